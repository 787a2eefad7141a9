//! Grid view state carried in a URL fragment:
//! `#sortCol=<id>&sortDir=<asc|dsc>&col_<n>=<id>;<width>;<filter>;<unit>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

const SORT_COLUMN_KEY: &str = "sortCol";
const SORT_DIRECTION_KEY: &str = "sortDir";
const COLUMN_KEY_PREFIX: &str = "col_";
const COLUMN_DELIMITER: &str = ";";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Dsc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Dsc => "dsc",
        }
    }

    pub fn is_ascending(self) -> bool {
        self == SortDirection::Asc
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "dsc" | "desc" => Ok(SortDirection::Dsc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOption {
    pub label: String,
    pub value: String,
    pub default: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOptions {
    pub units: Vec<UnitOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    pub width: Option<u32>,
    pub header: Option<HeaderOptions>,
}

impl ColumnOptions {
    /// The unit selected by default in the column header.
    pub fn unit(&self) -> Option<&str> {
        let units = &self.header.as_ref()?.units;
        units
            .iter()
            .find(|u| u.default)
            .or(units.first())
            .map(|u| u.value.as_str())
    }
}

/// Options a grid is set up with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerOptions {
    pub sort_column: Option<String>,
    pub sort_dir: Option<SortDirection>,
    pub default_column_ids: Vec<String>,
    pub column_options: BTreeMap<String, ColumnOptions>,
    pub column_filters: BTreeMap<String, String>,
}

impl ViewerOptions {
    pub fn is_empty(&self) -> bool {
        *self == ViewerOptions::default()
    }

    /// Overlay `other` on these options. Values present in `other` win; a
    /// non-empty column list replaces the current one.
    pub fn merge(&mut self, other: ViewerOptions) {
        if other.sort_column.is_some() {
            self.sort_column = other.sort_column;
        }
        if other.sort_dir.is_some() {
            self.sort_dir = other.sort_dir;
        }
        if !other.default_column_ids.is_empty() {
            self.default_column_ids = other.default_column_ids;
        }
        for (id, options) in other.column_options {
            let current = self.column_options.entry(id).or_default();
            if options.width.is_some() {
                current.width = options.width;
            }
            if options.header.is_some() {
                current.header = options.header;
            }
        }
        self.column_filters.extend(other.column_filters);
    }
}

/// Writes the view state of a grid into the fragment of `base_url`.
#[derive(Debug, Clone, Default)]
pub struct ResultStateSerializer {
    base_url: String,
    sort_column: Option<String>,
    sort_direction: Option<SortDirection>,
    columns: Vec<String>,
    widths: BTreeMap<String, u32>,
    filters: BTreeMap<String, String>,
    units: BTreeMap<String, String>,
}

impl ResultStateSerializer {
    pub fn new(
        base_url: impl Into<String>,
        sort_column: Option<String>,
        sort_direction: Option<SortDirection>,
        columns: Vec<String>,
        widths: BTreeMap<String, u32>,
        filters: BTreeMap<String, String>,
        units: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            sort_column,
            sort_direction,
            columns,
            widths,
            filters,
            units,
        }
    }

    pub fn result_state_url(&self) -> String {
        let base = match self.base_url.split_once('#') {
            Some((base, _)) => base,
            None => self.base_url.as_str(),
        };

        let mut params = Vec::new();
        if let Some(column) = self.sort_column.as_deref().filter(|c| !c.is_empty()) {
            params.push(format!(
                "{SORT_COLUMN_KEY}={}",
                urlencoding::encode(column)
            ));
        }
        if let Some(direction) = self.sort_direction {
            params.push(format!("{SORT_DIRECTION_KEY}={direction}"));
        }
        for (index, id) in self.columns.iter().enumerate() {
            params.push(format!(
                "{COLUMN_KEY_PREFIX}{}={}",
                index + 1,
                self.column_record(id)
            ));
        }

        if params.is_empty() {
            base.to_string()
        } else {
            format!("{base}#{}", params.join("&"))
        }
    }

    fn column_record(&self, id: &str) -> String {
        let width = self.widths.get(id).map(u32::to_string).unwrap_or_default();
        let filter = self
            .filters
            .get(id)
            .map(|f| urlencoding::encode(f).into_owned())
            .unwrap_or_default();
        let unit = self.units.get(id).map(String::as_str).unwrap_or_default();
        let id = urlencoding::encode(id);
        [id.as_ref(), width.as_str(), filter.as_str(), unit].join(COLUMN_DELIMITER)
    }
}

/// Reads view state back out of a URL fragment.
#[derive(Debug, Clone)]
pub struct ResultStateDeserializer {
    url: String,
}

impl ResultStateDeserializer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn viewer_options(&self) -> ViewerOptions {
        let mut options = ViewerOptions::default();
        let Some((_, fragment)) = self.url.split_once('#') else {
            return options;
        };

        let mut columns: Vec<(usize, String)> = Vec::new();
        for param in fragment.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            match key {
                SORT_COLUMN_KEY if !value.is_empty() => {
                    options.sort_column = Some(decode(value));
                }
                SORT_DIRECTION_KEY if !value.is_empty() => match value.parse() {
                    Ok(direction) => options.sort_dir = Some(direction),
                    Err(e) => warn!("Ignoring state parameter {param}: {e}"),
                },
                _ => match key.strip_prefix(COLUMN_KEY_PREFIX).map(str::parse::<usize>) {
                    Some(Ok(position)) => {
                        if let Some(id) = Self::read_column(&mut options, value) {
                            columns.push((position, id));
                        }
                    }
                    _ => debug!("Ignoring state parameter {param}"),
                },
            }
        }

        columns.sort_by_key(|(position, _)| *position);
        options.default_column_ids = columns.into_iter().map(|(_, id)| id).collect();
        options
    }

    fn read_column(options: &mut ViewerOptions, record: &str) -> Option<String> {
        let mut parts = record.split(COLUMN_DELIMITER);
        let id = decode(parts.next().filter(|id| !id.is_empty())?);
        let width = parts.next().unwrap_or_default();
        let filter = parts.next().unwrap_or_default();
        let unit = parts.next().unwrap_or_default();

        let mut column = ColumnOptions::default();
        if !width.is_empty() {
            match width.parse::<u32>() {
                Ok(width) => column.width = Some(width),
                Err(_) => warn!("Ignoring width '{width}' of column {id}"),
            }
        }
        if !unit.is_empty() {
            column.header = Some(HeaderOptions {
                units: vec![UnitOption {
                    label: unit.to_string(),
                    value: unit.to_string(),
                    default: true,
                }],
            });
        }
        if column != ColumnOptions::default() {
            options.column_options.insert(id.clone(), column);
        }
        if !filter.is_empty() {
            options.column_filters.insert(id.clone(), decode(filter));
        }
        Some(id)
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_URL: &str = "http://localhost.com/search?Observation.target.name=alpha%20beta&foo=bar";

    fn map<V: Clone>(entries: &[(&str, V)]) -> BTreeMap<String, V> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn units(unit: &str) -> Option<HeaderOptions> {
        Some(HeaderOptions {
            units: vec![UnitOption {
                label: unit.into(),
                value: unit.into(),
                default: true,
            }],
        })
    }

    #[test]
    fn serialize_without_state() {
        let base = "http://localhost.com/foo/bar/search";
        let serializer = ResultStateSerializer::new(base, None, None, vec![], map(&[]), map(&[]), map(&[]));
        assert_eq!(serializer.result_state_url(), base);

        let serializer = ResultStateSerializer::new(
            BASE_URL,
            Some(String::new()),
            None,
            vec![],
            map(&[]),
            map(&[]),
            map(&[]),
        );
        assert_eq!(serializer.result_state_url(), BASE_URL);
    }

    #[test]
    fn serialize_columns() {
        let columns = vec!["id1".to_string(), "id2".to_string(), "id3".to_string()];
        let sort = Some("foo".to_string());
        let dir = Some(SortDirection::Dsc);

        let serializer = ResultStateSerializer::new(
            BASE_URL,
            sort.clone(),
            dir,
            vec![],
            map(&[]),
            map(&[]),
            map(&[]),
        );
        assert_eq!(
            serializer.result_state_url(),
            format!("{BASE_URL}#sortCol=foo&sortDir=dsc")
        );

        let serializer = ResultStateSerializer::new(
            BASE_URL,
            sort.clone(),
            dir,
            columns.clone(),
            map(&[]),
            map(&[]),
            map(&[]),
        );
        assert_eq!(
            serializer.result_state_url(),
            format!("{BASE_URL}#sortCol=foo&sortDir=dsc&col_1=id1;;;&col_2=id2;;;&col_3=id3;;;")
        );

        let serializer = ResultStateSerializer::new(
            format!("{BASE_URL}#old=state"),
            sort,
            dir,
            columns,
            map(&[("id1", 75), ("id3", 150)]),
            map(&[("id2", "id2 filter".to_string()), ("id3", "id3 filter".to_string())]),
            map(&[("id1", "H:M:S".to_string()), ("id2", "km/s".to_string())]),
        );
        assert_eq!(
            serializer.result_state_url(),
            format!(
                "{BASE_URL}#sortCol=foo&sortDir=dsc&col_1=id1;75;;H:M:S\
                 &col_2=id2;;id2%20filter;km/s&col_3=id3;150;id3%20filter;"
            )
        );
    }

    #[test]
    fn deserialize() {
        assert!(ResultStateDeserializer::new(BASE_URL).viewer_options().is_empty());

        let options = ResultStateDeserializer::new(format!("{BASE_URL}#sortCol=foo&sortDir=asc"))
            .viewer_options();
        assert_eq!(options.sort_column.as_deref(), Some("foo"));
        assert_eq!(options.sort_dir, Some(SortDirection::Asc));
        assert!(options.default_column_ids.is_empty());

        let options = ResultStateDeserializer::new(format!(
            "{BASE_URL}#sortCol=foo&sortDir=asc&col_1=id1&col_3=id3&col_2=id2"
        ))
        .viewer_options();
        assert_eq!(options.default_column_ids, vec!["id1", "id2", "id3"]);
        assert!(options.column_options.is_empty());

        let options = ResultStateDeserializer::new(format!(
            "{BASE_URL}#sortCol=foo&sortDir=asc&col_1=id1;50;filter%201\
             &col_3=id3;;filter%203;km/s&col_2=id2;75"
        ))
        .viewer_options();
        assert_eq!(options.default_column_ids, vec!["id1", "id2", "id3"]);
        assert_eq!(
            options.column_options,
            map(&[
                ("id1", ColumnOptions { width: Some(50), header: None }),
                ("id2", ColumnOptions { width: Some(75), header: None }),
                ("id3", ColumnOptions { width: None, header: units("km/s") }),
            ])
        );
        assert_eq!(
            options.column_filters,
            map(&[("id1", "filter 1".to_string()), ("id3", "filter 3".to_string())])
        );
        assert_eq!(options.column_options["id3"].unit(), Some("km/s"));
    }

    #[test]
    fn merge_url_options_into_defaults() {
        let mut defaults = ViewerOptions {
            sort_column: Some("bar".into()),
            sort_dir: Some(SortDirection::Dsc),
            default_column_ids: vec!["col1".into(), "col2".into(), "col3".into()],
            column_options: map(&[
                ("id2", ColumnOptions { width: Some(100), header: None }),
                ("id3", ColumnOptions { width: Some(100), header: units("m/s") }),
            ]),
            column_filters: map(&[
                ("id1", "default filter".to_string()),
                ("id3", "default filter".to_string()),
            ]),
        };

        let url = format!(
            "{BASE_URL}#sortCol=foo&sortDir=asc&col_1=id1;50;filter%201\
             &col_3=id3;;filter%203;km/s&col_2=id2;75"
        );
        defaults.merge(ResultStateDeserializer::new(url).viewer_options());

        let expected = ViewerOptions {
            sort_column: Some("foo".into()),
            sort_dir: Some(SortDirection::Asc),
            default_column_ids: vec!["id1".into(), "id2".into(), "id3".into()],
            column_options: map(&[
                ("id1", ColumnOptions { width: Some(50), header: None }),
                ("id2", ColumnOptions { width: Some(75), header: None }),
                ("id3", ColumnOptions { width: Some(100), header: units("km/s") }),
            ]),
            column_filters: map(&[
                ("id1", "filter 1".to_string()),
                ("id3", "filter 3".to_string()),
            ]),
        };
        assert_eq!(defaults, expected);
    }

    #[test]
    fn sort_direction_parsing() {
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert_eq!("DESC".parse::<SortDirection>(), Ok(SortDirection::Dsc));
        assert!("up".parse::<SortDirection>().is_err());
        let options = ResultStateDeserializer::new("u#sortDir=up&col_x=a").viewer_options();
        assert!(options.is_empty());
    }

    #[test]
    fn column_ids_with_reserved_characters() {
        let serializer = ResultStateSerializer::new(
            "http://host/search",
            Some("Job ID".into()),
            Some(SortDirection::Asc),
            vec!["Job ID".into(), "a;b&c#d".into()],
            map(&[("Job ID", 90)]),
            map(&[("a;b&c#d", "x".to_string())]),
            BTreeMap::new(),
        );
        let url = serializer.result_state_url();
        assert_eq!(
            url,
            "http://host/search#sortCol=Job%20ID&sortDir=asc&col_1=Job%20ID;90;;&col_2=a%3Bb%26c%23d;;x;"
        );

        let options = ResultStateDeserializer::new(url).viewer_options();
        assert_eq!(options.sort_column.as_deref(), Some("Job ID"));
        assert_eq!(options.default_column_ids, vec!["Job ID", "a;b&c#d"]);
        assert_eq!(options.column_options["Job ID"].width, Some(90));
        assert_eq!(options.column_filters["a;b&c#d"], "x");
    }
}
