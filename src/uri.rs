use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

static URI_PARSER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?")
        .expect("URI grammar is a valid regex")
});

static FILE_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/?#]+)$").expect("file grammar is a valid regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UriComponents {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
    pub hash: String,
    pub file: String,
}

/// A parsed URI with its query string decoded into name => values.
#[derive(Debug, Clone)]
pub struct Uri {
    uri: String,
    components: UriComponents,
    query: BTreeMap<String, Vec<String>>,
}

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let components = Self::parse(&uri);
        let query = Self::parse_query(&components.query);
        trace!("Parsed URI {uri}: {components:?}");
        Self {
            uri,
            components,
            query,
        }
    }

    fn parse(uri: &str) -> UriComponents {
        let Some(caps) = URI_PARSER.captures(uri) else {
            return UriComponents::default();
        };
        let part = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();

        let path = part(3);
        let file = FILE_MATCHER
            .captures(&path)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        UriComponents {
            scheme: part(1),
            host: part(2),
            query: part(4),
            hash: part(5),
            path,
            file,
        }
    }

    fn parse_query(query_string: &str) -> BTreeMap<String, Vec<String>> {
        let mut nvpair: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if query_string.trim().is_empty() {
            return nvpair;
        }

        for pair in query_string.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            // Malformed escapes stay as they are
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            nvpair.entry(key.to_string()).or_default().push(decoded);
        }
        nvpair
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn components(&self) -> &UriComponents {
        &self.components
    }

    pub fn scheme(&self) -> &str {
        &self.components.scheme
    }

    pub fn host(&self) -> &str {
        &self.components.host
    }

    pub fn path(&self) -> &str {
        &self.components.path
    }

    /// Path segments, without the empty item produced by a leading '/'.
    pub fn path_items(&self) -> Vec<&str> {
        let mut items: Vec<&str> = self.path().split('/').collect();
        if items.first() == Some(&"") {
            items.remove(0);
        }
        items
    }

    pub fn file(&self) -> &str {
        &self.components.file
    }

    pub fn query_string(&self) -> &str {
        &self.components.query
    }

    pub fn hash(&self) -> &str {
        &self.components.hash
    }

    /// The host-less version of this URI, or an empty string if none available.
    pub fn relative_uri(&self) -> String {
        let mut relative = self.path().to_string();
        if !self.query_string().is_empty() {
            relative.push('?');
            relative.push_str(self.query_string());
        }
        if !self.hash().is_empty() {
            relative.push('#');
            relative.push_str(self.hash());
        }
        relative
    }

    /// `scheme://host` of this URI, empty when it has no host.
    pub fn origin(&self) -> String {
        if self.host().is_empty() {
            String::new()
        } else if self.scheme().is_empty() {
            format!("//{}", self.host())
        } else {
            format!("{}://{}", self.scheme(), self.host())
        }
    }

    pub fn query(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query
    }

    /// First value for the key.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query_values(key).first().map(String::as_str)
    }

    /// All values for the key, or an empty slice.
    pub fn query_values(&self, key: &str) -> &[String] {
        self.query.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Raw key => value view of the query string, one value per key.
    #[deprecated(note = "use `query()` instead")]
    pub fn query_string_object(&self) -> BTreeMap<String, Option<String>> {
        self.query_string()
            .replace('?', "")
            .split('&')
            .map(|pair| {
                let mut parts = pair.split('=');
                let key = parts.next().unwrap_or_default().to_string();
                (key, parts.next().map(str::to_string))
            })
            .collect()
    }
}
