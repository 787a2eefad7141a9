use tracing::{debug, warn};

use super::csv::{BuilderEvent, CsvBuilder, EventHandler, EventKind};
use super::json::JsonBuilder;
use super::stream::StreamBuilder;
use super::xml::VOTableXmlBuilder;
use super::{Field, LongestValues, Metadata, Row, RowBuilder, VOTable};
use crate::domain::{ReaderConfig, VotvError};

#[derive(Debug, Clone, Default)]
pub struct CsvInput {
    /// Column descriptions. Left empty, columns come from the header line.
    pub table_metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct UrlInput {
    pub url: String,
    pub table_metadata: Metadata,
}

/// Where a VOTable comes from.
#[derive(Debug, Clone)]
pub enum Input {
    Xml(String),
    Json(String),
    Csv(CsvInput),
    Url(UrlInput),
}

#[derive(Debug)]
enum Source {
    Xml(VOTableXmlBuilder),
    Json(JsonBuilder),
    Csv(CsvBuilder),
    Stream(StreamBuilder),
    /// The stream has started but no CSV builder is installed yet.
    Waiting,
}

/// Single entry point over the format specific builders.
pub struct Builder {
    config: ReaderConfig,
    row_builder: RowBuilder,
    source: Source,
    pending_subscribers: Vec<(EventKind, EventHandler)>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("pending_subscribers", &self.pending_subscribers.len())
            .finish()
    }
}

impl Builder {
    pub fn new(config: ReaderConfig, input: Input) -> Self {
        let source = match input {
            Input::Xml(xml) => Source::Xml(VOTableXmlBuilder::new(xml)),
            Input::Json(json) => Source::Json(JsonBuilder::new(json)),
            Input::Csv(csv) => Source::Csv(CsvBuilder::new(config.clone(), csv.table_metadata)),
            Input::Url(url) => Source::Stream(StreamBuilder::new(
                config.clone(),
                url.url,
                url.table_metadata,
            )),
        };
        Self {
            config,
            row_builder: RowBuilder::new(),
            source,
            pending_subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Run the stream for URL input. For any other input `ready` is called
    /// right away.
    pub async fn start<F>(&mut self, ready: F) -> Result<(), VotvError>
    where
        F: FnOnce(&mut Builder),
    {
        match std::mem::replace(&mut self.source, Source::Waiting) {
            Source::Stream(stream) => stream.start(self, ready).await,
            source => {
                self.source = source;
                ready(self);
                Ok(())
            }
        }
    }

    /// Build an XML or JSON document. Streamed input builds itself on
    /// `load_end`.
    pub fn build(&mut self) -> Result<(), VotvError> {
        match &mut self.source {
            Source::Xml(xml) => xml.build(&self.row_builder),
            Source::Json(json) => json.build(&self.row_builder),
            _ => {
                debug!("Nothing to build for streamed input");
                Ok(())
            }
        }
    }

    pub fn votable(&self) -> Option<&VOTable> {
        match &self.source {
            Source::Xml(xml) => xml.votable(),
            Source::Json(json) => json.votable(),
            Source::Csv(csv) => csv.votable(),
            Source::Stream(_) | Source::Waiting => None,
        }
    }

    pub fn take_votable(&mut self) -> Option<VOTable> {
        match &mut self.source {
            Source::Xml(xml) => xml.take_votable(),
            Source::Json(json) => json.take_votable(),
            Source::Csv(csv) => csv.take_votable(),
            Source::Stream(_) | Source::Waiting => None,
        }
    }

    pub fn append(&mut self, chunk: &[u8]) -> Result<(), VotvError> {
        match &mut self.source {
            Source::Csv(csv) => csv.append(chunk),
            _ => Err(VotvError::LoadingFailed(
                "only CSV input is read in chunks".into(),
            )),
        }
    }

    pub fn load_end(&mut self) -> Result<(), VotvError> {
        match &mut self.source {
            Source::Csv(csv) => csv.load_end(),
            _ => Err(VotvError::LoadingFailed(
                "only CSV input is read in chunks".into(),
            )),
        }
    }

    /// Register an event handler. Handlers registered before a stream has
    /// started are handed to its CSV builder once it exists. XML and JSON
    /// input fire no events.
    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&BuilderEvent<'_>) + 'static) {
        match &mut self.source {
            Source::Csv(csv) => csv.subscribe(kind, handler),
            Source::Stream(_) | Source::Waiting => {
                self.pending_subscribers.push((kind, Box::new(handler)));
            }
            Source::Xml(_) | Source::Json(_) => {
                warn!("Ignoring {kind:?} subscription, input does not stream");
            }
        }
    }

    pub fn build_row_data<T>(
        &self,
        fields: &[Field],
        row_id: impl Into<String>,
        row_data: &[T],
        longest_values: &mut LongestValues,
        extract: impl Fn(&T) -> String,
    ) -> Row {
        self.row_builder
            .build_row_data(fields, row_id, row_data, longest_values, extract)
    }

    pub(super) fn install_csv(&mut self, mut csv: CsvBuilder) {
        for (kind, handler) in self.pending_subscribers.drain(..) {
            csv.subscribe(kind, handler);
        }
        self.source = Source::Csv(csv);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::votable::{CellValue, Datatype};

    #[tokio::test]
    async fn xml_input_is_ready_immediately() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="a" datatype="int"/>
            <DATA><TABLEDATA><TR><TD>7</TD></TR></TABLEDATA></DATA></TABLE></RESOURCE></VOTABLE>"#;
        let mut builder = Builder::new(ReaderConfig::default(), Input::Xml(xml.into()));

        let mut called = false;
        builder
            .start(|b| {
                called = true;
                b.build().unwrap();
            })
            .await
            .unwrap();

        assert!(called);
        let table = builder.votable().unwrap().first_table().unwrap();
        assert_eq!(table.rows()[0].value("a"), Some(&CellValue::Integer(7)));
    }

    #[test]
    fn csv_input_through_the_facade() {
        let metadata = Metadata::with_fields(vec![
            Field::new("obs", None).with_datatype(Datatype::Char),
            Field::new("exptime", None).with_datatype(Datatype::Double),
        ]);
        let mut builder = Builder::new(
            ReaderConfig::default(),
            Input::Csv(CsvInput {
                table_metadata: metadata,
            }),
        );
        let added = Rc::new(Cell::new(0));
        let counter = Rc::clone(&added);
        builder.subscribe(EventKind::RowAdd, move |_| counter.set(counter.get() + 1));

        builder.append(b"obs,exptime\no1,30.5\no2,").unwrap();
        builder.append(b"\n").unwrap();
        assert!(builder.votable().is_none());
        builder.load_end().unwrap();

        assert_eq!(added.get(), 2);
        let votable = builder.take_votable().unwrap();
        let rows = votable.first_table().unwrap().rows();
        assert_eq!(rows[0].value("exptime"), Some(&CellValue::Float(30.5)));
        assert!(rows[1].value("exptime").unwrap().is_nan());
    }

    #[test]
    fn chunks_need_csv_input() {
        let mut builder = Builder::new(ReaderConfig::default(), Input::Json("{}".into()));
        assert!(builder.append(b"a,b\n").is_err());
        builder.build().unwrap();
        assert_eq!(builder.votable().unwrap().resources.len(), 0);
    }

    #[test]
    fn subscriptions_wait_for_the_stream() {
        let mut builder = Builder::new(
            ReaderConfig::default(),
            Input::Url(UrlInput {
                url: "http://localhost/data.csv".into(),
                table_metadata: Metadata::default(),
            }),
        );
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        builder.subscribe(EventKind::DataLoadComplete, move |_| flag.set(true));
        assert_eq!(builder.pending_subscribers.len(), 1);

        builder.install_csv(CsvBuilder::new(ReaderConfig::default(), Metadata::default()));
        builder.append(b"a\n1\n").unwrap();
        builder.load_end().unwrap();
        assert!(done.get());
        assert!(builder.pending_subscribers.is_empty());
    }
}
