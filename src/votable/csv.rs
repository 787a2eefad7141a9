use std::fmt;

use tracing::{debug, trace, warn};

use super::{
    Datatype, Field, LongestValues, Metadata, Resource, Row, RowBuilder, Table, TableData, VOTable,
};
use crate::domain::{ROW_ID_PREFIX, ReaderConfig, VotvError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RowAdd,
    PageAddStart,
    PageAddEnd,
    DataLoadComplete,
}

/// Notifications sent while rows are streamed in.
#[derive(Debug)]
pub enum BuilderEvent<'a> {
    RowAdd(&'a Row),
    PageAddStart,
    PageAddEnd,
    DataLoadComplete(&'a LongestValues),
}

impl BuilderEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            BuilderEvent::RowAdd(_) => EventKind::RowAdd,
            BuilderEvent::PageAddStart => EventKind::PageAddStart,
            BuilderEvent::PageAddEnd => EventKind::PageAddEnd,
            BuilderEvent::DataLoadComplete(_) => EventKind::DataLoadComplete,
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&BuilderEvent<'_>)>;

fn fire_event(subscribers: &mut [(EventKind, EventHandler)], event: &BuilderEvent<'_>) {
    let kind = event.kind();
    for (_, handler) in subscribers.iter_mut().filter(|(k, _)| *k == kind) {
        handler(event);
    }
}

/// Where the line splitter is within the current CSV field. A quote only
/// opens a quoted field as the first byte of that field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

impl Scan {
    fn next(self, byte: u8) -> Scan {
        match (self, byte) {
            (Scan::Quoted, b'"') => Scan::QuoteInQuoted,
            (Scan::Quoted, _) => Scan::Quoted,
            (Scan::QuoteInQuoted, b'"') => Scan::Quoted,
            (Scan::FieldStart, b'"') => Scan::Quoted,
            (_, b',') | (_, b'\n') => Scan::FieldStart,
            _ => Scan::Unquoted,
        }
    }
}

/// Position of the reader within the document, for tests and progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkState {
    pub row_count: usize,
    pub pending_bytes: usize,
}

/// Incremental CSV reader. Bytes are handed in as they arrive, complete
/// lines are turned into rows right away.
pub struct CsvBuilder {
    config: ReaderConfig,
    metadata: Metadata,
    row_builder: RowBuilder,
    buffer: Vec<u8>,
    scan_pos: usize,
    scan: Scan,
    header_seen: bool,
    row_count: usize,
    longest_values: LongestValues,
    rows: Vec<Row>,
    limit_reached: bool,
    subscribers: Vec<(EventKind, EventHandler)>,
    votable: Option<VOTable>,
}

impl fmt::Debug for CsvBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvBuilder")
            .field("config", &self.config)
            .field("fields", &self.metadata.fields.len())
            .field("row_count", &self.row_count)
            .field("pending_bytes", &self.buffer.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl CsvBuilder {
    /// `table_metadata` describes the columns. Without fields, they are
    /// taken from the header line as character columns.
    pub fn new(config: ReaderConfig, table_metadata: Metadata) -> Self {
        let mut longest_values = LongestValues::new();
        for field in table_metadata.fields() {
            longest_values.register(&field.id);
        }
        Self {
            config,
            metadata: table_metadata,
            row_builder: RowBuilder::new(),
            buffer: Vec::new(),
            scan_pos: 0,
            scan: Scan::FieldStart,
            header_seen: false,
            row_count: 0,
            longest_values,
            rows: Vec::new(),
            limit_reached: false,
            subscribers: Vec::new(),
            votable: None,
        }
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&BuilderEvent<'_>) + 'static) {
        self.subscribers.push((kind, Box::new(handler)));
    }

    pub fn current(&self) -> ChunkState {
        ChunkState {
            row_count: self.row_count,
            pending_bytes: self.buffer.len(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn votable(&self) -> Option<&VOTable> {
        self.votable.as_ref()
    }

    pub fn take_votable(&mut self) -> Option<VOTable> {
        self.votable.take()
    }

    /// Feed the next bytes of the document.
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), VotvError> {
        self.buffer.extend_from_slice(chunk);
        let buffer = std::mem::take(&mut self.buffer);

        let mut row_start = 0;
        let mut result = Ok(());
        for pos in self.scan_pos..buffer.len() {
            let byte = buffer[pos];
            // Newlines inside quoted values belong to the value
            let line_end = byte == b'\n' && self.scan != Scan::Quoted;
            self.scan = self.scan.next(byte);
            if line_end {
                result = self.next_line(&buffer[row_start..pos]);
                row_start = pos + 1;
                if result.is_err() {
                    break;
                }
            }
        }

        self.buffer = buffer[row_start..].to_vec();
        if result.is_ok() {
            self.scan_pos = self.buffer.len();
        } else {
            self.scan_pos = 0;
            self.scan = Scan::FieldStart;
        }
        trace!("Appended {} bytes, {} pending", chunk.len(), self.buffer.len());
        result
    }

    /// Finish the document: read a last line without line break, announce
    /// completion and assemble the VOTable.
    pub fn load_end(&mut self) -> Result<(), VotvError> {
        let rest = std::mem::take(&mut self.buffer);
        self.scan_pos = 0;
        self.scan = Scan::FieldStart;
        if !rest.iter().all(u8::is_ascii_whitespace) {
            self.next_line(&rest)?;
        }

        if self.config.page_size.is_some() {
            fire_event(&mut self.subscribers, &BuilderEvent::PageAddEnd);
        }
        fire_event(
            &mut self.subscribers,
            &BuilderEvent::DataLoadComplete(&self.longest_values),
        );

        let table = Table::new(
            self.metadata.clone(),
            TableData {
                rows: std::mem::take(&mut self.rows),
                longest_values: self.longest_values.clone(),
            },
        );
        debug!("CSV load complete with {} rows", table.rows().len());
        self.votable = Some(VOTable::new(
            Metadata::default(),
            vec![Resource {
                tables: vec![table],
                ..Default::default()
            }],
        ));
        Ok(())
    }

    fn next_line(&mut self, line: &[u8]) -> Result<(), VotvError> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let record = match Self::parse_record(line)? {
            Some(record) => record,
            None => return Ok(()),
        };

        // The first line holds facsimiles of the column names
        if !self.header_seen {
            self.header_seen = true;
            self.row_count = 1;
            if !self.metadata.has_fields() {
                self.metadata.fields = record
                    .iter()
                    .map(|name| Field::new(name.trim(), None).with_datatype(Datatype::Char))
                    .collect();
                for field in &self.metadata.fields {
                    self.longest_values.register(&field.id);
                }
                debug!("Fields from CSV header: {:?}", record);
            }
            return Ok(());
        }

        if let Some(limit) = self.config.max_row_limit
            && self.rows.len() >= limit
        {
            if !self.limit_reached {
                warn!("Row limit of {limit} reached, ignoring remaining rows");
                self.limit_reached = true;
            }
            return Ok(());
        }

        let values = record.iter().collect::<Vec<&str>>();
        let row = self.row_builder.build_row_data(
            &self.metadata.fields,
            format!("{ROW_ID_PREFIX}{}", self.row_count),
            &values,
            &mut self.longest_values,
            |value| value.trim().to_string(),
        );

        let page_position = self
            .config
            .page_size
            .filter(|&size| size > 0)
            .map(|size| self.row_count % size);

        if page_position == Some(1) {
            fire_event(&mut self.subscribers, &BuilderEvent::PageAddStart);
        }
        fire_event(&mut self.subscribers, &BuilderEvent::RowAdd(&row));
        if page_position == Some(0) {
            fire_event(&mut self.subscribers, &BuilderEvent::PageAddEnd);
        }

        self.rows.push(row);
        self.row_count += 1;
        Ok(())
    }

    fn parse_record(line: &[u8]) -> Result<Option<csv::StringRecord>, VotvError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line);
        let mut records = reader.records();
        let record = records.next().transpose()?;
        let extra = records.count();
        if extra > 0 {
            warn!(
                "Line holds {} more records, only the first is kept: {}",
                extra,
                String::from_utf8_lossy(line)
            );
        }
        Ok(record)
    }
}
