//! Reading VOTables (XML, JSON, CSV, streamed over HTTP) into an in-memory
//! table, with the sorting, filtering and URL view state of a data grid.

pub mod comparer;
pub mod domain;
pub mod filter;
pub mod state;
pub mod uri;
pub mod util;
pub mod view;
pub mod votable;

pub use comparer::Comparer;
pub use domain::{ReaderConfig, VotvError};
pub use filter::ValueFilter;
pub use state::{ResultStateDeserializer, ResultStateSerializer, SortDirection, ViewerOptions};
pub use uri::Uri;
pub use view::GridView;
pub use votable::builder::{Builder, CsvInput, Input, UrlInput};
