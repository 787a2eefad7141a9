use std::io::Error;

use derive_setters::Setters;
use thiserror::Error;

/// Namespace of the VOTable 1.2 schema, bound to the `votable` XPath prefix.
pub const VOTABLE_NAMESPACE: &str = "http://www.ivoa.net/xml/VOTable/v1.2";

/// Prefix for row ids that the document did not provide.
pub const ROW_ID_PREFIX: &str = "vov_";

#[derive(Debug, Error)]
pub enum VotvError {
    #[error("I/O error: {0}")]
    IoError(#[from] Error),
    #[error("XML input is invalid: {0}")]
    XmlError(#[from] roxmltree::Error),
    #[error("JSON input is invalid: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV input is invalid: {0}")]
    CsvError(#[from] csv::Error),
    #[error("input is not valid UTF-8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("{0}")]
    HttpError(String),
    #[error("Unable to obtain XML, JSON, or CSV VOTable from URL ({0}).")]
    UnsupportedContent(String),
    #[error("Input object is not set or not recognizable: {0}")]
    InputNotRecognized(String),
    #[error("unknown XPath namespace prefix: {0}")]
    UnknownPrefix(String),
    #[error("invalid XPath step: {0}")]
    InvalidXPath(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

/// Settings shared by every builder.
#[derive(Debug, Clone, Default, Setters)]
#[setters(prefix = "with_")]
pub struct ReaderConfig {
    /// Maximum number of rows kept from a streamed document.
    #[setters(strip_option)]
    pub max_row_limit: Option<usize>,
    /// Rows per page when announcing page events.
    #[setters(strip_option)]
    pub page_size: Option<usize>,
    /// Request the host-less form of a URL.
    pub use_relative_url: bool,
}
