use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, trace, warn};

use super::Metadata;
use super::builder::Builder;
use super::csv::CsvBuilder;
use crate::domain::{ReaderConfig, VotvError};
use crate::uri::Uri;

/// Streams a CSV VOTable over HTTP into the CSV builder, chunk by chunk.
#[derive(Debug)]
pub struct StreamBuilder {
    config: ReaderConfig,
    uri: Uri,
    table_metadata: Metadata,
}

impl StreamBuilder {
    pub fn new(config: ReaderConfig, url: impl Into<String>, table_metadata: Metadata) -> Self {
        Self {
            config,
            uri: Uri::new(url),
            table_metadata,
        }
    }

    /// The URL as configured: host-less when `use_relative_url` is set.
    pub fn url_string(&self) -> String {
        if self.config.use_relative_url {
            self.uri.relative_uri()
        } else {
            self.uri.uri().to_string()
        }
    }

    /// The absolute URL that is requested. A relative URL is resolved against
    /// the origin of the configured one.
    fn request_url(&self) -> String {
        let url = if self.config.use_relative_url {
            format!("{}{}", self.uri.origin(), self.uri.relative_uri())
        } else {
            self.uri.uri().to_string()
        };
        match url.split_once('#') {
            Some((without_fragment, _)) => without_fragment.to_string(),
            None => url,
        }
    }

    /// Issue the request and feed the response into `builder`. `ready` is
    /// called once the CSV builder is installed, before the first chunk.
    pub async fn start<F>(self, builder: &mut Builder, ready: F) -> Result<(), VotvError>
    where
        F: FnOnce(&mut Builder),
    {
        let start_time = Instant::now();
        let url = self.url_string();
        let http = reqwest::Client::new();
        debug!("Requesting {}", self.request_url());
        let mut response = http.get(self.request_url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(read_error(&url, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        check_content_type(&url, content_type)?;

        builder.install_csv(CsvBuilder::new(self.config, self.table_metadata));
        ready(builder);

        let mut received = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    trace!("Received chunk of {} bytes", chunk.len());
                    received += chunk.len();
                    builder.append(&chunk)?;
                }
                Ok(None) => break,
                Err(e) => {
                    // Announce what has arrived before reporting the failure
                    warn!("Stream from {url} broke off after {received} bytes: {e}");
                    builder.load_end()?;
                    return Err(e.into());
                }
            }
        }
        builder.load_end()?;

        info!(
            "Streamed {received} bytes from {url} in {}ms",
            start_time.elapsed().as_millis()
        );
        Ok(())
    }
}

fn read_error(url: &str, body: &str) -> VotvError {
    let mut message = format!("Unable to read from URL ({url}).");
    if !body.trim().is_empty() {
        message.push_str("\n\nMessage from server: ");
        message.push_str(body.trim());
    }
    VotvError::HttpError(message)
}

fn check_content_type(url: &str, content_type: &str) -> Result<(), VotvError> {
    if content_type.to_ascii_lowercase().contains("csv") {
        Ok(())
    } else {
        Err(VotvError::UnsupportedContent(url.to_string()))
    }
}
