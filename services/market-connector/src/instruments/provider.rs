//! Remote instrument dataset download and decoding

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{info, warn};

use super::types::{InstrumentRecord, check_header};
use crate::error::LoadError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MAX_LOGGED_ROW_ERRORS: usize = 5;

/// Source of the raw (compressed) instrument dataset
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Download the complete dataset
    async fn fetch(&self) -> Result<Vec<u8>, LoadError>;
}

/// Downloads the Upstox `complete.csv.gz` dataset
#[derive(Debug, Clone)]
pub struct UpstoxDatasetProvider {
    url: String,
    client: Client,
}

impl UpstoxDatasetProvider {
    /// Create a provider with a bounded request timeout
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Dataset URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DatasetProvider for UpstoxDatasetProvider {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        info!("Fetching instrument dataset from {}", self.url);
        let start = std::time::Instant::now();

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                LoadError::Fetch(format!("request timeout: {e}"))
            } else {
                LoadError::Fetch(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LoadError::Fetch(format!("failed to read response body: {e}")))?;

        info!(
            "Downloaded {} bytes of instrument data in {:?}",
            body.len(),
            start.elapsed()
        );
        Ok(body.to_vec())
    }
}

/// Decode a downloaded dataset into the four indexed columns and drop rows
/// that cannot be indexed (blank key/symbol, complex symbols).
///
/// Gzip payloads are decompressed; anything else is read as plain CSV.
///
/// # Errors
/// Returns an error on corrupt compression, or a header without the
/// `instrument_key` and `tradingsymbol` columns
pub fn decode_dataset(payload: &[u8]) -> Result<Vec<InstrumentRecord>, LoadError> {
    if payload.starts_with(&GZIP_MAGIC) {
        parse_rows(GzDecoder::new(payload))
    } else {
        parse_rows(payload)
    }
}

fn parse_rows<R: Read>(source: R) -> Result<Vec<InstrumentRecord>, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    check_header(reader.headers()?)?;

    let mut rows = Vec::new();
    let mut seen = 0usize;
    let mut error_count = 0usize;

    for result in reader.deserialize::<InstrumentRecord>() {
        seen += 1;
        match result {
            Ok(row) if row.is_indexable() => rows.push(row),
            Ok(_) => {}
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                error_count += 1;
                if error_count <= MAX_LOGGED_ROW_ERRORS {
                    warn!("Skipping unparsable instrument row: {}", e);
                }
            }
        }
    }

    if error_count > 0 {
        warn!("Total instrument row parse errors: {}", error_count);
    }

    info!("Kept {} of {} instrument rows after filtering", rows.len(), seen);
    Ok(rows)
}
