//! Error types for instrument resolution and quotes

use thiserror::Error;

/// Failure while building the instrument index from the remote dataset or
/// the local cache file
#[derive(Debug, Error)]
pub enum LoadError {
    /// Remote dataset request failed or timed out
    #[error("Failed to fetch instrument dataset: {0}")]
    Fetch(String),

    /// Remote dataset endpoint answered with a non-success status
    #[error("Instrument dataset request failed with HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Dataset rows could not be parsed
    #[error("Failed to parse instrument dataset: {0}")]
    Csv(#[from] csv::Error),

    /// Local cache file or decompression I/O failed
    #[error("Instrument dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header lacks a column every row needs
    #[error("Instrument dataset has no '{column}' column")]
    MissingColumn {
        /// Name of the absent column
        column: &'static str,
    },

    /// Dataset parsed but no row survived filtering
    #[error("Instrument dataset contains no indexable rows")]
    Empty,
}

/// Exchange code outside the named segments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown exchange '{0}'")]
pub struct UnknownExchange(pub String);

/// Instrument index errors
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// Exchange-qualified symbol is not in the index
    #[error("Invalid symbol: {0}")]
    SymbolNotFound(String),

    /// Instrument key is not in the index
    #[error("Invalid instrument key: {0}")]
    KeyNotFound(String),

    /// No index has been loaded yet
    #[error("Instrument index is not loaded")]
    NotReady,

    /// Loading or refreshing the index failed
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl InstrumentError {
    /// True for lookup misses on either direction
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SymbolNotFound(_) | Self::KeyNotFound(_))
    }
}

/// Per-instrument quote failure; captured in batch results instead of raised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// Upstox answered with a non-success status
    #[error("API Error ({status}): {message} for {symbol}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the error body, or a default text
        message: String,
        /// Trading symbol the request was for
        symbol: String,
    },

    /// Response carried no quote data
    #[error("No data found for {symbol}")]
    NoData {
        /// Trading symbol the request was for
        symbol: String,
    },

    /// No access token has been configured
    #[error("Access token not configured for {symbol}")]
    MissingToken {
        /// Trading symbol the request was for
        symbol: String,
    },

    /// Request never produced a response
    #[error("Request failed for {symbol}: {message}")]
    Transport {
        /// Trading symbol the request was for
        symbol: String,
        /// Transport error description
        message: String,
    },

    /// Successful response with an unexpected payload
    #[error("Malformed quote payload for {symbol}: {message}")]
    Decode {
        /// Trading symbol the request was for
        symbol: String,
        /// Parse error description
        message: String,
    },
}
