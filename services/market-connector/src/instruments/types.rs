//! Instrument dataset rows and lookup results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LoadError, UnknownExchange};

/// Separator between exchange and symbol/identifier in composite keys
pub const EXCHANGE_SEPARATOR: char = '|';

/// Exchange segments with a first-class name.
///
/// Lookups accept any exchange string; the dataset carries more segments
/// than the ones listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// NSE equity
    #[serde(rename = "NSE_EQ")]
    NseEq,
    /// BSE equity
    #[serde(rename = "BSE_EQ")]
    BseEq,
    /// MCX commodity derivatives
    #[serde(rename = "MCX_FO")]
    McxFo,
    /// NSE currency derivatives
    #[serde(rename = "NCD_FO")]
    NcdFo,
}

impl Exchange {
    /// Exchange code as used by Upstox
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NseEq => "NSE_EQ",
            Self::BseEq => "BSE_EQ",
            Self::McxFo => "MCX_FO",
            Self::NcdFo => "NCD_FO",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = UnknownExchange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NSE_EQ" => Ok(Self::NseEq),
            "BSE_EQ" => Ok(Self::BseEq),
            "MCX_FO" => Ok(Self::McxFo),
            "NCD_FO" => Ok(Self::NcdFo),
            other => Err(UnknownExchange(other.to_string())),
        }
    }
}

/// One row of the instrument dataset.
///
/// Field order matches the local cache header
/// `instrument_key,tradingsymbol,name,exchange`. Extra columns in the remote
/// dataset are ignored when deserializing; `name` and `exchange` may be
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Opaque identifier, e.g. `NSE_EQ|INE040A01034`
    pub instrument_key: String,

    /// Ticker, unique within an exchange
    pub tradingsymbol: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Exchange segment, e.g. `NSE_EQ`
    #[serde(default)]
    pub exchange: String,
}

/// Columns a dataset header must carry
pub const REQUIRED_COLUMNS: [&str; 2] = ["instrument_key", "tradingsymbol"];

/// Reject a dataset whose header lacks a required column
///
/// # Errors
/// Returns [`LoadError::MissingColumn`] naming the first absent column
pub fn check_header(headers: &csv::StringRecord) -> Result<(), LoadError> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column) {
            return Err(LoadError::MissingColumn { column });
        }
    }
    Ok(())
}

impl InstrumentRecord {
    /// Create a record
    pub fn new(
        instrument_key: impl Into<String>,
        tradingsymbol: impl Into<String>,
        name: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            tradingsymbol: tradingsymbol.into(),
            name: name.into(),
            exchange: exchange.into(),
        }
    }

    /// Row has both a key and a symbol
    pub fn is_well_formed(&self) -> bool {
        !self.instrument_key.trim().is_empty() && !self.tradingsymbol.trim().is_empty()
    }

    /// Row survives dataset filtering
    pub fn is_indexable(&self) -> bool {
        self.is_well_formed() && !is_complex_symbol(self.tradingsymbol.trim())
    }
}

/// Resolved instrument returned by both lookup directions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Trading symbol, exchange-qualified when known (`NSE_EQ|HDFCBANK`)
    #[serde(rename = "tradingsymbol")]
    pub trading_symbol: String,

    /// Normalized instrument key
    #[serde(rename = "instrumentKey")]
    pub instrument_key: String,
}

impl Instrument {
    /// Create an instrument
    pub fn new(trading_symbol: impl Into<String>, instrument_key: impl Into<String>) -> Self {
        Self {
            trading_symbol: trading_symbol.into(),
            instrument_key: instrument_key.into(),
        }
    }
}

/// When a locally cached dataset must be re-fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Only an explicit refresh re-fetches the dataset
    #[default]
    Manual,
    /// Local data older than this is stale
    MaxAge(Duration),
}

impl RefreshPolicy {
    /// Whether data of the given age must be re-fetched
    pub fn is_stale(self, age: Option<Duration>) -> bool {
        match (self, age) {
            (Self::Manual, _) | (Self::MaxAge(_), None) => false,
            (Self::MaxAge(max_age), Some(age)) => age >= max_age,
        }
    }
}

/// Derivative/contract style symbol: only letters and digits, with at least
/// one of each (`NIFTY24JANFUT`). Such symbols are kept out of the index.
pub fn is_complex_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.chars().all(char::is_alphanumeric)
        && symbol.chars().any(char::is_alphabetic)
        && symbol.chars().any(char::is_numeric)
}

/// Composite `EXCHANGE|SYMBOL` lookup key
pub fn symbol_key(exchange: &str, symbol: &str) -> String {
    format!("{}{EXCHANGE_SEPARATOR}{}", exchange.trim(), symbol.trim()).to_uppercase()
}

/// Normalized instrument key
pub fn normalize_key(instrument_key: &str) -> String {
    instrument_key.trim().to_uppercase()
}
