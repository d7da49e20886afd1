//! Market quote payloads

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Fallback text when an error response carries no message
pub const UNKNOWN_API_ERROR: &str = "Unknown API error";

/// Last traded price snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteData {
    /// Instrument key echoed by the API
    pub instrument_token: String,
    /// Last traded price
    pub last_price: f64,
    /// Previous session close
    #[serde(rename(deserialize = "cp"))]
    pub previous_day_closing_price: f64,
    /// Last traded quantity
    #[serde(default)]
    pub ltq: u64,
    /// Volume traded in the session
    #[serde(default)]
    pub volume: u64,
}

/// Body of `GET /v3/market-quote/ltp`
#[derive(Debug, Deserialize)]
pub(crate) struct LtpResponse {
    #[serde(default)]
    pub data: Option<FxHashMap<String, QuoteData>>,
}

impl LtpResponse {
    /// First quote in the payload
    pub(crate) fn into_first(self) -> Option<QuoteData> {
        self.data.and_then(|data| data.into_values().next())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Error body; Upstox reports either a top-level `message` or an `errors` list
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

/// Extract a human readable message from an error response body
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .message
                .or_else(|| parsed.errors.into_iter().next().and_then(|e| e.message))
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string())
}
