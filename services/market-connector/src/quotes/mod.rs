//! Market quotes

pub mod client;
pub mod types;

pub use client::{QuoteResults, QuoteService};
pub use types::{QuoteData, UNKNOWN_API_ERROR, api_error_message};
