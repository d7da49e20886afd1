//! Upstox market connector
//!
//! Resolves trading symbols to Upstox instrument keys and back through a
//! locally cached instrument dataset, fetches last traded prices and exposes
//! both through a small set of named tools.
//!
//! ```no_run
//! use std::sync::Arc;
//! use market_connector::{InstrumentService, MarketConnectorConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MarketConnectorConfig::from_env();
//! let service = Arc::new(InstrumentService::from_config(&config)?);
//! service.ensure_loaded().await?;
//!
//! let hdfc = service.resolve_by_symbol("HDFCBANK", Some("NSE_EQ"))?;
//! assert_eq!(hdfc.trading_symbol, "NSE_EQ|HDFCBANK");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod instruments;
pub mod quotes;
pub mod tools;

pub use config::MarketConnectorConfig;
pub use error::{InstrumentError, LoadError, QuoteError, UnknownExchange};
pub use instruments::{
    Exchange, Instrument, InstrumentIndex, InstrumentRecord, InstrumentService, RefreshPolicy,
};
pub use quotes::{QuoteData, QuoteService};
pub use tools::{ToolError, Toolbox};
