//! Named operations exposed to the command-line front end
//!
//! Every operation answers with a JSON value.

use std::sync::Arc;

use auth::{AuthError, TokenStore};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::info;

use crate::config::MarketConnectorConfig;
use crate::error::{InstrumentError, LoadError};
use crate::instruments::InstrumentService;
use crate::quotes::QuoteService;

/// Greeting returned by [`Toolbox::hello_world`]
pub const HELLO_MESSAGE: &str = "Hello from upstox-connector!";

/// Tool failures
#[derive(Debug, Error)]
pub enum ToolError {
    /// Symbol or key resolution failed
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    /// Token could not be saved
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Instrument service could not be set up
    #[error("Failed to initialize instrument service")]
    Load(#[from] LoadError),

    /// HTTP client could not be built
    #[error("Failed to initialize HTTP client")]
    Http(#[from] reqwest::Error),

    /// Result could not be rendered as JSON
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Instrument, quote and token operations behind one handle
#[derive(Debug, Clone)]
pub struct Toolbox {
    instruments: Arc<InstrumentService>,
    quotes: QuoteService,
    tokens: TokenStore,
}

impl Toolbox {
    /// Assemble a toolbox from existing services
    pub fn new(instruments: Arc<InstrumentService>, quotes: QuoteService) -> Self {
        let tokens = quotes.tokens().clone();
        Self {
            instruments,
            quotes,
            tokens,
        }
    }

    /// Build every service from configuration
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be built
    pub fn from_config(config: &MarketConnectorConfig) -> Result<Self, ToolError> {
        let tokens = TokenStore::from_env(&config.env_file);
        let instruments = InstrumentService::from_config(config)?;
        let quotes = QuoteService::new(config, tokens)?;

        Ok(Self::new(Arc::new(instruments), quotes))
    }

    /// Shared instrument service
    pub fn instruments(&self) -> &Arc<InstrumentService> {
        &self.instruments
    }

    /// Liveness check
    pub fn hello_world(&self) -> Value {
        Value::String(HELLO_MESSAGE.to_string())
    }

    /// Save a new access token
    ///
    /// # Errors
    /// Returns an error for a blank token or an unwritable env file
    pub async fn refresh_token(&self, token: &str) -> Result<Value, ToolError> {
        let message = self.tokens.save(token).await?;
        Ok(Value::String(message.to_string()))
    }

    /// Resolve trading symbols to instruments, all or nothing
    ///
    /// # Errors
    /// Returns the first unresolved symbol, or a load failure
    pub async fn get_instrument(
        &self,
        symbols: &[String],
        exchange: Option<&str>,
    ) -> Result<Value, ToolError> {
        self.instruments.ensure_loaded().await?;
        let resolved = self.instruments.resolve_by_symbols(symbols, exchange)?;
        Ok(serde_json::to_value(resolved)?)
    }

    /// Resolve instrument keys to trading symbols, all or nothing
    ///
    /// # Errors
    /// Returns the first unresolved key, or a load failure
    pub async fn get_symbol(&self, instrument_keys: &[String]) -> Result<Value, ToolError> {
        self.instruments.ensure_loaded().await?;
        let resolved = self.instruments.resolve_by_keys(instrument_keys)?;
        Ok(serde_json::to_value(resolved)?)
    }

    /// Resolve symbols, then fetch a last traded price for each.
    ///
    /// Resolution is all or nothing; quote failures are reported per symbol
    /// as an error string.
    ///
    /// # Errors
    /// Returns the first unresolved symbol, or a load failure
    pub async fn get_last_traded_price(
        &self,
        symbols: &[String],
        exchange: Option<&str>,
    ) -> Result<Value, ToolError> {
        self.instruments.ensure_loaded().await?;
        let resolved = self.instruments.resolve_by_symbols(symbols, exchange)?;

        let mut out = Map::new();
        for (symbol, result) in self.quotes.fetch_last_traded_prices(&resolved).await {
            let entry = match result {
                Ok(quote) => serde_json::to_value(quote)?,
                Err(e) => Value::String(e.to_string()),
            };
            out.insert(symbol, entry);
        }
        Ok(Value::Object(out))
    }

    /// Re-download the instrument dataset and swap in a new index
    ///
    /// # Errors
    /// Returns a load failure; the previous index stays live
    pub async fn refresh_instruments(&self) -> Result<Value, ToolError> {
        let index = self.instruments.refresh().await?;
        info!("Instrument refresh complete: {} instruments", index.len());

        Ok(json!({
            "status": "refreshed",
            "stats": self.instruments.stats(),
        }))
    }
}
