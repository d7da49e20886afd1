//! Last traded price client for the Upstox REST API

use std::collections::BTreeMap;

use auth::TokenStore;
use futures::future::join_all;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use super::types::{LtpResponse, QuoteData, api_error_message};
use crate::config::MarketConnectorConfig;
use crate::error::QuoteError;
use crate::instruments::Instrument;

const LTP_PATH: &str = "/v3/market-quote/ltp";
const JSON: &str = "application/json";

/// Per-symbol quote results of a batch request
pub type QuoteResults = BTreeMap<String, Result<QuoteData, QuoteError>>;

/// Fetches last traded prices with the stored access token
#[derive(Debug, Clone)]
pub struct QuoteService {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl QuoteService {
    /// Create a quote service
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(config: &MarketConnectorConfig, tokens: TokenStore) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.quote_timeout).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// Token store used for the `Authorization` header
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Fetch the last traded price of one instrument
    ///
    /// # Errors
    /// Returns a [`QuoteError`] naming the instrument's trading symbol
    pub async fn fetch_last_traded_price(
        &self,
        instrument: &Instrument,
    ) -> Result<QuoteData, QuoteError> {
        let symbol = instrument.trading_symbol.clone();
        let Some(token) = self.tokens.access_token().await else {
            return Err(QuoteError::MissingToken { symbol });
        };

        let url = format!("{}{LTP_PATH}", self.base_url);
        debug!("Requesting LTP for {} ({})", symbol, instrument.instrument_key);

        let response = self
            .client
            .get(&url)
            .query(&[("instrument_key", instrument.instrument_key.as_str())])
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| QuoteError::Transport {
                symbol: symbol.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| QuoteError::Transport {
            symbol: symbol.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let error = QuoteError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
                symbol,
            };
            warn!("{}", error);
            return Err(error);
        }

        let parsed: LtpResponse = serde_json::from_str(&body).map_err(|e| QuoteError::Decode {
            symbol: symbol.clone(),
            message: e.to_string(),
        })?;

        parsed.into_first().ok_or(QuoteError::NoData { symbol })
    }

    /// Fetch last traded prices concurrently.
    ///
    /// Every instrument gets an entry keyed by trading symbol; failures are
    /// recorded per entry and never abort the batch.
    pub async fn fetch_last_traded_prices(&self, instruments: &[Instrument]) -> QuoteResults {
        let results = join_all(
            instruments
                .iter()
                .map(|instrument| self.fetch_last_traded_price(instrument)),
        )
        .await;

        instruments
            .iter()
            .map(|instrument| instrument.trading_symbol.clone())
            .zip(results)
            .collect()
    }
}
