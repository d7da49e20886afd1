//! Instrument service: owns the live index and its load/refresh lifecycle
//!
//! Lookups read an immutable snapshot without locking. Loads and refreshes
//! are serialized, build the replacement index off to the side and publish it
//! with a single pointer swap.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::index::{IndexStats, InstrumentIndex};
use super::provider::{DatasetProvider, UpstoxDatasetProvider, decode_dataset};
use super::store::{CsvInstrumentStore, LocalStore};
use super::types::{Instrument, InstrumentRecord, RefreshPolicy};
use crate::config::MarketConnectorConfig;
use crate::error::{InstrumentError, LoadError};

/// Where the live index was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    /// Local cache file
    LocalCache,
    /// Remote dataset download
    Remote,
}

/// Snapshot of service state for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// An index is live
    pub loaded: bool,
    /// Instruments in the live index
    pub instruments: usize,
    /// Counters from the last build
    pub index: Option<IndexStats>,
    /// When the live index was published
    pub loaded_at: Option<DateTime<Utc>>,
    /// Where the live index came from
    pub source: Option<LoadSource>,
}

struct LiveIndex {
    index: Arc<InstrumentIndex>,
    loaded_at: DateTime<Utc>,
    source: LoadSource,
}

/// Bidirectional symbol/key resolution backed by a cached dataset
pub struct InstrumentService {
    provider: Arc<dyn DatasetProvider>,
    store: Arc<dyn LocalStore>,
    policy: RefreshPolicy,
    default_exchange: String,
    live: ArcSwapOption<LiveIndex>,
    load_lock: Mutex<()>,
}

impl std::fmt::Debug for InstrumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentService")
            .field("policy", &self.policy)
            .field("default_exchange", &self.default_exchange)
            .field("loaded", &self.live.load().is_some())
            .finish_non_exhaustive()
    }
}

impl InstrumentService {
    /// Create a service over explicit collaborators. Nothing is loaded until
    /// [`ensure_loaded`](Self::ensure_loaded) or [`refresh`](Self::refresh).
    pub fn new(
        provider: Arc<dyn DatasetProvider>,
        store: Arc<dyn LocalStore>,
        policy: RefreshPolicy,
        default_exchange: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            policy,
            default_exchange: default_exchange.into().trim().to_uppercase(),
            live: ArcSwapOption::empty(),
            load_lock: Mutex::new(()),
        }
    }

    /// Create a service using the Upstox dataset and a CSV cache file
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn from_config(config: &MarketConnectorConfig) -> Result<Self, LoadError> {
        let provider = UpstoxDatasetProvider::new(&config.instruments_url, config.fetch_timeout)?;
        let store = CsvInstrumentStore::new(&config.instruments_file);

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(store),
            config.refresh_policy,
            &config.default_exchange,
        ))
    }

    /// Exchange used when a lookup names none
    pub fn default_exchange(&self) -> &str {
        &self.default_exchange
    }

    /// Load the index if no index is live yet.
    ///
    /// Uses the local cache unless it is missing or stale under the refresh
    /// policy; otherwise downloads the dataset and rewrites the cache.
    ///
    /// # Errors
    /// Returns [`InstrumentError::Load`] if the cache is unreadable, or the
    /// download fails or yields no indexable rows. Nothing is installed.
    pub async fn ensure_loaded(&self) -> Result<Arc<InstrumentIndex>, InstrumentError> {
        if let Some(live) = self.live.load_full() {
            return Ok(Arc::clone(&live.index));
        }

        let _guard = self.load_lock.lock().await;
        if let Some(live) = self.live.load_full() {
            return Ok(Arc::clone(&live.index));
        }

        let index = match self.load_local().await? {
            Some(index) => self.publish(index, LoadSource::LocalCache),
            None => {
                let index = self.load_remote().await?;
                self.publish(index, LoadSource::Remote)
            }
        };
        Ok(index)
    }

    /// Re-download the dataset, rewrite the cache and swap in a new index.
    ///
    /// On failure the previous index stays live.
    ///
    /// # Errors
    /// Returns [`InstrumentError::Load`] on fetch, decode or persist failure
    pub async fn refresh(&self) -> Result<Arc<InstrumentIndex>, InstrumentError> {
        let _guard = self.load_lock.lock().await;
        info!("Refreshing instrument index");

        match self.load_remote().await {
            Ok(index) => Ok(self.publish(index, LoadSource::Remote)),
            Err(e) => {
                if self.live.load().is_some() {
                    warn!("Instrument refresh failed, keeping previous index: {}", e);
                }
                Err(e.into())
            }
        }
    }

    /// Current index
    ///
    /// # Errors
    /// Returns [`InstrumentError::NotReady`] before the first successful load
    pub fn snapshot(&self) -> Result<Arc<InstrumentIndex>, InstrumentError> {
        self.live
            .load_full()
            .map(|live| Arc::clone(&live.index))
            .ok_or(InstrumentError::NotReady)
    }

    /// Resolve a symbol on `exchange`, or on the default exchange
    ///
    /// # Errors
    /// Returns `SymbolNotFound` or `NotReady`
    pub fn resolve_by_symbol(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> Result<Instrument, InstrumentError> {
        self.snapshot()?
            .resolve_by_symbol(symbol, exchange.unwrap_or(self.default_exchange.as_str()))
    }

    /// Resolve symbols in order against one snapshot; fail-fast
    ///
    /// # Errors
    /// Returns the first `SymbolNotFound`, or `NotReady`
    pub fn resolve_by_symbols<S: AsRef<str>>(
        &self,
        symbols: &[S],
        exchange: Option<&str>,
    ) -> Result<Vec<Instrument>, InstrumentError> {
        self.snapshot()?
            .resolve_by_symbols(symbols, exchange.unwrap_or(self.default_exchange.as_str()))
    }

    /// Resolve an instrument key
    ///
    /// # Errors
    /// Returns `KeyNotFound` or `NotReady`
    pub fn resolve_by_key(&self, instrument_key: &str) -> Result<Instrument, InstrumentError> {
        self.snapshot()?.resolve_by_key(instrument_key)
    }

    /// Resolve keys in order against one snapshot; fail-fast
    ///
    /// # Errors
    /// Returns the first `KeyNotFound`, or `NotReady`
    pub fn resolve_by_keys<S: AsRef<str>>(
        &self,
        instrument_keys: &[S],
    ) -> Result<Vec<Instrument>, InstrumentError> {
        self.snapshot()?.resolve_by_keys(instrument_keys)
    }

    /// Service diagnostics
    pub fn stats(&self) -> ServiceStats {
        match self.live.load_full() {
            Some(live) => ServiceStats {
                loaded: true,
                instruments: live.index.len(),
                index: Some(live.index.stats()),
                loaded_at: Some(live.loaded_at),
                source: Some(live.source),
            },
            None => ServiceStats {
                loaded: false,
                instruments: 0,
                index: None,
                loaded_at: None,
                source: None,
            },
        }
    }

    /// Refresh periodically under a max-age policy.
    ///
    /// Returns `None` for manual policies. The task stops once the service
    /// is dropped.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let RefreshPolicy::MaxAge(period) = self.policy else {
            return None;
        };
        if period.is_zero() {
            return None;
        }

        let service: Weak<Self> = Arc::downgrade(self);
        info!("Scheduling instrument refresh every {:?}", period);

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    debug!("Instrument service dropped, stopping refresh task");
                    break;
                };

                match service.refresh().await {
                    Ok(index) => info!("Scheduled refresh indexed {} instruments", index.len()),
                    Err(e) => error!("Scheduled instrument refresh failed: {}", e),
                }
            }
        }))
    }

    async fn load_local(&self) -> Result<Option<InstrumentIndex>, LoadError> {
        if !self.store.exists() {
            info!("No local instrument cache, fetching dataset");
            return Ok(None);
        }
        if self.policy.is_stale(self.store.age()) {
            info!("Local instrument cache is stale, fetching dataset");
            return Ok(None);
        }

        let store = Arc::clone(&self.store);
        let index = run_blocking(move || {
            let rows = require_rows(store.read_rows()?)?;
            Ok(InstrumentIndex::build(rows))
        })
        .await?;
        Ok(Some(index))
    }

    async fn load_remote(&self) -> Result<InstrumentIndex, LoadError> {
        let payload = self.provider.fetch().await?;

        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let rows = require_rows(decode_dataset(&payload)?)?;
            store.write_rows(&rows)?;
            Ok(InstrumentIndex::build(rows))
        })
        .await
    }

    fn publish(&self, index: InstrumentIndex, source: LoadSource) -> Arc<InstrumentIndex> {
        let index = Arc::new(index);
        let stats = index.stats();
        info!(
            "Instrument index live: {} instruments ({} rows, {} malformed, {} complex, {} displaced)",
            stats.indexed, stats.rows_seen, stats.malformed, stats.complex, stats.displaced
        );

        self.live.store(Some(Arc::new(LiveIndex {
            index: Arc::clone(&index),
            loaded_at: Utc::now(),
            source,
        })));
        index
    }
}

fn require_rows(rows: Vec<InstrumentRecord>) -> Result<Vec<InstrumentRecord>, LoadError> {
    if rows.iter().any(InstrumentRecord::is_indexable) {
        Ok(rows)
    } else {
        Err(LoadError::Empty)
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, LoadError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, LoadError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LoadError::Io(std::io::Error::other(format!("index build task failed: {e}"))))?
}
