//! Bidirectional symbol/key index
//!
//! Immutable once built. The service publishes whole snapshots, so readers
//! never see a half-built index.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::types::{
    EXCHANGE_SEPARATOR, Instrument, InstrumentRecord, normalize_key, symbol_key,
};
use crate::error::InstrumentError;

/// Stored side of a key entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listing {
    exchange: String,
    trading_symbol: String,
}

/// Counters from an index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Rows offered to the build
    pub rows_seen: usize,
    /// Rows with an empty key or symbol
    pub malformed: usize,
    /// Rows with a derivative-style symbol
    pub complex: usize,
    /// Earlier rows displaced by a later row with the same key or symbol
    pub displaced: usize,
    /// Instruments in the index
    pub indexed: usize,
}

/// Symbol ⇄ instrument key lookup tables
#[derive(Debug, Default)]
pub struct InstrumentIndex {
    /// Normalized instrument key -> listing
    by_key: FxHashMap<String, Listing>,
    /// `EXCHANGE|SYMBOL` -> normalized instrument key
    by_symbol: FxHashMap<String, String>,
    stats: IndexStats,
}

impl InstrumentIndex {
    /// Build an index from dataset rows.
    ///
    /// Malformed rows and complex symbols are skipped. When two rows share a
    /// key or an exchange+symbol, the later row wins and every entry it
    /// displaces is dropped from both tables.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = InstrumentRecord>,
    {
        let records = records.into_iter();
        let mut index = Self {
            by_key: FxHashMap::with_capacity_and_hasher(records.size_hint().0, Default::default()),
            by_symbol: FxHashMap::with_capacity_and_hasher(
                records.size_hint().0,
                Default::default(),
            ),
            stats: IndexStats::default(),
        };

        for record in records {
            index.stats.rows_seen += 1;

            if !record.is_well_formed() {
                index.stats.malformed += 1;
                continue;
            }
            if !record.is_indexable() {
                index.stats.complex += 1;
                continue;
            }

            index.insert(record);
        }

        index.stats.indexed = index.by_key.len();
        index
    }

    fn insert(&mut self, record: InstrumentRecord) {
        let key = normalize_key(&record.instrument_key);
        let listing = Listing {
            exchange: record.exchange.trim().to_string(),
            trading_symbol: record.tradingsymbol.trim().to_string(),
        };
        let composite = symbol_key(&listing.exchange, &listing.trading_symbol);

        if let Some(previous_key) = self.by_symbol.get(&composite) {
            if *previous_key != key {
                self.by_key.remove(previous_key);
                self.stats.displaced += 1;
            }
        }

        if let Some(previous) = self.by_key.get(&key) {
            let previous_composite = symbol_key(&previous.exchange, &previous.trading_symbol);
            if previous_composite != composite {
                self.by_symbol.remove(&previous_composite);
            }
            self.stats.displaced += 1;
        }

        self.by_symbol.insert(composite, key.clone());
        self.by_key.insert(key, listing);
    }

    /// Resolve a symbol on an exchange
    ///
    /// # Errors
    /// Returns [`InstrumentError::SymbolNotFound`] if the pair is not indexed
    pub fn resolve_by_symbol(&self, symbol: &str, exchange: &str) -> Result<Instrument, InstrumentError> {
        let composite = symbol_key(exchange, symbol);
        match self.by_symbol.get(&composite) {
            Some(key) => Ok(Instrument::new(composite, key.clone())),
            None => Err(InstrumentError::SymbolNotFound(composite)),
        }
    }

    /// Resolve an instrument key.
    ///
    /// The returned symbol carries the exchange prefix of the query key when
    /// the key has one (`NSE_EQ|INE040A01034` -> `NSE_EQ|HDFCBANK`).
    ///
    /// # Errors
    /// Returns [`InstrumentError::KeyNotFound`] if the key is not indexed
    pub fn resolve_by_key(&self, instrument_key: &str) -> Result<Instrument, InstrumentError> {
        let key = normalize_key(instrument_key);
        let Some(listing) = self.by_key.get(&key) else {
            return Err(InstrumentError::KeyNotFound(key));
        };

        let trading_symbol = match key.split_once(EXCHANGE_SEPARATOR) {
            Some((exchange, _)) => {
                format!("{exchange}{EXCHANGE_SEPARATOR}{}", listing.trading_symbol)
            }
            None => listing.trading_symbol.clone(),
        };

        Ok(Instrument::new(trading_symbol, key))
    }

    /// Resolve symbols in order; the first miss fails the whole batch
    ///
    /// # Errors
    /// Returns the first [`InstrumentError::SymbolNotFound`]
    pub fn resolve_by_symbols<S: AsRef<str>>(
        &self,
        symbols: &[S],
        exchange: &str,
    ) -> Result<Vec<Instrument>, InstrumentError> {
        symbols
            .iter()
            .map(|symbol| self.resolve_by_symbol(symbol.as_ref(), exchange))
            .collect()
    }

    /// Resolve keys in order; the first miss fails the whole batch
    ///
    /// # Errors
    /// Returns the first [`InstrumentError::KeyNotFound`]
    pub fn resolve_by_keys<S: AsRef<str>>(
        &self,
        instrument_keys: &[S],
    ) -> Result<Vec<Instrument>, InstrumentError> {
        instrument_keys
            .iter()
            .map(|key| self.resolve_by_key(key.as_ref()))
            .collect()
    }

    /// Whether an exchange-qualified symbol is indexed
    pub fn contains_symbol(&self, symbol: &str, exchange: &str) -> bool {
        self.by_symbol.contains_key(&symbol_key(exchange, symbol))
    }

    /// Whether an instrument key is indexed
    pub fn contains_key(&self, instrument_key: &str) -> bool {
        self.by_key.contains_key(&normalize_key(instrument_key))
    }

    /// Number of indexed instruments
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Build counters
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// All indexed instruments as `(exchange|symbol, key)` pairs
    pub fn instruments(&self) -> impl Iterator<Item = Instrument> + '_ {
        self.by_symbol
            .iter()
            .map(|(composite, key)| Instrument::new(composite.clone(), key.clone()))
    }

    /// Both tables describe the same set of instruments
    pub fn is_consistent(&self) -> bool {
        self.by_key.len() == self.by_symbol.len()
            && self.by_key.iter().all(|(key, listing)| {
                self.by_symbol
                    .get(&symbol_key(&listing.exchange, &listing.trading_symbol))
                    .is_some_and(|k| k == key)
            })
    }
}
