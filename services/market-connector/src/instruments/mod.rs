//! Instrument symbol/key resolution
//!
//! The Upstox dataset is filtered into a flat CSV cache, indexed in both
//! directions and served from an immutable snapshot.

pub mod index;
pub mod provider;
pub mod service;
pub mod store;
pub mod types;

pub use index::{IndexStats, InstrumentIndex};
pub use provider::{DatasetProvider, UpstoxDatasetProvider, decode_dataset};
pub use service::{InstrumentService, LoadSource, ServiceStats};
pub use store::{CsvInstrumentStore, LocalStore, MemoryInstrumentStore};
pub use types::{Exchange, Instrument, InstrumentRecord, RefreshPolicy, is_complex_symbol};
