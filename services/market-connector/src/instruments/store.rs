//! Local persistence for the filtered instrument dataset
//!
//! The cache is a flat CSV file with header
//! `instrument_key,tradingsymbol,name,exchange`.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use super::types::{InstrumentRecord, check_header};
use crate::error::LoadError;

/// Storage for the filtered dataset between process runs
pub trait LocalStore: Send + Sync {
    /// Whether a cached dataset is present
    fn exists(&self) -> bool;

    /// Read every cached row
    fn read_rows(&self) -> Result<Vec<InstrumentRecord>, LoadError>;

    /// Replace the cached rows
    fn write_rows(&self, rows: &[InstrumentRecord]) -> Result<(), LoadError>;

    /// Time since the cached dataset was written, when known
    fn age(&self) -> Option<Duration> {
        None
    }
}

/// CSV file backed store
#[derive(Debug, Clone)]
pub struct CsvInstrumentStore {
    path: PathBuf,
}

impl CsvInstrumentStore {
    /// Create a store for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStore for CsvInstrumentStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_rows(&self) -> Result<Vec<InstrumentRecord>, LoadError> {
        let start = std::time::Instant::now();
        let mut reader = csv::Reader::from_path(&self.path)?;
        check_header(reader.headers()?)?;

        let rows = reader
            .deserialize::<InstrumentRecord>()
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Read {} instruments from {} in {:?}",
            rows.len(),
            self.path.display(),
            start.elapsed()
        );
        Ok(rows)
    }

    fn write_rows(&self, rows: &[InstrumentRecord]) -> Result<(), LoadError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Written next to the target and renamed so a crash never leaves a
        // truncated cache behind.
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(&tmp_path)?));
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        info!("Wrote {} instruments to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn age(&self) -> Option<Duration> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        debug!("{} is {:?} old", self.path.display(), age);
        Some(age)
    }
}

/// In-memory store, for tests and ephemeral processes
#[derive(Debug, Default)]
pub struct MemoryInstrumentStore {
    rows: RwLock<Option<Vec<InstrumentRecord>>>,
}

impl MemoryInstrumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds rows
    pub fn with_rows(rows: Vec<InstrumentRecord>) -> Self {
        Self {
            rows: RwLock::new(Some(rows)),
        }
    }

    /// Snapshot of the stored rows
    pub fn rows(&self) -> Option<Vec<InstrumentRecord>> {
        self.rows.read().ok().and_then(|rows| rows.clone())
    }
}

impl LocalStore for MemoryInstrumentStore {
    fn exists(&self) -> bool {
        self.rows.read().map(|rows| rows.is_some()).unwrap_or(false)
    }

    fn read_rows(&self) -> Result<Vec<InstrumentRecord>, LoadError> {
        self.rows()
            .ok_or_else(|| LoadError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))
    }

    fn write_rows(&self, rows: &[InstrumentRecord]) -> Result<(), LoadError> {
        let mut guard = self
            .rows
            .write()
            .map_err(|_| LoadError::Io(std::io::Error::other("instrument store lock poisoned")))?;
        *guard = Some(rows.to_vec());
        Ok(())
    }
}
