//! Shared fakes for instrument service tests

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use market_connector::LoadError;
use market_connector::instruments::DatasetProvider;

pub const HEADER: &str = "instrument_key,exchange_token,tradingsymbol,name,last_price,expiry,strike,tick_size,lot_size,instrument_type,option_type,exchange";

/// Render dataset rows in the remote column layout and gzip them
pub fn remote_dataset(rows: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for (key, symbol, name, exchange) in rows {
        csv.push_str(&format!("{key},0,{symbol},{name},0,,,0.05,1,EQUITY,,{exchange}\n"));
    }
    gzip(&csv)
}

pub fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).expect("compress");
    encoder.finish().expect("finish gzip")
}

/// Serves a queue of canned responses; the last one repeats
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<Vec<u8>, u16>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<Vec<u8>, u16>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetProvider for ScriptedProvider {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("provider lock");
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses.first().cloned().unwrap_or(Err(500))
        };
        next.map_err(|status| LoadError::Status { status })
    }
}
