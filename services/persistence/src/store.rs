//! Trade store contract and the journal backed implementation

use crate::journal::{JournalConfig, JournalError, JournalWriter};
use crate::reader::{CorruptionRecord, JournalReader, ReaderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;
use types::sample::ProcessedSample;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),
}

/// One row of trade history: `(time, symbol, price)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub price: f64,
    /// Unix epoch milliseconds
    pub time: i64,
}

impl From<&ProcessedSample> for TradeRecord {
    fn from(sample: &ProcessedSample) -> Self {
        Self {
            symbol: sample.symbol.clone(),
            price: sample.price,
            time: sample.time,
        }
    }
}

/// Aggregate over a time window. All zero when the window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub average: f64,
    pub high: f64,
    pub low: f64,
    pub count: u64,
}

impl WindowStats {
    fn from_prices(prices: impl Iterator<Item = f64>) -> Self {
        let mut stats = WindowStats::default();
        let mut sum = 0.0;
        for price in prices {
            if stats.count == 0 {
                stats.high = price;
                stats.low = price;
            } else {
                stats.high = stats.high.max(price);
                stats.low = stats.low.min(price);
            }
            sum += price;
            stats.count += 1;
        }
        if stats.count > 0 {
            stats.average = sum / stats.count as f64;
        }
        stats
    }
}

/// Append-only time-ordered trade history.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn append(&self, record: TradeRecord) -> Result<(), StoreError>;

    /// Up to `limit` records for `symbol`, newest first.
    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<TradeRecord>, StoreError>;

    /// Average/high/low of `symbol` prices with `time > since_ms`.
    async fn window_stats(&self, symbol: &str, since_ms: i64) -> Result<WindowStats, StoreError>;
}

/// `TradeStore` over an on-disk journal directory.
///
/// Appends are serialized through one writer; reads scan the files without
/// taking the writer lock and treat a half-written tail as absent.
pub struct JournalStore {
    dir: PathBuf,
    writer: Arc<Mutex<JournalWriter>>,
}

impl JournalStore {
    pub fn open(config: JournalConfig) -> Result<Self, StoreError> {
        let dir = config.dir.clone();
        let writer = JournalWriter::open(config)?;
        Ok(Self {
            dir,
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl TradeStore for JournalStore {
    async fn append(&self, record: TradeRecord) -> Result<(), StoreError> {
        let writer = Arc::clone(&self.writer);
        run_blocking(move || {
            let mut writer = writer
                .lock()
                .map_err(|_| StoreError::Unavailable("journal writer lock poisoned".into()))?;
            writer.append(record)?;
            Ok(())
        })
        .await
    }

    async fn recent(&self, symbol: &str, limit: usize) -> Result<Vec<TradeRecord>, StoreError> {
        let dir = self.dir.clone();
        let symbol = symbol.to_string();
        run_blocking(move || recent_blocking(&dir, &symbol, limit)).await
    }

    async fn window_stats(&self, symbol: &str, since_ms: i64) -> Result<WindowStats, StoreError> {
        let dir = self.dir.clone();
        let symbol = symbol.to_string();
        run_blocking(move || {
            let (entries, corruption) = JournalReader::open(&dir)?.read_all()?;
            log_corruption(&corruption);
            Ok(WindowStats::from_prices(
                entries
                    .into_iter()
                    .map(|e| e.record)
                    .filter(|r| r.symbol == symbol && r.time > since_ms)
                    .map(|r| r.price),
            ))
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Unavailable(format!("storage task failed: {e}")))?
}

/// Records are appended in arrival order, which the hub keeps equal to
/// sample order, so reverse file order is newest first.
fn recent_blocking(dir: &Path, symbol: &str, limit: usize) -> Result<Vec<TradeRecord>, StoreError> {
    let mut out = Vec::with_capacity(limit.min(1024));
    if limit == 0 {
        return Ok(out);
    }

    JournalReader::open(dir)?.scan_newest_first(|scan| {
        log_corruption(&scan.corruption);
        for entry in scan.entries.into_iter().rev() {
            if entry.record.symbol == symbol {
                out.push(entry.record);
                if out.len() >= limit {
                    return false;
                }
            }
        }
        true
    })?;

    Ok(out)
}

fn log_corruption(records: &[CorruptionRecord]) {
    for record in records {
        warn!(
            file = %record.file.display(),
            offset = record.byte_offset,
            kind = ?record.kind,
            detail = %record.detail,
            "Skipping corrupt journal region"
        );
    }
}
