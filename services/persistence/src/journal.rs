//! Journal writer: append-only trade journal with checksums
//!
//! # Binary Format (per entry)
//! ```text
//! [body_len:   u32]
//! [time:       i64]   // epoch millis of the sample
//! [symbol_len: u16][symbol: bytes]
//! [price:      f64]
//! [checksum:   u32]   // CRC32C over time+symbol+price
//! ```
//! All integers little-endian. Files are named `trades-NNNNNN.log` and
//! rotate once they reach `max_file_size`. A partial entry left at the end
//! of the newest file by a crash is cut off when the writer reopens it.

use crate::store::TradeRecord;
use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Fixed part of an entry body: time + symbol_len + price + checksum.
const FIXED_BODY_LEN: usize = 8 + 2 + 8 + 4;

/// Bodies above this size can only come from corruption.
const MAX_BODY_LEN: usize = FIXED_BODY_LEN + u16::MAX as usize;

pub(crate) const FILE_PREFIX: &str = "trades-";
pub(crate) const FILE_SUFFIX: &str = ".log";

// ── Journal Entry ───────────────────────────────────────────────────

/// One persisted trade record plus its checksum.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub record: TradeRecord,
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the CRC32C checksum automatically.
    pub fn new(record: TradeRecord) -> Self {
        let checksum = Self::compute_checksum(&record);
        Self { record, checksum }
    }

    pub fn compute_checksum(record: &TradeRecord) -> u32 {
        let mut buf = Vec::with_capacity(16 + record.symbol.len());
        buf.extend_from_slice(&record.time.to_le_bytes());
        buf.extend_from_slice(record.symbol.as_bytes());
        buf.extend_from_slice(&record.price.to_le_bytes());
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(&self.record)
    }

    /// Serialize entry to the binary wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JournalError> {
        let symbol = self.record.symbol.as_bytes();
        let symbol_len = u16::try_from(symbol.len()).map_err(|_| {
            JournalError::Serialization(format!("symbol too long: {} bytes", symbol.len()))
        })?;

        let body_len = (FIXED_BODY_LEN + symbol.len()) as u32;
        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.record.time.to_le_bytes());
        buf.extend_from_slice(&symbol_len.to_le_bytes());
        buf.extend_from_slice(symbol);
        buf.extend_from_slice(&self.record.price.to_le_bytes());
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        Ok(buf)
    }

    /// Deserialize entry from the binary wire format.
    ///
    /// Returns `(entry, bytes_consumed)`. The checksum is not verified here.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        let body_len = read_u32(data, 0)
            .ok_or_else(|| JournalError::Serialization("Not enough data for length prefix".into()))?
            as usize;

        if !(FIXED_BODY_LEN..=MAX_BODY_LEN).contains(&body_len) {
            return Err(JournalError::Serialization(format!(
                "Implausible body length: {} (likely corruption)",
                body_len
            )));
        }

        let total = 4 + body_len;
        if data.len() < total {
            return Err(JournalError::Serialization(format!(
                "Incomplete entry: need {} bytes, have {}",
                total,
                data.len()
            )));
        }

        let body = &data[4..total];
        let time = read_i64(body, 0).ok_or_else(|| truncated("time"))?;
        let symbol_len = read_u16(body, 8).ok_or_else(|| truncated("symbol length"))? as usize;

        if FIXED_BODY_LEN + symbol_len != body_len {
            return Err(JournalError::Serialization(format!(
                "symbol_len {} inconsistent with body_len {}",
                symbol_len, body_len
            )));
        }

        let symbol_end = 10 + symbol_len;
        let symbol = String::from_utf8(body[10..symbol_end].to_vec())
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        let price = read_f64(body, symbol_end).ok_or_else(|| truncated("price"))?;
        let checksum = read_u32(body, symbol_end + 8).ok_or_else(|| truncated("checksum"))?;

        let entry = Self {
            record: TradeRecord {
                symbol,
                price,
                time,
            },
            checksum,
        };
        Ok((entry, total))
    }
}

fn truncated(field: &str) -> JournalError {
    JournalError::Serialization(format!("Not enough data for {}", field))
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2)?.try_into().ok().map(u16::from_le_bytes)
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)?.try_into().ok().map(u32::from_le_bytes)
}

fn read_i64(data: &[u8], at: usize) -> Option<i64> {
    data.get(at..at + 8)?.try_into().ok().map(i64::from_le_bytes)
}

fn read_f64(data: &[u8], at: usize) -> Option<f64> {
    data.get(at..at + 8)?.try_into().ok().map(f64::from_le_bytes)
}

// ── Fsync Policy ────────────────────────────────────────────────────

/// Controls when `fsync` (durable write) is called. Buffered data is always
/// flushed to the OS after each append so readers see it immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    EveryWrite,
    EveryN(usize),
    OnRotation,
}

// ── Journal Writer Configuration ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory for journal files.
    pub dir: PathBuf,
    /// Maximum file size in bytes before rotation (default 64 MiB).
    pub max_file_size: u64,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024,
            fsync_policy: FsyncPolicy::EveryN(64),
        }
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    writes_since_fsync: usize,
    file_index: u64,
}

impl JournalWriter {
    /// Open a journal writer, creating the directory if needed. Appends to
    /// the newest existing file after cutting off any partial entry at its end.
    pub fn open(config: JournalConfig) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = find_latest_index(&config.dir);
        let current_file = journal_path(&config.dir, file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;

        let mut current_file_size = file.metadata()?.len();
        let framed = framed_prefix_len(&current_file)?;
        if framed < current_file_size {
            warn!(
                file = %current_file.display(),
                kept = framed,
                dropped = current_file_size - framed,
                "Truncating torn journal tail"
            );
            file.set_len(framed)?;
            file.sync_all()?;
            current_file_size = framed;
        }

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size,
            writes_since_fsync: 0,
            file_index,
        })
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    /// Append one record.
    pub fn append(&mut self, record: TradeRecord) -> Result<JournalEntry, JournalError> {
        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let entry = JournalEntry::new(record);
        let bytes = entry.to_bytes()?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        self.current_file_size += bytes.len() as u64;
        self.writes_since_fsync += 1;
        self.apply_fsync_policy()?;

        Ok(entry)
    }

    /// Force flush + fsync (used before shutdown / rotation).
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_fsync = 0;
        Ok(())
    }

    fn apply_fsync_policy(&mut self) -> Result<(), JournalError> {
        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::OnRotation => false,
        };
        if should_fsync {
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;

        self.file_index += 1;
        self.current_file = journal_path(&self.config.dir, self.file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;

        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        Ok(())
    }
}

pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{}{:06}{}", FILE_PREFIX, index, FILE_SUFFIX))
}

pub(crate) fn parse_file_index(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse::<u64>()
        .ok()
}

/// Length of the longest prefix of `path` made of whole entries. Entries
/// with a bad checksum still count, their framing is intact.
fn framed_prefix_len(path: &Path) -> Result<u64, JournalError> {
    let data = fs::read(path)?;
    let mut pos = 0usize;
    while pos < data.len() {
        match JournalEntry::from_bytes(&data[pos..]) {
            Ok((_, consumed)) => pos += consumed,
            Err(_) => break,
        }
    }
    Ok(pos as u64)
}

fn find_latest_index(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .ok()
        .and_then(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| parse_file_index(&e.file_name().to_string_lossy()))
                .max()
        })
        .unwrap_or(0)
}
