//! Journal reader: checksum-validating reader with corruption detection
//!
//! Features:
//! - CRC32C validation on every entry
//! - Entries with a bad checksum but intact framing are skipped
//! - A truncated or garbled tail stops reading that file; the valid prefix
//!   is still returned
//! - Files are visited oldest first or newest first

use crate::journal::{parse_file_index, JournalEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Structured corruption log entry for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionRecord {
    pub file: PathBuf,
    /// Byte offset in the file where corruption was detected.
    pub byte_offset: u64,
    pub kind: CorruptionKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    ChecksumMismatch,
    TruncatedEntry,
}

/// Valid entries of one file plus whatever corruption was found in it.
#[derive(Debug, Default)]
pub struct FileScan {
    pub entries: Vec<JournalEntry>,
    pub corruption: Vec<CorruptionRecord>,
}

pub struct JournalReader {
    /// All journal file paths, sorted by index ascending.
    files: Vec<PathBuf>,
}

impl JournalReader {
    /// Open a reader over all journal files in `dir`. A missing directory
    /// reads as empty.
    pub fn open(dir: &Path) -> Result<Self, ReaderError> {
        Ok(Self {
            files: discover_files(dir)?,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Scan files newest first, handing each file's scan to `visit` until it
    /// returns `false`.
    pub fn scan_newest_first<F>(&self, mut visit: F) -> Result<(), ReaderError>
    where
        F: FnMut(FileScan) -> bool,
    {
        for path in self.files.iter().rev() {
            if !visit(scan_file(path)?) {
                break;
            }
        }
        Ok(())
    }

    /// Read every valid entry, oldest first.
    pub fn read_all(&self) -> Result<(Vec<JournalEntry>, Vec<CorruptionRecord>), ReaderError> {
        let mut entries = Vec::new();
        let mut corruption = Vec::new();
        for path in &self.files {
            let scan = scan_file(path)?;
            entries.extend(scan.entries);
            corruption.extend(scan.corruption);
        }
        Ok((entries, corruption))
    }
}

/// Scan a single journal file.
pub fn scan_file(path: &Path) -> Result<FileScan, ReaderError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        // Rotated away between discovery and read.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FileScan::default()),
        Err(e) => return Err(e.into()),
    };

    let mut scan = FileScan::default();
    let mut pos = 0usize;

    while pos < data.len() {
        match JournalEntry::from_bytes(&data[pos..]) {
            Ok((entry, consumed)) => {
                if entry.verify_checksum() {
                    scan.entries.push(entry);
                } else {
                    scan.corruption.push(CorruptionRecord {
                        file: path.to_path_buf(),
                        byte_offset: pos as u64,
                        kind: CorruptionKind::ChecksumMismatch,
                        detail: format!("CRC32C mismatch, stored={:#010x}", entry.checksum),
                    });
                }
                pos += consumed;
            }
            Err(err) => {
                scan.corruption.push(CorruptionRecord {
                    file: path.to_path_buf(),
                    byte_offset: pos as u64,
                    kind: CorruptionKind::TruncatedEntry,
                    detail: format!("{} bytes unreadable: {}", data.len() - pos, err),
                });
                break;
            }
        }
    }

    Ok(scan)
}

fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, ReaderError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let idx = parse_file_index(&e.file_name().to_string_lossy())?;
            Some((idx, e.path()))
        })
        .collect();

    files.sort_by_key(|(idx, _)| *idx);
    Ok(files.into_iter().map(|(_, p)| p).collect())
}
