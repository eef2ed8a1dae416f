//! # WAL — Write-Ahead Log
//!
//! Provides crash-safe durability for the storage engine.
//!
//! Every mutation is appended to the WAL **before** the corresponding
//! in-memory update. On restart the WAL is replayed to reconstruct the
//! memtable, guaranteeing that no acknowledged write is lost.
//!
//! ## Record Format
//!
//! ```text
//! [key_len: u32 BE][key][val_len: u32 BE][value]
//! ```
//!
//! There is no checksum and no per-record sequence number: the WAL only
//! has to recover "what was the last value written for each key", and a
//! truncated tail (a crash mid-write) is simply dropped rather than
//! treated as an error. A delete is written as a record whose value is
//! the tombstone byte `[0x00]`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::WalWriter;
//!
//! let mut w = WalWriter::create("wal.log", true).unwrap();
//! w.append(b"hello", b"world").unwrap();
//! drop(w);
//!
//! let records = wal::recover("wal.log").unwrap();
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use keyorder::compare;
use thiserror::Error;
use tracing::{trace, warn};

/// Maximum key size tolerated during replay before a record is treated as
/// corrupt and the remainder of the log is dropped.
const MAX_KEY_SIZE: usize = 1024 * 1024;
/// Maximum value size tolerated during replay, for the same reason.
const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A fully-read record had a length field past the tolerated cap.
    #[error("corrupt record")]
    Corrupt,
}

/// Append-only WAL writer.
///
/// Every record is written and flushed; when `sync` is `true`, every
/// append is followed by `sync_all()` (fsync) so the record is durable
/// on disk before the call returns.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync: bool,
    buf: Vec<u8>,
}

impl WalWriter {
    /// Opens (or creates) a WAL file in append mode.
    ///
    /// * `path` — file system path for the WAL (created if it does not exist).
    /// * `sync` — if true, every `append` call is followed by `fsync`.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            sync,
            buf: Vec::with_capacity(256),
        })
    }

    /// Appends a single `(key, value)` record, flushing (and, if `sync` is
    /// set, fsyncing) before returning.
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<(), WalError> {
        self.buf.clear();
        self.buf.write_u32::<BigEndian>(key.len() as u32)?;
        self.buf.extend_from_slice(key);
        self.buf.write_u32::<BigEndian>(value.len() as u32)?;
        self.buf.extend_from_slice(value);

        self.file.write_all(&self.buf)?;
        self.file.flush()?;

        if self.sync {
            self.file.sync_all()?;
        }

        trace!(key_len = key.len(), value_len = value.len(), "wal append");
        Ok(())
    }

    /// Forces all buffered data to be written to disk via `sync_all()`.
    pub fn sync_to_disk(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Closes the file handle. The WAL file itself is left on disk.
    pub fn close(self) -> Result<(), WalError> {
        drop(self);
        Ok(())
    }

    /// Closes and removes the WAL file, typically called right after a
    /// successful flush of the memtable it was backing.
    pub fn delete(self) -> Result<(), WalError> {
        let path = self.path.clone();
        drop(self);
        std::fs::remove_file(path)?;
        Ok(())
    }
}

/// Sequential WAL reader that yields raw `(key, value)` records in file
/// order, including duplicate keys and tombstones.
///
/// Generic over any `Read` implementor so it can run against a real file
/// or an in-memory buffer in tests.
pub struct WalReader<R: Read> {
    rdr: BufReader<R>,
}

impl WalReader<File> {
    /// Opens an existing WAL file for sequential replay.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WalReader<File>, WalError> {
        let f = File::open(path)?;
        Ok(WalReader {
            rdr: BufReader::new(f),
        })
    }
}

impl<R: Read> WalReader<R> {
    /// Constructs a reader from any `Read` implementor.
    pub fn from_reader(reader: R) -> Self {
        WalReader {
            rdr: BufReader::new(reader),
        }
    }

    /// Replays every well-formed record in the WAL, calling `apply` for
    /// each one in file order. A truncated or malformed tail is silently
    /// dropped rather than surfaced as an error.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<(), WalError>
    where
        F: FnMut(Vec<u8>, Vec<u8>),
    {
        loop {
            let key_len = match self.rdr.read_u32::<BigEndian>() {
                Ok(v) => v as usize,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(WalError::Io(e)),
            };
            if key_len > MAX_KEY_SIZE {
                warn!(key_len, "wal: oversized key length, discarding tail");
                return Ok(());
            }

            let mut key = vec![0u8; key_len];
            if let Err(e) = self.rdr.read_exact(&mut key) {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    warn!("wal: truncated tail (key), discarding");
                    return Ok(());
                }
                return Err(WalError::Io(e));
            }

            let val_len = match self.rdr.read_u32::<BigEndian>() {
                Ok(v) => v as usize,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!("wal: truncated tail (value length), discarding");
                    return Ok(());
                }
                Err(e) => return Err(WalError::Io(e)),
            };
            if val_len > MAX_VALUE_SIZE {
                warn!(val_len, "wal: oversized value length, discarding tail");
                return Ok(());
            }

            let mut value = vec![0u8; val_len];
            if let Err(e) = self.rdr.read_exact(&mut value) {
                if e.kind() == io::ErrorKind::UnexpectedEof {
                    warn!("wal: truncated tail (value), discarding");
                    return Ok(());
                }
                return Err(WalError::Io(e));
            }

            apply(key, value);
        }
    }
}

/// Opens `path` (a missing file behaves as an empty log) and returns the
/// most-recent `(key, value)` for every key seen, sorted in key order.
///
/// Later records shadow earlier ones for the same key, including
/// tombstones. A truncated or corrupt tail simply loses unwritten data,
/// per the WAL's recovery contract.
pub fn recover<P: AsRef<Path>>(path: P) -> Result<Vec<(Vec<u8>, Vec<u8>)>, WalError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = WalReader::open(path)?;
    let mut latest: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    reader.replay(|key, value| {
        match latest.binary_search_by(|(k, _)| compare(k, &key)) {
            Ok(idx) => latest[idx].1 = value,
            Err(idx) => latest.insert(idx, (key, value)),
        }
    })?;
    Ok(latest)
}
