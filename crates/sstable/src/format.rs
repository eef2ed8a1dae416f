//! On-disk layout constants and the JSON metadata header.
//!
//! ```text
//!  offset 0                  header (HEADER_SIZE bytes)
//!    bytes  0..3   magic = 'LSMT'
//!    bytes  4..7   version: u32-BE = 1
//!    bytes  8..    JSON metadata, NUL-padded to HEADER_SIZE
//!  HEADER_SIZE              data section: concatenated records
//!    record = key_len: u32-BE | key | val_len: u32-BE | val
//!  index_offset             sparse index: lines of "key\toffset\tsize\n"
//!  bloom_offset             bloom: m: u32-BE | k: u32-BE | packed_bits
//!  EOF
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed header size reserved for magic, version, and JSON metadata.
pub const HEADER_SIZE: u64 = 4096;
/// File magic identifying this format.
pub const MAGIC: &[u8; 4] = b"LSMT";
/// Current format version.
pub const VERSION: u32 = 1;
/// Sparse index stride: every Nth record gets an index entry.
pub const INDEX_INTERVAL: usize = 128;

/// The JSON header embedded in every SSTable file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub level: u32,
    pub sequence: u64,
    pub data_size: u64,
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub index_offset: u64,
    pub bloom_offset: u64,
}

/// Errors that can occur while creating or loading an SSTable.
#[derive(Debug, Error)]
pub enum SstError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported version: {0}")]
    BadVersion(u32),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("refusing to write an empty sstable")]
    Empty,

    #[error("malformed sparse index")]
    BadIndex,
}
