//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the storage engine.
//!
//! When the in-memory memtable exceeds its size threshold the engine
//! flushes it to disk as an SSTable. SSTables are *write-once, read-many*
//! — once created they are never modified, only replaced during
//! compaction.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER (fixed 4096 bytes)                                      │
//! │ magic "LSMT" | version: u32-BE = 1 | JSON metadata, NUL-padded  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ DATA SECTION (sorted key/value records)                        │
//! │ key_len: u32-BE | key | val_len: u32-BE | val                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SPARSE INDEX (every 128th record): "key\toffset\tsize\n"       │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOOM SECTION: m: u32-BE | k: u32-BE | packed bits              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no per-record checksum and no footer — every offset needed to
//! navigate the file is recorded in the JSON header, which is read once
//! on open.

mod format;
mod reader;
mod writer;

pub use format::{Metadata, SstError, HEADER_SIZE, INDEX_INTERVAL, MAGIC, VERSION};
pub use reader::SSTableReader;
pub use writer::SSTableWriter;

#[cfg(test)]
mod tests;
