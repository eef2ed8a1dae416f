//! # Engine - the LSM storage coordinator
//!
//! Ties [`memtable`], [`wal`], and [`sstable`] together into a single
//! embedded, ordered key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → Memtable put          │
//! │              |                                │
//! │              |  (size >= threshold?)          │
//! │              v                                │
//! │           flush() → new level-0 SST           │
//! │              |                                │
//! │              |  (SST count > L0_TRIGGER?)     │
//! │              v                                │
//! │           compaction → single level-1 SST     │
//! │                                               │
//! │ read.rs → Memtable → SSTs newest-first        │
//! │            (first hit wins, tombstone = absent)│
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                           |
//! |----------------|-----------------------------------------------------|
//! | [`lib.rs`]     | `Engine` struct, mutex, public API surface, `Drop`  |
//! | [`recovery`]   | `Engine::open`: SST load, WAL replay                |
//! | [`write`]      | `put`, `delete`, internal `flush`                   |
//! | [`read`]       | `get`, `range_scan`                                 |
//! | [`compaction`] | `compact`, the newest-value-wins merge              |
//!
//! ## SST list
//!
//! There is a single ordered list of SSTs (oldest to newest by sequence).
//! Flush appends a level-0 table to the end; compaction replaces the whole
//! list with one level-1 table. Each table's level comes from its own
//! persisted metadata, never from its position in the list.
//!
//! ## Crash safety
//!
//! Every write is appended to the WAL before the Memtable update. The WAL
//! is only replaced after a flush has durably written its SST. SSTs are
//! written atomically via temp file + rename.
mod compaction;
mod read;
mod recovery;
mod write;

use anyhow::Result;
use memtable::Memtable;
use sstable::SSTableReader;
use std::path::PathBuf;
use std::sync::Mutex;
use wal::WalWriter;

/// Maximum allowed value size in bytes (10 MiB).
pub const MAX_VALUE_SIZE: usize = 10 * 1024 * 1024;

/// The sentinel value denoting a deleted key. Preserved verbatim through
/// the Memtable, WAL, and SST and translated to "absent" only here, at the
/// Engine's public API boundary.
pub const TOMBSTONE: &[u8] = b"\0";

/// Number of SSTs that triggers automatic compaction after a flush.
pub const L0_COMPACTION_TRIGGER: usize = 3;

const WAL_SUBDIR: &str = "wal";
const WAL_FILENAME: &str = "wal";
const SST_SUBDIR: &str = "sstable";

/// The engine's mutable state, guarded by [`Engine`]'s single mutex.
pub(crate) struct State {
    mem: Memtable,
    /// All live SSTs, ordered oldest to newest by sequence number.
    ssts: Vec<SSTableReader>,
    wal_writer: WalWriter,
    wal_path: PathBuf,
    sst_dir: PathBuf,

    /// Next sequence number to assign to a newly written SST.
    next_sequence: u64,

    /// Memtable byte-size threshold that triggers a flush to SST.
    memtable_size_threshold: usize,

    /// Number of SSTs that triggers automatic compaction after a flush.
    /// `0` disables auto-compaction.
    l0_compaction_trigger: usize,

    /// If `true`, every WAL append is followed by `fsync`.
    wal_sync: bool,
}

/// The central storage engine: one Memtable, one WAL, one ordered list of
/// SSTs, all guarded by a single mutex so every public operation is
/// serialized and linearizable.
///
/// # Write path
///
/// 1. Append the record to the WAL (durability before anything else).
/// 2. Apply it to the Memtable.
/// 3. If the Memtable's size reaches the threshold, flush it to a new SST.
///
/// # Read path
///
/// 1. Check the Memtable.
/// 2. Check SSTs newest to oldest.
/// 3. First hit wins; a tombstone hit means "absent".
///
/// # Recovery
///
/// [`Engine::open`] loads existing SSTs from `data_dir/sstable`, then
/// replays `data_dir/wal/wal` into a fresh Memtable.
pub struct Engine {
    inner: Mutex<State>,
}

impl Engine {
    /// Inserts a key-value pair.
    ///
    /// Appended to the WAL first, then applied to the Memtable. May trigger
    /// a flush (and, in turn, a compaction) once the Memtable has grown
    /// past its configured threshold.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.lock().put(key, value)
    }

    /// Looks up a key, returning its value if present and live.
    ///
    /// A tombstone anywhere in the layer stack resolves to `Ok(None)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.lock().get(key)
    }

    /// Deletes a key by writing a tombstone — equivalent to
    /// `put(key, TOMBSTONE)`.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.lock().delete(key)
    }

    /// Returns all live `(key, value)` pairs with `lo <= key <= hi`, in
    /// ascending key order. Both bounds are inclusive; tombstones are
    /// filtered out.
    pub fn range_scan(&self, lo: &[u8], hi: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.lock().range_scan(lo, hi)
    }

    /// Flushes the Memtable if non-empty, then compacts all SSTs into one
    /// if more than one exists.
    pub fn compact(&self) -> Result<()> {
        self.lock().compact()
    }

    /// Flushes, compacts down to one SST if needed, and releases every
    /// open file handle. Consumes the engine.
    pub fn close(self) -> Result<()> {
        let this = std::mem::ManuallyDrop::new(self);
        let inner = unsafe { std::ptr::read(&this.inner) };
        let mut state = inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.compact()?;
        for sst in state.ssts.drain(..) {
            sst.close();
        }
        state.wal_writer.close()?;
        Ok(())
    }

    /// Returns the number of live SSTs.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.lock().ssts.len()
    }

    /// Returns the next sequence number that will be assigned to a new SST.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }

    /// Returns the SST-count threshold that triggers automatic compaction.
    #[must_use]
    pub fn l0_compaction_trigger(&self) -> usize {
        self.lock().l0_compaction_trigger
    }

    /// Updates the auto-compaction trigger. `0` disables auto-compaction.
    pub fn set_l0_compaction_trigger(&self, trigger: usize) {
        self.lock().l0_compaction_trigger = trigger;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Engine")
            .field("next_sequence", &state.next_sequence)
            .field("memtable_size_threshold", &state.memtable_size_threshold)
            .field("memtable_entries", &state.mem.len())
            .field("memtable_size", &state.mem.size())
            .field("sstable_count", &state.ssts.len())
            .field("l0_compaction_trigger", &state.l0_compaction_trigger)
            .finish()
    }
}

/// Best-effort flush on drop.
///
/// If the Memtable still holds data when the `Engine` is dropped, it is
/// flushed so it is not lost. Errors are ignored: the data is already
/// durable in the WAL and will be recovered on the next `open`.
impl Drop for Engine {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.lock() {
            if !state.mem.is_empty() {
                let _ = state.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests;
