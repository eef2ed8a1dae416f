//! Write path: `put`, `delete`, and the internal `flush`.
//!
//! Every mutation is appended to the WAL before it touches the Memtable.
//! Once the Memtable's approximate size reaches the configured threshold it
//! is persisted to a new level-0 SST, the WAL is replaced, and the engine
//! may chain into a compaction if the SST list has grown past the trigger.
use anyhow::{ensure, Result};
use std::fs::OpenOptions;
use tracing::info;

use sstable::{SSTableReader, SSTableWriter};
use wal::WalWriter;

use crate::{State, MAX_VALUE_SIZE, TOMBSTONE};

impl State {
    /// Inserts a key-value pair.
    pub(crate) fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        ensure!(
            value.len() <= MAX_VALUE_SIZE,
            "value too large: {} bytes (max {})",
            value.len(),
            MAX_VALUE_SIZE
        );

        // Durability first: the write is not acknowledged until it is on
        // disk in the WAL.
        self.wal_writer.append(&key, &value)?;
        self.mem.put(key, value);

        if self.mem.size() >= self.memtable_size_threshold {
            self.flush()?;
        }

        Ok(())
    }

    /// Deletes a key by writing the tombstone sentinel.
    pub(crate) fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.put(key.to_vec(), TOMBSTONE.to_vec())
    }

    /// Flushes the Memtable to a new level-0 SST, replaces the WAL, and
    /// chains into a compaction if the SST count has crossed the trigger.
    ///
    /// No-op if the Memtable is empty.
    pub(crate) fn flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }

        let sequence = self.next_sequence;
        let sst_path = self.sst_dir.join(format!("sst_{sequence}.sst"));
        let entries: Vec<(Vec<u8>, Vec<u8>)> = self
            .mem
            .iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        let count = entries.len();

        SSTableWriter::create(&sst_path, 0, sequence, count, entries.into_iter())?;
        self.next_sequence += 1;

        // Only once the SST is durably on disk do we drop the WAL and the
        // Memtable it was backing.
        let _ = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.wal_path)?;
        self.wal_writer = WalWriter::create(&self.wal_path, self.wal_sync)?;
        self.mem.clear();

        let reader = SSTableReader::open(&sst_path)?;
        self.ssts.push(reader);

        info!(sequence, entries = count, "flushed memtable to sstable");

        if self.l0_compaction_trigger > 0 && self.ssts.len() > self.l0_compaction_trigger {
            self.run_compaction()?;
        }

        Ok(())
    }
}
