//! Compaction: merges every live SST into a single level-1 SST.
//!
//! Every key's newest value survives; tombstones are dropped once they
//! have nothing older left to shadow. The merged table is written
//! atomically, the SST list is replaced with it, and the old files are
//! closed and unlinked.
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;

use keyorder::OrderedKey;
use sstable::{SSTableReader, SSTableWriter};

use crate::{State, TOMBSTONE};

impl State {
    /// Flushes the Memtable if non-empty, then compacts if more than one
    /// SST exists. This is the public `Engine::compact` contract.
    pub(crate) fn compact(&mut self) -> Result<()> {
        self.flush()?;
        if self.ssts.len() > 1 {
            self.run_compaction()?;
        }
        Ok(())
    }

    /// Merges all SSTs into a single level-1 table.
    ///
    /// Reads every live SST oldest to newest, keeping each key's newest
    /// value (a later insert into the same map overwrites an earlier
    /// one). Entries whose retained value is the tombstone are dropped.
    /// If the surviving set is empty, the list is left untouched. A
    /// failure while writing the new SST also leaves the old list intact.
    pub(crate) fn run_compaction(&mut self) -> Result<()> {
        let mut merged: BTreeMap<OrderedKey, Vec<u8>> = BTreeMap::new();
        for sst in &self.ssts {
            for (key, value) in all_entries(sst)? {
                merged.insert(OrderedKey(key), value);
            }
        }

        let live: Vec<(Vec<u8>, Vec<u8>)> = merged
            .into_iter()
            .filter(|(_, v)| v.as_slice() != TOMBSTONE)
            .map(|(k, v)| (k.0, v))
            .collect();

        if live.is_empty() {
            return Ok(());
        }

        let sequence = self.next_sequence;
        let sst_path = self.sst_dir.join(format!("sst_{sequence}.sst"));
        let count = live.len();
        SSTableWriter::create(&sst_path, 1, sequence, count, live.into_iter())?;
        self.next_sequence += 1;

        let new_reader = SSTableReader::open(&sst_path)?;
        let old = std::mem::replace(&mut self.ssts, vec![new_reader]);
        for sst in old {
            let _ = sst.delete();
        }

        info!(sequence, live_entries = count, "compacted sstables");
        Ok(())
    }
}

/// Dumps every record in an SST by range-scanning its own full key span.
fn all_entries(sst: &SSTableReader) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    Ok(sst.range_scan(sst.min_key(), sst.max_key())?)
}
