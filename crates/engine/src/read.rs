//! Read path: `get` and `range_scan`.
//!
//! Point lookups check the Memtable first, then SSTs from newest to oldest;
//! the first hit wins. Range scans merge every layer — oldest SST to
//! newest SST to Memtable — so that later writers overwrite earlier ones,
//! then drop tombstones before returning.
use anyhow::Result;
use std::collections::BTreeMap;

use keyorder::OrderedKey;

use crate::{State, TOMBSTONE};

impl State {
    /// Looks up a key. Returns `Ok(None)` if absent or tombstoned.
    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(v) = self.mem.get(key) {
            return Ok(if v == TOMBSTONE { None } else { Some(v.to_vec()) });
        }

        for sst in self.ssts.iter().rev() {
            if let Some(v) = sst.get(key)? {
                return Ok(if v.as_slice() == TOMBSTONE { None } else { Some(v) });
            }
        }

        Ok(None)
    }

    /// Returns all live `(key, value)` pairs with `lo <= key <= hi`.
    pub(crate) fn range_scan(&self, lo: &[u8], hi: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<OrderedKey, Vec<u8>> = BTreeMap::new();

        // Oldest SST to newest, then the Memtable, so each later source
        // overwrites anything a previous one contributed for the same key.
        for sst in &self.ssts {
            for (k, v) in sst.range_scan(lo, hi)? {
                merged.insert(OrderedKey(k), v);
            }
        }
        for (k, v) in self.mem.range_scan(lo, hi) {
            merged.insert(OrderedKey(k), v);
        }

        Ok(merged
            .into_iter()
            .filter(|(_, v)| v.as_slice() != TOMBSTONE)
            .map(|(k, v)| (k.0, v))
            .collect())
    }
}
