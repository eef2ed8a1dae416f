//! Cold-start recovery: load existing SSTs and replay the WAL.
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use memtable::Memtable;
use sstable::SSTableReader;
use wal::WalWriter;

use crate::{Engine, State, WAL_FILENAME, WAL_SUBDIR, SST_SUBDIR, L0_COMPACTION_TRIGGER};

impl Engine {
    /// Creates or recovers an engine rooted at `data_dir`.
    ///
    /// `data_dir/wal` and `data_dir/sstable` are created if missing.
    /// Existing SSTs are loaded in ascending sequence order, each keeping
    /// the level recorded in its own metadata header — recovery never
    /// assumes level 0 for a recovered table. The WAL is then replayed
    /// into a fresh Memtable; if the replayed Memtable already exceeds
    /// `memtable_size_threshold`, it is flushed immediately.
    pub fn open<P: AsRef<Path>>(data_dir: P, memtable_size_threshold: usize) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let wal_dir = data_dir.join(WAL_SUBDIR);
        let sst_dir = data_dir.join(SST_SUBDIR);
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&sst_dir)?;
        let wal_path = wal_dir.join(WAL_FILENAME);

        let (ssts, next_sequence) = Self::load_sstables(&sst_dir)?;

        let records = wal::recover(&wal_path)?;
        let mut mem = Memtable::new();
        for (key, value) in records {
            mem.put(key, value);
        }

        info!(
            sstables = ssts.len(),
            wal_records = mem.len(),
            "engine recovered"
        );

        let wal_sync = true;
        let wal_writer = WalWriter::create(&wal_path, wal_sync)?;

        let mut state = State {
            mem,
            ssts,
            wal_writer,
            wal_path,
            sst_dir,
            next_sequence,
            memtable_size_threshold,
            l0_compaction_trigger: L0_COMPACTION_TRIGGER,
            wal_sync,
        };

        if state.mem.size() >= state.memtable_size_threshold {
            state.flush()?;
        }

        Ok(Engine {
            inner: Mutex::new(state),
        })
    }

    /// Enumerates `sst_<sequence>.sst` files, loads each in ascending
    /// sequence order (skipping unreadable ones with a log), and returns
    /// the loaded readers alongside the next sequence number to assign.
    ///
    /// `next_sequence` is derived from every filename found, not just the
    /// ones that load successfully — a corrupt file still occupies its
    /// sequence number and must not be reissued on the next flush.
    fn load_sstables(sst_dir: &Path) -> Result<(Vec<SSTableReader>, u64)> {
        let mut found: Vec<(u64, PathBuf)> = fs::read_dir(sst_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                parse_sequence(name).map(|seq| (seq, path))
            })
            .collect();
        found.sort_by_key(|(seq, _)| *seq);

        let max_seq = found.iter().map(|(seq, _)| *seq).max();

        let mut ssts = Vec::with_capacity(found.len());
        for (_, path) in found {
            match SSTableReader::open(&path) {
                Ok(reader) => ssts.push(reader),
                Err(err) => {
                    warn!(?path, %err, "skipping unreadable sstable during recovery");
                }
            }
        }

        Ok((ssts, max_seq.map_or(0, |m| m + 1)))
    }
}

fn parse_sequence(filename: &str) -> Option<u64> {
    filename
        .strip_prefix("sst_")?
        .strip_suffix(".sst")?
        .parse()
        .ok()
}
