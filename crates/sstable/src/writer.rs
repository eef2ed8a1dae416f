use bloom::BloomFilter;
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::format::{Metadata, HEADER_SIZE, INDEX_INTERVAL, MAGIC, VERSION};
use crate::SstError;

/// Writes an immutable SSTable file from a key-ordered iterator of entries.
///
/// The write is crash-safe: data is written to a temporary file, fsynced,
/// and atomically renamed to the final path only once it is complete.
pub struct SSTableWriter;

impl SSTableWriter {
    /// Creates a new SSTable at `path`.
    ///
    /// `entries` must yield `(key, value)` pairs in ascending
    /// [`keyorder::compare`] order; the caller is responsible for
    /// deduplication. `expected_count` sizes the embedded bloom filter —
    /// over-estimating is safe, under-estimating only raises the
    /// false-positive rate.
    ///
    /// Returns [`SstError::Empty`] (and removes the partial file) if
    /// `entries` yields nothing.
    pub fn create<I>(
        path: &Path,
        level: u32,
        sequence: u64,
        expected_count: usize,
        entries: I,
    ) -> Result<(), SstError>
    where
        I: Iterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let tmp_path = path.with_extension("tmp");
        let raw_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut file = BufWriter::new(raw_file);

        // Reserve the header; filled in once the rest of the file is known.
        file.write_all(&[0u8; HEADER_SIZE as usize])?;

        let mut bloom = BloomFilter::new(expected_count.max(1));
        let mut index: Vec<(Vec<u8>, u64, u32)> = Vec::new();
        let mut min_key: Option<Vec<u8>> = None;
        let mut max_key: Option<Vec<u8>> = None;
        let mut count: usize = 0;

        for (key, value) in entries {
            let offset = file.stream_position()?;
            file.write_u32::<BigEndian>(key.len() as u32)?;
            file.write_all(&key)?;
            file.write_u32::<BigEndian>(value.len() as u32)?;
            file.write_all(&value)?;
            let record_size = (file.stream_position()? - offset) as u32;

            if count % INDEX_INTERVAL == 0 {
                index.push((key.clone(), offset, record_size));
            }

            bloom.insert(&key);
            if min_key.is_none() {
                min_key = Some(key.clone());
            }
            max_key = Some(key);
            count += 1;
        }

        if count == 0 {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(SstError::Empty);
        }

        let data_size = file.stream_position()? - HEADER_SIZE;

        let index_offset = file.stream_position()?;
        for (key, offset, size) in &index {
            let mut line = Vec::with_capacity(key.len() + 24);
            line.extend_from_slice(key);
            line.push(b'\t');
            line.extend_from_slice(offset.to_string().as_bytes());
            line.push(b'\t');
            line.extend_from_slice(size.to_string().as_bytes());
            line.push(b'\n');
            file.write_all(&line)?;
        }

        let bloom_offset = file.stream_position()?;
        bloom.write_to(&mut file)?;

        let metadata = Metadata {
            level,
            sequence,
            data_size,
            min_key: min_key.unwrap(),
            max_key: max_key.unwrap(),
            index_offset,
            bloom_offset,
        };
        let metadata_json = match serde_json::to_vec(&metadata) {
            Ok(v) => v,
            Err(e) => {
                drop(file);
                let _ = std::fs::remove_file(&tmp_path);
                return Err(SstError::Metadata(e));
            }
        };
        if metadata_json.len() > (HEADER_SIZE as usize - 8) {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(SstError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "sstable metadata exceeds header capacity",
            )));
        }

        file.seek(SeekFrom::Start(0))?;
        file.write_all(MAGIC)?;
        file.write_u32::<BigEndian>(VERSION)?;
        file.write_all(&metadata_json)?;
        let padding = HEADER_SIZE as usize - 8 - metadata_json.len();
        file.write_all(&vec![0u8; padding])?;

        file.flush()?;
        file.into_inner()
            .map_err(|e| SstError::Io(e.into_error()))?
            .sync_all()?;

        rename(&tmp_path, path)?;

        if let Some(parent) = path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}
