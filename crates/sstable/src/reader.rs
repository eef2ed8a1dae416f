use bloom::BloomFilter;
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::format::{Metadata, HEADER_SIZE, MAGIC, VERSION};
use crate::SstError;

/// Maximum key size tolerated while reading a record, guarding against
/// treating corrupt data as a huge allocation request.
const MAX_KEY_BYTES: usize = 1024 * 1024;
/// Maximum value size tolerated while reading a record.
const MAX_VALUE_BYTES: usize = 64 * 1024 * 1024;

/// Reads an immutable SSTable file for point lookups and range scans.
///
/// [`open`](SSTableReader::open) loads the sparse index and bloom filter
/// into memory; the data section is read lazily through a persistent file
/// handle guarded by a `Mutex` so `get`/`range_scan` can be called through
/// a shared `&self` reference.
pub struct SSTableReader {
    #[allow(dead_code)]
    path: PathBuf,
    metadata: Metadata,
    /// Sparse index: every `INDEX_INTERVAL`-th key, in ascending order.
    index: Vec<(Vec<u8>, u64, u32)>,
    bloom: BloomFilter,
    file: Mutex<BufReader<File>>,
}

impl SSTableReader {
    /// Opens an SSTable file, validating its header and loading its sparse
    /// index and bloom filter.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SstError> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)?;

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(SstError::BadMagic);
        }
        let version = f.read_u32::<BigEndian>()?;
        if version != VERSION {
            return Err(SstError::BadVersion(version));
        }

        let mut header_rest = vec![0u8; (HEADER_SIZE - 8) as usize];
        f.read_exact(&mut header_rest)?;
        let nul_pos = header_rest
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(header_rest.len());
        let metadata: Metadata = serde_json::from_slice(&header_rest[..nul_pos])?;

        f.seek(SeekFrom::Start(metadata.index_offset))?;
        let index_bytes_len = (metadata.bloom_offset - metadata.index_offset) as usize;
        let mut index_bytes = vec![0u8; index_bytes_len];
        f.read_exact(&mut index_bytes)?;
        let index = parse_sparse_index(&index_bytes)?;

        f.seek(SeekFrom::Start(metadata.bloom_offset))?;
        let filesize = f.metadata()?.len();
        let bloom_len = (filesize - metadata.bloom_offset) as usize;
        let bloom = BloomFilter::read_from(&mut f, bloom_len)?;

        f.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path_buf,
            metadata,
            index,
            bloom,
            file: Mutex::new(BufReader::new(f)),
        })
    }

    /// Point lookup for a single key.
    ///
    /// Checks the bloom filter, binary-searches the sparse index for the
    /// nearest entry at or before `key`, then scans forward through the
    /// data section. A decode error anywhere past that point is treated
    /// as "not found" rather than propagated, per the engine's tolerant
    /// read path.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SstError> {
        if !self.bloom.contains(key) {
            return Ok(None);
        }

        let start_offset = match self.seek_start_offset(key) {
            Some(o) => o,
            None => return Ok(None),
        };

        let mut f = self.file.lock().expect("sstable file lock poisoned");
        f.seek(SeekFrom::Start(start_offset))?;

        loop {
            let cur_key = match read_key(&mut *f)? {
                Some(k) => k,
                None => return Ok(None),
            };
            match keyorder::compare(&cur_key, key) {
                std::cmp::Ordering::Equal => return Ok(read_value(&mut *f)?),
                std::cmp::Ordering::Greater => return Ok(None),
                std::cmp::Ordering::Less => {
                    if skip_value(&mut *f)?.is_none() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Returns all live records with `lo <= key <= hi`, in ascending order.
    pub fn range_scan(&self, lo: &[u8], hi: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SstError> {
        if keyorder::compare(hi, &self.metadata.min_key) == std::cmp::Ordering::Less
            || keyorder::compare(lo, &self.metadata.max_key) == std::cmp::Ordering::Greater
        {
            return Ok(Vec::new());
        }

        let mut f = self.file.lock().expect("sstable file lock poisoned");
        f.seek(SeekFrom::Start(HEADER_SIZE))?;

        let mut out = Vec::new();
        loop {
            if f.stream_position()? >= self.metadata.index_offset {
                break;
            }
            let cur_key = match read_key(&mut *f)? {
                Some(k) => k,
                None => break,
            };
            if keyorder::compare(&cur_key, hi) == std::cmp::Ordering::Greater {
                break;
            }
            let value = match read_value(&mut *f)? {
                Some(v) => v,
                None => break,
            };
            if keyorder::compare(&cur_key, lo) != std::cmp::Ordering::Less {
                out.push((cur_key, value));
            }
        }
        Ok(out)
    }

    /// Binary-searches the sparse index for the largest entry `<= key`.
    fn seek_start_offset(&self, key: &[u8]) -> Option<u64> {
        let idx = self
            .index
            .partition_point(|(k, _, _)| keyorder::compare(k, key) != std::cmp::Ordering::Greater);
        if idx == 0 {
            return None;
        }
        Some(self.index[idx - 1].1)
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.metadata.level
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.metadata.sequence
    }

    #[must_use]
    pub fn min_key(&self) -> &[u8] {
        &self.metadata.min_key
    }

    #[must_use]
    pub fn max_key(&self) -> &[u8] {
        &self.metadata.max_key
    }

    /// Closes the reader, dropping the index, bloom filter, and file handle.
    pub fn close(self) {
        drop(self);
    }

    /// Removes the underlying file from disk.
    pub fn delete(self) -> std::io::Result<()> {
        let path = self.path.clone();
        drop(self);
        std::fs::remove_file(path)
    }
}

fn parse_sparse_index(bytes: &[u8]) -> Result<Vec<(Vec<u8>, u64, u32)>, SstError> {
    let mut out = Vec::new();
    for line in bytes.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, |&b| b == b'\t');
        let key = parts.next().ok_or(SstError::BadIndex)?.to_vec();
        let offset: u64 = std::str::from_utf8(parts.next().ok_or(SstError::BadIndex)?)
            .map_err(|_| SstError::BadIndex)?
            .parse()
            .map_err(|_| SstError::BadIndex)?;
        let _size: u32 = std::str::from_utf8(parts.next().ok_or(SstError::BadIndex)?)
            .map_err(|_| SstError::BadIndex)?
            .parse()
            .map_err(|_| SstError::BadIndex)?;
        out.push((key, offset, _size));
    }
    Ok(out)
}

fn read_key<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, SstError> {
    let key_len = match r.read_u32::<BigEndian>() {
        Ok(v) => v as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(SstError::Io(e)),
    };
    if key_len > MAX_KEY_BYTES {
        return Ok(None);
    }
    let mut key = vec![0u8; key_len];
    if r.read_exact(&mut key).is_err() {
        return Ok(None);
    }
    Ok(Some(key))
}

fn read_value<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, SstError> {
    let val_len = match r.read_u32::<BigEndian>() {
        Ok(v) => v as usize,
        Err(_) => return Ok(None),
    };
    if val_len > MAX_VALUE_BYTES {
        return Ok(None);
    }
    let mut value = vec![0u8; val_len];
    if r.read_exact(&mut value).is_err() {
        return Ok(None);
    }
    Ok(Some(value))
}

fn skip_value<R: Read>(r: &mut R) -> Result<Option<()>, SstError> {
    read_value(r).map(|v| v.map(|_| ()))
}
