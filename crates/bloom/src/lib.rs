///! # Bloom Filter
///!
///! A space-efficient probabilistic data structure for set membership testing.
///!
///! A bloom filter can tell you with certainty that a key is **not** in the set
///! (no false negatives), but may occasionally report that a key **is** in the
///! set when it isn't (false positives).
///!
///! ## Usage
///!
///! Each SSTable embeds a bloom filter built from its keys. During point lookups
///! the engine checks the bloom filter first -- if it says "not present", the
///! SSTable is skipped entirely, avoiding an index search and a disk read.
///!
///! ## Sizing
///!
///! Bit count and hash count are not tuned from a target false-positive rate.
///! They are fixed by the number of expected entries `n`: `m = max(10*n, 1000)`
///! bits and `k = 7` hash functions, always.
///!
///! ## Example
///!
///! ```rust,no_run
///! use bloom::BloomFilter;
///!
///! let mut bf = BloomFilter::new(1000);
///! bf.insert(b"hello");
///! assert!(bf.contains(b"hello"));
///! ```
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// Fixed hash-function count, per the sizing rule in the module docs.
pub const NUM_HASHES: u32 = 7;

/// A bloom filter backed by a bit vector with [`NUM_HASHES`] independent
/// probes per key, placed by double hashing over a 32-bit FNV-1a hash.
pub struct BloomFilter {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_items` entries.
    ///
    /// `m = max(10 * expected_items, 1000)`, `k = 7`.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0.
    pub fn new(expected_items: usize) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");

        let m = (10u64.saturating_mul(expected_items as u64)).max(1000);
        let byte_len = ((m + 7) / 8) as usize;

        Self {
            bits: vec![0u8; byte_len],
            num_bits: m,
            num_hashes: NUM_HASHES,
        }
    }

    fn from_raw(bits: Vec<u8>, num_bits: u64, num_hashes: u32) -> Self {
        Self {
            bits,
            num_bits,
            num_hashes,
        }
    }

    /// Inserts a key into the filter.
    pub fn insert(&mut self, key: &[u8]) {
        let idxs: Vec<u64> = self.indices(key).collect();
        for idx in idxs {
            self.set_bit(idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.indices(key).all(|idx| self.get_bit(idx))
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns the size of the serialized bloom section in bytes:
    /// `m(u32) + k(u32) + packed_bits`.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        4 + 4 + self.bits.len()
    }

    /// Serializes the bloom section: `m:u32-BE | k:u32-BE | packed_bits`.
    ///
    /// Bits are packed little-endian within each byte: bit `j` of byte `i`
    /// encodes position `8*i + j`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.num_bits as u32)?;
        w.write_u32::<BigEndian>(self.num_hashes)?;
        w.write_all(&self.bits)?;
        Ok(())
    }

    /// Deserializes a bloom section written by [`Self::write_to`].
    ///
    /// `remaining` is the number of bytes available for the packed bit
    /// array (i.e. everything after the `m`/`k` header up to EOF).
    pub fn read_from<R: Read>(r: &mut R, remaining: usize) -> io::Result<Self> {
        let m = r.read_u32::<BigEndian>()? as u64;
        let k = r.read_u32::<BigEndian>()?;

        const MAX_BLOOM_BYTES: usize = 128 * 1024 * 1024;
        let byte_len = remaining.saturating_sub(8).min(MAX_BLOOM_BYTES);
        if byte_len > MAX_BLOOM_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bloom filter too large: {} bytes", byte_len),
            ));
        }

        let mut bits = vec![0u8; byte_len];
        r.read_exact(&mut bits)?;

        Ok(Self::from_raw(bits, m, k))
    }

    // ---- Internal helpers ----

    /// Yields the `k` bit indices for `key` via double hashing:
    /// `g1 = h(key,i) mod m`, `g2 = h(key,i+k) mod m`,
    /// `idx_i = (g1 + i*g2) mod m`.
    fn indices<'a>(&'a self, key: &'a [u8]) -> impl Iterator<Item = u64> + 'a {
        let m = self.num_bits;
        let k = self.num_hashes;
        (0..k).map(move |i| {
            let g1 = seeded_hash_mod(key, i, m);
            let g2 = seeded_hash_mod(key, i + k, m);
            (g1 + (i as u64).wrapping_mul(g2)) % m
        })
    }

    fn set_bit(&mut self, idx: u64) {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        self.bits[byte_idx] |= 1 << bit_offset;
    }

    fn get_bit(&self, idx: u64) -> bool {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        (self.bits[byte_idx] >> bit_offset) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("bytes", &self.bits.len())
            .finish()
    }
}

/// FNV-1a 32-bit hash of `key` with `seed` folded into the starting basis,
/// reduced mod `m` on the absolute value of its signed interpretation so
/// `i32::MIN` does not overflow on negation.
fn seeded_hash_mod(key: &[u8], seed: u32, m: u64) -> u64 {
    const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut hash = FNV_OFFSET_BASIS ^ seed;
    for &byte in key {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let signed = hash as i32 as i64;
    (signed.unsigned_abs()) % m
}
