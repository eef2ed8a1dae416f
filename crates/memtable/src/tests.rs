use super::*;

const TOMBSTONE: &[u8] = b"\0";

// -------------------- Basic CRUD --------------------

#[test]
fn put_and_get_single_key() {
    let mut m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(b"k1"), Some(b"v1".as_slice()));
}

#[test]
fn put_overwrites_existing_value() {
    let mut m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    m.put(b"k1".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k1"), Some(b"v2".as_slice()));
    assert_eq!(m.len(), 1);
}

#[test]
fn get_missing_key_returns_none() {
    let m = Memtable::new();
    assert!(m.get(b"nonexistent").is_none());
}

#[test]
fn put_tombstone_is_stored_as_opaque_value() {
    let mut m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    m.put(b"k1".to_vec(), TOMBSTONE.to_vec());
    assert_eq!(m.get(b"k1"), Some(TOMBSTONE));
    assert_eq!(m.len(), 1); // tombstone still present as a value
}

#[test]
fn delete_removes_entry_entirely() {
    let mut m = Memtable::new();
    m.put(b"k1".to_vec(), b"v1".to_vec());
    m.delete(b"k1");
    assert!(m.get(b"k1").is_none());
    assert!(!m.contains_key(b"k1"));
    assert_eq!(m.len(), 0);
}

// -------------------- Load / write tests --------------------

#[test]
fn write_load_10k_unique_keys() {
    let mut m = Memtable::new();
    for i in 0..10_000u64 {
        let key = format!("key{}", i).into_bytes();
        let val = vec![b'x'; 100];
        m.put(key, val);
    }
    assert_eq!(m.len(), 10_000);
}

#[test]
fn write_load_with_key_reuse() {
    let mut m = Memtable::new();
    for i in 0..100_000u64 {
        let key = format!("key{}", i % 1_000).into_bytes();
        m.put(key, vec![b'x'; 50]);
    }
    assert_eq!(m.len(), 1_000);
}

// -------------------- Iterator ordering --------------------

#[test]
fn iter_yields_keys_in_length_then_byte_order() {
    let mut m = Memtable::new();
    m.put(b"bb".to_vec(), b"2".to_vec());
    m.put(b"a".to_vec(), b"1".to_vec());
    m.put(b"aa".to_vec(), b"3".to_vec());

    let keys: Vec<&[u8]> = m.iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![b"a".as_slice(), b"aa".as_slice(), b"bb".as_slice()]
    );
}

#[test]
fn iter_includes_tombstone_values() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    m.put(b"b".to_vec(), TOMBSTONE.to_vec());
    m.put(b"c".to_vec(), b"3".to_vec());

    let entries: Vec<_> = m.iter().collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1].1, TOMBSTONE);
}

#[test]
fn iter_empty_memtable() {
    let m = Memtable::new();
    assert_eq!(m.iter().count(), 0);
}

// -------------------- range_scan --------------------

#[test]
fn range_scan_is_inclusive_both_ends() {
    let mut m = Memtable::new();
    for i in 1..=5 {
        m.put(format!("key{}", i).into_bytes(), format!("v{}", i).into_bytes());
    }
    let got = m.range_scan(b"key2", b"key4");
    let keys: Vec<Vec<u8>> = got.into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![b"key2".to_vec(), b"key3".to_vec(), b"key4".to_vec()]
    );
}

#[test]
fn range_scan_empty_when_disjoint() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    assert!(m.range_scan(b"x", b"z").is_empty());
}

// -------------------- contains_key --------------------

#[test]
fn contains_key_live_value() {
    let mut m = Memtable::new();
    m.put(b"k".to_vec(), b"v".to_vec());
    assert!(m.contains_key(b"k"));
}

#[test]
fn contains_key_missing() {
    let m = Memtable::new();
    assert!(!m.contains_key(b"k"));
}

// -------------------- size tracking --------------------

#[test]
fn size_includes_key_and_value() {
    let mut m = Memtable::new();
    assert_eq!(m.size(), 0);
    // key="ab" (2) + value="ccc" (3) = 5
    m.put(b"ab".to_vec(), b"ccc".to_vec());
    assert_eq!(m.size(), 5);
}

#[test]
fn size_adjusts_on_overwrite() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"aaa".to_vec()); // key=1 + val=3 = 4
    assert_eq!(m.size(), 4);
    m.put(b"a".to_vec(), b"bb".to_vec()); // key=1 + val=2 = 3
    assert_eq!(m.size(), 3);
}

#[test]
fn size_adjusts_on_delete() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"aaa".to_vec()); // 1+3=4
    m.delete(b"a");
    assert_eq!(m.size(), 0);
}

// -------------------- Clear --------------------

#[test]
fn clear_resets_everything() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    m.put(b"b".to_vec(), b"2".to_vec());
    assert!(!m.is_empty());
    assert!(m.size() > 0);

    m.clear();
    assert_eq!(m.len(), 0);
    assert_eq!(m.size(), 0);
    assert!(m.is_empty());
    assert!(m.get(b"a").is_none());
}

// -------------------- len / is_empty --------------------

#[test]
fn len_counts_tombstone_values() {
    let mut m = Memtable::new();
    m.put(b"a".to_vec(), b"1".to_vec());
    m.put(b"b".to_vec(), TOMBSTONE.to_vec());
    assert_eq!(m.len(), 2);
}

#[test]
fn is_empty_on_new() {
    let m = Memtable::new();
    assert!(m.is_empty());
}

#[test]
fn is_empty_after_insert() {
    let mut m = Memtable::new();
    m.put(b"k".to_vec(), b"v".to_vec());
    assert!(!m.is_empty());
}

#[test]
fn default_creates_empty() {
    let m = Memtable::default();
    assert!(m.is_empty());
    assert_eq!(m.size(), 0);
}

// -------------------- Many / stress tests --------------------

#[test]
fn many_distinct_keys_are_length_then_byte_sorted() {
    let mut m = Memtable::new();
    for i in 0u64..1000 {
        m.put(format!("key{:04}", i).into_bytes(), b"v".to_vec());
    }
    assert_eq!(m.len(), 1000);
    let keys: Vec<&[u8]> = m.iter().map(|(k, _)| k).collect();
    let mut sorted = keys.clone();
    sorted.sort_by(|a, b| keyorder::compare(a, b));
    assert_eq!(keys, sorted);
}

#[test]
fn overwrite_same_key_many_times() {
    let mut m = Memtable::new();
    for seq in 1..=10_000u64 {
        m.put(b"k".to_vec(), format!("v{}", seq).into_bytes());
    }
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(b"k"), Some(b"v10000".as_slice()));
}

#[test]
fn alternating_put_delete() {
    let mut m = Memtable::new();
    for _ in 0..1_000u64 {
        m.put(b"k".to_vec(), b"v".to_vec());
        m.delete(b"k");
    }
    assert!(m.get(b"k").is_none());
    assert_eq!(m.len(), 0);
}

// -------------------- Edge cases --------------------

#[test]
fn empty_key() {
    let mut m = Memtable::new();
    m.put(b"".to_vec(), b"val".to_vec());
    assert_eq!(m.get(b""), Some(b"val".as_slice()));
}

#[test]
fn empty_value() {
    let mut m = Memtable::new();
    m.put(b"k".to_vec(), b"".to_vec());
    assert_eq!(m.get(b"k"), Some(b"".as_slice()));
}

#[test]
fn binary_key_and_value() {
    let mut m = Memtable::new();
    let key = vec![0x00, 0xFF, 0x80, 0x01];
    let val = vec![0xDE, 0xAD, 0xBE, 0xEF];
    m.put(key.clone(), val.clone());
    assert_eq!(m.get(&key), Some(val.as_slice()));
}

#[test]
fn large_value() {
    let mut m = Memtable::new();
    let val = vec![b'x'; 1_000_000]; // 1 MB
    m.put(b"big".to_vec(), val.clone());
    assert_eq!(m.get(b"big").unwrap().len(), 1_000_000);
    assert_eq!(m.size(), 3 + 1_000_000); // key len (3) + value len
}

#[test]
fn delete_nonexistent_key_is_a_no_op() {
    let mut m = Memtable::new();
    m.delete(b"k");
    assert_eq!(m.len(), 0);
    assert!(m.get(b"k").is_none());
    assert!(!m.contains_key(b"k"));
}

#[test]
fn put_after_delete_resurrects_key() {
    let mut m = Memtable::new();
    m.put(b"k".to_vec(), b"v1".to_vec());
    m.delete(b"k");
    assert!(m.get(b"k").is_none());

    m.put(b"k".to_vec(), b"v2".to_vec());
    assert_eq!(m.get(b"k"), Some(b"v2".as_slice()));
}
