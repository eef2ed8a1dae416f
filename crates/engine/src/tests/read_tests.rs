use crate::*;
use anyhow::Result;
use tempfile::tempdir;

// --------------------- Range scan ---------------------

#[test]
fn range_scan_full_table() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1024 * 1024)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    engine.put(b"b".to_vec(), b"2".to_vec())?;
    engine.put(b"c".to_vec(), b"3".to_vec())?;

    let results = engine.range_scan(&[0u8], &[0xffu8; 8])?;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], (b"a".to_vec(), b"1".to_vec()));
    assert_eq!(results[1], (b"b".to_vec(), b"2".to_vec()));
    assert_eq!(results[2], (b"c".to_vec(), b"3".to_vec()));
    Ok(())
}

#[test]
fn range_scan_is_inclusive_on_both_ends() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1024 * 1024)?;

    for c in b'a'..=b'z' {
        engine.put(vec![c], vec![c])?;
    }

    let results = engine.range_scan(b"b", b"e")?;
    let keys: Vec<Vec<u8>> = results.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec(), b"e".to_vec()]);
    Ok(())
}

#[test]
fn range_scan_across_memtable_and_sstables() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 64)?;
    engine.set_l0_compaction_trigger(0);

    for i in 0..20u64 {
        engine.put(format!("k{i:04}").into_bytes(), b"val".to_vec())?;
    }

    let results = engine.range_scan(&[0u8], &[0xffu8; 8])?;
    assert_eq!(results.len(), 20);
    for i in 0..19 {
        assert!(results[i].0 < results[i + 1].0);
    }
    Ok(())
}

#[test]
fn range_scan_filters_tombstones() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1024 * 1024)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;
    engine.put(b"b".to_vec(), b"2".to_vec())?;
    engine.put(b"c".to_vec(), b"3".to_vec())?;
    engine.delete(b"b")?;

    let results = engine.range_scan(&[0u8], &[0xffu8; 8])?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, b"a".to_vec());
    assert_eq!(results[1].0, b"c".to_vec());
    Ok(())
}

#[test]
fn range_scan_empty_range_returns_nothing() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1024 * 1024)?;

    engine.put(b"a".to_vec(), b"1".to_vec())?;

    let results = engine.range_scan(b"x", b"z")?;
    assert!(results.is_empty());
    Ok(())
}

#[test]
fn range_scan_orders_keys_by_length_then_lexicographically() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1024 * 1024)?;

    // "z" is shorter than "aa"/"ab" and must sort first under (length, bytes).
    engine.put(b"aa".to_vec(), b"1".to_vec())?;
    engine.put(b"z".to_vec(), b"2".to_vec())?;
    engine.put(b"ab".to_vec(), b"3".to_vec())?;

    let results = engine.range_scan(&[0u8], &[0xffu8; 8])?;
    let keys: Vec<Vec<u8>> = results.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"z".to_vec(), b"aa".to_vec(), b"ab".to_vec()]);
    Ok(())
}

// --------------------- Read path priority ---------------------

#[test]
fn get_prefers_memtable_over_sstable() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 64)?;
    engine.set_l0_compaction_trigger(0);

    engine.put(b"key".to_vec(), b"old".to_vec())?;
    for i in 0..30u64 {
        engine.put(format!("pad{i:04}").into_bytes(), b"x".to_vec())?;
    }

    assert!(engine.sstable_count() > 1, "need multiple sstables for compact");
    engine.compact()?;
    assert_eq!(engine.sstable_count(), 1, "compaction should merge down to one sst");

    // Write a newer value - lands in the fresh memtable, shadowing the
    // compacted sst's value.
    engine.put(b"key".to_vec(), b"new".to_vec())?;

    assert_eq!(engine.get(b"key")?.expect("key should exist"), b"new".to_vec());
    Ok(())
}

#[test]
fn get_checks_sstables_newest_first() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path(), 1)?;
    engine.set_l0_compaction_trigger(0);

    engine.put(b"k".to_vec(), b"v1".to_vec())?; // flushes to sst 0
    engine.put(b"k".to_vec(), b"v2".to_vec())?; // flushes to sst 1, newer

    assert_eq!(engine.sstable_count(), 2);
    assert_eq!(engine.get(b"k")?.unwrap(), b"v2".to_vec());
    Ok(())
}
