//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Command execution
//! - Write-count flush trigger
//! - Newest-wins across memtable and segments
//! - Tombstones surviving flushes and restarts
//! - Restart from the manifest, including damaged entries
//! - Concurrent access

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use siltkv::config::Config;
use siltkv::engine::Engine;
use siltkv::protocol::{Command, Response, Status};
use siltkv::storage::{SegmentId, MANIFEST_FILENAME};
use siltkv::SiltError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn open_engine(dir: &Path, flush_threshold: usize) -> Engine {
    let config = Config::builder()
        .data_dir(dir)
        .flush_threshold(flush_threshold)
        .build();
    Engine::open(config).unwrap()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 1000);
    (temp_dir, engine)
}

fn manifest_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join(MANIFEST_FILENAME))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory_and_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let _engine = open_engine(&data_dir, 100);

    assert!(data_dir.exists());
    assert!(data_dir.join(MANIFEST_FILENAME).exists());
}

#[test]
fn test_engine_rejects_zero_flush_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_threshold(0)
        .build();

    assert!(matches!(Engine::open(config), Err(SiltError::Config(_))));
}

#[test]
fn test_engine_read_your_write() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"hello", b"world").unwrap();

    assert_eq!(engine.get(b"hello"), Some(b"world".to_vec()));
}

#[test]
fn test_engine_get_on_empty_engine() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get(b"never-written"), None);
}

#[test]
fn test_engine_put_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value1").unwrap();
    engine.put(b"key", b"value2").unwrap();

    assert_eq!(engine.get(b"key"), Some(b"value2".to_vec()));
}

#[test]
fn test_engine_empty_value_is_not_absence() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"empty", b"").unwrap();
    assert_eq!(engine.get(b"empty"), Some(Vec::new()));

    engine.flush().unwrap();
    assert_eq!(engine.get(b"empty"), Some(Vec::new()));
}

#[test]
fn test_engine_binary_keys_and_values() {
    let (_temp, engine) = setup_temp_engine();

    let key = [0u8, 255, 10, 13, 0];
    let value = [0xde, 0xad, 0xbe, 0xef, 0x00];
    engine.put(&key, &value).unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(&key), Some(value.to_vec()));
    assert_eq!(engine.get(&key[..4]), None);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_engine_delete_missing_key_reports_not_found() {
    let (_temp, engine) = setup_temp_engine();

    assert!(!engine.delete(b"nonexistent").unwrap());
    assert_eq!(engine.pending_writes(), 0);
    assert_eq!(engine.memtable_entry_count(), 0);
}

#[test]
fn test_engine_delete_in_memtable() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();
    assert!(engine.delete(b"key").unwrap());

    assert_eq!(engine.get(b"key"), None);
    assert!(!engine.delete(b"key").unwrap());
}

#[test]
fn test_engine_delete_survives_flush() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();
    engine.delete(b"key").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.get(b"key"), None);
}

#[test]
fn test_engine_delete_shadows_older_segment() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"key", b"value").unwrap();
        engine.flush().unwrap();

        assert!(engine.delete(b"key").unwrap());
        assert_eq!(engine.get(b"key"), None);

        engine.flush().unwrap();
        assert_eq!(engine.segment_count(), 2);
        assert_eq!(engine.get(b"key"), None);
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.get(b"key"), None);
    assert!(!engine.delete(b"key").unwrap());
}

#[test]
fn test_engine_put_after_delete_revives_key() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"old").unwrap();
    engine.flush().unwrap();
    engine.delete(b"key").unwrap();
    engine.flush().unwrap();
    engine.put(b"key", b"new").unwrap();

    assert_eq!(engine.get(b"key"), Some(b"new".to_vec()));
    engine.flush().unwrap();
    assert_eq!(engine.get(b"key"), Some(b"new".to_vec()));
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_engine_execute_put_echoes_value() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine
        .execute(Command::Put {
            key: b"key".to_vec(),
            value: b"value".to_vec(),
        })
        .unwrap();

    assert_eq!(response, Response::ok(Some(b"value".to_vec())));
    assert_eq!(engine.get(b"key"), Some(b"value".to_vec()));
}

#[test]
fn test_engine_execute_get() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"key", b"value").unwrap();

    let found = engine.execute(Command::Get { key: b"key".to_vec() }).unwrap();
    let missing = engine.execute(Command::Get { key: b"nope".to_vec() }).unwrap();

    assert_eq!(found, Response::ok(Some(b"value".to_vec())));
    assert_eq!(missing.status, Status::NotFound);
}

#[test]
fn test_engine_execute_delete() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"key", b"value").unwrap();

    let first = engine.execute(Command::Delete { key: b"key".to_vec() }).unwrap();
    let second = engine.execute(Command::Delete { key: b"key".to_vec() }).unwrap();

    assert_eq!(first.status, Status::Ok);
    assert_eq!(second.status, Status::NotFound);
}

#[test]
fn test_engine_execute_rejects_empty_key() {
    let (_temp, engine) = setup_temp_engine();

    let result = engine.execute(Command::Put {
        key: Vec::new(),
        value: b"value".to_vec(),
    });

    assert!(matches!(result, Err(SiltError::InvalidRequest(_))));
    assert_eq!(engine.pending_writes(), 0);
}

#[test]
fn test_engine_execute_ping() {
    let (_temp, engine) = setup_temp_engine();

    let response = engine.execute(Command::Ping).unwrap();

    assert_eq!(response, Response::ok(Some(b"PONG".to_vec())));
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_engine_manual_flush() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();
    assert_eq!(engine.memtable_entry_count(), 1);
    assert_eq!(engine.segment_count(), 0);

    let id = engine.flush().unwrap();

    assert_eq!(id, Some(SegmentId(1)));
    assert_eq!(engine.memtable_entry_count(), 0);
    assert_eq!(engine.pending_writes(), 0);
    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get(b"key"), Some(b"value".to_vec()));
}

#[test]
fn test_engine_flush_empty_memtable_is_noop() {
    let (temp, engine) = setup_temp_engine();

    assert_eq!(engine.flush().unwrap(), None);
    assert_eq!(engine.segment_count(), 0);
    assert!(manifest_lines(temp.path()).is_empty());
}

#[test]
fn test_engine_flushes_exactly_at_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 10);

    for i in 0..9 {
        engine.put(format!("key{:02}", i).as_bytes(), b"v").unwrap();
    }
    assert_eq!(engine.segment_count(), 0);
    assert_eq!(engine.pending_writes(), 9);
    assert_eq!(engine.memtable_entry_count(), 9);

    engine.put(b"key09", b"v").unwrap();

    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.pending_writes(), 0);
    assert_eq!(engine.memtable_entry_count(), 0);
    for i in 0..10 {
        assert_eq!(engine.get(format!("key{:02}", i).as_bytes()), Some(b"v".to_vec()));
    }
}

#[test]
fn test_engine_threshold_counts_writes_not_keys() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 5);

    for i in 0..5 {
        engine.put(b"same", format!("v{}", i).as_bytes()).unwrap();
    }

    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get(b"same"), Some(b"v4".to_vec()));
}

#[test]
fn test_engine_deletes_count_toward_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 4);

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.delete(b"a").unwrap();
    assert_eq!(engine.segment_count(), 0);

    engine.delete(b"b").unwrap();

    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get(b"a"), None);
    assert_eq!(engine.get(b"b"), None);
}

#[test]
fn test_engine_newest_wins_across_flush() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"k", b"a").unwrap();
    engine.flush().unwrap();
    engine.put(b"k", b"b").unwrap();

    assert_eq!(engine.get(b"k"), Some(b"b".to_vec()));
}

#[test]
fn test_engine_manifest_lists_flushes_in_order() {
    let (temp, engine) = setup_temp_engine();

    for i in 1..=3 {
        engine.put(b"k", format!("v{}", i).as_bytes()).unwrap();
        engine.put(format!("only{}", i).as_bytes(), b"x").unwrap();
        engine.flush().unwrap();
    }

    assert_eq!(engine.segment_ids(), vec![SegmentId(1), SegmentId(2), SegmentId(3)]);
    assert_eq!(
        manifest_lines(temp.path()),
        vec!["sst-000001.sst", "sst-000002.sst", "sst-000003.sst"]
    );
    assert_eq!(engine.get(b"k"), Some(b"v3".to_vec()));
    assert_eq!(engine.get(b"only1"), Some(b"x".to_vec()));
}

#[test]
fn test_engine_failed_flush_keeps_memtable() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 3);

    // A directory where the builder wants its temp file makes the write fail
    let blocker = temp_dir.path().join("sst-000001.sst.tmp");
    fs::create_dir(&blocker).unwrap();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    assert!(engine.put(b"c", b"3").is_err());

    assert_eq!(engine.segment_count(), 0);
    assert_eq!(engine.pending_writes(), 3);
    assert_eq!(engine.get(b"c"), Some(b"3".to_vec()));
    assert!(manifest_lines(temp_dir.path()).is_empty());

    fs::remove_dir(&blocker).unwrap();
    engine.put(b"d", b"4").unwrap();

    assert_eq!(engine.segment_ids(), vec![SegmentId(1)]);
    assert_eq!(engine.pending_writes(), 0);
    for key in [b"a", b"b", b"c", b"d"] {
        assert!(engine.get(key).is_some());
    }
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_engine_segments_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"k", b"a").unwrap();
        engine.flush().unwrap();
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get(b"k"), Some(b"a".to_vec()));
}

#[test]
fn test_engine_unflushed_writes_are_lost_on_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"flushed", b"1").unwrap();
        engine.flush().unwrap();
        engine.put(b"pending", b"2").unwrap();
        // Dropped without close()
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.get(b"flushed"), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"pending"), None);
}

#[test]
fn test_engine_close_flushes_memtable() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"key", b"value").unwrap();
        engine.close().unwrap();
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.get(b"key"), Some(b"value".to_vec()));
    assert_eq!(engine.segment_count(), 1);
}

#[test]
fn test_engine_restart_skips_missing_segment() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"first", b"1").unwrap();
        engine.put(b"shared", b"old").unwrap();
        engine.flush().unwrap();
        engine.put(b"second", b"2").unwrap();
        engine.flush().unwrap();
    }

    fs::remove_file(temp_dir.path().join("sst-000001.sst")).unwrap();

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(2)]);
    assert_eq!(engine.get(b"first"), None);
    assert_eq!(engine.get(b"shared"), None);
    assert_eq!(engine.get(b"second"), Some(b"2".to_vec()));
}

#[test]
fn test_engine_restart_skips_corrupt_segment() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"k", b"old").unwrap();
        engine.flush().unwrap();
        engine.put(b"k", b"new").unwrap();
        engine.flush().unwrap();
    }

    // Flip a byte inside the newest segment's data block
    let path = temp_dir.path().join("sst-000002.sst");
    let mut bytes = fs::read(&path).unwrap();
    bytes[20] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(1)]);
    assert_eq!(engine.get(b"k"), Some(b"old".to_vec()));
}

#[test]
fn test_engine_new_ids_stay_above_dropped_entries() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        for i in 1..=2 {
            engine.put(format!("k{}", i).as_bytes(), b"v").unwrap();
            engine.flush().unwrap();
        }
    }

    fs::remove_file(temp_dir.path().join("sst-000002.sst")).unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"k3", b"v").unwrap();
        assert_eq!(engine.flush().unwrap(), Some(SegmentId(3)));
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(1), SegmentId(3)]);
    assert_eq!(engine.get(b"k3"), Some(b"v".to_vec()));
}

#[test]
fn test_engine_restart_ignores_malformed_manifest_lines() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"k", b"v").unwrap();
        engine.flush().unwrap();
    }

    let manifest = temp_dir.path().join(MANIFEST_FILENAME);
    let mut contents = fs::read_to_string(&manifest).unwrap();
    contents.push_str("garbage\nsst-12.sst\n\n");
    fs::write(&manifest, contents).unwrap();

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(1)]);
    assert_eq!(engine.get(b"k"), Some(b"v".to_vec()));

    engine.put(b"k", b"v2").unwrap();
    assert_eq!(engine.flush().unwrap(), Some(SegmentId(2)));
}

#[test]
fn test_engine_flushes_past_out_of_range_manifest_id() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(MANIFEST_FILENAME),
        format!("sst-{}.sst\n", u64::MAX),
    )
    .unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        assert_eq!(engine.segment_count(), 0);

        engine.put(b"k", b"v").unwrap();
        assert_eq!(engine.flush().unwrap(), Some(SegmentId(1)));
    }

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(1)]);
    assert_eq!(engine.get(b"k"), Some(b"v".to_vec()));
}

#[test]
fn test_engine_orphan_segment_is_invisible() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = open_engine(temp_dir.path(), 1000);
        engine.put(b"k", b"registered").unwrap();
        engine.flush().unwrap();
        engine.put(b"k", b"orphan").unwrap();
        engine.flush().unwrap();
    }

    // Simulate a crash between segment write and manifest append
    let manifest = temp_dir.path().join(MANIFEST_FILENAME);
    fs::write(&manifest, "sst-000001.sst\n").unwrap();

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.segment_ids(), vec![SegmentId(1)]);
    assert_eq!(engine.get(b"k"), Some(b"registered".to_vec()));

    // The orphan's id is reused and its file overwritten
    engine.put(b"k", b"fresh").unwrap();
    assert_eq!(engine.flush().unwrap(), Some(SegmentId(2)));
    drop(engine);

    let engine = open_engine(temp_dir.path(), 1000);
    assert_eq!(engine.get(b"k"), Some(b"fresh".to_vec()));
}

// =============================================================================
// Accessor Tests
// =============================================================================

#[test]
fn test_engine_accessors() {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_engine(temp_dir.path(), 42);

    assert_eq!(engine.data_dir(), temp_dir.path());
    assert_eq!(engine.config().flush_threshold, 42);
    assert_eq!(engine.memtable_entry_count(), 0);
    assert_eq!(engine.pending_writes(), 0);
    assert_eq!(engine.segment_count(), 0);
}

#[test]
fn test_engine_open_path_convenience() {
    let temp_dir = TempDir::new().unwrap();

    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.config().flush_threshold, 100);
    engine.put(b"key", b"value").unwrap();
    assert_eq!(engine.get(b"key"), Some(b"value".to_vec()));
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_writers_flush_deterministically() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(open_engine(temp_dir.path(), 50));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("t{}-k{:03}", t, i);
                    engine.put(key.as_bytes(), key.as_bytes()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // 1600 writes at a threshold of 50
    assert_eq!(engine.segment_count(), 32);
    assert_eq!(engine.pending_writes(), 0);

    for t in 0..8 {
        for i in 0..200 {
            let key = format!("t{}-k{:03}", t, i);
            assert_eq!(engine.get(key.as_bytes()), Some(key.clone().into_bytes()));
        }
    }
}

#[test]
fn test_engine_concurrent_readers_and_writer() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(open_engine(temp_dir.path(), 25));

    for i in 0..100 {
        engine.put(format!("stable{:03}", i).as_bytes(), b"v").unwrap();
    }

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..300 {
                engine.put(format!("churn{:03}", i).as_bytes(), b"c").unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..100 {
                    assert_eq!(engine.get(format!("stable{:03}", i).as_bytes()), Some(b"v".to_vec()));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(engine.segment_count(), 16);
}
