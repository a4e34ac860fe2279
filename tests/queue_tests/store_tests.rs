//! Tests for QueueStore
//!
//! These tests verify:
//! - FIFO ordering, empty dequeue, size accounting
//! - Logging: seeding on late enable, markers, write-before-return
//! - Recovery round-trips and idempotence
//! - Recovery after a partial write at the end of the log
//! - Concurrent access

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use hawkmq::config::WalSyncStrategy;
use hawkmq::wal::{LogEntry, Operation, WalRecovery};
use hawkmq::{HawkError, QueueStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("queue.log");
    (temp_dir, log_path)
}

fn read_entries(path: &Path) -> Vec<LogEntry> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| LogEntry::decode(line).unwrap())
        .collect()
}

fn ops_and_payloads(path: &Path) -> Vec<(Operation, String)> {
    read_entries(path)
        .into_iter()
        .map(|e| (e.operation, e.payload))
        .collect()
}

fn enqueue_ok(queue: &QueueStore, message: &str) {
    queue.enqueue(message).into_result().unwrap();
}

fn dequeue_ok(queue: &QueueStore) -> Option<String> {
    queue.dequeue().into_result().unwrap()
}

// =============================================================================
// In-Memory Tests
// =============================================================================

#[test]
fn test_fifo_order() {
    let queue = QueueStore::new();
    for i in 0..50 {
        enqueue_ok(&queue, &format!("message{}", i));
    }

    for i in 0..50 {
        assert_eq!(dequeue_ok(&queue), Some(format!("message{}", i)));
    }
    assert_eq!(dequeue_ok(&queue), None);
}

#[test]
fn test_dequeue_empty() {
    let queue = QueueStore::new();

    let outcome = queue.dequeue();
    assert!(outcome.wal_error().is_none());
    assert_eq!(*outcome.value(), None);
    assert_eq!(queue.size(), 0);
    assert!(queue.is_empty());
}

#[test]
fn test_size_consistency() {
    let queue = QueueStore::new();
    for i in 0..10 {
        enqueue_ok(&queue, &i.to_string());
    }
    for _ in 0..4 {
        dequeue_ok(&queue);
    }

    assert_eq!(queue.size(), 6);
    assert_eq!(queue.messages(), vec!["4", "5", "6", "7", "8", "9"]);
}

#[test]
fn test_empty_and_duplicate_messages() {
    let queue = QueueStore::new();
    enqueue_ok(&queue, "");
    enqueue_ok(&queue, "dup");
    enqueue_ok(&queue, "dup");

    assert_eq!(dequeue_ok(&queue), Some(String::new()));
    assert_eq!(dequeue_ok(&queue), Some("dup".to_string()));
    assert_eq!(queue.size(), 1);
}

#[test]
fn test_close_without_logging_is_noop() {
    let queue = QueueStore::new();
    enqueue_ok(&queue, "a");

    queue.close().unwrap();
    assert_eq!(queue.size(), 1);
}

// =============================================================================
// Logging Tests
// =============================================================================

#[test]
fn test_enable_logging_writes_startup_marker() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();

    queue.enable_logging(&log_path).unwrap();

    assert!(queue.is_logging());
    assert_eq!(
        ops_and_payloads(&log_path),
        vec![(Operation::Startup, String::new())]
    );
}

#[test]
fn test_seeding_on_late_enable() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    enqueue_ok(&queue, "x");
    enqueue_ok(&queue, "y");

    queue.enable_logging(&log_path).unwrap();
    enqueue_ok(&queue, "z");

    assert_eq!(
        ops_and_payloads(&log_path),
        vec![
            (Operation::Startup, String::new()),
            (Operation::Enqueue, "x".to_string()),
            (Operation::Enqueue, "y".to_string()),
            (Operation::Enqueue, "z".to_string()),
        ]
    );
}

#[test]
fn test_entries_written_before_return() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    queue.enable_logging(&log_path).unwrap();

    enqueue_ok(&queue, "hello world");
    assert_eq!(read_entries(&log_path).len(), 2);

    assert_eq!(dequeue_ok(&queue), Some("hello world".to_string()));
    let entries = read_entries(&log_path);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].operation, Operation::Dequeue);
    assert_eq!(entries[2].payload, "hello world");
}

#[test]
fn test_empty_dequeue_writes_nothing() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    queue.enable_logging(&log_path).unwrap();

    assert_eq!(dequeue_ok(&queue), None);
    assert_eq!(read_entries(&log_path).len(), 1);
}

#[test]
fn test_enable_logging_twice_fails() {
    let (temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    queue.enable_logging(&log_path).unwrap();

    let result = queue.enable_logging(&temp.path().join("other.log"));

    assert!(matches!(result, Err(HawkError::Config(_))));
    assert!(!temp.path().join("other.log").exists());
}

#[test]
fn test_enable_logging_failure_leaves_logging_off() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "file, not dir").unwrap();
    let queue = QueueStore::new();
    enqueue_ok(&queue, "kept");

    let result = queue.enable_logging(&blocker.join("queue.log"));

    assert!(result.is_err());
    assert!(!queue.is_logging());
    assert_eq!(queue.messages(), vec!["kept"]);
    enqueue_ok(&queue, "still works");
    assert_eq!(queue.size(), 2);
}

#[test]
fn test_unloggable_message_is_still_enqueued() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    queue.enable_logging(&log_path).unwrap();

    let outcome = queue.enqueue("line one\nline two");

    assert!(matches!(outcome.wal_error(), Some(HawkError::WalWrite(_))));
    assert_eq!(queue.size(), 1);
    assert_eq!(read_entries(&log_path).len(), 1);
}

#[test]
fn test_close_writes_shutdown_marker_once() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::new();
    queue.enable_logging(&log_path).unwrap();
    enqueue_ok(&queue, "a");

    queue.close().unwrap();
    queue.close().unwrap();

    let ops: Vec<Operation> = read_entries(&log_path).iter().map(|e| e.operation).collect();
    assert_eq!(
        ops,
        vec![Operation::Startup, Operation::Enqueue, Operation::Shutdown]
    );
    assert!(!queue.is_logging());
}

#[test]
fn test_batched_sync_flushes_on_close() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::with_sync_strategy(WalSyncStrategy::EveryNEntries { count: 1000 });
    queue.enable_logging(&log_path).unwrap();
    for i in 0..10 {
        enqueue_ok(&queue, &i.to_string());
    }

    queue.close().unwrap();

    // STARTUP + 10 ENQUEUE + SHUTDOWN
    assert_eq!(read_entries(&log_path).len(), 12);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_log_round_trip() {
    let (_temp, log_path) = setup_temp_log();
    {
        let queue = QueueStore::new();
        queue.enable_logging(&log_path).unwrap();
        enqueue_ok(&queue, "a");
        enqueue_ok(&queue, "b");
        enqueue_ok(&queue, "c");
        assert_eq!(dequeue_ok(&queue), Some("a".to_string()));
        queue.close().unwrap();
    }

    let recovered = QueueStore::new();
    let result = recovered.recover_from_log(&log_path).unwrap();

    assert_eq!(recovered.messages(), vec!["b", "c"]);
    assert!(result.clean_shutdown);
    assert!(recovered.is_logging());
}

#[test]
fn test_recovery_is_idempotent() {
    let (_temp, log_path) = setup_temp_log();
    {
        let queue = QueueStore::new();
        queue.enable_logging(&log_path).unwrap();
        for m in ["one", "two", "three"] {
            enqueue_ok(&queue, m);
        }
        dequeue_ok(&queue);
        // no close: simulate a crash
    }
    let snapshot = fs::read(&log_path).unwrap();

    let first = QueueStore::new();
    first.recover_from_log(&log_path).unwrap();
    let first_messages = first.messages();
    drop(first);

    fs::write(&log_path, &snapshot).unwrap();
    let second = QueueStore::new();
    second.recover_from_log(&log_path).unwrap();

    assert_eq!(first_messages, vec!["two", "three"]);
    assert_eq!(second.messages(), first_messages);
}

#[test]
fn test_recover_replaces_existing_contents() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "ENQUEUE 2024-05-01T10:00:00Z from-log\n").unwrap();
    let queue = QueueStore::new();
    enqueue_ok(&queue, "in-memory");

    queue.recover_from_log(&log_path).unwrap();

    assert_eq!(queue.messages(), vec!["from-log"]);
}

#[test]
fn test_recover_appends_startup_and_continues_logging() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "ENQUEUE 2024-05-01T10:00:00Z a\n").unwrap();
    let queue = QueueStore::new();

    queue.recover_from_log(&log_path).unwrap();
    enqueue_ok(&queue, "b");

    assert_eq!(
        ops_and_payloads(&log_path),
        vec![
            (Operation::Enqueue, "a".to_string()),
            (Operation::Startup, String::new()),
            (Operation::Enqueue, "b".to_string()),
        ]
    );
}

#[test]
fn test_recover_twice_on_live_store() {
    let (_temp, log_path) = setup_temp_log();
    let queue = QueueStore::with_sync_strategy(WalSyncStrategy::EveryNEntries { count: 100 });
    queue.enable_logging(&log_path).unwrap();
    enqueue_ok(&queue, "a");
    enqueue_ok(&queue, "b");

    // Pending batched entries are flushed before the replay reads the file
    queue.recover_from_log(&log_path).unwrap();
    assert_eq!(queue.messages(), vec!["a", "b"]);

    queue.recover_from_log(&log_path).unwrap();
    assert_eq!(queue.messages(), vec!["a", "b"]);
}

#[test]
fn test_corrupt_log_leaves_store_untouched() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(
        &log_path,
        "ENQUEUE 2024-05-01T10:00:00Z a\nDEQUEUE 2024-05-01T10:00:01Z b\n",
    )
    .unwrap();
    let queue = QueueStore::new();
    enqueue_ok(&queue, "before");

    let result = queue.recover_from_log(&log_path);

    assert!(matches!(result, Err(HawkError::WalCorruption(_))));
    assert_eq!(queue.messages(), vec!["before"]);
    assert!(!queue.is_logging());
}

#[test]
fn test_recover_closes_log_at_other_path() {
    let temp_dir = TempDir::new().unwrap();
    let old_path = temp_dir.path().join("old.log");
    let new_path = temp_dir.path().join("new.log");
    fs::write(&new_path, "ENQUEUE 2024-05-01T10:00:00Z from-new\n").unwrap();

    let queue = QueueStore::new();
    queue.enable_logging(&old_path).unwrap();
    enqueue_ok(&queue, "from-old");

    queue.recover_from_log(&new_path).unwrap();
    enqueue_ok(&queue, "after");

    let old_ops: Vec<Operation> = read_entries(&old_path)
        .into_iter()
        .map(|e| e.operation)
        .collect();
    assert_eq!(
        old_ops,
        vec![Operation::Startup, Operation::Enqueue, Operation::Shutdown]
    );
    assert!(WalRecovery::verify(&old_path).unwrap().clean_shutdown);
    assert_eq!(queue.messages(), vec!["from-new", "after"]);
    assert_eq!(
        ops_and_payloads(&new_path).last(),
        Some(&(Operation::Enqueue, "after".to_string()))
    );
}

// =============================================================================
// Partial Write Recovery Tests
// =============================================================================

const TORN_PREFIX: &str = "STARTUP 2024-05-01T10:00:00Z \n\
                           ENQUEUE 2024-05-01T10:00:01Z hello\n";

fn setup_torn_log(tail: &str) -> (TempDir, PathBuf) {
    let (temp_dir, log_path) = setup_temp_log();
    fs::write(&log_path, format!("{}{}", TORN_PREFIX, tail)).unwrap();
    (temp_dir, log_path)
}

fn assert_every_line_complete(path: &Path) {
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.ends_with('\n'));
    for line in contents.lines() {
        assert!(LogEntry::decode(line).is_ok(), "bad line: {:?}", line);
    }
}

#[test]
fn test_partial_enqueue_dropped_across_restarts() {
    let (_temp, log_path) = setup_torn_log("ENQUEUE 2024-05-01T10:00:02Z hel");

    // First restart cuts the partial entry off
    {
        let queue = QueueStore::new();
        let result = queue.recover_from_log(&log_path).unwrap();
        assert!(result.was_truncated);
        assert_eq!(queue.messages(), vec!["hello"]);
        // no close: crash again
    }
    assert_every_line_complete(&log_path);

    // Second restart sees a clean file and the same queue
    {
        let queue = QueueStore::new();
        let result = queue.recover_from_log(&log_path).unwrap();
        assert!(!result.was_truncated);
        assert_eq!(result.lines_skipped, 0);
        assert_eq!(queue.messages(), vec!["hello"]);
        enqueue_ok(&queue, "world");
        queue.close().unwrap();
    }
    assert_every_line_complete(&log_path);

    let queue = QueueStore::new();
    queue.recover_from_log(&log_path).unwrap();
    assert_eq!(queue.messages(), vec!["hello", "world"]);
}

#[test]
fn test_partial_dequeue_keeps_head_across_restarts() {
    let (_temp, log_path) = setup_torn_log("DEQUEUE 2024-05-01T10:00:02Z hel");

    {
        let queue = QueueStore::new();
        let result = queue.recover_from_log(&log_path).unwrap();
        assert!(result.was_truncated);
        assert_eq!(queue.messages(), vec!["hello"]);
    }

    {
        let queue = QueueStore::new();
        queue.recover_from_log(&log_path).unwrap();
        assert_eq!(queue.messages(), vec!["hello"]);
        assert_eq!(dequeue_ok(&queue), Some("hello".to_string()));
    }
    assert_every_line_complete(&log_path);

    let queue = QueueStore::new();
    let result = queue.recover_from_log(&log_path).unwrap();
    assert!(queue.is_empty());
    assert_eq!(result.dequeued, 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_enqueue() {
    let queue = Arc::new(QueueStore::new());

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || enqueue_ok(&queue, &i.to_string()))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(queue.size(), 100);
    let stored: HashSet<String> = queue.messages().into_iter().collect();
    let submitted: HashSet<String> = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(stored, submitted);
}

#[test]
fn test_concurrent_dequeue_delivers_each_message_once() {
    let queue = Arc::new(QueueStore::new());
    for i in 0..100 {
        enqueue_ok(&queue, &i.to_string());
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(m) = dequeue_ok(&queue) {
                    taken.push(m);
                }
                taken
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    assert_eq!(queue.size(), 0);
    assert_eq!(all.len(), 100);
    let unique: HashSet<String> = all.into_iter().collect();
    assert_eq!(unique.len(), 100);
}

#[test]
fn test_concurrent_logged_operations_replay_to_same_state() {
    let (_temp, log_path) = setup_temp_log();
    let queue = Arc::new(QueueStore::new());
    queue.enable_logging(&log_path).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..20 {
                    enqueue_ok(&queue, &format!("t{}-{}", t, i));
                    if i % 3 == 0 {
                        dequeue_ok(&queue);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let live = queue.messages();
    queue.close().unwrap();

    let recovered = QueueStore::new();
    recovered.recover_from_log(&log_path).unwrap();
    assert_eq!(recovered.messages(), live);
}
