//! Concurrent registration tests
//!
//! Registration races on the same identifier must produce exactly one
//! account; the losers get `DuplicateIdentifier` and nothing is overwritten.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use webdisk_core::adapters::duckdb::DuckDbRepository;
use webdisk_core::adapters::memory::MemoryAccountStore;
use webdisk_core::ports::AccountStore;
use webdisk_core::services::CredentialStore;
use webdisk_core::{Error, HashParams};

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 8;

fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("test_concurrent.duckdb")).unwrap();
    repo.ensure_schema().unwrap();
    Arc::new(repo)
}

/// Race THREAD_COUNT registrations of one identifier, each with its own
/// password. Returns (successes, duplicates, winning thread index).
fn race_same_identifier(store: Arc<CredentialStore>) -> (usize, usize, Option<usize>) {
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let duplicate_count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let barrier = Arc::clone(&barrier);
            let store = Arc::clone(&store);
            let success_count = Arc::clone(&success_count);
            let duplicate_count = Arc::clone(&duplicate_count);

            thread::spawn(move || {
                barrier.wait();
                match store.register("alice", format!("password-{}", thread_id).into()) {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                        Some(thread_id)
                    }
                    Err(Error::DuplicateIdentifier(_)) => {
                        duplicate_count.fetch_add(1, Ordering::SeqCst);
                        None
                    }
                    Err(e) => panic!("Thread {}: unexpected error: {}", thread_id, e),
                }
            })
        })
        .collect();

    let mut winner = None;
    for handle in handles {
        if let Some(id) = handle.join().unwrap() {
            winner = Some(id);
        }
    }

    (
        success_count.load(Ordering::SeqCst),
        duplicate_count.load(Ordering::SeqCst),
        winner,
    )
}

#[test]
fn test_concurrent_register_same_identifier_duckdb() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let store = Arc::new(CredentialStore::new(repo.clone(), HashParams::fast()).unwrap());

    let (successes, duplicates, winner) = race_same_identifier(Arc::clone(&store));

    assert_eq!(successes, 1, "exactly one registration must win");
    assert_eq!(duplicates, THREAD_COUNT - 1);
    assert_eq!(repo.count_accounts().unwrap(), 1);

    // The stored credential belongs to the winner, not a later loser
    let winner = winner.unwrap();
    assert!(store
        .verify("alice", format!("password-{}", winner).into())
        .unwrap());
    for other in (0..THREAD_COUNT).filter(|t| *t != winner) {
        assert!(!store
            .verify("alice", format!("password-{}", other).into())
            .unwrap());
    }
}

#[test]
fn test_concurrent_register_same_identifier_memory() {
    let accounts = Arc::new(MemoryAccountStore::new());
    let store = Arc::new(CredentialStore::new(accounts.clone(), HashParams::fast()).unwrap());

    let (successes, duplicates, _) = race_same_identifier(store);

    assert_eq!(successes, 1);
    assert_eq!(duplicates, THREAD_COUNT - 1);
    assert_eq!(accounts.count_accounts().unwrap(), 1);
}

#[test]
fn test_concurrent_register_distinct_identifiers() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let store = Arc::new(CredentialStore::new(repo.clone(), HashParams::fast()).unwrap());
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let id = format!("user{}", thread_id);
                store
                    .register(&id, format!("pw-{}", thread_id).into())
                    .unwrap();
                assert!(store.verify(&id, format!("pw-{}", thread_id).into()).unwrap());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(repo.count_accounts().unwrap(), THREAD_COUNT as u64);
}

#[test]
fn test_concurrent_verify_while_registering() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let store = Arc::new(CredentialStore::new(repo.clone(), HashParams::fast()).unwrap());
    store.register("alice", "S3cret!".into()).unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let failures = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let failures = Arc::clone(&failures);
            thread::spawn(move || {
                barrier.wait();
                if thread_id % 2 == 0 {
                    let ok = store.verify("alice", "S3cret!".into()).unwrap_or(false);
                    if !ok {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                } else if store
                    .register(&format!("new{}", thread_id), "pw".into())
                    .is_err()
                {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert_eq!(repo.count_accounts().unwrap(), 1 + THREAD_COUNT as u64 / 2);
}
