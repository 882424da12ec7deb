//! # Session Registry Tests
//!
//! Validates id generation, resolve/refresh semantics, host binding and
//! expiry sweeping, using explicit clocks where timing matters.

use ember_core::{SessionRegistry, SESSION_ID_LEN};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_ids_are_alphabetic_and_unique() {
    let t = Instant::now();

    let sessions = SessionRegistry::new(Duration::from_secs(60));
    let mut seen = HashSet::new();
    for _ in 0..500 {
        let record = sessions.create("localhost");
        assert_eq!(record.id().len(), SESSION_ID_LEN);
        assert!(record.id().bytes().all(|b| b.is_ascii_alphabetic()));
        assert!(seen.insert(record.id().to_string()), "duplicate id issued");
    }
    assert_eq!(sessions.len(), 500);

    let overhead = t.elapsed();
    println!("test_ids_are_alphabetic_and_unique: Testing Overhead = {:?}", overhead);
}

#[test]
fn test_resolve_reuses_live_session() {
    let sessions = SessionRegistry::new(Duration::from_secs(60));

    let first = sessions.resolve(None, "example.com");
    assert!(first.created);
    first.record.set_attribute("n", "1");

    let again = sessions.resolve(Some(first.record.id()), "example.com");
    assert!(!again.created);
    assert!(Arc::ptr_eq(&first.record, &again.record));
    assert_eq!(again.record.attribute("n").as_deref(), Some("1"));
    assert_eq!(sessions.len(), 1);
}

#[test]
fn test_unknown_id_issues_new_session() {
    let sessions = SessionRegistry::new(Duration::from_secs(60));
    let resolved = sessions.resolve(Some("NotARealSessionIdentifier"), "example.com");
    assert!(resolved.created);
    assert_ne!(resolved.record.id(), "NotARealSessionIdentifier");
    assert_eq!(resolved.record.owner_host(), "example.com");
}

/// A session presented from another host is not shared.
#[test]
fn test_host_mismatch_issues_new_session() {
    let sessions = SessionRegistry::new(Duration::from_secs(60));
    let original = sessions.resolve(None, "a.example").record;
    original.set_attribute("secret", "x");

    let other = sessions.resolve(Some(original.id()), "b.example");
    assert!(other.created);
    assert_ne!(other.record.id(), original.id());
    assert_eq!(other.record.attribute("secret"), None);

    // The original is untouched and still reachable from its own host.
    let back = sessions.resolve(Some(original.id()), "a.example");
    assert!(!back.created);
    assert_eq!(sessions.len(), 2);
}

/// Access refreshes the expiry; an unrefreshed session expires.
#[test]
fn test_refresh_and_expiry() {
    let t = Instant::now();

    let timeout = Duration::from_secs(10);
    let sessions = SessionRegistry::new(timeout);
    let start = Instant::now();

    let record = sessions.resolve_at(None, "h", start).record;
    let id = record.id().to_string();

    // Touch at +8s pushes expiry to +18s.
    let touched = sessions.resolve_at(Some(id.as_str()), "h", start + Duration::from_secs(8));
    assert!(!touched.created);
    assert_eq!(sessions.sweep_expired_at(start + Duration::from_secs(15)), 0);

    // Expiry is inclusive.
    let expired = sessions.resolve_at(Some(id.as_str()), "h", start + Duration::from_secs(18));
    assert!(expired.created);
    assert_ne!(expired.record.id(), id);
    assert!(sessions.lookup(&id).is_none(), "expired record must be dropped");

    let overhead = t.elapsed();
    println!("test_refresh_and_expiry: Testing Overhead = {:?}", overhead);
}

/// Huge timeouts saturate instead of wrapping into the past.
#[test]
fn test_huge_timeout_never_expires() {
    let sessions = SessionRegistry::new(Duration::from_secs(u64::MAX));
    let start = Instant::now();
    let record = sessions.resolve_at(None, "h", start).record;
    let id = record.id().to_string();

    let later = start + Duration::from_secs(3600);
    let again = sessions.resolve_at(Some(id.as_str()), "h", later);
    assert!(!again.created);
    assert_eq!(sessions.sweep_expired_at(later), 0);
    assert_eq!(sessions.len(), 1);
}

#[test]
fn test_sweep_removes_only_expired() {
    let sessions = SessionRegistry::new(Duration::from_secs(10));
    let start = Instant::now();

    let old = sessions.resolve_at(None, "h", start).record;
    let fresh = sessions.resolve_at(None, "h", start + Duration::from_secs(5)).record;

    assert_eq!(sessions.sweep_expired_at(start + Duration::from_secs(9)), 0);
    assert_eq!(sessions.sweep_expired_at(start + Duration::from_secs(12)), 1);
    assert!(sessions.lookup(old.id()).is_none());
    assert!(sessions.lookup(fresh.id()).is_some());
    assert_eq!(sessions.sweep_expired_at(start + Duration::from_secs(60)), 1);
    assert!(sessions.is_empty());
}

/// Records stay usable by in-flight requests after being swept.
#[test]
fn test_swept_record_outlives_registry_entry() {
    let sessions = SessionRegistry::new(Duration::from_secs(1));
    let start = Instant::now();
    let record = sessions.resolve_at(None, "h", start).record;
    sessions.sweep_expired_at(start + Duration::from_secs(5));
    record.set_attribute("still", "here");
    assert_eq!(record.attribute("still").as_deref(), Some("here"));
}

#[test]
fn test_debug_does_not_leak_full_id() {
    let sessions = SessionRegistry::new(Duration::from_secs(60));
    let record = sessions.create("h");
    let shown = format!("{:?}", record);
    assert!(!shown.contains(record.id()));
}

#[tokio::test]
async fn test_background_sweeper() {
    let t = Instant::now();

    let sessions = Arc::new(SessionRegistry::new(Duration::from_millis(50)));
    sessions.create("h");
    sessions.create("h");
    assert_eq!(sessions.len(), 2);

    let sweeper = sessions.spawn_sweeper(Duration::from_millis(20));
    let mut waited = Duration::ZERO;
    while !sessions.is_empty() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    sweeper.abort();
    assert!(sessions.is_empty(), "sweeper should have removed expired sessions");

    let overhead = t.elapsed();
    println!("test_background_sweeper: Testing Overhead = {:?}", overhead);
}

#[test]
fn test_concurrent_resolution() {
    let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
    let shared = sessions.create("h");
    let id = shared.id().to_string();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let sessions = Arc::clone(&sessions);
            let id = id.clone();
            std::thread::spawn(move || {
                for j in 0..100 {
                    let r = sessions.resolve(Some(id.as_str()), "h");
                    assert!(!r.created);
                    r.record.set_attribute(format!("k{}", i), j.to_string());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.attribute_count(), 8);
    assert_eq!(shared.attribute("k3").as_deref(), Some("99"));
}
