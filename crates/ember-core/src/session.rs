use core::sync::atomic::{AtomicU64, Ordering};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use rand::Rng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "sid";
pub const SESSION_ID_LEN: usize = 32;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A random alphabetic session token. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..SESSION_ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.get(..4).unwrap_or("");
        write!(f, "SessionId({}…)", shown)
    }
}

/// Per-client state: the persistent parameter scope plus its expiry.
///
/// Attributes are guarded internally, so concurrent requests of the same
/// client can read and write them without any caller-side locking.
pub struct SessionRecord {
    id: SessionId,
    owner_host: String,
    /// Milliseconds since the owning registry's origin.
    expires_at: AtomicU64,
    attributes: RwLock<HashMap<String, String>>,
}

impl SessionRecord {
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn owner_host(&self) -> &str {
        &self.owner_host
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.load(Ordering::Acquire) <= now_ms
    }

    fn extend_to(&self, deadline_ms: u64) {
        self.expires_at.fetch_max(deadline_ms, Ordering::AcqRel);
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("owner_host", &self.owner_host)
            .field("expires_at", &self.expires_at.load(Ordering::Relaxed))
            .field("attributes", &self.attribute_count())
            .finish()
    }
}

/// Outcome of [`SessionRegistry::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub record: Arc<SessionRecord>,
    /// True when a fresh record was issued and a cookie must be sent.
    pub created: bool,
}

/// Concurrency-safe map from session id to [`SessionRecord`].
///
/// Only whole operations are exposed (`resolve`, `create`, `lookup`,
/// `sweep_expired`); the map itself never leaves the registry.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionRecord>>>,
    timeout: Duration,
    origin: Instant,
}

impl SessionRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
            origin: Instant::now(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resolve(&self, presented: Option<&str>, host: &str) -> Resolved {
        self.resolve_at(presented, host, Instant::now())
    }

    /// Maps a presented cookie value to a live record, refreshing its
    /// expiry, or issues a new record when the id is absent, unknown,
    /// expired, or owned by another host.
    pub fn resolve_at(&self, presented: Option<&str>, host: &str, now: Instant) -> Resolved {
        let now_ms = self.millis(now);

        if let Some(id) = presented {
            let found = self
                .sessions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id)
                .cloned();

            match found {
                Some(record) if record.owner_host != host => {
                    tracing::debug!(
                        "session {:?} presented by {} but owned by {}",
                        record.id,
                        host,
                        record.owner_host
                    );
                }
                Some(record) if record.is_expired_at(now_ms) => {
                    let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
                    if sessions.get(id).is_some_and(|current| Arc::ptr_eq(current, &record)) {
                        sessions.remove(id);
                    }
                }
                Some(record) => {
                    record.extend_to(now_ms.saturating_add(self.timeout_ms()));
                    return Resolved {
                        record,
                        created: false,
                    };
                }
                None => {}
            }
        }

        Resolved {
            record: self.create_at(host, now_ms),
            created: true,
        }
    }

    pub fn create(&self, host: &str) -> Arc<SessionRecord> {
        self.create_at(host, self.millis(Instant::now()))
    }

    /// Returns the record for `id` without refreshing it.
    pub fn lookup(&self, id: &str) -> Option<Arc<SessionRecord>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// Removes every record whose expiry is at or before `now`.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let now_ms = self.millis(now);
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired_at(now_ms));
        before - sessions.len()
    }

    /// Runs [`sweep_expired`](Self::sweep_expired) every `every`, independent
    /// of request traffic. Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, live = registry.len(), "swept expired sessions");
                }
            }
        })
    }

    fn create_at(&self, host: &str, now_ms: u64) -> Arc<SessionRecord> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let id = loop {
            let candidate = SessionId::generate();
            if !sessions.contains_key(candidate.as_str()) {
                break candidate;
            }
        };
        let record = Arc::new(SessionRecord {
            id: id.clone(),
            owner_host: host.to_string(),
            expires_at: AtomicU64::new(now_ms.saturating_add(self.timeout_ms())),
            attributes: RwLock::new(HashMap::new()),
        });
        sessions.insert(id, Arc::clone(&record));
        tracing::debug!("created session {:?} for {}", record.id, host);
        record
    }

    fn millis(&self, at: Instant) -> u64 {
        saturating_millis(at.saturating_duration_since(self.origin))
    }

    fn timeout_ms(&self) -> u64 {
        saturating_millis(self.timeout)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
