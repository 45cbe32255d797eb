use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use frameparse_frame::ParseSession;
use tracing::debug;

/// Key identifying a logical data source.
///
/// Implemented for every type meeting the bounds; `()` serves single-source
/// engines.
pub trait SourceKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> SourceKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

pub(crate) type SharedSession = Arc<Mutex<ParseSession>>;

/// Lock a session, recovering it if a previous holder panicked.
pub(crate) fn lock_session(session: &Mutex<ParseSession>) -> MutexGuard<'_, ParseSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-source parse sessions, created lazily on first use.
///
/// Sessions of different sources live behind separate locks, so feeds for
/// different sources never contend; feeds for one source serialize on its
/// session lock.
pub struct SessionTracker<S> {
    sessions: DashMap<S, SharedSession>,
}

impl<S: SourceKey> SessionTracker<S> {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Session for `source`, created on first use.
    pub(crate) fn session_for(&self, source: &S) -> SharedSession {
        if let Some(session) = self.sessions.get(source) {
            return Arc::clone(session.value());
        }
        let entry = self.sessions.entry(source.clone()).or_insert_with(|| {
            debug!(?source, "new parse session");
            SharedSession::default()
        });
        Arc::clone(entry.value())
    }

    /// Inspect the session for `source`, if one exists.
    pub fn with_session<R>(&self, source: &S, f: impl FnOnce(&ParseSession) -> R) -> Option<R> {
        let session = self.sessions.get(source).map(|s| Arc::clone(s.value()))?;
        let guard = lock_session(&session);
        Some(f(&guard))
    }

    /// Drop carried-forward bytes for `source`; returns how many were dropped.
    pub fn purge_leftover(&self, source: &S) -> Option<usize> {
        let session = self.sessions.get(source).map(|s| Arc::clone(s.value()))?;
        let purged = lock_session(&session).purge_leftover();
        debug!(?source, purged, "purged leftover bytes");
        Some(purged)
    }

    /// Forget `source` entirely; its next buffer starts a fresh session.
    pub fn evict(&self, source: &S) -> bool {
        let removed = self.sessions.remove(source).is_some();
        if removed {
            debug!(?source, "evicted parse session");
        }
        removed
    }

    /// Evict every session idle for at least `max_idle`.
    ///
    /// Sessions currently being fed are never idle and are kept.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.sessions.retain(|source, session| {
            let idle = match session.try_lock() {
                Ok(guard) => guard.idle_for(now),
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().idle_for(now),
                Err(TryLockError::WouldBlock) => Duration::ZERO,
            };
            let keep = idle < max_idle;
            if !keep {
                debug!(?source, ?idle, "evicting idle parse session");
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Drop every session.
    pub fn clear(&self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sources with a live session, in no particular order.
    pub fn sources(&self) -> Vec<S> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl<S: SourceKey> Default for SessionTracker<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_created_lazily_and_shared() {
        let tracker: SessionTracker<&'static str> = SessionTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.with_session(&"a", |s| s.is_aligned()).is_none());

        let first = tracker.session_for(&"a");
        let second = tracker.session_for(&"a");
        assert!(Arc::ptr_eq(&first, &second));

        tracker.session_for(&"b");
        assert_eq!(tracker.len(), 2);
        let mut sources = tracker.sources();
        sources.sort_unstable();
        assert_eq!(sources, vec!["a", "b"]);
    }

    #[test]
    fn evict_removes_one_source() {
        let tracker: SessionTracker<u32> = SessionTracker::new();
        tracker.session_for(&1);
        tracker.session_for(&2);

        assert!(tracker.evict(&1));
        assert!(!tracker.evict(&1));
        assert_eq!(tracker.sources(), vec![2]);
    }

    #[test]
    fn evict_idle_skips_recent_and_locked_sessions() {
        let tracker: SessionTracker<u32> = SessionTracker::new();
        tracker.session_for(&1);
        let busy = tracker.session_for(&2);

        std::thread::sleep(Duration::from_millis(60));
        tracker.session_for(&3);

        let _guard = busy.lock().unwrap();
        assert_eq!(tracker.evict_idle(Duration::from_millis(30)), 1);

        let mut sources = tracker.sources();
        sources.sort_unstable();
        assert_eq!(sources, vec![2, 3]);
    }

    #[test]
    fn purge_leftover_of_unknown_source_is_none() {
        let tracker: SessionTracker<u32> = SessionTracker::new();
        assert_eq!(tracker.purge_leftover(&9), None);
        tracker.session_for(&9);
        assert_eq!(tracker.purge_leftover(&9), Some(0));
    }
}
