use std::time::{Duration, Instant};

use bytes::BytesMut;

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Bytes handed to the session.
    pub bytes_received: u64,
    /// Bytes dropped while searching for a sync marker.
    pub bytes_skipped: u64,
    /// Frames decoded into outputs.
    pub frames_parsed: u64,
    /// Discard events raised.
    pub discards: u64,
    /// Bytes dropped by discard events.
    pub bytes_discarded: u64,
    /// Frames whose type identifier was not registered.
    pub unknown_types: u64,
}

/// Mutable parse state for one source.
///
/// Only the [`FrameReassembler`](crate::FrameReassembler) mutates a session
/// while parsing; callers hold it behind whatever lock serializes feeds for
/// that source.
#[derive(Debug)]
pub struct ParseSession {
    pub(crate) aligned: bool,
    pub(crate) leftover: BytesMut,
    pub(crate) retry_attempts: u32,
    pub(crate) last_activity: Instant,
    pub(crate) stats: SessionStats,
}

impl ParseSession {
    /// Fresh session waiting for its first sync marker.
    pub fn new() -> Self {
        Self {
            aligned: false,
            leftover: BytesMut::new(),
            retry_attempts: 0,
            last_activity: Instant::now(),
            stats: SessionStats::default(),
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Bytes carried forward to the next feed.
    pub fn leftover(&self) -> &[u8] {
        &self.leftover
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Time since the session last received bytes.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    /// Drop carried-forward bytes, returning how many were dropped.
    ///
    /// Alignment is kept, so the next feed is parsed as starting on a frame
    /// boundary.
    pub fn purge_leftover(&mut self) -> usize {
        let purged = self.leftover.len();
        self.leftover.clear();
        self.retry_attempts = 0;
        purged
    }

    /// Return to the start-of-stream state, keeping nothing but the clock.
    pub fn reset(&mut self) {
        self.aligned = false;
        self.leftover.clear();
        self.retry_attempts = 0;
        self.stats = SessionStats::default();
        self.last_activity = Instant::now();
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl Default for ParseSession {
    fn default() -> Self {
        Self::new()
    }
}
