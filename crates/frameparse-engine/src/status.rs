use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::config::ProcessingMode;

/// Engine-wide counters, updated lock-free from any thread.
#[derive(Debug, Default)]
pub(crate) struct EngineStats {
    pub(crate) buffers_received: AtomicU64,
    pub(crate) bytes_received: AtomicU64,
    pub(crate) buffers_processed: AtomicU64,
    pub(crate) frames_parsed: AtomicU64,
    pub(crate) discards: AtomicU64,
    pub(crate) bytes_discarded: AtomicU64,
    pub(crate) unknown_types: AtomicU64,
    pub(crate) processing_errors: AtomicU64,
    pub(crate) duplicate_types: AtomicU64,
}

impl EngineStats {
    pub(crate) fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.buffers_received,
            &self.bytes_received,
            &self.buffers_processed,
            &self.frames_parsed,
            &self.discards,
            &self.bytes_discarded,
            &self.unknown_types,
            &self.processing_errors,
            &self.duplicate_types,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time engine status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub name: String,
    pub running: bool,
    pub mode: ProcessingMode,
    /// Sync marker as lowercase hex.
    pub sync_marker: Option<String>,
    pub max_retry_attempts: u32,
    /// Seconds since the last start, frozen at stop.
    pub run_time_secs: f64,
    pub buffers_received: u64,
    pub bytes_received: u64,
    pub buffers_processed: u64,
    pub frames_parsed: u64,
    pub discards: u64,
    pub bytes_discarded: u64,
    pub unknown_types: u64,
    pub processing_errors: u64,
    pub duplicate_types: u64,
    pub queued_buffers: usize,
    pub active_sessions: usize,
    pub output_types: usize,
}

impl EngineStatus {
    pub(crate) fn fill_counters(&mut self, stats: &EngineStats) {
        self.buffers_received = EngineStats::get(&stats.buffers_received);
        self.bytes_received = EngineStats::get(&stats.bytes_received);
        self.buffers_processed = EngineStats::get(&stats.buffers_processed);
        self.frames_parsed = EngineStats::get(&stats.frames_parsed);
        self.discards = EngineStats::get(&stats.discards);
        self.bytes_discarded = EngineStats::get(&stats.bytes_discarded);
        self.unknown_types = EngineStats::get(&stats.unknown_types);
        self.processing_errors = EngineStats::get(&stats.processing_errors);
        self.duplicate_types = EngineStats::get(&stats.duplicate_types);
    }

    /// Run time as a [`Duration`].
    pub fn run_time(&self) -> Duration {
        Duration::from_secs_f64(self.run_time_secs.max(0.0))
    }
}

impl EngineStatus {
    /// Labelled fields in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Engine name", self.name.clone()),
            ("Running", self.running.to_string()),
            ("Processing mode", self.mode.to_string()),
            (
                "Sync marker",
                self.sync_marker
                    .as_deref()
                    .map(|m| format!("0x{m}"))
                    .unwrap_or_else(|| "none".to_string()),
            ),
            ("Max retry attempts", self.max_retry_attempts.to_string()),
            ("Run time", format!("{:.3}s", self.run_time_secs)),
            ("Buffers received", self.buffers_received.to_string()),
            ("Bytes received", self.bytes_received.to_string()),
            ("Buffers processed", self.buffers_processed.to_string()),
            ("Frames parsed", self.frames_parsed.to_string()),
            ("Discards", self.discards.to_string()),
            ("Bytes discarded", self.bytes_discarded.to_string()),
            ("Unknown types", self.unknown_types.to_string()),
            ("Processing errors", self.processing_errors.to_string()),
            ("Duplicate types", self.duplicate_types.to_string()),
            ("Queued buffers", self.queued_buffers.to_string()),
            ("Active sessions", self.active_sessions.to_string()),
            ("Output types", self.output_types.to_string()),
        ]
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.rows() {
            writeln!(f, "{label:>20}: {value}")?;
        }
        Ok(())
    }
}
