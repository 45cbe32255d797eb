use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use frameparse_frame::{Emission, FrameParser, FrameReassembler, ParseSession};
use frameparse_image::BinaryImage;
use tracing::{debug, info, trace, warn};

use crate::config::{EngineConfig, ProcessingMode};
use crate::error::{EngineError, Result};
use crate::event::{EventSink, ParseEvent};
use crate::panic::format_panic;
use crate::queue::IngestQueue;
use crate::status::{EngineStats, EngineStatus};
use crate::tracker::{lock_session, SessionTracker, SourceKey};

/// Event type emitted by an engine running parser `F` over sources `S`.
pub type EngineEvent<F, S> =
    ParseEvent<S, <F as FrameParser>::Output, <F as FrameParser>::TypeId>;

struct Shared<F: FrameParser, S> {
    parser: RwLock<F>,
    reassembler: FrameReassembler,
    sessions: SessionTracker<S>,
    queue: IngestQueue<S>,
    sink: Box<dyn EventSink<EngineEvent<F, S>>>,
    stats: EngineStats,
    running: AtomicBool,
}

/// Turns byte streams from one or many sources into parser outputs.
///
/// ```ignore
/// let (sink, events) = ChannelSink::unbounded();
/// let mut engine = Engine::new(parser, EngineConfig::default(), sink);
/// engine.start()?;
/// engine.write(&bytes)?;
/// engine.flush();
/// for event in events.try_iter() { /* ... */ }
/// ```
pub struct Engine<F, S = ()>
where
    F: FrameParser + 'static,
    S: SourceKey,
{
    config: EngineConfig,
    shared: Arc<Shared<F, S>>,
    worker: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
    run_time: Duration,
}

impl<F, S> Engine<F, S>
where
    F: FrameParser + 'static,
    S: SourceKey,
{
    /// Create a stopped engine.
    pub fn new(parser: F, config: EngineConfig, sink: impl EventSink<EngineEvent<F, S>>) -> Self {
        let reassembler = FrameReassembler::new(config.reassembler_config());
        Self {
            shared: Arc::new(Shared {
                parser: RwLock::new(parser),
                reassembler,
                sessions: SessionTracker::new(),
                queue: IngestQueue::new(),
                sink: Box::new(sink),
                stats: EngineStats::default(),
                running: AtomicBool::new(false),
            }),
            config,
            worker: None,
            started_at: None,
            run_time: Duration::ZERO,
        }
    }

    /// Build output type registrations, reset all sessions and counters, and
    /// start the worker in queued mode. A running engine is left untouched.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            debug!(name = %self.config.name, "engine already running");
            return Ok(());
        }

        let duplicates = self.shared.write_parser().start()?;
        self.shared.sessions.clear();
        self.shared.stats.reset();
        for duplicate in duplicates {
            EngineStats::add(&self.shared.stats.duplicate_types, 1);
            self.shared.sink.emit(ParseEvent::DuplicateType {
                type_id: duplicate.type_id,
                registered: duplicate.registered,
                duplicate: duplicate.duplicate,
            });
        }

        self.shared.queue.open();
        self.shared.running.store(true, Ordering::Release);

        if self.config.mode == ProcessingMode::Queued {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker", self.config.name))
                .spawn(move || shared.run_worker());
            match spawned {
                Ok(handle) => self.worker = Some(handle),
                Err(err) => {
                    self.shared.running.store(false, Ordering::Release);
                    self.shared.queue.close();
                    self.shared.write_parser().stop();
                    return Err(EngineError::Spawn(err));
                }
            }
        }

        self.started_at = Some(Instant::now());
        self.run_time = Duration::ZERO;
        info!(
            name = %self.config.name,
            mode = %self.config.mode,
            output_types = self.shared.read_parser().output_type_count(),
            "engine started"
        );
        Ok(())
    }

    /// Stop intake, wait for the batch in flight, drop still-queued buffers
    /// and release output type registrations.
    pub fn stop(&mut self) {
        if !self.is_running() && self.worker.is_none() {
            return;
        }

        self.shared.running.store(false, Ordering::Release);
        let (chunks, bytes) = self.shared.queue.close();
        if chunks > 0 {
            warn!(
                name = %self.config.name,
                buffers = chunks,
                bytes,
                "dropping queued buffers on stop"
            );
        }
        self.join_worker();
        self.shared.write_parser().stop();

        if let Some(started) = self.started_at.take() {
            self.run_time = started.elapsed();
        }
        info!(name = %self.config.name, run_time = ?self.run_time, "engine stopped");
    }

    /// Block until every queued buffer has been parsed, then stop.
    ///
    /// Inline engines have nothing queued and keep running.
    pub fn flush(&mut self) {
        if self.worker.is_none() {
            return;
        }
        debug!(
            name = %self.config.name,
            queued = self.shared.queue.len(),
            "flushing queued buffers"
        );
        self.shared.queue.wait_idle();
        self.stop();
    }

    /// Ingest bytes from `source`.
    ///
    /// `data` is copied before this returns. In inline mode it is also fully
    /// parsed and its events emitted.
    pub fn write_from(&self, source: S, data: &[u8]) -> Result<()> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        if data.is_empty() {
            return Ok(());
        }

        EngineStats::add(&self.shared.stats.buffers_received, 1);
        EngineStats::add(&self.shared.stats.bytes_received, data.len() as u64);

        match self.config.mode {
            ProcessingMode::Inline => {
                self.shared.process_guarded(&source, &[data]);
                Ok(())
            }
            ProcessingMode::Queued => {
                trace!(?source, bytes = data.len(), "queueing buffer");
                if self.shared.queue.push(source, Bytes::copy_from_slice(data)) {
                    Ok(())
                } else {
                    Err(EngineError::NotRunning)
                }
            }
        }
    }

    /// Ingest the binary image of `image` from `source`.
    pub fn write_image(&self, source: S, image: &impl BinaryImage) -> Result<()> {
        let bytes = image.to_bytes()?;
        self.write_from(source, &bytes)
    }

    /// Drop bytes carried forward for `source`; `None` if it has no session.
    pub fn purge_leftover(&self, source: &S) -> Option<usize> {
        self.shared.sessions.purge_leftover(source)
    }

    /// Forget all state for `source`.
    pub fn evict_session(&self, source: &S) -> bool {
        self.shared.sessions.evict(source)
    }

    /// Forget every source that has been silent for at least `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted = self.shared.sessions.evict_idle(max_idle);
        if evicted > 0 {
            debug!(name = %self.config.name, evicted, "evicted idle sessions");
        }
        evicted
    }

    /// Inspect the session for `source`, if one exists.
    pub fn with_session<R>(&self, source: &S, f: impl FnOnce(&ParseSession) -> R) -> Option<R> {
        self.shared.sessions.with_session(source, f)
    }

    /// Sources with a live session.
    pub fn sources(&self) -> Vec<S> {
        self.shared.sessions.sources()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> EngineStatus {
        let run_time = match self.started_at {
            Some(started) => started.elapsed(),
            None => self.run_time,
        };
        let mut status = EngineStatus {
            name: self.config.name.clone(),
            running: self.is_running(),
            mode: self.config.mode,
            sync_marker: self.config.sync_marker_hex(),
            max_retry_attempts: self.config.max_retry_attempts,
            run_time_secs: run_time.as_secs_f64(),
            buffers_received: 0,
            bytes_received: 0,
            buffers_processed: 0,
            frames_parsed: 0,
            discards: 0,
            bytes_discarded: 0,
            unknown_types: 0,
            processing_errors: 0,
            duplicate_types: 0,
            queued_buffers: self.shared.queue.len(),
            active_sessions: self.shared.sessions.len(),
            output_types: self.shared.read_parser().output_type_count(),
        };
        status.fill_counters(&self.shared.stats);
        status
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(name = %self.config.name, "worker thread panicked");
            }
        }
    }
}

impl<F> Engine<F, ()>
where
    F: FrameParser + 'static,
{
    /// Ingest bytes on a single-source engine.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.write_from((), data)
    }
}

impl<F, S> Drop for Engine<F, S>
where
    F: FrameParser + 'static,
    S: SourceKey,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<F, S> Shared<F, S>
where
    F: FrameParser + 'static,
    S: SourceKey,
{
    fn read_parser(&self) -> RwLockReadGuard<'_, F> {
        self.parser.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_parser(&self) -> RwLockWriteGuard<'_, F> {
        self.parser.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_worker(&self) {
        debug!("worker started");
        while let Some(batch) = self.queue.next_batch() {
            for (source, chunks) in group_by_source(batch) {
                self.process_guarded(&source, &chunks);
            }
            self.queue.finish_batch();
        }
        debug!("worker stopped");
    }

    /// Parse one source's chunks; a panicking sink is logged, never propagated.
    fn process_guarded<B: AsRef<[u8]>>(&self, source: &S, chunks: &[B]) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.process(source, chunks))) {
            EngineStats::add(&self.stats.processing_errors, 1);
            warn!(?source, panic = %format_panic(payload), "event sink panicked");
        }
    }

    /// Feed each chunk separately under one session lock, so a discard in
    /// one chunk never reaches into the chunks queued after it.
    fn process<B: AsRef<[u8]>>(&self, source: &S, chunks: &[B]) {
        let session = self.sessions.session_for(source);
        let mut session = lock_session(&session);

        for chunk in chunks {
            EngineStats::add(&self.stats.buffers_processed, 1);
            let parser = self.read_parser();
            let fed = catch_unwind(AssertUnwindSafe(|| {
                self.reassembler.feed(&*parser, &mut session, chunk.as_ref())
            }));
            drop(parser);

            match fed {
                Ok(emissions) => {
                    for emission in emissions {
                        self.emit(source, emission);
                    }
                }
                Err(payload) => {
                    let message = format_panic(payload).to_string();
                    warn!(?source, panic = %message, "parser panicked; resetting session");
                    session.reset();
                    EngineStats::add(&self.stats.processing_errors, 1);
                    self.sink.emit(ParseEvent::ProcessingError {
                        source: source.clone(),
                        error: EngineError::Panicked(message),
                    });
                }
            }
        }
    }

    fn emit(&self, source: &S, emission: Emission<F::Output, F::TypeId>) {
        let event = match emission {
            Emission::Parsed(output) => {
                EngineStats::add(&self.stats.frames_parsed, 1);
                ParseEvent::Parsed {
                    source: source.clone(),
                    output,
                }
            }
            Emission::Discarded { bytes, reason } => {
                EngineStats::add(&self.stats.discards, 1);
                EngineStats::add(&self.stats.bytes_discarded, bytes.len() as u64);
                ParseEvent::Discarded {
                    source: source.clone(),
                    bytes,
                    reason,
                }
            }
            Emission::UnknownType(type_id) => {
                EngineStats::add(&self.stats.unknown_types, 1);
                ParseEvent::UnknownType {
                    source: source.clone(),
                    type_id,
                }
            }
        };
        self.sink.emit(event);
    }
}

/// Group a batch by source in first-appearance order, keeping each source's
/// chunks in the order they were queued.
fn group_by_source<S: SourceKey>(batch: Vec<(S, Bytes)>) -> Vec<(S, Vec<Bytes>)> {
    let mut index: HashMap<S, usize> = HashMap::new();
    let mut grouped: Vec<(S, Vec<Bytes>)> = Vec::new();
    for (source, chunk) in batch {
        match index.get(&source) {
            Some(&slot) => grouped[slot].1.push(chunk),
            None => {
                index.insert(source.clone(), grouped.len());
                grouped.push((source, vec![chunk]));
            }
        }
    }
    grouped
}
