use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

struct QueueState<S> {
    chunks: VecDeque<(S, Bytes)>,
    open: bool,
    in_flight: bool,
}

/// Multi-producer FIFO of copied byte chunks drained by one worker.
///
/// The worker takes everything queued at wake-up as one batch. `close`
/// stops intake, drops what is still queued and releases the worker once
/// its current batch completes.
pub(crate) struct IngestQueue<S> {
    state: Mutex<QueueState<S>>,
    ready: Condvar,
    idle: Condvar,
}

impl<S> IngestQueue<S> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                chunks: VecDeque::new(),
                open: false,
                in_flight: false,
            }),
            ready: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept chunks from now on.
    pub(crate) fn open(&self) {
        self.lock().open = true;
    }

    /// Append a chunk; returns `false` if the queue is closed.
    pub(crate) fn push(&self, source: S, chunk: Bytes) -> bool {
        let mut state = self.lock();
        if !state.open {
            return false;
        }
        state.chunks.push_back((source, chunk));
        drop(state);
        self.ready.notify_one();
        true
    }

    /// Block until chunks are available and take all of them.
    ///
    /// Returns `None` once the queue is closed.
    pub(crate) fn next_batch(&self) -> Option<Vec<(S, Bytes)>> {
        let mut state = self.lock();
        loop {
            if !state.open {
                return None;
            }
            if !state.chunks.is_empty() {
                state.in_flight = true;
                return Some(state.chunks.drain(..).collect());
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Mark the batch returned by [`next_batch`](Self::next_batch) as done.
    pub(crate) fn finish_batch(&self) {
        let mut state = self.lock();
        state.in_flight = false;
        if state.chunks.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Block until nothing is queued and no batch is in flight.
    pub(crate) fn wait_idle(&self) {
        let mut state = self.lock();
        while state.open && (state.in_flight || !state.chunks.is_empty()) {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop intake and drop queued chunks; returns `(chunks, bytes)` dropped.
    pub(crate) fn close(&self) -> (usize, usize) {
        let mut state = self.lock();
        state.open = false;
        let chunks = state.chunks.len();
        let bytes = state.chunks.drain(..).map(|(_, chunk)| chunk.len()).sum();
        drop(state);
        self.ready.notify_all();
        self.idle.notify_all();
        (chunks, bytes)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().chunks.len()
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.lock().open
    }
}
