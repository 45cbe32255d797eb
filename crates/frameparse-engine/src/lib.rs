//! Ingest engine for framed byte streams.
//!
//! An [`Engine`] accepts bytes from one or many sources, parses them inline
//! or on a single background worker, and reports every decoded output,
//! discard, unknown type and processing failure to an [`EventSink`].
//!
//! Each source gets its own parse session (alignment state, leftover bytes,
//! retry attempts). Bytes of one source are always parsed in the order they
//! were written; sources never affect each other.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
mod panic;
mod queue;
pub mod status;
pub mod tracker;

pub use config::{parse_sync_marker, EngineConfig, ProcessingMode};
pub use engine::{Engine, EngineEvent};
pub use error::{EngineError, Result};
pub use event::{ChannelSink, EventSink, ParseEvent};
pub use status::EngineStatus;
pub use tracker::{SessionTracker, SourceKey};
