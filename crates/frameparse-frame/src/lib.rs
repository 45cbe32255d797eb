//! Stream alignment and frame reassembly.
//!
//! Turns a sequence of arbitrarily split byte buffers into whole frames:
//! - [`StreamAligner`] locates the first frame boundary using a sync marker
//! - [`FrameReassembler`] runs a [`FrameParser`] over the accumulated bytes,
//!   carrying unconsumed bytes forward in a [`ParseSession`]
//! - [`RetryBudget`] bounds how often a frame that failed to deserialize is
//!   recombined with the next buffer
//! - [`FrameImageParser`] adapts a [`FrameProtocol`] (common header plus a
//!   type registry) into a [`FrameParser`]
//!
//! The [`codec`] module carries a small reference protocol used by tests and
//! the CLI.

pub mod align;
pub mod codec;
pub mod error;
pub mod header;
pub mod parser;
pub mod reassembler;
pub mod retry;
pub mod session;

pub use align::StreamAligner;
pub use codec::{encode_frame, RawFrame, ReferenceHeader, ReferenceProtocol, HEADER_SIZE, SYNC_BYTE};
pub use error::{DiscardReason, FrameError, Result};
pub use header::{FrameImageParser, FrameProtocol};
pub use parser::{Decoded, FrameParser};
pub use reassembler::{Emission, FrameReassembler, ReassemblerConfig, DEFAULT_MAX_LEFTOVER};
pub use retry::RetryBudget;
pub use session::{ParseSession, SessionStats};
