//! Generic engine turning framed byte streams into typed objects.
//!
//! Bytes arrive from one or many sources in arbitrarily split buffers.
//! frameparse aligns each stream on a sync marker, reassembles whole frames,
//! reads the common header, looks the frame type up in a registry and hands
//! the body to the matching output type's deserializer.
//!
//! # Crate Structure
//!
//! - [`image`] - Binary image contracts implemented by output types
//! - [`registry`] - Type identifier to constructor registry
//! - [`frame`] - Stream alignment, frame reassembly, retry budget and the
//!   reference frame codec
//! - [`engine`] - Inline or queued ingestion, per-source sessions and event
//!   emission

/// Re-export binary image types.
pub mod image {
    pub use frameparse_image::*;
}

/// Re-export registry types.
pub mod registry {
    pub use frameparse_registry::*;
}

/// Re-export frame layer types.
pub mod frame {
    pub use frameparse_frame::*;
}

/// Re-export engine types.
pub mod engine {
    pub use frameparse_engine::*;
}

pub use frameparse_engine::{
    ChannelSink, Engine, EngineConfig, EngineError, EventSink, ParseEvent, ProcessingMode,
};
pub use frameparse_frame::{FrameImageParser, FrameParser, FrameProtocol};
pub use frameparse_registry::output_types;
