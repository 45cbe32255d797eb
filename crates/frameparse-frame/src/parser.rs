use std::fmt;

use frameparse_registry::{DuplicateType, RegistryError};

use crate::error::FrameError;

/// Outcome of one successful single-frame parse attempt.
#[derive(Debug)]
pub enum Decoded<O> {
    /// Not enough bytes for the next frame yet.
    Incomplete,
    /// One frame decoded from the start of the buffer.
    Frame {
        /// Bytes the frame occupied.
        consumed: usize,
        /// The decoded output.
        output: O,
    },
}

/// Protocol-specific single-frame parse step.
///
/// `parse_frame` is handed everything buffered for a source from the current
/// position onward. It must return [`Decoded::Incomplete`] whenever the bytes
/// could simply be short, and reserve errors for data that can never become a
/// valid frame.
pub trait FrameParser: Send + Sync {
    /// Object produced for every decoded frame.
    type Output: Send + 'static;

    /// Identifier carried by frames of this protocol.
    type TypeId: Clone + fmt::Debug + Send + 'static;

    /// Prepare for parsing; returns output types shadowed by an earlier
    /// registration of the same identifier.
    fn start(&mut self) -> Result<Vec<DuplicateType<Self::TypeId>>, RegistryError> {
        Ok(Vec::new())
    }

    /// Release anything built by [`start`](Self::start).
    fn stop(&mut self) {}

    /// Number of output types currently known to the parser.
    fn output_type_count(&self) -> usize {
        0
    }

    /// Attempt to decode one frame from the start of `buffer`.
    fn parse_frame(
        &self,
        buffer: &[u8],
    ) -> Result<Decoded<Self::Output>, FrameError<Self::TypeId>>;
}

impl<P: FrameParser + ?Sized> FrameParser for Box<P> {
    type Output = P::Output;
    type TypeId = P::TypeId;

    fn start(&mut self) -> Result<Vec<DuplicateType<Self::TypeId>>, RegistryError> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn output_type_count(&self) -> usize {
        (**self).output_type_count()
    }

    fn parse_frame(
        &self,
        buffer: &[u8],
    ) -> Result<Decoded<Self::Output>, FrameError<Self::TypeId>> {
        (**self).parse_frame(buffer)
    }
}
