use bytes::Bytes;

use crate::error::Result;

/// An object with a byte-serialized representation.
///
/// Implementors report their wire length and can both generate their image
/// into a caller-provided slice and initialize themselves from one.
pub trait BinaryImage {
    /// Length in bytes of the image this object generates.
    fn binary_length(&self) -> usize;

    /// Serialize into the start of `buffer`, returning the bytes written.
    ///
    /// Fails with [`ImageError::BufferTooSmall`](crate::ImageError::BufferTooSmall)
    /// when `buffer` is shorter than [`binary_length`](Self::binary_length).
    fn generate_image(&self, buffer: &mut [u8]) -> Result<usize>;

    /// Initialize from the start of `buffer`, returning the bytes consumed.
    fn parse_image(&mut self, buffer: &[u8]) -> Result<usize>;

    /// Generate the image into a freshly allocated buffer.
    fn to_bytes(&self) -> Result<Bytes> {
        let mut image = vec![0u8; self.binary_length()];
        let written = self.generate_image(&mut image)?;
        image.truncate(written);
        Ok(Bytes::from(image))
    }
}

/// Identification data shared by every frame of a protocol.
///
/// Extracted ahead of the frame body; carries the type identifier used to
/// select an output type plus whatever state that type's deserializer needs.
pub trait CommonHeader: Send {
    /// Protocol-defined type discriminator.
    type TypeId;

    /// The identifier of the frame this header introduces.
    fn frame_type(&self) -> Self::TypeId;
}

/// An output object initialized from one frame of a framed protocol.
pub trait FrameImage: BinaryImage + Send + 'static {
    /// Common header handed to [`initialize`](Self::initialize) verbatim.
    type Header: CommonHeader;

    /// Initialize from a frame body.
    ///
    /// `body` starts immediately after the common header and may extend past
    /// the end of this frame. Returns the number of body bytes consumed. An
    /// error here means the type was recognized but the body could not be
    /// decoded.
    ///
    /// Return [`ImageError::Truncated`](crate::ImageError::Truncated) only when
    /// `body` is short: the frame is then carried into the next read without
    /// touching the retry budget, so a header that overstates its length holds
    /// bytes back until they arrive or the leftover cap is hit. Any other
    /// error counts as one failed attempt against the retry budget.
    fn initialize(&mut self, header: Self::Header, body: &[u8]) -> Result<usize>;
}

/// Compile-time type identifier for an output type.
///
/// Identifiers are a property of the type, so registries never need to build
/// a throwaway instance just to learn one.
pub trait Identified {
    /// Protocol-defined identifier type.
    type TypeId;

    /// Identifier of this output type.
    const TYPE_ID: Self::TypeId;
}
