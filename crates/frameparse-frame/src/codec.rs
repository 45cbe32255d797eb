use bytes::{BufMut, Bytes, BytesMut};
use frameparse_image::{BinaryImage, CommonHeader, FrameImage, ImageError};
use frameparse_registry::OutputType;

use crate::header::FrameProtocol;

/// Sync byte opening every reference frame.
pub const SYNC_BYTE: u8 = 0xAA;

/// Reference header: sync (1) + type (1) + length (2) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a reference frame can carry.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Common header of the reference protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceHeader {
    /// Type identifier selecting the output type.
    pub frame_type: u8,
    /// Payload length following the header.
    pub length: u16,
}

impl ReferenceHeader {
    /// Decode a header from the start of `src`.
    ///
    /// Returns `Ok(None)` while fewer than [`HEADER_SIZE`] bytes are available.
    pub fn decode(src: &[u8]) -> Result<Option<Self>, ImageError> {
        match src.first() {
            None => return Ok(None),
            Some(&SYNC_BYTE) => {}
            Some(other) => {
                return Err(ImageError::invalid(format_args!(
                    "expected sync byte {SYNC_BYTE:#04x}, found {other:#04x}"
                )))
            }
        }
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }
        Ok(Some(Self {
            frame_type: src[1],
            length: u16::from_be_bytes([src[2], src[3]]),
        }))
    }
}

impl CommonHeader for ReferenceHeader {
    type TypeId = u8;

    fn frame_type(&self) -> u8 {
        self.frame_type
    }
}

/// Encode a reference frame.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────────┬─────────────┬──────────────────┐
/// │ Sync (1B) │ Type (1B) │ Length      │ Payload          │
/// │ 0xAA      │           │ (2B BE)     │ (Length bytes)   │
/// └───────────┴───────────┴─────────────┴──────────────────┘
/// ```
pub fn encode_frame(frame_type: u8, payload: &[u8], dst: &mut BytesMut) -> Result<(), ImageError> {
    let length = u16::try_from(payload.len()).map_err(|_| {
        ImageError::invalid(format_args!(
            "payload too large ({} bytes, max {MAX_PAYLOAD})",
            payload.len()
        ))
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(SYNC_BYTE);
    dst.put_u8(frame_type);
    dst.put_u16(length);
    dst.put_slice(payload);
    Ok(())
}

/// Untyped reference frame: keeps the type identifier and the raw payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub frame_type: u8,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn new(frame_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }
}

impl BinaryImage for RawFrame {
    fn binary_length(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    fn generate_image(&self, buffer: &mut [u8]) -> Result<usize, ImageError> {
        let needed = self.binary_length();
        if buffer.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        }
        let mut dst = BytesMut::with_capacity(needed);
        encode_frame(self.frame_type, &self.payload, &mut dst)?;
        buffer[..needed].copy_from_slice(&dst);
        Ok(needed)
    }

    fn parse_image(&mut self, buffer: &[u8]) -> Result<usize, ImageError> {
        let Some(header) = ReferenceHeader::decode(buffer)? else {
            return Err(ImageError::Truncated {
                needed: HEADER_SIZE,
                available: buffer.len(),
            });
        };
        Ok(HEADER_SIZE + self.initialize(header, &buffer[HEADER_SIZE..])?)
    }
}

impl FrameImage for RawFrame {
    type Header = ReferenceHeader;

    fn initialize(&mut self, header: ReferenceHeader, body: &[u8]) -> Result<usize, ImageError> {
        let length = header.length as usize;
        ImageError::ensure_available(length, body.len())?;
        self.frame_type = header.frame_type;
        self.payload = Bytes::copy_from_slice(&body[..length]);
        Ok(length)
    }
}

/// The reference protocol over any output family initialized from a
/// [`ReferenceHeader`].
pub struct ReferenceProtocol<O> {
    output_types: Vec<OutputType<u8, O>>,
}

impl<O> ReferenceProtocol<O> {
    pub fn new(output_types: Vec<OutputType<u8, O>>) -> Self {
        Self { output_types }
    }
}

impl ReferenceProtocol<RawFrame> {
    /// Decode each listed type identifier into a [`RawFrame`].
    pub fn raw(type_ids: impl IntoIterator<Item = u8>) -> Self {
        Self::new(
            type_ids
                .into_iter()
                .map(|id| OutputType::new("RawFrame", id, RawFrame::default))
                .collect(),
        )
    }
}

impl<O> std::fmt::Debug for ReferenceProtocol<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceProtocol")
            .field("output_types", &self.output_types)
            .finish()
    }
}

impl<O> FrameProtocol for ReferenceProtocol<O>
where
    O: FrameImage<Header = ReferenceHeader>,
{
    type TypeId = u8;
    type Header = ReferenceHeader;
    type Output = O;

    fn parse_header(&self, buffer: &[u8]) -> Result<Option<(ReferenceHeader, usize)>, ImageError> {
        Ok(ReferenceHeader::decode(buffer)?.map(|header| (header, HEADER_SIZE)))
    }

    fn output_types(&self) -> Vec<OutputType<u8, O>> {
        self.output_types.clone()
    }
}
