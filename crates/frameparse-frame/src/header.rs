use std::fmt;
use std::hash::Hash;

use frameparse_image::{CommonHeader, FrameImage, ImageError};
use frameparse_registry::{DuplicateType, OutputType, RegistryConfig, RegistryError, TypeRegistry};

use crate::error::FrameError;
use crate::parser::{Decoded, FrameParser};

/// A frame-oriented protocol: every frame opens with a common header that
/// names the output type decoding the rest.
pub trait FrameProtocol: Send + Sync {
    /// Identifier carried in the common header.
    type TypeId: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Common header extracted ahead of each frame body.
    type Header: CommonHeader<TypeId = Self::TypeId>;

    /// Output family produced by this protocol.
    type Output: FrameImage<Header = Self::Header>;

    /// Extract the common header from the start of `buffer`.
    ///
    /// Returns `Ok(None)` when `buffer` is too short to hold a full header,
    /// otherwise the header and the number of bytes it occupied. Errors are
    /// reserved for bytes that can never form a header.
    fn parse_header(&self, buffer: &[u8]) -> Result<Option<(Self::Header, usize)>, ImageError>;

    /// Candidate output types, in registration order.
    fn output_types(&self) -> Vec<OutputType<Self::TypeId, Self::Output>>;
}

/// [`FrameParser`] for a [`FrameProtocol`].
///
/// Extracts the common header, looks the identifier up in a [`TypeRegistry`]
/// built on [`start`](FrameParser::start), constructs a fresh output and
/// initializes it from the frame body.
pub struct FrameImageParser<P: FrameProtocol> {
    protocol: P,
    registry: TypeRegistry<P::TypeId, P::Output>,
}

impl<P: FrameProtocol> FrameImageParser<P> {
    pub fn new(protocol: P) -> Self {
        Self::with_config(protocol, RegistryConfig::default())
    }

    pub fn with_config(protocol: P, config: RegistryConfig) -> Self {
        Self {
            protocol,
            registry: TypeRegistry::with_config(config),
        }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Output types registered by the last successful start.
    pub fn registry(&self) -> &TypeRegistry<P::TypeId, P::Output> {
        &self.registry
    }
}

impl<P: FrameProtocol> FrameParser for FrameImageParser<P> {
    type Output = P::Output;
    type TypeId = P::TypeId;

    fn start(&mut self) -> Result<Vec<DuplicateType<P::TypeId>>, RegistryError> {
        self.registry.build(self.protocol.output_types())
    }

    fn stop(&mut self) {
        self.registry.clear();
    }

    fn output_type_count(&self) -> usize {
        self.registry.len()
    }

    fn parse_frame(&self, buffer: &[u8]) -> Result<Decoded<P::Output>, FrameError<P::TypeId>> {
        let Some((header, header_len)) = self
            .protocol
            .parse_header(buffer)
            .map_err(FrameError::Malformed)?
        else {
            return Ok(Decoded::Incomplete);
        };
        if header_len == 0 {
            return Ok(Decoded::Incomplete);
        }
        let Some(body) = buffer.get(header_len..) else {
            return Err(FrameError::Malformed(ImageError::Truncated {
                needed: header_len,
                available: buffer.len(),
            }));
        };

        let type_id = header.frame_type();
        let Some(mut output) = self.registry.create(&type_id) else {
            return Err(FrameError::UnknownType(type_id));
        };

        match output.initialize(header, body) {
            Ok(consumed) => Ok(Decoded::Frame {
                consumed: header_len + consumed,
                output,
            }),
            // Short bodies wait for more bytes; other failures spend retries.
            Err(ImageError::Truncated { .. }) => Ok(Decoded::Incomplete),
            Err(source) => Err(FrameError::Deserialize { type_id, source }),
        }
    }
}

impl<P: FrameProtocol + fmt::Debug> fmt::Debug for FrameImageParser<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameImageParser")
            .field("protocol", &self.protocol)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use frameparse_registry::DuplicatePolicy;

    use super::*;
    use crate::codec::{encode_frame, RawFrame, ReferenceProtocol};

    fn frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut dst = bytes::BytesMut::new();
        encode_frame(frame_type, payload, &mut dst).unwrap();
        dst.to_vec()
    }

    fn started(ids: &[u8]) -> FrameImageParser<ReferenceProtocol<RawFrame>> {
        let mut parser = FrameImageParser::new(ReferenceProtocol::raw(ids.iter().copied()));
        parser.start().unwrap();
        parser
    }

    #[test]
    fn decodes_registered_frame() {
        let parser = started(&[0x01]);
        let wire = frame(0x01, &[0x10, 0x20]);

        match parser.parse_frame(&wire).unwrap() {
            Decoded::Frame { consumed, output } => {
                assert_eq!(consumed, wire.len());
                assert_eq!(output.frame_type, 0x01);
                assert_eq!(output.payload.as_ref(), &[0x10, 0x20]);
            }
            Decoded::Incomplete => panic!("expected a frame"),
        }
    }

    #[test]
    fn short_header_and_short_body_are_incomplete() {
        let parser = started(&[0x01]);
        let wire = frame(0x01, &[1, 2, 3]);

        assert!(matches!(parser.parse_frame(&wire[..2]), Ok(Decoded::Incomplete)));
        assert!(matches!(parser.parse_frame(&wire[..5]), Ok(Decoded::Incomplete)));
    }

    #[test]
    fn unregistered_type_is_reported() {
        let parser = started(&[0x01]);
        let wire = frame(0x02, &[0]);
        assert!(matches!(parser.parse_frame(&wire), Err(FrameError::UnknownType(0x02))));
    }

    #[test]
    fn bad_sync_byte_is_malformed() {
        let parser = started(&[0x01]);
        assert!(matches!(
            parser.parse_frame(&[0x55, 0x01, 0x00, 0x00]),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn nothing_decodes_before_start_or_after_stop() {
        let mut parser = FrameImageParser::new(ReferenceProtocol::raw([0x01]));
        let wire = frame(0x01, &[7]);
        assert!(matches!(parser.parse_frame(&wire), Err(FrameError::UnknownType(1))));

        parser.start().unwrap();
        assert_eq!(parser.output_type_count(), 1);
        assert!(matches!(parser.parse_frame(&wire), Ok(Decoded::Frame { .. })));

        parser.stop();
        assert_eq!(parser.output_type_count(), 0);
        assert!(matches!(parser.parse_frame(&wire), Err(FrameError::UnknownType(1))));
    }

    #[test]
    fn start_reports_duplicates() {
        let mut parser = FrameImageParser::new(ReferenceProtocol::raw([0x01, 0x02, 0x01]));
        let duplicates = parser.start().unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].type_id, 0x01);
        assert_eq!(parser.registry().len(), 2);

        let mut strict = FrameImageParser::with_config(
            ReferenceProtocol::raw([0x01, 0x01]),
            RegistryConfig {
                duplicate_policy: DuplicatePolicy::Reject,
            },
        );
        assert!(strict.start().is_err());
    }
}
