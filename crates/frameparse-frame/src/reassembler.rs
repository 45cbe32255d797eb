use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::align::StreamAligner;
use crate::error::{DiscardReason, FrameError};
use crate::parser::{Decoded, FrameParser};
use crate::retry::RetryBudget;
use crate::session::ParseSession;

/// Default cap on carried-forward bytes per session: 16 MiB.
pub const DEFAULT_MAX_LEFTOVER: usize = 16 * 1024 * 1024;

/// Something a feed produced for the caller.
#[derive(Debug)]
pub enum Emission<O, Id> {
    /// A frame decoded into an output.
    Parsed(O),
    /// Bytes dropped without producing an output.
    Discarded { bytes: Bytes, reason: DiscardReason },
    /// A frame named a type identifier with no registered output type.
    UnknownType(Id),
}

/// Configuration for the frame reassembler.
#[derive(Debug, Clone)]
pub struct ReassemblerConfig {
    /// Sync marker searched for while a session is unaligned.
    pub aligner: StreamAligner,
    /// Retries allowed for frames that fail to deserialize.
    pub retry: RetryBudget,
    /// Maximum bytes carried forward between feeds. Default: 16 MiB.
    pub max_leftover: usize,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            aligner: StreamAligner::none(),
            retry: RetryBudget::default(),
            max_leftover: DEFAULT_MAX_LEFTOVER,
        }
    }
}

/// Runs a [`FrameParser`] over buffered bytes, one session at a time.
///
/// Each [`feed`](Self::feed) prepends the session's leftover to the new bytes
/// and parses frames until the parser asks for more data or reports an
/// error. Bytes that may still become a frame are carried forward; bytes that
/// never can are discarded with a reason.
#[derive(Debug, Clone, Default)]
pub struct FrameReassembler {
    config: ReassemblerConfig,
}

impl FrameReassembler {
    pub fn new(config: ReassemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReassemblerConfig {
        &self.config
    }

    /// Feed `data` for one session and collect everything it produced.
    ///
    /// Empty input is a no-op.
    pub fn feed<P: FrameParser>(
        &self,
        parser: &P,
        session: &mut ParseSession,
        data: &[u8],
    ) -> Vec<Emission<P::Output, P::TypeId>> {
        let mut emissions = Vec::new();
        if data.is_empty() {
            return emissions;
        }

        session.touch();
        session.stats.bytes_received += data.len() as u64;

        let mut buffer = std::mem::take(&mut session.leftover);
        buffer.extend_from_slice(data);

        if !session.aligned && !self.align(session, &mut buffer) {
            session.leftover = buffer;
            return emissions;
        }

        let offset = self.parse_frames(parser, session, &buffer, &mut emissions);
        buffer.advance(offset);

        if buffer.len() > self.config.max_leftover {
            let reason = DiscardReason::LeftoverOverflow {
                size: buffer.len(),
                max: self.config.max_leftover,
            };
            self.discard(session, buffer.split().freeze(), reason, &mut emissions);
            session.aligned = false;
            session.retry_attempts = 0;
        }

        session.leftover = buffer;
        emissions
    }

    /// Advance `buffer` to the first sync marker. Returns `false` when none
    /// was found; any suffix that may begin a split marker stays in `buffer`.
    fn align(&self, session: &mut ParseSession, buffer: &mut BytesMut) -> bool {
        match self.config.aligner.align(&buffer[..]) {
            Some(position) => {
                if position > 0 {
                    trace!(skipped = position, "aligned on sync marker");
                }
                session.stats.bytes_skipped += position as u64;
                buffer.advance(position);
                session.aligned = true;
                true
            }
            None => {
                let keep = self.config.aligner.partial_marker_len(&buffer[..]);
                let skipped = buffer.len() - keep;
                trace!(skipped, "no sync marker in buffer");
                session.stats.bytes_skipped += skipped as u64;
                buffer.advance(skipped);
                false
            }
        }
    }

    /// Parse frames from the start of `buffer`; returns the offset of the
    /// first byte that was neither consumed nor discarded.
    fn parse_frames<P: FrameParser>(
        &self,
        parser: &P,
        session: &mut ParseSession,
        buffer: &BytesMut,
        emissions: &mut Vec<Emission<P::Output, P::TypeId>>,
    ) -> usize {
        let mut offset = 0;

        while offset < buffer.len() {
            let remaining = &buffer[offset..];

            match parser.parse_frame(remaining) {
                Ok(Decoded::Incomplete) => break,
                Ok(Decoded::Frame { consumed: 0, .. }) => break,
                Ok(Decoded::Frame { consumed, .. }) if consumed > remaining.len() => {
                    let reason = DiscardReason::Malformed(format!(
                        "parser consumed {consumed} bytes with {} available",
                        remaining.len()
                    ));
                    self.discard(session, Bytes::copy_from_slice(remaining), reason, emissions);
                    session.aligned = false;
                    return buffer.len();
                }
                Ok(Decoded::Frame { consumed, output }) => {
                    offset += consumed;
                    self.config.retry.reset(&mut session.retry_attempts);
                    session.stats.frames_parsed += 1;
                    emissions.push(Emission::Parsed(output));
                }
                Err(FrameError::Malformed(err)) => {
                    let reason = DiscardReason::Malformed(err.to_string());
                    self.discard(session, Bytes::copy_from_slice(remaining), reason, emissions);
                    session.aligned = false;
                    return buffer.len();
                }
                Err(FrameError::UnknownType(type_id)) => {
                    debug!(?type_id, "no output type registered");
                    session.stats.unknown_types += 1;
                    emissions.push(Emission::UnknownType(type_id));
                    self.discard(
                        session,
                        Bytes::copy_from_slice(remaining),
                        DiscardReason::UnknownType,
                        emissions,
                    );
                    return buffer.len();
                }
                Err(FrameError::Deserialize { type_id, source }) => {
                    if self.config.retry.should_retry(&mut session.retry_attempts) {
                        debug!(
                            ?type_id,
                            attempt = session.retry_attempts,
                            max_attempts = self.config.retry.max_attempts(),
                            error = %source,
                            "frame failed to deserialize; retrying with next buffer"
                        );
                        break;
                    }
                    self.discard(
                        session,
                        Bytes::copy_from_slice(remaining),
                        DiscardReason::RetriesExhausted,
                        emissions,
                    );
                    session.aligned = false;
                    return buffer.len();
                }
            }
        }

        offset
    }

    fn discard<O, Id>(
        &self,
        session: &mut ParseSession,
        bytes: Bytes,
        reason: DiscardReason,
        emissions: &mut Vec<Emission<O, Id>>,
    ) {
        warn!(bytes = bytes.len(), reason = %reason, "discarding bytes");
        session.stats.discards += 1;
        session.stats.bytes_discarded += bytes.len() as u64;
        emissions.push(Emission::Discarded { bytes, reason });
    }
}

#[cfg(test)]
mod tests {
    use frameparse_image::ImageError;

    use super::*;

    /// `[len u8][payload]` frames; a zero length byte is malformed and a
    /// length of 0xEE always fails to deserialize.
    struct LengthPrefixed;

    impl FrameParser for LengthPrefixed {
        type Output = Vec<u8>;
        type TypeId = u8;

        fn parse_frame(&self, buffer: &[u8]) -> Result<Decoded<Vec<u8>>, FrameError<u8>> {
            let Some(&len) = buffer.first() else {
                return Ok(Decoded::Incomplete);
            };
            match len {
                0 => Err(FrameError::Malformed(ImageError::invalid("zero length"))),
                0xEE => Err(FrameError::Deserialize {
                    type_id: len,
                    source: ImageError::invalid("never decodes"),
                }),
                0xEF => Err(FrameError::UnknownType(len)),
                _ => {
                    let total = 1 + len as usize;
                    if buffer.len() < total {
                        return Ok(Decoded::Incomplete);
                    }
                    Ok(Decoded::Frame {
                        consumed: total,
                        output: buffer[1..total].to_vec(),
                    })
                }
            }
        }
    }

    fn parsed(emissions: &[Emission<Vec<u8>, u8>]) -> Vec<Vec<u8>> {
        emissions
            .iter()
            .filter_map(|e| match e {
                Emission::Parsed(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    fn reassembler() -> FrameReassembler {
        FrameReassembler::default()
    }

    #[test]
    fn parses_many_frames_in_one_buffer() {
        let mut session = ParseSession::new();
        let emissions = reassembler().feed(&LengthPrefixed, &mut session, &[2, 1, 2, 1, 3]);

        assert_eq!(parsed(&emissions), vec![vec![1, 2], vec![3]]);
        assert!(session.leftover().is_empty());
        assert_eq!(session.stats().frames_parsed, 2);
    }

    #[test]
    fn carries_partial_frame_forward() {
        let r = reassembler();
        let mut session = ParseSession::new();

        assert!(r.feed(&LengthPrefixed, &mut session, &[3, 7]).is_empty());
        assert_eq!(session.leftover(), &[3, 7]);

        let emissions = r.feed(&LengthPrefixed, &mut session, &[8, 9, 2]);
        assert_eq!(parsed(&emissions), vec![vec![7, 8, 9]]);
        assert_eq!(session.leftover(), &[2]);
    }

    #[test]
    fn empty_feed_is_a_no_op() {
        let mut session = ParseSession::new();
        assert!(reassembler().feed(&LengthPrefixed, &mut session, &[]).is_empty());
        assert!(!session.is_aligned());
        assert_eq!(session.stats().bytes_received, 0);
    }

    #[test]
    fn malformed_discards_remainder_and_realigns() {
        let r = FrameReassembler::new(ReassemblerConfig {
            aligner: StreamAligner::new(vec![0x01]),
            ..ReassemblerConfig::default()
        });
        let mut session = ParseSession::new();

        let emissions = r.feed(&LengthPrefixed, &mut session, &[0x01, 0x05, 0x00, 0x01, 0x06]);
        assert_eq!(parsed(&emissions), vec![vec![0x05]]);
        assert!(matches!(
            emissions.last(),
            Some(Emission::Discarded { bytes, reason: DiscardReason::Malformed(_) })
                if bytes.as_ref() == [0x00, 0x01, 0x06]
        ));
        assert!(!session.is_aligned());
        assert!(session.leftover().is_empty());

        let emissions = r.feed(&LengthPrefixed, &mut session, &[0x09, 0x01, 0x07]);
        assert_eq!(parsed(&emissions), vec![vec![0x07]]);
        assert_eq!(session.stats().bytes_skipped, 1);
    }

    #[test]
    fn unknown_type_keeps_alignment() {
        let mut session = ParseSession::new();
        let emissions = reassembler().feed(&LengthPrefixed, &mut session, &[1, 4, 0xEF, 1, 2]);

        assert_eq!(parsed(&emissions), vec![vec![4]]);
        assert!(matches!(emissions[1], Emission::UnknownType(0xEF)));
        assert!(matches!(
            &emissions[2],
            Emission::Discarded { bytes, reason: DiscardReason::UnknownType } if bytes.len() == 3
        ));
        assert!(session.is_aligned());
        assert_eq!(session.stats().unknown_types, 1);
    }

    #[test]
    fn deserialize_failure_is_retried_then_discarded_once() {
        let r = FrameReassembler::new(ReassemblerConfig {
            retry: RetryBudget::new(2),
            ..ReassemblerConfig::default()
        });
        let mut session = ParseSession::new();

        assert!(r.feed(&LengthPrefixed, &mut session, &[0xEE, 1]).is_empty());
        assert_eq!(session.retry_attempts(), 1);
        assert!(r.feed(&LengthPrefixed, &mut session, &[2]).is_empty());
        assert_eq!(session.retry_attempts(), 2);
        assert_eq!(session.leftover(), &[0xEE, 1, 2]);

        let emissions = r.feed(&LengthPrefixed, &mut session, &[3]);
        assert_eq!(emissions.len(), 1);
        assert!(matches!(
            &emissions[0],
            Emission::Discarded { bytes, reason: DiscardReason::RetriesExhausted }
                if bytes.as_ref() == [0xEE, 1, 2, 3]
        ));
        assert_eq!(session.retry_attempts(), 0);
        assert!(session.leftover().is_empty());
    }

    #[test]
    fn successful_parse_resets_retry_counter() {
        let r = FrameReassembler::new(ReassemblerConfig {
            retry: RetryBudget::new(5),
            ..ReassemblerConfig::default()
        });
        let mut session = ParseSession::new();
        session.retry_attempts = 3;

        let emissions = r.feed(&LengthPrefixed, &mut session, &[1, 9]);
        assert_eq!(parsed(&emissions), vec![vec![9]]);
        assert_eq!(session.retry_attempts(), 0);
    }

    #[test]
    fn buffer_without_marker_is_dropped_silently() {
        let r = FrameReassembler::new(ReassemblerConfig {
            aligner: StreamAligner::new(vec![0xAA, 0x55]),
            ..ReassemblerConfig::default()
        });
        let mut session = ParseSession::new();

        assert!(r.feed(&LengthPrefixed, &mut session, &[1, 2, 3, 0xAA]).is_empty());
        assert!(!session.is_aligned());
        assert_eq!(session.leftover(), &[0xAA]);
        assert_eq!(session.stats().bytes_skipped, 3);

        r.feed(&LengthPrefixed, &mut session, &[0x55]);
        assert!(session.is_aligned());
    }

    #[test]
    fn leftover_overflow_discards_and_realigns() {
        let r = FrameReassembler::new(ReassemblerConfig {
            max_leftover: 4,
            ..ReassemblerConfig::default()
        });
        let mut session = ParseSession::new();

        let emissions = r.feed(&LengthPrefixed, &mut session, &[200, 1, 2, 3, 4, 5]);
        assert!(matches!(
            &emissions[0],
            Emission::Discarded { reason: DiscardReason::LeftoverOverflow { size: 6, max: 4 }, .. }
        ));
        assert!(session.leftover().is_empty());
        assert!(!session.is_aligned());
    }

    struct Overreaching;

    impl FrameParser for Overreaching {
        type Output = ();
        type TypeId = u8;

        fn parse_frame(&self, _buffer: &[u8]) -> Result<Decoded<()>, FrameError<u8>> {
            Ok(Decoded::Frame {
                consumed: usize::MAX,
                output: (),
            })
        }
    }

    #[test]
    fn overreaching_parser_is_treated_as_malformed() {
        let mut session = ParseSession::new();
        let emissions = reassembler().feed(&Overreaching, &mut session, &[1, 2]);

        assert_eq!(emissions.len(), 1);
        assert!(matches!(
            &emissions[0],
            Emission::Discarded { reason: DiscardReason::Malformed(_), .. }
        ));
    }
}
