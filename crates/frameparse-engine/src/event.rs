use std::fmt;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use frameparse_frame::DiscardReason;
use tracing::trace;

use crate::error::EngineError;

/// Everything an engine reports to its consumer.
#[derive(Debug)]
pub enum ParseEvent<S, O, Id> {
    /// A frame decoded into an output.
    Parsed { source: S, output: O },
    /// Bytes were dropped without producing an output.
    Discarded {
        source: S,
        bytes: Bytes,
        reason: DiscardReason,
    },
    /// A frame named a type identifier with no registered output type.
    UnknownType { source: S, type_id: Id },
    /// Protocol code failed while parsing; the source's session was reset.
    ProcessingError { source: S, error: EngineError },
    /// An output type lost its identifier to an earlier registration.
    DuplicateType {
        type_id: Id,
        registered: &'static str,
        duplicate: &'static str,
    },
}

impl<S, O, Id> ParseEvent<S, O, Id> {
    /// Stable event label for logs and tables.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Parsed { .. } => "parsed",
            Self::Discarded { .. } => "discarded",
            Self::UnknownType { .. } => "unknown-type",
            Self::ProcessingError { .. } => "processing-error",
            Self::DuplicateType { .. } => "duplicate-type",
        }
    }

    /// Source the event belongs to; registry events have none.
    pub fn source(&self) -> Option<&S> {
        match self {
            Self::Parsed { source, .. }
            | Self::Discarded { source, .. }
            | Self::UnknownType { source, .. }
            | Self::ProcessingError { source, .. } => Some(source),
            Self::DuplicateType { .. } => None,
        }
    }

    /// The decoded output, if this is a [`ParseEvent::Parsed`].
    pub fn into_output(self) -> Option<O> {
        match self {
            Self::Parsed { output, .. } => Some(output),
            _ => None,
        }
    }
}

impl<S: fmt::Debug, O, Id: fmt::Debug> fmt::Display for ParseEvent<S, O, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed { source, .. } => write!(f, "parsed frame from {source:?}"),
            Self::Discarded {
                source,
                bytes,
                reason,
            } => write!(f, "discarded {} bytes from {source:?}: {reason}", bytes.len()),
            Self::UnknownType { source, type_id } => {
                write!(f, "unknown type {type_id:?} from {source:?}")
            }
            Self::ProcessingError { source, error } => {
                write!(f, "processing error for {source:?}: {error}")
            }
            Self::DuplicateType {
                type_id,
                registered,
                duplicate,
            } => write!(
                f,
                "duplicate type {type_id:?}: {duplicate} shadowed by {registered}"
            ),
        }
    }
}

/// Consumer of engine events.
///
/// Called from the worker thread in queued mode and from the writing thread
/// in inline mode. Events of one source arrive in stream order.
pub trait EventSink<E>: Send + Sync + 'static {
    fn emit(&self, event: E);
}

impl<E, F> EventSink<E> for F
where
    F: Fn(E) + Send + Sync + 'static,
{
    fn emit(&self, event: E) {
        self(event)
    }
}

/// [`EventSink`] forwarding into a crossbeam channel.
///
/// A bounded channel blocks the engine while the consumer lags. Events sent
/// after the receiver is dropped are discarded.
#[derive(Debug)]
pub struct ChannelSink<E> {
    sender: Sender<E>,
}

impl<E> Clone for ChannelSink<E> {
    fn clone(&self) -> Self {
        Self::new(self.sender.clone())
    }
}

impl<E> ChannelSink<E> {
    pub fn new(sender: Sender<E>) -> Self {
        Self { sender }
    }

    /// Sink and receiver over a channel holding at most `capacity` events.
    pub fn bounded(capacity: usize) -> (Self, Receiver<E>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self::new(sender), receiver)
    }

    pub fn unbounded() -> (Self, Receiver<E>) {
        let (sender, receiver) = channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl<E: Send + 'static> EventSink<E> for ChannelSink<E> {
    fn emit(&self, event: E) {
        if self.sender.send(event).is_err() {
            trace!("event receiver dropped; event discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Event = ParseEvent<u16, Vec<u8>, u8>;

    #[test]
    fn closure_sink_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |event: Event| seen.lock().unwrap().push(event.kind())
        };

        sink.emit(ParseEvent::Parsed {
            source: 1,
            output: vec![1],
        });
        sink.emit(ParseEvent::UnknownType {
            source: 1,
            type_id: 9,
        });

        assert_eq!(*seen.lock().unwrap(), vec!["parsed", "unknown-type"]);
    }

    #[test]
    fn channel_sink_forwards_and_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::<Event>::unbounded();
        sink.emit(ParseEvent::Parsed {
            source: 3,
            output: vec![7],
        });
        let event = rx.recv().unwrap();
        assert_eq!(event.source(), Some(&3));
        assert_eq!(event.into_output(), Some(vec![7]));

        drop(rx);
        sink.emit(ParseEvent::Parsed {
            source: 3,
            output: vec![8],
        });
    }

    #[test]
    fn display_mentions_reason() {
        let event: Event = ParseEvent::Discarded {
            source: 2,
            bytes: Bytes::from_static(&[1, 2, 3]),
            reason: DiscardReason::RetriesExhausted,
        };
        assert_eq!(event.to_string(), "discarded 3 bytes from 2: retries exhausted");

        let event: Event = ParseEvent::DuplicateType {
            type_id: 1,
            registered: "A",
            duplicate: "B",
        };
        assert!(event.source().is_none());
        assert_eq!(event.to_string(), "duplicate type 1: B shadowed by A");
    }
}
