use std::fmt;

use frameparse_image::ImageError;

/// Errors a single-frame parse can report.
///
/// Running out of bytes is not an error; parsers report it with
/// [`Decoded::Incomplete`](crate::Decoded::Incomplete) instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError<Id: fmt::Debug> {
    /// The bytes at the current position are not a valid frame.
    #[error("malformed frame: {0}")]
    Malformed(#[source] ImageError),

    /// The frame header names a type identifier with no registered output type.
    #[error("no output type registered for identifier {0:?}")]
    UnknownType(Id),

    /// The output type was found but could not initialize from the frame body.
    #[error("failed to deserialize frame of type {type_id:?}: {source}")]
    Deserialize {
        type_id: Id,
        #[source]
        source: ImageError,
    },
}

pub type Result<T, Id> = std::result::Result<T, FrameError<Id>>;

/// Why a run of bytes was dropped without producing an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The parser rejected the bytes as malformed; the session realigns.
    Malformed(String),
    /// The frame's type identifier is not registered.
    UnknownType,
    /// A frame kept failing to deserialize after every allowed retry.
    RetriesExhausted,
    /// Carried-forward bytes outgrew the configured limit.
    LeftoverOverflow { size: usize, max: usize },
}

impl DiscardReason {
    /// Short, stable label for logs and tables.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnknownType => "unknown-type",
            Self::RetriesExhausted => "retries-exhausted",
            Self::LeftoverOverflow { .. } => "leftover-overflow",
        }
    }
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed: {reason}"),
            Self::UnknownType => f.write_str("unknown type"),
            Self::RetriesExhausted => f.write_str("retries exhausted"),
            Self::LeftoverOverflow { size, max } => {
                write!(f, "leftover overflow ({size} bytes, max {max})")
            }
        }
    }
}
