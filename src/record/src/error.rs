use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecordError>;

#[derive(Debug, Error)]
pub enum RecordError {
    /// Fewer bytes are available than a section prologue or payload declares.
    #[error("truncated input: expecting {expected} bytes at offset {offset}")]
    Truncated { offset: u64, expected: u64 },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: protobuf::Error,
    },

    #[error("{0} section not found")]
    MissingSection(&'static str),

    #[error("cannot resolve schema of channel {channel}: {reason}")]
    SchemaResolution { channel: String, reason: String },
}

impl RecordError {
    pub(crate) fn decode(what: &'static str, source: protobuf::Error) -> Self {
        Self::Decode { what, source }
    }

    pub(crate) fn schema(channel: &str, reason: impl Into<String>) -> Self {
        Self::SchemaResolution {
            channel: channel.to_string(),
            reason: reason.into(),
        }
    }

    /// is_truncated returns true for errors caused by a file shorter than its
    /// sections claim.
    pub fn is_truncated(&self) -> bool {
        match self {
            Self::Truncated { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
