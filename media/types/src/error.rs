use thiserror::Error;

use crate::MediaKind;

/**
    Status code reported for allocations that fail without a native code
    (a null handle rather than a negative return value).
*/
pub const ENOMEM_STATUS: i32 = -12;

/**
    Errors produced by the media pipeline.

    Every variant describing a native failure carries the numeric status the
    engine returned, for diagnostics.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ── Resources ─────────────────────────────────────────────────────
    #[error("{code}: couldn't allocate {context}")]
    Allocation { context: &'static str, code: i32 },

    // ── Container ─────────────────────────────────────────────────────
    #[error("{code}: couldn't open {location}")]
    Open { location: String, code: i32 },
    #[error("couldn't find input format {name:?}")]
    InputFormatNotFound { name: String },
    #[error("{code}: couldn't find stream information")]
    StreamDiscovery { code: i32 },
    #[error("{code}: couldn't read the next packet")]
    Read { code: i32 },
    #[error("packet references stream {index}, container has {count} streams")]
    StreamIndex { index: usize, count: usize },
    #[error("{code}: couldn't rewind stream {index}")]
    Seek { index: usize, code: i32 },

    // ── Stream lifecycle ──────────────────────────────────────────────
    #[error("stream {index} is not open for decoding")]
    NotOpen { index: usize },
    #[error("stream {index} is already open for decoding")]
    AlreadyOpen { index: usize },
    #[error("stream {index} of kind {kind} can't be decoded")]
    Unsupported { index: usize, kind: MediaKind },
    #[error("{code}: couldn't {context}")]
    Decode { context: &'static str, code: i32 },
    #[error("{code}: couldn't {context}")]
    Convert { context: &'static str, code: i32 },

    // ── Bitstream filters ─────────────────────────────────────────────
    #[error("{code}: couldn't {context}")]
    FilterInit { context: &'static str, code: i32 },
    #[error("{code}: couldn't {context}")]
    Filter { context: &'static str, code: i32 },
    #[error("no filter applied to stream {index}")]
    NoFilter { index: usize },

    // ── Process-wide state ────────────────────────────────────────────
    #[error("error occurred: {}", signed_hex(*code))]
    Network { code: i32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /**
        Returns the native status code carried by this error, if any.
    */
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Allocation { code, .. }
            | Self::Open { code, .. }
            | Self::StreamDiscovery { code }
            | Self::Read { code }
            | Self::Seek { code, .. }
            | Self::Decode { code, .. }
            | Self::Convert { code, .. }
            | Self::FilterInit { code, .. }
            | Self::Filter { code, .. }
            | Self::Network { code } => Some(*code),
            Self::InputFormatNotFound { .. }
            | Self::StreamIndex { .. }
            | Self::NotOpen { .. }
            | Self::AlreadyOpen { .. }
            | Self::Unsupported { .. }
            | Self::NoFilter { .. }
            | Self::InvalidArgument(_) => None,
        }
    }

    /**
        Shorthand for an allocation failure without a native status code.
    */
    pub fn allocation(context: &'static str) -> Self {
        Self::Allocation {
            context,
            code: ENOMEM_STATUS,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/**
    Hexadecimal with the sign after the prefix: -5 renders as `0x-5`.
*/
fn signed_hex(code: i32) -> String {
    let sign = if code < 0 { "-" } else { "" };
    format!("0x{sign}{:X}", code.unsigned_abs())
}

/**
    Type alias for results that may return an [`Error`].
*/
pub type Result<T> = std::result::Result<T, Error>;
