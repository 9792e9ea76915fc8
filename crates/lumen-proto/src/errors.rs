//! Error types for the Lumen wire codec.
//!
//! All errors are structured, testable, and map onto a reply [`Status`] so
//! the stub can answer a malformed request without crashing.

use thiserror::Error;

use crate::Status;

/// Codec-level errors that can occur while writing or reading a parcel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Bounds errors
    /// A read needed more bytes than the parcel has left
    #[error("parcel truncated: needed {needed} bytes, only {remaining} remaining")]
    Truncated {
        /// Bytes the read required (including padding)
        needed: usize,
        /// Bytes left in the parcel
        remaining: usize,
    },

    /// A length or count field was negative
    #[error("negative length field: {0}")]
    NegativeLength(i32),

    /// A sequence count exceeds the configured maximum
    #[error("sequence too long: {count} elements exceeds maximum {max}")]
    SequenceTooLong {
        /// Element count claimed by the sender
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// A sequence count cannot fit in the bytes that remain
    #[error("sequence overrun: {count} elements need at least {needed} bytes, {remaining} remaining")]
    SequenceOverrun {
        /// Element count claimed by the sender
        count: usize,
        /// Minimum bytes those elements occupy
        needed: usize,
        /// Bytes left in the parcel
        remaining: usize,
    },

    /// Writing would grow the parcel past the configured maximum
    #[error("parcel too large: {size} bytes exceeds maximum {max}")]
    ParcelTooLarge {
        /// Size the parcel would reach
        size: usize,
        /// Configured maximum
        max: usize,
    },

    // Object table errors
    /// Object marker points outside the parcel's object table
    #[error("bad object index {index}: object table holds {len} entries")]
    BadObjectIndex {
        /// Index read from the byte buffer
        index: u32,
        /// Length of the object table
        len: usize,
    },

    /// Object marker kind is neither null nor object
    #[error("invalid object kind: {0:#010x}")]
    InvalidObjectKind(u32),

    // String errors
    /// String bytes are not valid UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// String is not followed by its NUL terminator
    #[error("string is missing its NUL terminator")]
    MissingTerminator,

    // Authentication errors
    /// Request was written for a different interface
    #[error("interface mismatch: expected {expected:?}, got {actual:?}")]
    InterfaceMismatch {
        /// Descriptor the receiver implements
        expected: String,
        /// Descriptor found in the request
        actual: String,
    },
}

impl ProtocolError {
    /// Reply status a stub sends when a request fails with this error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Truncated { .. } | Self::SequenceOverrun { .. } => Status::NOT_ENOUGH_DATA,
            Self::ParcelTooLarge { .. } | Self::SequenceTooLong { .. } => Status::NO_MEMORY,
            Self::BadObjectIndex { .. } => Status::BAD_INDEX,
            Self::InvalidObjectKind(_) => Status::BAD_TYPE,
            Self::NegativeLength(_) | Self::InvalidUtf8 | Self::MissingTerminator => {
                Status::BAD_VALUE
            },
            Self::InterfaceMismatch { .. } => Status::PERMISSION_DENIED,
        }
    }
}

/// Convenient Result type alias for codec operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_mismatch_maps_to_permission_denied() {
        let err = ProtocolError::InterfaceMismatch {
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        assert_eq!(err.status(), Status::PERMISSION_DENIED);
    }

    #[test]
    fn bounds_errors_map_to_not_enough_data() {
        assert_eq!(
            ProtocolError::Truncated { needed: 4, remaining: 0 }.status(),
            Status::NOT_ENOUGH_DATA
        );
        assert_eq!(
            ProtocolError::SequenceOverrun { count: 10, needed: 40, remaining: 8 }.status(),
            Status::NOT_ENOUGH_DATA
        );
    }
}
