//! Codec limits.
//!
//! Limits bound what a parcel may grow to and how many elements a decoded
//! sequence may claim. They are enforced before memory is allocated for the
//! claimed contents.

/// Size limits applied while writing and reading parcels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum size of a parcel's byte buffer
    pub max_parcel_bytes: usize,
    /// Maximum element count accepted for a length-prefixed sequence
    pub max_sequence_len: usize,
}

impl CodecLimits {
    /// Default maximum parcel size (1 MiB, the transaction buffer size)
    pub const DEFAULT_MAX_PARCEL_BYTES: usize = 1024 * 1024;

    /// Default maximum sequence length
    pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 4096;
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_parcel_bytes: Self::DEFAULT_MAX_PARCEL_BYTES,
            max_sequence_len: Self::DEFAULT_MAX_SEQUENCE_LEN,
        }
    }
}
