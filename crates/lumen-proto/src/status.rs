//! Signed status codes carried in replies.
//!
//! A `Status` is the first field of every reply (the transaction status) and
//! is also returned as a trailing application status by operations such as
//! `captureScreen` and `getDisplayInfo`.
//!
//! Values follow the negative-errno convention. Unknown values received from
//! a peer are preserved verbatim rather than rejected, since the remote side
//! may be newer than we are.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A signed result code. Zero is success.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(i32);

const UNKNOWN_ERROR: i32 = i32::MIN;

impl Status {
    /// Success
    pub const OK: Self = Self(0);
    /// Caller is not allowed to perform the operation (token mismatch)
    pub const PERMISSION_DENIED: Self = Self(-1);
    /// Named entity (display, layer) does not exist
    pub const NAME_NOT_FOUND: Self = Self(-2);
    /// Allocation failed or a size limit was hit
    pub const NO_MEMORY: Self = Self(-12);
    /// Argument value is invalid
    pub const BAD_VALUE: Self = Self(-22);
    /// Remote object is dead
    pub const DEAD_OBJECT: Self = Self(-32);
    /// Operation is not valid in the current state
    pub const INVALID_OPERATION: Self = Self(-38);
    /// Parcel ended before all fields were read
    pub const NOT_ENOUGH_DATA: Self = Self(-61);
    /// Method code is not part of the interface
    pub const UNKNOWN_TRANSACTION: Self = Self(-74);
    /// Index out of range
    pub const BAD_INDEX: Self = Self(-75);
    /// Unspecified failure
    pub const UNKNOWN: Self = Self(UNKNOWN_ERROR);
    /// Value has the wrong type
    pub const BAD_TYPE: Self = Self(UNKNOWN_ERROR + 1);
    /// Transaction could not be carried out
    pub const FAILED_TRANSACTION: Self = Self(UNKNOWN_ERROR + 2);

    /// Wrap a raw status value
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw status value
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// True if this is [`Status::OK`]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name, if the value is one of the known constants
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::OK => "OK",
            Self::PERMISSION_DENIED => "PERMISSION_DENIED",
            Self::NAME_NOT_FOUND => "NAME_NOT_FOUND",
            Self::NO_MEMORY => "NO_MEMORY",
            Self::BAD_VALUE => "BAD_VALUE",
            Self::DEAD_OBJECT => "DEAD_OBJECT",
            Self::INVALID_OPERATION => "INVALID_OPERATION",
            Self::NOT_ENOUGH_DATA => "NOT_ENOUGH_DATA",
            Self::UNKNOWN_TRANSACTION => "UNKNOWN_TRANSACTION",
            Self::BAD_INDEX => "BAD_INDEX",
            Self::UNKNOWN => "UNKNOWN_ERROR",
            Self::BAD_TYPE => "BAD_TYPE",
            Self::FAILED_TRANSACTION => "FAILED_TRANSACTION",
            _ => return None,
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::OK
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Status({name})"),
            None => write!(f, "Status({})", self.0),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}
