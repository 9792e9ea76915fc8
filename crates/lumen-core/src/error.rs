//! Error types for Lumen calls.
//!
//! A call can fail in several distinct places, and callers need to tell them
//! apart:
//!
//! - the transport never delivered the request ([`TransportError`])
//! - the remote rejected the request before running it (token mismatch,
//!   unknown code, undecodable arguments)
//! - the remote ran the operation and it reported failure (application
//!   status)
//! - the reply could not be decoded locally
//! - a returned object reference was null, dead or of the wrong interface
//!
//! We keep the remote status value verbatim wherever one exists so callers can
//! log or branch on it.

use lumen_proto::{ProtocolError, ReferenceError, Status};
use thiserror::Error;

/// Failure delivering a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The remote endpoint is gone
    #[error("remote endpoint is dead")]
    DeadObject,

    /// The transport failed for another reason
    #[error("transport failed: {0}")]
    Failed(String),
}

/// Failure of a single proxy call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The transaction was not delivered or no reply came back
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote rejected our interface token
    #[error("interface token rejected by remote")]
    ProtocolMismatch,

    /// The reply could not be decoded
    #[error("malformed reply: {0}")]
    Malformed(#[from] ProtocolError),

    /// The remote does not implement the method code
    #[error("unsupported operation: code {code}")]
    Unsupported {
        /// Method code that was sent
        code: u32,
    },

    /// The remote failed the transaction before running the operation
    #[error("transaction rejected: {0}")]
    Rejected(Status),

    /// The operation ran and reported failure
    #[error("operation failed: {0}")]
    Status(Status),

    /// A returned object reference could not be used
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl CallError {
    /// Returns true if the same call may succeed on retry.
    ///
    /// Only transport hiccups qualify. A dead endpoint stays dead, and every
    /// other variant reflects a decision by one of the two sides.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Failed(_)))
    }

    /// Status value associated with this error, if the remote supplied one
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::ProtocolMismatch => Some(Status::PERMISSION_DENIED),
            Self::Unsupported { .. } => Some(Status::UNKNOWN_TRANSACTION),
            Self::Rejected(status) | Self::Status(status) => Some(*status),
            Self::Transport(TransportError::DeadObject) => Some(Status::DEAD_OBJECT),
            Self::Transport(TransportError::Failed(_))
            | Self::Malformed(_)
            | Self::Reference(_) => None,
        }
    }
}
