//! Transport abstraction for transactions.
//!
//! A transport moves one request [`Parcel`] to the service side and returns
//! the reply parcel. The call is synchronous: `transact` returns only after
//! the reply (or a delivery failure) is available.
//!
//! # Implementations
//!
//! - **`ComposerStub`**: dispatches directly in-process, no copying
//! - **`LoopbackTransport`** (lumen-harness): round-trips parcels through raw
//!   bytes, can simulate a dead endpoint
//! - **`FaultyTransport`** (lumen-harness): seeded fault injection
//!
//! # What a Transport Must Preserve
//!
//! - Byte buffer contents, exactly
//! - Object table contents and order (each entry stays an owning reference)
//! - The method code and flags of the envelope
//!
//! Framing below the parcel boundary is the transport's own business.

use std::sync::Arc;

use lumen_proto::{Parcel, TransactFlags};

use crate::error::TransportError;

/// One request in flight: method code, flags and request parcel.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Method code selecting the operation
    pub code: u32,
    /// Delivery flags
    pub flags: TransactFlags,
    /// Request payload, starting with the interface token
    pub data: Parcel,
}

impl Transaction {
    /// Build a transaction with no flags
    #[must_use]
    pub fn new(code: u32, data: Parcel) -> Self {
        Self { code, flags: TransactFlags::empty(), data }
    }

    /// True if the caller does not wait for results
    #[must_use]
    pub fn is_one_way(&self) -> bool {
        self.flags.contains(TransactFlags::ONE_WAY)
    }
}

/// Synchronous request/response delivery.
///
/// Implementations must be safe to call from many threads at once; calls on
/// the same transport may be in flight concurrently.
pub trait Transport: Send + Sync {
    /// Deliver `txn` and wait for the reply.
    ///
    /// # Errors
    ///
    /// - `TransportError::DeadObject` if the remote endpoint is gone
    /// - `TransportError::Failed` for any other delivery failure
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        (**self).transact(txn)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        (**self).transact(txn)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        (**self).transact(txn)
    }
}
