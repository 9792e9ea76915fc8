//! In-process loopback transport.
//!
//! Unlike calling a [`ComposerStub`] directly, the loopback freezes each
//! parcel to raw bytes and rebuilds it on the other side, the way an IPC
//! driver copies a transaction buffer. Object tables travel alongside as
//! owning references, so refcounts behave as they would across a process
//! boundary.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use lumen_core::{ComposerStub, SurfaceComposer, Transaction, Transport, TransportError};
use lumen_proto::{CodecLimits, Parcel, TransactFlags};

/// Transport that delivers transactions to a stub in the same process.
#[derive(Debug)]
pub struct LoopbackTransport<S> {
    stub: Arc<ComposerStub<S>>,
    limits: CodecLimits,
    alive: AtomicBool,
    delivered: AtomicU64,
}

impl<S: SurfaceComposer> LoopbackTransport<S> {
    /// Connect to a stub with default limits
    pub fn new(stub: Arc<ComposerStub<S>>) -> Self {
        Self::with_limits(stub, CodecLimits::default())
    }

    /// Connect to a stub, rebuilding parcels with the given limits
    pub fn with_limits(stub: Arc<ComposerStub<S>>, limits: CodecLimits) -> Self {
        Self { stub, limits, alive: AtomicBool::new(true), delivered: AtomicU64::new(0) }
    }

    /// Stub on the far side
    pub fn stub(&self) -> &Arc<ComposerStub<S>> {
        &self.stub
    }

    /// Simulate the service process going away
    pub fn kill(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Bring the endpoint back
    pub fn revive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    /// False after [`kill`](Self::kill)
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Number of transactions that reached the stub
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn copy(&self, parcel: Parcel) -> Result<Parcel, TransportError> {
        let (bytes, objects) = parcel.into_parts();
        Parcel::from_parts(&bytes, objects, self.limits)
            .map_err(|err| TransportError::Failed(err.to_string()))
    }
}

impl<S: SurfaceComposer> Transport for LoopbackTransport<S> {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        if !self.is_alive() {
            return Err(TransportError::DeadObject);
        }

        let request = self.copy(txn.data)?;
        let reply = self.stub.on_transact(txn.code, &request, txn.flags);
        self.delivered.fetch_add(1, Ordering::Relaxed);
        drop(request);

        if txn.flags.contains(TransactFlags::ONE_WAY) {
            return Ok(Parcel::new());
        }
        self.copy(reply)
    }
}
