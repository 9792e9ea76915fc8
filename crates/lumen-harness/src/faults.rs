//! Deterministic fault injection.
//!
//! [`FaultyTransport`] wraps another transport and, per transaction, may:
//!
//! - drop it before delivery (`TransportError::Failed`)
//! - truncate the request bytes before delivery
//! - truncate the reply bytes after delivery
//!
//! Decisions come from a ChaCha20 RNG seeded by the caller, so a failing
//! seed reproduces the exact same fault sequence on every run.
//!
//! # Determinism
//!
//! With a fixed seed and a single calling thread, the fault sequence is a
//! pure function of the seed and the call order. Concurrent callers share the
//! RNG behind a mutex, so the sequence is still drawn from the same stream,
//! but which call receives which fault depends on scheduling.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use lumen_core::{Transaction, Transport, TransportError};
use lumen_proto::Parcel;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Probability of each fault, per transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Drop the transaction before delivery
    pub drop_rate: f64,
    /// Cut the request short before delivery
    pub truncate_request_rate: f64,
    /// Cut the reply short after delivery
    pub truncate_reply_rate: f64,
}

impl FaultConfig {
    /// No faults at all
    pub const NONE: Self = Self { drop_rate: 0.0, truncate_request_rate: 0.0, truncate_reply_rate: 0.0 };

    /// Same rate for every fault kind
    #[must_use]
    pub const fn uniform(rate: f64) -> Self {
        Self { drop_rate: rate, truncate_request_rate: rate, truncate_reply_rate: rate }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::NONE
    }
}

/// Number of faults injected so far, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Transactions dropped
    pub dropped: u64,
    /// Requests truncated
    pub truncated_requests: u64,
    /// Replies truncated
    pub truncated_replies: u64,
    /// Transactions passed through untouched
    pub clean: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dropped: AtomicU64,
    truncated_requests: AtomicU64,
    truncated_replies: AtomicU64,
    clean: AtomicU64,
}

enum Fault {
    Drop,
    TruncateRequest(usize),
    TruncateReply(usize),
}

/// Transport wrapper that injects seeded faults.
#[derive(Debug, Clone)]
pub struct FaultyTransport<T> {
    inner: T,
    config: FaultConfig,
    /// Shared across clones so the fault sequence continues, not restarts
    rng: Arc<Mutex<ChaCha20Rng>>,
    counters: Arc<Counters>,
}

impl<T: Transport> FaultyTransport<T> {
    /// Wrap `inner` with the given fault rates and RNG seed
    pub fn new(inner: T, config: FaultConfig, seed: u64) -> Self {
        Self {
            inner,
            config,
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Faults injected so far
    pub fn stats(&self) -> FaultStats {
        FaultStats {
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            truncated_requests: self.counters.truncated_requests.load(Ordering::Relaxed),
            truncated_replies: self.counters.truncated_replies.load(Ordering::Relaxed),
            clean: self.counters.clean.load(Ordering::Relaxed),
        }
    }

    fn pick(&self, request_len: usize) -> Option<Fault> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if rng.gen_bool(self.config.drop_rate) {
            return Some(Fault::Drop);
        }
        if request_len > 0 && rng.gen_bool(self.config.truncate_request_rate) {
            return Some(Fault::TruncateRequest(rng.gen_range(0..request_len)));
        }
        if rng.gen_bool(self.config.truncate_reply_rate) {
            // reply length is unknown yet; keep a fraction of it
            return Some(Fault::TruncateReply(rng.gen_range(0..100)));
        }
        None
    }
}

fn truncate(parcel: Parcel, keep: usize) -> Result<Parcel, TransportError> {
    let limits = parcel.limits();
    let (bytes, objects) = parcel.into_parts();
    let keep = keep.min(bytes.len());
    Parcel::from_parts(&bytes[..keep], objects, limits)
        .map_err(|err| TransportError::Failed(err.to_string()))
}

impl<T: Transport> Transport for FaultyTransport<T> {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        match self.pick(txn.data.len()) {
            None => {
                self.counters.clean.fetch_add(1, Ordering::Relaxed);
                self.inner.transact(txn)
            },
            Some(Fault::Drop) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(code = txn.code, "Injected fault: dropped transaction");
                Err(TransportError::Failed("injected: transaction dropped".to_string()))
            },
            Some(Fault::TruncateRequest(keep)) => {
                self.counters.truncated_requests.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(code = txn.code, keep, "Injected fault: truncated request");
                let data = truncate(txn.data, keep)?;
                self.inner.transact(Transaction { data, ..txn })
            },
            Some(Fault::TruncateReply(percent)) => {
                self.counters.truncated_replies.fetch_add(1, Ordering::Relaxed);
                let reply = self.inner.transact(txn)?;
                let keep = reply.len() * percent / 100;
                tracing::debug!(keep, "Injected fault: truncated reply");
                truncate(reply, keep)
            },
        }
    }
}
