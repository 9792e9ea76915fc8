//! Test harness for the Lumen surface-composer protocol.
//!
//! This crate provides in-process implementations of the `Transport` and
//! `SurfaceComposer` traits so the full proxy → transport → stub → service
//! path can be exercised without a real IPC driver:
//!
//! - [`LoopbackTransport`]: round-trips every parcel through raw bytes and a
//!   rebuilt object table, and can simulate a dead endpoint
//! - [`FaultyTransport`]: wraps another transport and injects drops and
//!   truncations from a seeded RNG, so failures reproduce exactly
//! - [`FakeCompositor`]: reference compositor with displays, layers, issued
//!   textures and per-operation call counters

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compositor;
pub mod faults;
pub mod loopback;
pub mod objects;

pub use compositor::FakeCompositor;
pub use faults::{FaultConfig, FaultStats, FaultyTransport};
pub use loopback::LoopbackTransport;
