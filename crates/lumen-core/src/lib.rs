//! Lumen protocol core logic
//!
//! This crate contains both ends of a surface-composer call: the client-side
//! [`ComposerProxy`] that encodes requests and decodes replies, and the
//! service-side [`ComposerStub`] that authenticates, decodes and dispatches
//! requests to a [`SurfaceComposer`] implementation.
//!
//! # Architecture
//!
//! ```text
//!  caller                                            compositor
//!    │                                                   ▲
//!    ▼                                                   │
//! ComposerProxy ──Transaction──▶ Transport ──▶ ComposerStub
//!    ▲                              │                │
//!    └──────────── reply Parcel ◀───┘◀───────────────┘
//! ```
//!
//! Neither side does I/O. The [`Transport`] trait is the only seam between
//! them; it can be an in-process loopback, a fault-injecting test double, or
//! a real IPC driver.
//!
//! # Key Principles
//!
//! - Decode Before Invoke: the stub decodes every argument before calling the
//!   service, so a malformed request never partially applies.
//! - Scoped Failures: every failure is local to one call and carries a
//!   [`CallError`] that says which side and which layer failed.
//! - Shared Table: proxy and stub both use [`MethodCode`](lumen_proto::MethodCode),
//!   so a code cannot mean different things on the two sides.
//!
//! # Modules
//!
//! - [`composer`]: Service trait and call results
//! - [`proxy`]: Client-side encoder
//! - [`stub`]: Service-side dispatcher
//! - [`transport`]: Transaction envelope and transport trait
//! - [`error`]: Call-level error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod composer;
pub mod error;
pub mod proxy;
pub mod stub;
pub mod transport;

pub use composer::{DISPLAY_ID_HDMI, DISPLAY_ID_MAIN, ScreenCapture, SurfaceComposer};
pub use error::{CallError, TransportError};
pub use proxy::ComposerProxy;
pub use stub::ComposerStub;
pub use transport::{Transaction, Transport};
