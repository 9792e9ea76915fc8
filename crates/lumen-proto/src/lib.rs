//! # Lumen Protocol: Wire Format
//!
//! This crate implements the parcel codec for the Lumen surface-composer RPC
//! protocol: the layer that turns method arguments and results into linear
//! byte buffers plus a table of transferable object references.
//!
//! ## Protocol Design
//!
//! A transaction carries a method code (in the transport envelope) and a
//! [`Parcel`]:
//!
//! - **Request**: `[interface token][arguments in declared order]`
//! - **Reply**: `[status][results in declared order]`
//!
//! Fields have no tags. The declared order of each operation *is* the schema,
//! so proxy and stub must agree on every [`MethodCode`].
//!
//! ## Implementation Notes
//!
//! - **Fixed Byte Order**: All scalars are little-endian and every item is
//!   padded to a 4-byte boundary.
//!
//! - **Fixed Blocks**: [`DisplayInfo`](records::DisplayInfo) is copied as a
//!   raw 32-byte block using [`zerocopy`](https://docs.rs/zerocopy), never
//!   field by field.
//!
//! - **Object References**: [`ObjectRef`] handles travel in the parcel's
//!   object table. The byte buffer only holds a `[kind][index]` marker, so a
//!   null reference is representable and distinct from an omitted one.
//!
//! ## Security Properties
//!
//! - **Bounded Reads**: Every read checks the remaining length first. Counts
//!   are validated against the remaining bytes before any element is decoded.
//!
//! - **Explicit Outcomes**: Every write and read returns a `Result`. There
//!   are no unchecked fast paths.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codes;
pub mod errors;
pub mod flags;
pub mod limits;
pub mod object;
pub mod parcel;
pub mod records;
pub mod status;
pub mod token;

pub use codes::MethodCode;
pub use errors::{ProtocolError, Result};
pub use flags::{DisplayChange, LayerChange, TransactFlags, TransactionFlags};
pub use limits::CodecLimits;
pub use object::{HandleId, HandleTable, Interface, ObjectRef, ReferenceError};
pub use parcel::{Parcel, ParcelReader};
pub use records::{
    ComposerState, DisplayInfo, DisplayState, LayerState, Matrix22, PixelFormat, Rect, Region,
    WireRecord,
};
pub use status::Status;
pub use token::SURFACE_COMPOSER_DESCRIPTOR;
