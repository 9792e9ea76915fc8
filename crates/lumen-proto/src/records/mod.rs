//! Structured records carried in parcels.
//!
//! Each record writes its fields in a fixed order and reads them back in the
//! same order. Records nest: a [`LayerState`] contains a [`Matrix22`], a crop
//! [`Rect`] and a transparent [`Region`].
//!
//! [`DisplayInfo`] is the exception. It is a fixed 32-byte block copied in
//! place rather than written field by field.

mod display_info;
mod display_state;
mod geometry;
mod layer_state;

pub use display_info::{DisplayInfo, PixelFormat};
pub use display_state::DisplayState;
pub use geometry::{Matrix22, Rect, Region};
pub use layer_state::{ComposerState, LayerState};

use crate::{Parcel, ParcelReader, Result};

/// A record with a fixed field order on the wire.
pub trait WireRecord: Sized {
    /// Smallest number of bytes one encoded record occupies.
    ///
    /// Used to reject sequence counts that cannot possibly fit in the bytes
    /// remaining, before any element is decoded.
    const MIN_WIRE_SIZE: usize;

    /// Append this record to a parcel
    fn write_to(&self, parcel: &mut Parcel) -> Result<()>;

    /// Read one record at the reader's cursor
    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self>;
}
