//! Per-display state changes submitted through `setTransactionState`.

use super::{Rect, WireRecord};
use crate::{DisplayChange, ObjectRef, Parcel, ParcelReader, Result, parcel::OBJECT_MARKER_SIZE};

/// Pending changes for one display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    /// Display the changes apply to
    pub token: Option<ObjectRef>,
    /// Surface the display renders into
    pub surface: Option<ObjectRef>,
    /// Which fields changed
    pub what: DisplayChange,
    /// Layer stack shown on the display
    pub layer_stack: u32,
    /// Rotation, one of the `ORIENTATION_*` constants
    pub orientation: u32,
    /// Part of the layer stack that is shown
    pub viewport: Rect,
    /// Where the viewport lands on the display
    pub frame: Rect,
}

impl DisplayState {
    /// No rotation
    pub const ORIENTATION_DEFAULT: u32 = 0;
    /// Rotated 90 degrees
    pub const ORIENTATION_90: u32 = 1;
    /// Rotated 180 degrees
    pub const ORIENTATION_180: u32 = 2;
    /// Rotated 270 degrees
    pub const ORIENTATION_270: u32 = 3;

    /// Empty change set for a display
    #[must_use]
    pub fn new(token: ObjectRef) -> Self {
        Self {
            token: Some(token),
            surface: None,
            what: DisplayChange::empty(),
            layer_stack: 0,
            orientation: Self::ORIENTATION_DEFAULT,
            viewport: Rect::default(),
            frame: Rect::default(),
        }
    }

    /// Change set that moves the display to another layer stack
    #[must_use]
    pub fn with_layer_stack(token: ObjectRef, layer_stack: u32) -> Self {
        Self { what: DisplayChange::LAYER_STACK, layer_stack, ..Self::new(token) }
    }
}

impl WireRecord for DisplayState {
    const MIN_WIRE_SIZE: usize = 2 * OBJECT_MARKER_SIZE + 3 * 4 + 2 * Rect::MIN_WIRE_SIZE;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_object(self.token.as_ref())?;
        parcel.write_object(self.surface.as_ref())?;
        parcel.write_u32(self.what.bits())?;
        parcel.write_u32(self.layer_stack)?;
        parcel.write_u32(self.orientation)?;
        parcel.write_record(&self.viewport)?;
        parcel.write_record(&self.frame)
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        Ok(Self {
            token: reader.read_object()?,
            surface: reader.read_object()?,
            what: DisplayChange::from_raw(reader.read_u32()?),
            layer_stack: reader.read_u32()?,
            orientation: reader.read_u32()?,
            viewport: reader.read_record()?,
            frame: reader.read_record()?,
        })
    }
}
