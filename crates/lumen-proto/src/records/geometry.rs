//! Geometry records: rectangles, regions and 2x2 transforms.

use super::WireRecord;
use crate::{Parcel, ParcelReader, Result};

/// Axis-aligned rectangle, edges in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive)
    pub left: i32,
    /// Top edge (inclusive)
    pub top: i32,
    /// Right edge (exclusive)
    pub right: i32,
    /// Bottom edge (exclusive)
    pub bottom: i32,
}

impl Rect {
    /// Rectangle from origin and size
    #[must_use]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self { left: 0, top: 0, right: width, bottom: height }
    }

    /// Width, or zero for an inverted rectangle
    #[must_use]
    pub const fn width(&self) -> i32 {
        let width = self.right.saturating_sub(self.left);
        if width > 0 { width } else { 0 }
    }

    /// Height, or zero for an inverted rectangle
    #[must_use]
    pub const fn height(&self) -> i32 {
        let height = self.bottom.saturating_sub(self.top);
        if height > 0 { height } else { 0 }
    }

    /// True if the rectangle covers no pixels
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl WireRecord for Rect {
    const MIN_WIRE_SIZE: usize = 16;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i32(self.left)?;
        parcel.write_i32(self.top)?;
        parcel.write_i32(self.right)?;
        parcel.write_i32(self.bottom)
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        Ok(Self {
            left: reader.read_i32()?,
            top: reader.read_i32()?,
            right: reader.read_i32()?,
            bottom: reader.read_i32()?,
        })
    }
}

/// Set of rectangles, in the order they were added
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    /// Component rectangles
    pub rects: Vec<Rect>,
}

impl Region {
    /// Region covering a single rectangle
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self { rects: vec![rect] }
    }

    /// True if no rectangle covers any pixel
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.iter().all(Rect::is_empty)
    }
}

impl WireRecord for Region {
    // count only
    const MIN_WIRE_SIZE: usize = 4;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_records(&self.rects)
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        Ok(Self { rects: reader.read_sequence()? })
    }
}

/// 2x2 layer transform, written in place as four floats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix22 {
    /// ds/dx
    pub dsdx: f32,
    /// dt/dx
    pub dtdx: f32,
    /// ds/dy
    pub dsdy: f32,
    /// dt/dy
    pub dtdy: f32,
}

impl Matrix22 {
    /// Size of the in-place block
    pub const SIZE: usize = 16;

    /// Identity transform
    pub const IDENTITY: Self = Self { dsdx: 1.0, dtdx: 0.0, dsdy: 0.0, dtdy: 1.0 };

    fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.dsdx.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.dtdx.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.dsdy.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.dtdy.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let float = |at: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[at..at + 4]);
            f32::from_le_bytes(raw)
        };
        Self { dsdx: float(0), dtdx: float(4), dsdy: float(8), dtdy: float(12) }
    }
}

impl Default for Matrix22 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl WireRecord for Matrix22 {
    const MIN_WIRE_SIZE: usize = Self::SIZE;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_blob(&self.to_bytes())
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        reader.read_blob_in_place(Self::SIZE).map(Self::from_bytes)
    }
}

#[cfg(test)]
pub(crate) mod arbitrary {
    use proptest::prelude::*;

    use super::*;

    pub fn rect() -> impl Strategy<Value = Rect> {
        (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>())
            .prop_map(|(left, top, right, bottom)| Rect { left, top, right, bottom })
    }

    pub fn region() -> impl Strategy<Value = Region> {
        prop::collection::vec(rect(), 0..8).prop_map(|rects| Region { rects })
    }

    pub fn matrix() -> impl Strategy<Value = Matrix22> {
        (-4.0f32..4.0, -4.0f32..4.0, -4.0f32..4.0, -4.0f32..4.0)
            .prop_map(|(dsdx, dtdx, dsdy, dtdy)| Matrix22 { dsdx, dtdx, dsdy, dtdy })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ProtocolError;

    #[test]
    fn rect_dimensions() {
        let rect = Rect { left: 10, top: 20, right: 110, bottom: 70 };
        assert_eq!((rect.width(), rect.height()), (100, 50));
        assert!(!rect.is_empty());
        assert!(Rect { left: 5, top: 0, right: 1, bottom: 9 }.is_empty());
    }

    #[test]
    fn matrix_is_sixteen_bytes_in_place() {
        let mut parcel = Parcel::new();
        parcel.write_record(&Matrix22::IDENTITY).unwrap();
        assert_eq!(parcel.len(), 16);
        assert_eq!(&parcel.data()[0..4], &1.0f32.to_le_bytes());
    }

    #[test]
    fn truncated_region_fails() {
        let mut parcel = Parcel::new();
        parcel.write_i32(3).unwrap();
        parcel.write_record(&Rect::from_size(1, 1)).unwrap();
        assert_eq!(
            parcel.reader().read_record::<Region>(),
            Err(ProtocolError::SequenceOverrun { count: 3, needed: 48, remaining: 16 })
        );
    }

    proptest! {
        #[test]
        fn region_round_trip(region in arbitrary::region()) {
            let mut parcel = Parcel::new();
            parcel.write_record(&region).unwrap();
            let mut reader = parcel.reader();
            prop_assert_eq!(reader.read_record::<Region>().unwrap(), region);
            prop_assert_eq!(reader.remaining(), 0);
        }

        #[test]
        fn matrix_round_trip(matrix in arbitrary::matrix()) {
            let mut parcel = Parcel::new();
            parcel.write_record(&matrix).unwrap();
            prop_assert_eq!(parcel.reader().read_record::<Matrix22>().unwrap(), matrix);
        }
    }
}
