//! Fixed display descriptor block.
//!
//! `getDisplayInfo` transfers its result as a raw 32-byte block. The block is
//! written and read in place, so the receiver sees exactly the bytes the
//! sender produced, including the reserved bytes.

use std::fmt;

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use super::WireRecord;
use crate::{Parcel, ParcelReader, Result};

/// Pixel format code
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat(pub i32);

impl PixelFormat {
    /// No format / unknown
    pub const UNKNOWN: Self = Self(0);
    /// 32-bit RGBA, 8 bits per channel
    pub const RGBA_8888: Self = Self(1);
    /// 32-bit RGB with unused alpha byte
    pub const RGBX_8888: Self = Self(2);
    /// 24-bit packed RGB
    pub const RGB_888: Self = Self(3);
    /// 16-bit RGB, 5-6-5
    pub const RGB_565: Self = Self(4);
    /// 32-bit BGRA, 8 bits per channel
    pub const BGRA_8888: Self = Self(5);

    /// Bytes per pixel, or `None` for unknown formats
    #[must_use]
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self.0 {
            1 | 2 | 5 => Some(4),
            3 => Some(3),
            4 => Some(2),
            _ => None,
        }
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::RGBA_8888 => "RGBA_8888",
            Self::RGBX_8888 => "RGBX_8888",
            Self::RGB_888 => "RGB_888",
            Self::RGB_565 => "RGB_565",
            Self::BGRA_8888 => "BGRA_8888",
            Self::UNKNOWN => "UNKNOWN",
            Self(other) => return write!(f, "PixelFormat({other})"),
        };
        write!(f, "PixelFormat::{name}")
    }
}

/// Display descriptor, 32 bytes, little-endian.
///
/// ```text
/// 0..4    width        u32
/// 4..8    height       u32
/// 8..12   xdpi         f32
/// 12..16  ydpi         f32
/// 16..20  fps          f32
/// 20..24  density      f32
/// 24      orientation  u8
/// 25      secure       u8
/// 26..28  reserved
/// 28..32  pixel format i32
/// ```
///
/// Fields are stored as byte arrays so any 32-byte pattern is a valid value
/// and the struct can be cast from untrusted bytes.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DisplayInfo {
    width: [u8; 4],
    height: [u8; 4],
    xdpi: [u8; 4],
    ydpi: [u8; 4],
    fps: [u8; 4],
    density: [u8; 4],
    orientation: u8,
    secure: u8,
    reserved: [u8; 2],
    pixel_format: [u8; 4],
}

impl DisplayInfo {
    /// Size of the block
    pub const SIZE: usize = 32;

    /// Descriptor with the given panel size and every other field zeroed
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut info = Self::new_zeroed();
        info.set_width(width);
        info.set_height(height);
        info
    }

    /// Raw block bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(self.as_bytes());
        bytes
    }

    /// Copy a block out of raw bytes. Returns `None` unless `bytes` is
    /// exactly [`Self::SIZE`] long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        u32::from_le_bytes(self.width)
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        u32::from_le_bytes(self.height)
    }

    /// Horizontal density in dots per inch
    #[must_use]
    pub fn xdpi(&self) -> f32 {
        f32::from_le_bytes(self.xdpi)
    }

    /// Vertical density in dots per inch
    #[must_use]
    pub fn ydpi(&self) -> f32 {
        f32::from_le_bytes(self.ydpi)
    }

    /// Refresh rate in frames per second
    #[must_use]
    pub fn fps(&self) -> f32 {
        f32::from_le_bytes(self.fps)
    }

    /// Logical density scale
    #[must_use]
    pub fn density(&self) -> f32 {
        f32::from_le_bytes(self.density)
    }

    /// Panel orientation
    #[must_use]
    pub fn orientation(&self) -> u8 {
        self.orientation
    }

    /// True if the display is secure
    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure != 0
    }

    /// Reserved bytes, carried verbatim
    #[must_use]
    pub fn reserved(&self) -> [u8; 2] {
        self.reserved
    }

    /// Native pixel format
    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat(i32::from_le_bytes(self.pixel_format))
    }

    /// Set the width
    pub fn set_width(&mut self, width: u32) {
        self.width = width.to_le_bytes();
    }

    /// Set the height
    pub fn set_height(&mut self, height: u32) {
        self.height = height.to_le_bytes();
    }

    /// Set both densities
    pub fn set_dpi(&mut self, xdpi: f32, ydpi: f32) {
        self.xdpi = xdpi.to_le_bytes();
        self.ydpi = ydpi.to_le_bytes();
    }

    /// Set the refresh rate
    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps.to_le_bytes();
    }

    /// Set the density scale
    pub fn set_density(&mut self, density: f32) {
        self.density = density.to_le_bytes();
    }

    /// Set the orientation
    pub fn set_orientation(&mut self, orientation: u8) {
        self.orientation = orientation;
    }

    /// Set the secure flag
    pub fn set_secure(&mut self, secure: bool) {
        self.secure = u8::from(secure);
    }

    /// Set the pixel format
    pub fn set_pixel_format(&mut self, format: PixelFormat) {
        self.pixel_format = format.0.to_le_bytes();
    }
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl fmt::Debug for DisplayInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayInfo")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("xdpi", &self.xdpi())
            .field("ydpi", &self.ydpi())
            .field("fps", &self.fps())
            .field("density", &self.density())
            .field("orientation", &self.orientation)
            .field("secure", &self.secure())
            .field("pixel_format", &self.pixel_format())
            .finish()
    }
}

impl WireRecord for DisplayInfo {
    const MIN_WIRE_SIZE: usize = Self::SIZE;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_blob(self.as_bytes())
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        let bytes = reader.read_blob_in_place(Self::SIZE)?;
        // read_blob_in_place returns exactly SIZE bytes
        Ok(Self::from_bytes(bytes).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ProtocolError;

    #[test]
    fn block_is_thirty_two_bytes() {
        assert_eq!(std::mem::size_of::<DisplayInfo>(), DisplayInfo::SIZE);
    }

    #[test]
    fn field_offsets() {
        let mut info = DisplayInfo::new(1280, 720);
        info.set_orientation(3);
        info.set_secure(true);
        info.set_pixel_format(PixelFormat::RGB_565);

        let bytes = info.to_bytes();
        assert_eq!(&bytes[0..4], &1280u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &720u32.to_le_bytes());
        assert_eq!(bytes[24], 3);
        assert_eq!(bytes[25], 1);
        assert_eq!(&bytes[28..32], &4i32.to_le_bytes());
    }

    #[test]
    fn short_block_fails() {
        let mut parcel = Parcel::new();
        parcel.write_blob(&[0u8; 16]).unwrap();
        assert_eq!(
            parcel.reader().read_record::<DisplayInfo>(),
            Err(ProtocolError::Truncated { needed: 32, remaining: 16 })
        );
    }

    #[test]
    fn pixel_format_sizes() {
        assert_eq!(PixelFormat::RGBA_8888.bytes_per_pixel(), Some(4));
        assert_eq!(PixelFormat::RGB_565.bytes_per_pixel(), Some(2));
        assert_eq!(PixelFormat(99).bytes_per_pixel(), None);
        assert_eq!(format!("{:?}", PixelFormat(99)), "PixelFormat(99)");
    }

    proptest! {
        #[test]
        fn block_is_copied_byte_for_byte(raw in prop::array::uniform32(any::<u8>())) {
            let info = DisplayInfo::from_bytes(&raw).unwrap();
            let mut parcel = Parcel::new();
            parcel.write_record(&info).unwrap();
            prop_assert_eq!(parcel.data(), &raw[..]);

            let decoded: DisplayInfo = parcel.reader().read_record().unwrap();
            prop_assert_eq!(decoded.to_bytes(), raw);
        }
    }
}
