//! Per-layer state changes submitted through `setTransactionState`.

use super::{Matrix22, Rect, Region, WireRecord};
use crate::{LayerChange, ObjectRef, Parcel, ParcelReader, Result, parcel::OBJECT_MARKER_SIZE};

/// Pending changes for one layer.
///
/// Only the fields named in `what` are meaningful to the receiver; the rest
/// are still transferred so the layout stays fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    /// Client-local surface identifier
    pub surface: i32,
    /// Which fields changed
    pub what: LayerChange,
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Z order within the layer stack
    pub z: u32,
    /// Requested width
    pub w: u32,
    /// Requested height
    pub h: u32,
    /// Layer stack the layer belongs to
    pub layer_stack: u32,
    /// Plane alpha, 0.0 to 1.0
    pub alpha: f32,
    /// Visibility flags
    pub flags: u32,
    /// Which bits of `flags` apply
    pub mask: u32,
    /// Transform
    pub matrix: Matrix22,
    /// Crop rectangle
    pub crop: Rect,
    /// Region the client declares fully transparent
    pub transparent_region: Region,
}

impl LayerState {
    /// Visibility flag: layer is hidden
    pub const FLAG_HIDDEN: u32 = 0x01;

    /// Visibility flag: layer content is opaque
    pub const FLAG_OPAQUE: u32 = 0x02;

    /// Empty change set for a surface
    #[must_use]
    pub fn new(surface: i32) -> Self {
        Self {
            surface,
            what: LayerChange::empty(),
            x: 0.0,
            y: 0.0,
            z: 0,
            w: 0,
            h: 0,
            layer_stack: 0,
            alpha: 1.0,
            flags: 0,
            mask: 0,
            matrix: Matrix22::IDENTITY,
            crop: Rect::default(),
            transparent_region: Region::default(),
        }
    }
}

impl WireRecord for LayerState {
    // 11 scalars, matrix, crop, region count
    const MIN_WIRE_SIZE: usize = 11 * 4 + Matrix22::SIZE + Rect::MIN_WIRE_SIZE + 4;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i32(self.surface)?;
        parcel.write_u32(self.what.bits())?;
        parcel.write_f32(self.x)?;
        parcel.write_f32(self.y)?;
        parcel.write_u32(self.z)?;
        parcel.write_u32(self.w)?;
        parcel.write_u32(self.h)?;
        parcel.write_u32(self.layer_stack)?;
        parcel.write_f32(self.alpha)?;
        parcel.write_u32(self.flags)?;
        parcel.write_u32(self.mask)?;
        parcel.write_record(&self.matrix)?;
        parcel.write_record(&self.crop)?;
        parcel.write_record(&self.transparent_region)
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        Ok(Self {
            surface: reader.read_i32()?,
            what: LayerChange::from_raw(reader.read_u32()?),
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_u32()?,
            w: reader.read_u32()?,
            h: reader.read_u32()?,
            layer_stack: reader.read_u32()?,
            alpha: reader.read_f32()?,
            flags: reader.read_u32()?,
            mask: reader.read_u32()?,
            matrix: reader.read_record()?,
            crop: reader.read_record()?,
            transparent_region: reader.read_record()?,
        })
    }
}

/// A layer state addressed to a client connection
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerState {
    /// Connection that owns the surface
    pub client: Option<ObjectRef>,
    /// Changes for the surface
    pub state: LayerState,
}

impl WireRecord for ComposerState {
    const MIN_WIRE_SIZE: usize = OBJECT_MARKER_SIZE + LayerState::MIN_WIRE_SIZE;

    fn write_to(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_object(self.client.as_ref())?;
        parcel.write_record(&self.state)
    }

    fn read_from(reader: &mut ParcelReader<'_>) -> Result<Self> {
        let client = reader.read_object()?;
        let state = reader.read_record()?;
        Ok(Self { client, state })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::{
        HandleTable, Interface, ProtocolError,
        records::geometry::arbitrary::{matrix, rect, region},
    };

    struct Client;

    impl Interface for Client {
        const DESCRIPTOR: &'static str = "test.Client";
    }

    fn arb_layer_state() -> impl Strategy<Value = LayerState> {
        (
            (any::<i32>(), any::<u32>(), -1e4f32..1e4, -1e4f32..1e4, any::<u32>()),
            (any::<u32>(), any::<u32>(), any::<u32>(), 0.0f32..=1.0, any::<u32>(), any::<u32>()),
            (matrix(), rect(), region()),
        )
            .prop_map(
                |(
                    (surface, what, x, y, z),
                    (w, h, layer_stack, alpha, flags, mask),
                    (matrix, crop, transparent_region),
                )| LayerState {
                    surface,
                    what: LayerChange::from_raw(what),
                    x,
                    y,
                    z,
                    w,
                    h,
                    layer_stack,
                    alpha,
                    flags,
                    mask,
                    matrix,
                    crop,
                    transparent_region,
                },
            )
    }

    #[test]
    fn minimum_size_matches_empty_encoding() {
        let mut parcel = Parcel::new();
        parcel.write_record(&LayerState::new(1)).unwrap();
        assert_eq!(parcel.len(), LayerState::MIN_WIRE_SIZE);
        assert_eq!(LayerState::MIN_WIRE_SIZE, 80);
    }

    #[test]
    fn composer_state_carries_client() {
        let table = HandleTable::new();
        let client = table.register(Arc::new(Client));
        let state = ComposerState { client: Some(client.clone()), state: LayerState::new(3) };

        let mut parcel = Parcel::new();
        parcel.write_record(&state).unwrap();
        assert_eq!(parcel.objects().len(), 1);

        let decoded: ComposerState = parcel.reader().read_record().unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.client.as_ref(), Some(&client));
    }

    #[test]
    fn truncated_layer_state_releases_client() {
        let table = HandleTable::new();
        let client = table.register(Arc::new(Client));
        let mut parcel = Parcel::new();
        parcel
            .write_record(&ComposerState { client: Some(client.clone()), state: LayerState::new(1) })
            .unwrap();

        let (bytes, objects) = parcel.into_parts();
        let cut = Parcel::from_parts(&bytes[..40], objects, Default::default()).unwrap();
        let result = cut.reader().read_record::<ComposerState>();
        assert!(matches!(result, Err(ProtocolError::Truncated { .. })));

        drop(cut);
        assert_eq!(table.strong_count(client.id()), 1);
    }

    proptest! {
        #[test]
        fn layer_state_round_trip(state in arb_layer_state()) {
            let mut parcel = Parcel::new();
            parcel.write_record(&state).unwrap();
            let mut reader = parcel.reader();
            prop_assert_eq!(reader.read_record::<LayerState>().unwrap(), state);
            prop_assert_eq!(reader.remaining(), 0);
        }

        #[test]
        fn composer_state_round_trip(with_client in any::<bool>(), state in arb_layer_state()) {
            let table = HandleTable::new();
            let client = with_client.then(|| table.register(Arc::new(Client)));
            let composer = ComposerState { client: client.clone(), state };

            let mut parcel = Parcel::new();
            parcel.write_record(&composer).unwrap();
            prop_assert_eq!(parcel.objects().len(), usize::from(with_client));

            let mut reader = parcel.reader();
            let decoded = reader.read_record::<ComposerState>().unwrap();
            prop_assert_eq!(reader.remaining(), 0);
            prop_assert_eq!(decoded.client.as_ref().map(ObjectRef::id), client.as_ref().map(ObjectRef::id));
            prop_assert_eq!(decoded, composer);
        }
    }
}
