//! Reference in-memory compositor.
//!
//! [`FakeCompositor`] implements [`SurfaceComposer`] with plain data: a set of
//! displays, the latest state of every layer, the textures it issued and a
//! call counter per operation. It draws nothing. Tests drive it through a
//! proxy and then inspect it directly.
//!
//! # Semantics
//!
//! - `setTransactionState` applies layer states first, then display states,
//!   each in submission order. Every entry overwrites only the fields named in
//!   its change mask, so the last write to a field wins.
//! - `blank` and `unblank` set a flag; repeating them changes nothing.
//! - `captureScreen` scales the display to fit the requested size while
//!   keeping its aspect ratio. A requested dimension of zero is unconstrained.
//! - `authenticateSurfaceTexture` is true only for textures this compositor
//!   issued via [`FakeCompositor::create_surface_texture`].

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use lumen_core::{DISPLAY_ID_HDMI, DISPLAY_ID_MAIN, ScreenCapture, SurfaceComposer};
use lumen_proto::{
    ComposerState, DisplayChange, DisplayInfo, DisplayState, HandleId, HandleTable, LayerChange,
    LayerState, MethodCode, ObjectRef, PixelFormat, Rect, Status, TransactionFlags,
};

use crate::objects::{
    BufferAllocator, Connection, DisplayEventConnection, DisplayToken, MemoryHeap, SurfaceTexture,
};

/// Size of the shared control block heap
const CONTROL_BLOCK_SIZE: usize = 4096;

/// Panel size given to virtual displays
const VIRTUAL_DISPLAY_SIZE: (u32, u32) = (1280, 720);

/// A display known to the compositor
#[derive(Debug, Clone)]
pub struct DisplayRecord {
    /// Token handed to clients
    pub token: ObjectRef,
    /// Display name
    pub name: String,
    /// Panel descriptor
    pub info: DisplayInfo,
    /// True while powered down
    pub blanked: bool,
    /// Layer stack shown on the display
    pub layer_stack: u32,
    /// Rotation
    pub orientation: u32,
    /// Part of the layer stack that is shown
    pub viewport: Rect,
    /// Where the viewport lands on the display
    pub frame: Rect,
    /// Surface the display renders into, for virtual displays
    pub surface: Option<ObjectRef>,
}

impl DisplayRecord {
    fn new(table: &Arc<HandleTable>, name: &str, info: DisplayInfo) -> Self {
        let token = table.register(Arc::new(DisplayToken { name: name.to_string() }));
        let full = Rect::from_size(
            i32::try_from(info.width()).unwrap_or(i32::MAX),
            i32::try_from(info.height()).unwrap_or(i32::MAX),
        );
        Self {
            token,
            name: name.to_string(),
            info,
            blanked: false,
            layer_stack: 0,
            orientation: DisplayState::ORIENTATION_DEFAULT,
            viewport: full,
            frame: full,
            surface: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    displays: HashMap<HandleId, DisplayRecord>,
    built_in: HashMap<i32, HandleId>,
    /// Keyed by (connection handle, surface id)
    layers: HashMap<(HandleId, i32), LayerState>,
    issued_textures: HashSet<HandleId>,
    /// Display tokens in the order their state changes were applied
    display_updates: Vec<HandleId>,
    last_flags: Option<TransactionFlags>,
    booted: bool,
}

/// In-memory compositor for tests.
#[derive(Debug)]
pub struct FakeCompositor {
    table: Arc<HandleTable>,
    allocator: ObjectRef,
    control_block: ObjectRef,
    state: Mutex<State>,
    calls: [AtomicUsize; MethodCode::ALL.len()],
    serial: AtomicU64,
}

impl FakeCompositor {
    /// Compositor with a 1280x720 main display and no HDMI output
    pub fn new() -> Self {
        let mut main = DisplayInfo::new(1280, 720);
        main.set_dpi(320.0, 320.0);
        main.set_fps(60.0);
        main.set_density(2.0);
        main.set_secure(true);
        main.set_pixel_format(PixelFormat::RGBA_8888);
        Self::with_main_display(main)
    }

    /// Compositor whose main display has the given descriptor
    pub fn with_main_display(info: DisplayInfo) -> Self {
        let table = HandleTable::new();
        let allocator = table.register(Arc::new(BufferAllocator));
        let control_block = table.register(Arc::new(MemoryHeap::plain(CONTROL_BLOCK_SIZE)));

        let compositor = Self {
            table,
            allocator,
            control_block,
            state: Mutex::new(State::default()),
            calls: Default::default(),
            serial: AtomicU64::new(1),
        };
        compositor.add_built_in(DISPLAY_ID_MAIN, "Built-in Screen", info);
        compositor
    }

    /// Attach an HDMI output
    #[must_use]
    pub fn with_hdmi(self, info: DisplayInfo) -> Self {
        self.add_built_in(DISPLAY_ID_HDMI, "HDMI Screen", info);
        self
    }

    fn add_built_in(&self, id: i32, name: &str, info: DisplayInfo) {
        let record = DisplayRecord::new(&self.table, name, info);
        let handle = record.token.id();
        let mut state = self.lock();
        state.displays.insert(handle, record);
        state.built_in.insert(id, handle);
    }

    /// Handle table every object of this compositor lives in
    pub fn table(&self) -> &Arc<HandleTable> {
        &self.table
    }

    /// Issue a texture that [`authenticate_surface_texture`] will accept.
    ///
    /// In a real system this happens through a client connection; here it is
    /// a local call.
    ///
    /// [`authenticate_surface_texture`]: SurfaceComposer::authenticate_surface_texture
    pub fn create_surface_texture(&self) -> ObjectRef {
        let texture = self.table.register(Arc::new(SurfaceTexture { serial: self.next_serial() }));
        self.lock().issued_textures.insert(texture.id());
        texture
    }

    /// Number of times the service ran an operation
    pub fn call_count(&self, method: MethodCode) -> usize {
        self.calls[method.to_u32() as usize].load(Ordering::SeqCst)
    }

    /// Number of operations the service ran, over all methods
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|count| count.load(Ordering::SeqCst)).sum()
    }

    /// Snapshot of a display's record
    pub fn display(&self, token: &ObjectRef) -> Option<DisplayRecord> {
        self.lock().displays.get(&token.id()).cloned()
    }

    /// Latest state of a layer
    pub fn layer(&self, client: &ObjectRef, surface: i32) -> Option<LayerState> {
        self.lock().layers.get(&(client.id(), surface)).cloned()
    }

    /// Display tokens in the order their state changes were applied
    pub fn display_updates(&self) -> Vec<HandleId> {
        self.lock().display_updates.clone()
    }

    /// Flags of the most recent transaction
    pub fn last_transaction_flags(&self) -> Option<TransactionFlags> {
        self.lock().last_flags
    }

    /// True once `bootFinished` was received
    pub fn is_booted(&self) -> bool {
        self.lock().booted
    }

    /// Simulate the compositor crashing: every object it hosts becomes dead
    pub fn crash(&self) {
        let state = self.lock();
        for record in state.displays.values() {
            self.table.mark_dead(record.token.id());
        }
        for texture in &state.issued_textures {
            self.table.mark_dead(*texture);
        }
        self.table.mark_dead(self.allocator.id());
        self.table.mark_dead(self.control_block.id());
    }

    fn count(&self, method: MethodCode) {
        self.calls[method.to_u32() as usize].fetch_add(1, Ordering::SeqCst);
    }

    fn next_serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a display argument to its record key
    fn display_key(&self, state: &State, display: Option<&ObjectRef>) -> Result<HandleId, Status> {
        let display = display.ok_or(Status::BAD_VALUE)?;
        if !Arc::ptr_eq(display.table(), &self.table) || display.cast::<DisplayToken>().is_err() {
            return Err(Status::NAME_NOT_FOUND);
        }
        if state.displays.contains_key(&display.id()) {
            Ok(display.id())
        } else {
            Err(Status::NAME_NOT_FOUND)
        }
    }

    fn set_blanked(&self, display: Option<ObjectRef>, blanked: bool) {
        let mut state = self.lock();
        match self.display_key(&state, display.as_ref()) {
            Ok(key) => {
                if let Some(record) = state.displays.get_mut(&key) {
                    record.blanked = blanked;
                }
            },
            Err(status) => {
                tracing::warn!(%status, blanked, "Ignoring power change for unknown display");
            },
        }
    }
}

impl Default for FakeCompositor {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_layer(target: &mut LayerState, change: &LayerState) {
    let what = change.what;
    if what.contains(LayerChange::POSITION) {
        target.x = change.x;
        target.y = change.y;
    }
    if what.contains(LayerChange::LAYER) {
        target.z = change.z;
    }
    if what.contains(LayerChange::SIZE) {
        target.w = change.w;
        target.h = change.h;
    }
    if what.contains(LayerChange::ALPHA) {
        target.alpha = change.alpha;
    }
    if what.contains(LayerChange::MATRIX) {
        target.matrix = change.matrix;
    }
    if what.contains(LayerChange::TRANSPARENT_REGION) {
        target.transparent_region = change.transparent_region.clone();
    }
    if what.contains(LayerChange::VISIBILITY) {
        target.flags = (target.flags & !change.mask) | (change.flags & change.mask);
    }
    if what.contains(LayerChange::LAYER_STACK) {
        target.layer_stack = change.layer_stack;
    }
    if what.contains(LayerChange::CROP) {
        target.crop = change.crop;
    }
    target.what |= what;
}

fn apply_display(target: &mut DisplayRecord, change: &DisplayState) {
    let what = change.what;
    if what.contains(DisplayChange::SURFACE) {
        target.surface = change.surface.clone();
    }
    if what.contains(DisplayChange::LAYER_STACK) {
        target.layer_stack = change.layer_stack;
    }
    if what.contains(DisplayChange::PROJECTION) {
        target.orientation = change.orientation;
        target.viewport = change.viewport;
        target.frame = change.frame;
    }
}

/// Largest size that fits in the request while keeping the aspect ratio.
/// Zero in a requested dimension leaves that dimension unconstrained.
fn fit(width: u32, height: u32, req_width: u32, req_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = |req: u32, full: u32| {
        if req == 0 { 1.0 } else { (f64::from(req) / f64::from(full)).min(1.0) }
    };
    let factor = scale(req_width, width).min(scale(req_height, height));

    let scaled = |full: u32| ((f64::from(full) * factor).floor() as u32).max(1);
    (scaled(width), scaled(height))
}

impl SurfaceComposer for FakeCompositor {
    fn create_connection(&self) -> ObjectRef {
        self.count(MethodCode::CreateConnection);
        self.table.register(Arc::new(Connection { serial: self.next_serial() }))
    }

    fn create_graphic_buffer_allocator(&self) -> ObjectRef {
        self.count(MethodCode::CreateGraphicBufferAllocator);
        self.allocator.clone()
    }

    fn get_control_block(&self) -> Option<ObjectRef> {
        self.count(MethodCode::GetControlBlock);
        Some(self.control_block.clone())
    }

    fn set_transaction_state(
        &self,
        state: Vec<ComposerState>,
        displays: Vec<DisplayState>,
        flags: TransactionFlags,
    ) {
        self.count(MethodCode::SetTransactionState);
        let mut current = self.lock();

        for ComposerState { client, state: change } in &state {
            let Some(client) = client.as_ref().filter(|c| c.cast::<Connection>().is_ok()) else {
                tracing::warn!(surface = change.surface, "Skipping layer state without a connection");
                continue;
            };
            let layer = current
                .layers
                .entry((client.id(), change.surface))
                .or_insert_with(|| LayerState::new(change.surface));
            apply_layer(layer, change);
        }

        for change in &displays {
            match self.display_key(&current, change.token.as_ref()) {
                Ok(key) => {
                    if let Some(record) = current.displays.get_mut(&key) {
                        apply_display(record, change);
                    }
                    current.display_updates.push(key);
                },
                Err(status) => {
                    tracing::warn!(%status, "Skipping display state for unknown display");
                },
            }
        }

        current.last_flags = Some(flags);
    }

    fn boot_finished(&self) {
        self.count(MethodCode::BootFinished);
        self.lock().booted = true;
    }

    fn capture_screen(
        &self,
        display: Option<ObjectRef>,
        req_width: u32,
        req_height: u32,
        min_layer_z: u32,
        max_layer_z: u32,
    ) -> Result<ScreenCapture, Status> {
        self.count(MethodCode::CaptureScreen);
        if min_layer_z > max_layer_z {
            return Err(Status::BAD_VALUE);
        }

        let state = self.lock();
        let key = self.display_key(&state, display.as_ref()).map_err(|_| Status::BAD_VALUE)?;
        let record = state.displays.get(&key).ok_or(Status::BAD_VALUE)?;

        let (width, height) =
            fit(record.info.width(), record.info.height(), req_width, req_height);
        let format = PixelFormat::RGBA_8888;
        let bytes_per_pixel = format.bytes_per_pixel().unwrap_or(4);

        let mut layers: Vec<&LayerState> = state
            .layers
            .values()
            .filter(|layer| layer.layer_stack == record.layer_stack)
            .filter(|layer| (min_layer_z..=max_layer_z).contains(&layer.z))
            .filter(|layer| layer.flags & LayerState::FLAG_HIDDEN == 0)
            .collect();
        layers.sort_by_key(|layer| (layer.z, layer.surface));

        let heap = MemoryHeap {
            size: width as usize * height as usize * bytes_per_pixel,
            width,
            height,
            format,
            layers: layers.iter().map(|layer| layer.surface).collect(),
        };
        Ok(ScreenCapture { heap: self.table.register(Arc::new(heap)), width, height, format })
    }

    fn authenticate_surface_texture(&self, texture: Option<ObjectRef>) -> bool {
        self.count(MethodCode::AuthenticateSurfaceTexture);
        let Some(texture) = texture else {
            return false;
        };
        Arc::ptr_eq(texture.table(), &self.table)
            && texture.cast::<SurfaceTexture>().is_ok()
            && self.lock().issued_textures.contains(&texture.id())
    }

    fn create_display_event_connection(&self) -> ObjectRef {
        self.count(MethodCode::CreateDisplayEventConnection);
        self.table.register(Arc::new(DisplayEventConnection { serial: self.next_serial() }))
    }

    fn create_display(&self, name: &str, secure: bool) -> Option<ObjectRef> {
        self.count(MethodCode::CreateDisplay);
        if name.is_empty() {
            return None;
        }

        let (width, height) = VIRTUAL_DISPLAY_SIZE;
        let mut info = DisplayInfo::new(width, height);
        info.set_fps(60.0);
        info.set_density(1.0);
        info.set_secure(secure);
        info.set_pixel_format(PixelFormat::RGBA_8888);

        let record = DisplayRecord::new(&self.table, name, info);
        let token = record.token.clone();
        self.lock().displays.insert(token.id(), record);
        Some(token)
    }

    fn get_built_in_display(&self, id: i32) -> Option<ObjectRef> {
        self.count(MethodCode::GetBuiltInDisplay);
        let state = self.lock();
        let key = state.built_in.get(&id)?;
        state.displays.get(key).map(|record| record.token.clone())
    }

    fn blank(&self, display: Option<ObjectRef>) {
        self.count(MethodCode::Blank);
        self.set_blanked(display, true);
    }

    fn unblank(&self, display: Option<ObjectRef>) {
        self.count(MethodCode::Unblank);
        self.set_blanked(display, false);
    }

    fn get_display_info(&self, display: Option<ObjectRef>) -> Result<DisplayInfo, Status> {
        self.count(MethodCode::GetDisplayInfo);
        let state = self.lock();
        let key = self.display_key(&state, display.as_ref())?;
        state.displays.get(&key).map(|record| record.info).ok_or(Status::NAME_NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit(1280, 720, 100, 200), (100, 56));
        assert_eq!(fit(1280, 720, 0, 0), (1280, 720));
        assert_eq!(fit(1280, 720, 0, 360), (640, 360));
        assert_eq!(fit(1280, 720, 4000, 4000), (1280, 720));
        assert_eq!(fit(1280, 720, 1, 1), (1, 1));
    }

    #[test]
    fn visibility_respects_mask() {
        let mut layer = LayerState::new(1);
        layer.flags = LayerState::FLAG_OPAQUE;

        let mut change = LayerState::new(1);
        change.what = LayerChange::VISIBILITY;
        change.flags = LayerState::FLAG_HIDDEN;
        change.mask = LayerState::FLAG_HIDDEN;
        apply_layer(&mut layer, &change);

        assert_eq!(layer.flags, LayerState::FLAG_OPAQUE | LayerState::FLAG_HIDDEN);
    }

    #[test]
    fn unmasked_fields_untouched() {
        let mut layer = LayerState::new(1);
        let mut change = LayerState::new(1);
        change.what = LayerChange::ALPHA;
        change.alpha = 0.5;
        change.z = 99;
        apply_layer(&mut layer, &change);

        assert_eq!(layer.alpha, 0.5);
        assert_eq!(layer.z, 0);
    }

    #[test]
    fn foreign_display_token_is_not_found() {
        let compositor = FakeCompositor::new();
        let other = FakeCompositor::new();
        let foreign = other.get_built_in_display(DISPLAY_ID_MAIN);
        assert_eq!(compositor.get_display_info(foreign), Err(Status::NAME_NOT_FOUND));
        assert_eq!(compositor.get_display_info(None), Err(Status::BAD_VALUE));
    }
}
