//! Surface-composer service interface.
//!
//! [`SurfaceComposer`] is what a compositor implements to be reachable
//! through a [`ComposerStub`](crate::ComposerStub). Arguments arrive fully
//! decoded; object arguments are owning [`ObjectRef`]s that may be null
//! because the wire allows it.
//!
//! Implementations are shared across threads and invoked concurrently. Any
//! internal state needs its own synchronization.

use std::sync::Arc;

use lumen_proto::{
    ComposerState, DisplayInfo, DisplayState, ObjectRef, PixelFormat, Status, TransactionFlags,
};

/// Built-in display id of the main panel
pub const DISPLAY_ID_MAIN: i32 = 0;

/// Built-in display id of the HDMI output
pub const DISPLAY_ID_HDMI: i32 = 1;

/// Result of a successful screen capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenCapture {
    /// Shared heap holding the pixels
    pub heap: ObjectRef,
    /// Captured width in pixels
    pub width: u32,
    /// Captured height in pixels
    pub height: u32,
    /// Pixel format of the heap contents
    pub format: PixelFormat,
}

/// Display-compositor control service.
pub trait SurfaceComposer: Send + Sync {
    /// Open a client connection context for creating surfaces
    fn create_connection(&self) -> ObjectRef;

    /// Obtain the graphic buffer allocator
    fn create_graphic_buffer_allocator(&self) -> ObjectRef;

    /// Shared control block heap, if the service exposes one
    fn get_control_block(&self) -> Option<ObjectRef>;

    /// Apply a batch of layer and display changes.
    ///
    /// Entries are delivered in the order the client wrote them. Later entries
    /// for the same target override earlier ones.
    fn set_transaction_state(
        &self,
        state: Vec<ComposerState>,
        displays: Vec<DisplayState>,
        flags: TransactionFlags,
    );

    /// Client-side boot setup is complete
    fn boot_finished(&self);

    /// Capture the layers of `display` with z in `min_layer_z..=max_layer_z`.
    ///
    /// A requested size of zero means the display's full size.
    ///
    /// # Errors
    ///
    /// An application status, e.g. `BAD_VALUE` for an unknown display.
    fn capture_screen(
        &self,
        display: Option<ObjectRef>,
        req_width: u32,
        req_height: u32,
        min_layer_z: u32,
        max_layer_z: u32,
    ) -> Result<ScreenCapture, Status>;

    /// True only if `texture` was issued by this service
    fn authenticate_surface_texture(&self, texture: Option<ObjectRef>) -> bool;

    /// Open a vsync/hotplug event stream
    fn create_display_event_connection(&self) -> ObjectRef;

    /// Create a virtual display
    fn create_display(&self, name: &str, secure: bool) -> Option<ObjectRef>;

    /// Look up a built-in display by id
    fn get_built_in_display(&self, id: i32) -> Option<ObjectRef>;

    /// Power a display down. Idempotent.
    fn blank(&self, display: Option<ObjectRef>);

    /// Power a display up. Idempotent.
    fn unblank(&self, display: Option<ObjectRef>);

    /// Descriptor of a display
    ///
    /// # Errors
    ///
    /// An application status, e.g. `NAME_NOT_FOUND` for an unknown display.
    fn get_display_info(&self, display: Option<ObjectRef>) -> Result<DisplayInfo, Status>;
}

impl<S: SurfaceComposer + ?Sized> SurfaceComposer for Arc<S> {
    fn create_connection(&self) -> ObjectRef {
        (**self).create_connection()
    }

    fn create_graphic_buffer_allocator(&self) -> ObjectRef {
        (**self).create_graphic_buffer_allocator()
    }

    fn get_control_block(&self) -> Option<ObjectRef> {
        (**self).get_control_block()
    }

    fn set_transaction_state(
        &self,
        state: Vec<ComposerState>,
        displays: Vec<DisplayState>,
        flags: TransactionFlags,
    ) {
        (**self).set_transaction_state(state, displays, flags);
    }

    fn boot_finished(&self) {
        (**self).boot_finished();
    }

    fn capture_screen(
        &self,
        display: Option<ObjectRef>,
        req_width: u32,
        req_height: u32,
        min_layer_z: u32,
        max_layer_z: u32,
    ) -> Result<ScreenCapture, Status> {
        (**self).capture_screen(display, req_width, req_height, min_layer_z, max_layer_z)
    }

    fn authenticate_surface_texture(&self, texture: Option<ObjectRef>) -> bool {
        (**self).authenticate_surface_texture(texture)
    }

    fn create_display_event_connection(&self) -> ObjectRef {
        (**self).create_display_event_connection()
    }

    fn create_display(&self, name: &str, secure: bool) -> Option<ObjectRef> {
        (**self).create_display(name, secure)
    }

    fn get_built_in_display(&self, id: i32) -> Option<ObjectRef> {
        (**self).get_built_in_display(id)
    }

    fn blank(&self, display: Option<ObjectRef>) {
        (**self).blank(display);
    }

    fn unblank(&self, display: Option<ObjectRef>) {
        (**self).unblank(display);
    }

    fn get_display_info(&self, display: Option<ObjectRef>) -> Result<DisplayInfo, Status> {
        (**self).get_display_info(display)
    }
}
