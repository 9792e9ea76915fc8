//! Objects handed out by [`FakeCompositor`](crate::FakeCompositor).
//!
//! They carry just enough data for tests to check what came back over the
//! wire. None of them do any rendering.

use lumen_proto::{Interface, PixelFormat};

/// Client connection context
#[derive(Debug)]
pub struct Connection {
    /// Sequence number, unique per compositor
    pub serial: u64,
}

impl Interface for Connection {
    const DESCRIPTOR: &'static str = "android.ui.ISurfaceComposerClient";
}

/// Graphic buffer allocator
#[derive(Debug, Default)]
pub struct BufferAllocator;

impl Interface for BufferAllocator {
    const DESCRIPTOR: &'static str = "android.ui.IGraphicBufferAlloc";
}

/// Shared memory segment
#[derive(Debug)]
pub struct MemoryHeap {
    /// Size in bytes
    pub size: usize,
    /// Pixel width of the contents, zero for non-image heaps
    pub width: u32,
    /// Pixel height of the contents, zero for non-image heaps
    pub height: u32,
    /// Format of the contents
    pub format: PixelFormat,
    /// Surfaces that were composited into the heap, bottom to top
    pub layers: Vec<i32>,
}

impl MemoryHeap {
    /// Heap without image contents
    #[must_use]
    pub fn plain(size: usize) -> Self {
        Self { size, width: 0, height: 0, format: PixelFormat::UNKNOWN, layers: Vec::new() }
    }
}

impl Interface for MemoryHeap {
    const DESCRIPTOR: &'static str = "android.utils.IMemoryHeap";
}

/// Buffer queue a client renders into
#[derive(Debug)]
pub struct SurfaceTexture {
    /// Sequence number, unique per compositor
    pub serial: u64,
}

impl Interface for SurfaceTexture {
    const DESCRIPTOR: &'static str = "android.gui.SurfaceTexture";
}

/// Vsync and hotplug event stream
#[derive(Debug)]
pub struct DisplayEventConnection {
    /// Sequence number, unique per compositor
    pub serial: u64,
}

impl Interface for DisplayEventConnection {
    const DESCRIPTOR: &'static str = "android.gui.DisplayEventConnection";
}

/// Opaque token naming a display
#[derive(Debug)]
pub struct DisplayToken {
    /// Display name
    pub name: String,
}

impl Interface for DisplayToken {
    const DESCRIPTOR: &'static str = "android.ui.IDisplayToken";
}
