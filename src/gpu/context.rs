//! The graphics-context seam between the renderer and a GPU backend.
//!
//! The renderer never touches wgpu types directly. It asks a
//! [`GraphicsContext`] for buffers and pipelines, receives opaque handles,
//! and submits one [`Frame`] per draw. [`RenderContext`] implements the
//! trait on top of wgpu; [`HeadlessContext`] records everything in memory.
//!
//! [`RenderContext`]: super::render_context::RenderContext
//! [`HeadlessContext`]: super::headless::HeadlessContext

use std::fmt;

/// Opaque handle to a context-owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

/// Opaque handle to a context-owned render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub(crate) u32);

/// How a buffer is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Per-vertex or per-instance attributes.
    Vertex,
    /// `u32` triangle indices.
    Index,
    /// Uniform block bound at group 0.
    Uniform,
}

/// The render pipelines the renderer knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Instanced icospheres, one per atom.
    AtomSpheres,
    /// Instanced two-colour cylinders, one per bond.
    BondCylinders,
}

/// One instanced, indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Pipeline to bind.
    pub pipeline: PipelineId,
    /// Vertex buffer slots 0..3: mesh, static instance data, dynamic
    /// instance data.
    pub vertex_buffers: [BufferId; 3],
    /// Mesh index buffer.
    pub index_buffer: BufferId,
    /// Indices per instance.
    pub index_count: u32,
    /// Number of instances.
    pub instance_count: u32,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Background colour (linear RGBA).
    pub clear_color: [f64; 4],
    /// Camera uniform bound at group 0, binding 0.
    pub camera: BufferId,
    /// Draws in submission order.
    pub draws: &'a [DrawCall],
}

/// Context-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// A handle that was never issued or has been released.
    InvalidHandle,
    /// The device was lost; nothing can be drawn until it is recreated.
    ContextLost,
    /// Surface acquisition or configuration failed.
    Surface(String),
    /// Shader composition or validation failed.
    Shader(String),
    /// An allocation exceeded what the device can provide.
    OutOfMemory,
    /// A write would run past the end of its buffer.
    WriteOutOfBounds {
        /// Buffer size in bytes.
        size: u64,
        /// Requested end offset in bytes.
        end: u64,
    },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "invalid or released GPU handle"),
            Self::ContextLost => write!(f, "graphics context lost"),
            Self::Surface(msg) => write!(f, "surface error: {msg}"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::WriteOutOfBounds { size, end } => {
                write!(f, "write ending at byte {end} exceeds buffer of {size} bytes")
            }
        }
    }
}

impl std::error::Error for GpuError {}

/// A real-time graphics backend as seen by the renderer.
///
/// All methods take `&mut self`; contexts are single-threaded and owned by
/// exactly one renderer.
pub trait GraphicsContext {
    /// Current drawable size in pixels.
    fn viewport(&self) -> (u32, u32);

    /// Resize the drawable. Callers guarantee both dimensions are non-zero.
    fn configure(&mut self, width: u32, height: u32) -> Result<(), GpuError>;

    /// Allocate a buffer initialised with `contents`.
    fn create_buffer(
        &mut self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> Result<BufferId, GpuError>;

    /// Overwrite part of an existing buffer. Never allocates.
    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError>;

    /// Free a buffer. Unknown handles are ignored.
    fn release_buffer(&mut self, buffer: BufferId);

    /// Compile and link the pipeline for `kind`.
    fn create_pipeline(&mut self, kind: PipelineKind) -> Result<PipelineId, GpuError>;

    /// Free a pipeline. Unknown handles are ignored.
    fn release_pipeline(&mut self, pipeline: PipelineId);

    /// Clear, issue every draw in order, and present.
    fn draw_frame(&mut self, frame: &Frame<'_>) -> Result<(), GpuError>;
}

/// Slot storage backing handle allocation. Freed slots
/// are reused, so live handle values stay small.
#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> SlotArena<T> {
    pub(crate) fn insert(&mut self, value: T) -> u32 {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(value);
            index
        } else {
            self.slots.push(Some(value));
            (self.slots.len() - 1) as u32
        }
    }

    pub(crate) fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub(crate) fn remove(&mut self, index: u32) -> Option<T> {
        let value = self.slots.get_mut(index as usize)?.take()?;
        self.free.push(index);
        Some(value)
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
