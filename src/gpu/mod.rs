//! GPU resource management.
//!
//! Provides the [`GraphicsContext`] seam, its wgpu and in-memory
//! implementations, shader composition, and render-target textures.

/// Handles, draw descriptions and the backend trait.
pub mod context;
/// In-memory backend that records every call.
pub mod headless;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render-target and depth textures.
pub mod texture;

pub use context::{
    BufferId, BufferUsage, DrawCall, Frame, GpuError, GraphicsContext,
    PipelineId, PipelineKind,
};
pub use headless::HeadlessContext;
pub use render_context::{RenderContext, RenderContextError};
