use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use wgpu::util::DeviceExt;

use super::context::{
    BufferId, BufferUsage, Frame, GpuError, GraphicsContext, PipelineId,
    PipelineKind, SlotArena,
};
use super::shader_composer::ShaderComposer;
use super::texture::{DepthTexture, RenderTarget};
use crate::renderer::pipeline_util;

/// Smallest buffer handed to wgpu; empty slices cannot be bound.
const MIN_BUFFER_SIZE: usize = 16;

/// Errors that can occur during GPU context initialization.
#[derive(Debug)]
pub enum RenderContextError {
    /// Failed to create a wgpu surface from the window handle.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    AdapterRequest(wgpu::RequestAdapterError),
    /// GPU device request failed (limits or features not met).
    DeviceRequest(wgpu::RequestDeviceError),
    /// Surface configuration not supported by the selected adapter.
    UnsupportedSurface,
    /// Shared shader modules failed to compose.
    Shader(GpuError),
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceCreation(e) => {
                write!(f, "surface creation failed: {e}")
            }
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            Self::UnsupportedSurface => {
                write!(f, "surface configuration not supported by adapter")
            }
            Self::Shader(e) => write!(f, "shader setup failed: {e}"),
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SurfaceCreation(e) => Some(e),
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::Shader(e) => Some(e),
            Self::UnsupportedSurface => None,
        }
    }
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    usage: BufferUsage,
}

/// Owns the core wgpu resources: device, queue, surface or offscreen
/// target, and every buffer and pipeline handed out through
/// [`GraphicsContext`].
pub struct RenderContext {
    /// The wgpu logical device.
    pub device: wgpu::Device,
    /// The wgpu command queue.
    pub queue: wgpu::Queue,
    /// The window surface for presentation (`None` in texture-only mode).
    pub surface: Option<wgpu::Surface<'static>>,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    offscreen: Option<RenderTarget>,
    depth: DepthTexture,
    camera_layout: wgpu::BindGroupLayout,
    camera_bind_group: Option<(BufferId, wgpu::BindGroup)>,
    composer: ShaderComposer,
    buffers: SlotArena<GpuBuffer>,
    pipelines: SlotArena<wgpu::RenderPipeline>,
    lost: Arc<AtomicBool>,
}

impl RenderContext {
    /// Create a new render context from the given window surface target and
    /// initial size.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if surface creation, adapter request,
    /// device request, or surface configuration fails.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: (u32, u32),
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(RenderContextError::SurfaceCreation)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;

        let (device, queue) = request_device(&adapter).await?;

        let mut config = surface
            .get_default_config(&adapter, initial_size.0, initial_size.1)
            .ok_or(RenderContextError::UnsupportedSurface)?;
        config.width = initial_size.0.max(1);
        config.height = initial_size.1.max(1);
        config.present_mode = wgpu::PresentMode::Fifo;

        surface.configure(&device, &config);
        log::info!(
            "render context: {} ({:?}), {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Self::assemble(device, queue, Some(surface), config)
    }

    /// Create a context that renders into an offscreen texture on the
    /// default adapter.
    ///
    /// # Errors
    ///
    /// Returns `RenderContextError` if no adapter or device is available.
    pub async fn headless(
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(RenderContextError::AdapterRequest)?;
        let (device, queue) = request_device(&adapter).await?;
        log::info!(
            "offscreen render context: {} ({:?}), {width}x{height}",
            adapter.get_info().name,
            adapter.get_info().backend
        );
        Self::from_device(
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            width,
            height,
        )
    }

    /// Create a context for an HTML canvas.
    ///
    /// # Errors
    ///
    /// Same as [`RenderContext::new`].
    #[cfg(all(feature = "web", target_arch = "wasm32"))]
    pub async fn from_canvas(
        canvas: web_sys::HtmlCanvasElement,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        Self::new(wgpu::SurfaceTarget::Canvas(canvas), (width, height)).await
    }

    /// Create a render context from an externally-owned device and queue
    /// (no surface: frames go to an offscreen texture).
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError::Shader`] if the shared shader modules
    /// fail to compose.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        Self::assemble(device, queue, None, config)
    }

    fn assemble(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        config: wgpu::SurfaceConfiguration,
    ) -> Result<Self, RenderContextError> {
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("wgpu: {error}");
        }));
        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("GPU device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        let composer = ShaderComposer::new().map_err(RenderContextError::Shader)?;
        let camera_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let offscreen = surface.is_none().then(|| {
            RenderTarget::new(&device, config.width, config.height, config.format)
        });
        let depth = DepthTexture::new(&device, config.width, config.height);

        Ok(Self {
            device,
            queue,
            surface,
            config,
            offscreen,
            depth,
            camera_layout,
            camera_bind_group: None,
            composer,
            buffers: SlotArena::default(),
            pipelines: SlotArena::default(),
            lost,
        })
    }

    /// The surface texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns `true` if this context has a presentation surface.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// The offscreen texture frames are drawn into when there is no surface.
    pub fn offscreen_target(&self) -> Option<&RenderTarget> {
        self.offscreen.as_ref()
    }

    fn check_alive(&self) -> Result<(), GpuError> {
        if self.lost.load(Ordering::Acquire) {
            Err(GpuError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn buffer(&self, id: BufferId, usage: BufferUsage) -> Result<&wgpu::Buffer, GpuError> {
        match self.buffers.get(id.0) {
            Some(b) if b.usage == usage => Ok(&b.buffer),
            _ => Err(GpuError::InvalidHandle),
        }
    }

    fn ensure_camera_bind_group(&mut self, camera: BufferId) -> Result<(), GpuError> {
        if matches!(self.camera_bind_group, Some((id, _)) if id == camera) {
            return Ok(());
        }
        let buffer = self.buffer(camera, BufferUsage::Uniform)?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &self.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.camera_bind_group = Some((camera, bind_group));
        Ok(())
    }

    fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>, GpuError> {
        let Some(surface) = &self.surface else {
            return Ok(None);
        };
        match surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GpuError::OutOfMemory),
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                // the next frame gets a fresh swapchain
                surface.configure(&self.device, &self.config);
                Err(GpuError::Surface(e.to_string()))
            }
            Err(e) => Err(GpuError::Surface(e.to_string())),
        }
    }

    fn encode(
        &self,
        view: &wgpu::TextureView,
        frame: &Frame<'_>,
    ) -> Result<wgpu::CommandBuffer, GpuError> {
        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });
        {
            let [r, g, b, a] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Molecule Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Discard,
                        }),
                        stencil_ops: None,
                    },
                ),
                ..Default::default()
            });

            if let Some((_, bind_group)) = &self.camera_bind_group {
                pass.set_bind_group(0, bind_group, &[]);
            }
            for draw in frame.draws {
                let pipeline = self
                    .pipelines
                    .get(draw.pipeline.0)
                    .ok_or(GpuError::InvalidHandle)?;
                pass.set_pipeline(pipeline);
                for (slot, id) in draw.vertex_buffers.iter().enumerate() {
                    let buffer = self.buffer(*id, BufferUsage::Vertex)?;
                    pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                let index = self.buffer(draw.index_buffer, BufferUsage::Index)?;
                pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
            }
        }
        Ok(encoder.finish())
    }

    fn build_pipeline(
        &mut self,
        kind: PipelineKind,
    ) -> Result<wgpu::RenderPipeline, GpuError> {
        let shader = self.composer.compose(&self.device, kind)?;
        let layout =
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Molecule Pipeline Layout"),
                    bind_group_layouts: &[&self.camera_layout],
                    push_constant_ranges: &[],
                });
        let buffers = pipeline_util::vertex_layouts(kind);
        Ok(self
            .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(match kind {
                        PipelineKind::AtomSpheres => "Atom Sphere Pipeline",
                        PipelineKind::BondCylinders => "Bond Cylinder Pipeline",
                    }),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &buffers,
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: self.config.format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: pipeline_util::primitive_state(),
                    depth_stencil: Some(pipeline_util::depth_stencil_state()),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                }))
    }
}

/// Pop the innermost error scope.
///
/// The native and WebGL backends resolve scopes immediately; a scope that is
/// still pending reports no error.
fn pop_validation_error(device: &wgpu::Device) -> Option<wgpu::Error> {
    let scope = std::pin::pin!(device.pop_error_scope());
    match scope.poll(&mut Context::from_waker(Waker::noop())) {
        Poll::Ready(error) => error,
        Poll::Pending => None,
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue), RenderContextError> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Primary Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            ..Default::default()
        })
        .await
        .map_err(RenderContextError::DeviceRequest)
}

impl GraphicsContext for RenderContext {
    fn viewport(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn configure(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.check_alive()?;
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        } else {
            self.offscreen = Some(RenderTarget::new(
                &self.device,
                width,
                height,
                self.config.format,
            ));
        }
        self.depth = DepthTexture::new(&self.device, width, height);
        Ok(())
    }

    fn create_buffer(
        &mut self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> Result<BufferId, GpuError> {
        self.check_alive()?;
        if contents.len() as u64 > self.device.limits().max_buffer_size {
            return Err(GpuError::OutOfMemory);
        }
        let usages = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = if contents.len() < MIN_BUFFER_SIZE {
            let mut padded = [0u8; MIN_BUFFER_SIZE];
            padded[..contents.len()].copy_from_slice(contents);
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: &padded,
                usage: usages,
            })
        } else {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usages,
            })
        };
        Ok(BufferId(self.buffers.insert(GpuBuffer { buffer, usage })))
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError> {
        self.check_alive()?;
        let target = self.buffers.get(buffer.0).ok_or(GpuError::InvalidHandle)?;
        let size = target.buffer.size();
        let end = offset + data.len() as u64;
        if end > size {
            return Err(GpuError::WriteOutOfBounds { size, end });
        }
        if !data.is_empty() {
            self.queue.write_buffer(&target.buffer, offset, data);
        }
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(b) = self.buffers.remove(buffer.0) {
            if matches!(self.camera_bind_group, Some((id, _)) if id == buffer) {
                self.camera_bind_group = None;
            }
            b.buffer.destroy();
        }
    }

    fn create_pipeline(&mut self, kind: PipelineKind) -> Result<PipelineId, GpuError> {
        self.check_alive()?;
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = self.build_pipeline(kind);
        let rejected = pop_validation_error(&self.device);
        let pipeline = built?;
        if let Some(e) = rejected {
            return Err(GpuError::Shader(format!("{kind:?} pipeline rejected: {e}")));
        }
        Ok(PipelineId(self.pipelines.insert(pipeline)))
    }

    fn release_pipeline(&mut self, pipeline: PipelineId) {
        let _ = self.pipelines.remove(pipeline.0);
    }

    fn draw_frame(&mut self, frame: &Frame<'_>) -> Result<(), GpuError> {
        self.check_alive()?;
        self.ensure_camera_bind_group(frame.camera)?;
        let surface_texture = self.acquire()?;
        let commands = match &surface_texture {
            Some(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.encode(&view, frame)?
            }
            None => {
                let target = self.offscreen.as_ref().ok_or(GpuError::InvalidHandle)?;
                self.encode(&target.view, frame)?
            }
        };
        let _ = self.queue.submit(std::iter::once(commands));
        if let Some(texture) = surface_texture {
            texture.present();
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "binary"))]
mod tests {
    use super::*;

    /// `None` on machines without a usable adapter.
    fn offscreen() -> Option<RenderContext> {
        pollster::block_on(RenderContext::headless(64, 48)).ok()
    }

    #[test]
    fn validation_errors_are_caught_by_the_scope() {
        let Some(ctx) = offscreen() else {
            log::warn!("no GPU adapter; skipping");
            return;
        };
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        // mappable for reading but not a copy destination: rejected
        let _buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Invalid Usage"),
            size: 16,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        assert!(pop_validation_error(&ctx.device).is_some());

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        assert!(pop_validation_error(&ctx.device).is_none());
    }

    #[test]
    fn molecule_pipelines_build_cleanly() {
        let Some(mut ctx) = offscreen() else {
            log::warn!("no GPU adapter; skipping");
            return;
        };
        for kind in [PipelineKind::AtomSpheres, PipelineKind::BondCylinders] {
            let id = ctx.create_pipeline(kind).unwrap();
            ctx.release_pipeline(id);
        }
    }
}
