//! In-memory [`GraphicsContext`] that records instead of drawing.
//!
//! Used by the tests and by hosts that want to validate a molecule without
//! a GPU. Buffers keep their bytes, pipelines are just tags, and every frame
//! is captured so callers can inspect what would have been drawn. Failure
//! injection (`set_lost`, `set_buffer_limit`) exercises the error paths.

use super::context::{
    BufferId, BufferUsage, DrawCall, Frame, GpuError, GraphicsContext,
    PipelineId, PipelineKind, SlotArena,
};

#[derive(Debug)]
struct HeadlessBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
}

/// Copy of the last submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    /// Background colour.
    pub clear_color: [f64; 4],
    /// Camera uniform handle.
    pub camera: BufferId,
    /// Draws in submission order.
    pub draws: Vec<DrawCall>,
}

/// Recording graphics context.
#[derive(Debug)]
pub struct HeadlessContext {
    width: u32,
    height: u32,
    buffers: SlotArena<HeadlessBuffer>,
    pipelines: SlotArena<PipelineKind>,
    allocations: usize,
    frames: usize,
    last_frame: Option<RecordedFrame>,
    lost: bool,
    buffer_limit: Option<usize>,
}

impl HeadlessContext {
    /// Context with a `width` x `height` drawable.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffers: SlotArena::default(),
            pipelines: SlotArena::default(),
            allocations: 0,
            frames: 0,
            last_frame: None,
            lost: false,
            buffer_limit: None,
        }
    }

    /// Simulate device loss (`true`) or recovery (`false`).
    pub fn set_lost(&mut self, lost: bool) {
        self.lost = lost;
    }

    /// Fail buffer creation with [`GpuError::OutOfMemory`] once this many
    /// buffers are live. `None` removes the limit.
    pub fn set_buffer_limit(&mut self, limit: Option<usize>) {
        self.buffer_limit = limit;
    }

    /// Total buffers and pipelines ever created.
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    /// Buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Pipelines currently alive.
    pub fn live_pipelines(&self) -> usize {
        self.pipelines.len()
    }

    /// Frames successfully drawn.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// The most recent successful frame.
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.last_frame.as_ref()
    }

    /// Contents of a live buffer.
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(buffer.0).map(|b| b.data.as_slice())
    }

    /// Label given to a live buffer.
    pub fn buffer_label(&self, buffer: BufferId) -> Option<&str> {
        self.buffers.get(buffer.0).map(|b| b.label.as_str())
    }

    fn check_alive(&self) -> Result<(), GpuError> {
        if self.lost {
            Err(GpuError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn check_buffer(&self, id: BufferId, usage: BufferUsage) -> Result<(), GpuError> {
        match self.buffers.get(id.0) {
            Some(b) if b.usage == usage => Ok(()),
            _ => Err(GpuError::InvalidHandle),
        }
    }

    fn check_draw(&self, draw: &DrawCall) -> Result<(), GpuError> {
        if self.pipelines.get(draw.pipeline.0).is_none() {
            return Err(GpuError::InvalidHandle);
        }
        for &buffer in &draw.vertex_buffers {
            self.check_buffer(buffer, BufferUsage::Vertex)?;
        }
        self.check_buffer(draw.index_buffer, BufferUsage::Index)
    }
}

impl GraphicsContext for HeadlessContext {
    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn configure(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.check_alive()?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn create_buffer(
        &mut self,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> Result<BufferId, GpuError> {
        self.check_alive()?;
        if self
            .buffer_limit
            .is_some_and(|limit| self.buffers.len() >= limit)
        {
            return Err(GpuError::OutOfMemory);
        }
        self.allocations += 1;
        let id = self.buffers.insert(HeadlessBuffer {
            label: label.to_owned(),
            usage,
            data: contents.to_vec(),
        });
        Ok(BufferId(id))
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError> {
        self.check_alive()?;
        let target = self
            .buffers
            .get_mut(buffer.0)
            .ok_or(GpuError::InvalidHandle)?;
        let size = target.data.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(GpuError::WriteOutOfBounds { size, end });
        }
        target.data[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        let _ = self.buffers.remove(buffer.0);
    }

    fn create_pipeline(&mut self, kind: PipelineKind) -> Result<PipelineId, GpuError> {
        self.check_alive()?;
        self.allocations += 1;
        Ok(PipelineId(self.pipelines.insert(kind)))
    }

    fn release_pipeline(&mut self, pipeline: PipelineId) {
        let _ = self.pipelines.remove(pipeline.0);
    }

    fn draw_frame(&mut self, frame: &Frame<'_>) -> Result<(), GpuError> {
        self.check_alive()?;
        self.check_buffer(frame.camera, BufferUsage::Uniform)?;
        for draw in frame.draws {
            self.check_draw(draw)?;
        }
        self.frames += 1;
        // reuse the recorded draw list so steady-state frames do not allocate
        match &mut self.last_frame {
            Some(last) => {
                last.clear_color = frame.clear_color;
                last.camera = frame.camera;
                last.draws.clear();
                last.draws.extend_from_slice(frame.draws);
            }
            None => {
                self.last_frame = Some(RecordedFrame {
                    clear_color: frame.clear_color,
                    camera: frame.camera,
                    draws: frame.draws.to_vec(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_round_trip_bytes() {
        let mut ctx = HeadlessContext::new(4, 4);
        let id = ctx
            .create_buffer("test", BufferUsage::Vertex, &[1, 2, 3, 4])
            .unwrap();
        ctx.write_buffer(id, 2, &[9, 9]).unwrap();
        assert_eq!(ctx.buffer_data(id), Some(&[1, 2, 9, 9][..]));
        assert_eq!(ctx.buffer_label(id), Some("test"));
        assert_eq!(
            ctx.write_buffer(id, 3, &[0, 0]),
            Err(GpuError::WriteOutOfBounds { size: 4, end: 5 })
        );
        ctx.release_buffer(id);
        assert_eq!(ctx.write_buffer(id, 0, &[0]), Err(GpuError::InvalidHandle));
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.allocation_count(), 1);
    }

    #[test]
    fn draw_validates_handles() {
        let mut ctx = HeadlessContext::new(4, 4);
        let camera = ctx.create_buffer("cam", BufferUsage::Uniform, &[0; 16]).unwrap();
        let mesh = ctx.create_buffer("mesh", BufferUsage::Vertex, &[0; 16]).unwrap();
        let index = ctx.create_buffer("idx", BufferUsage::Index, &[0; 12]).unwrap();
        let pipeline = ctx.create_pipeline(PipelineKind::AtomSpheres).unwrap();
        let draw = DrawCall {
            pipeline,
            vertex_buffers: [mesh; 3],
            index_buffer: index,
            index_count: 3,
            instance_count: 1,
        };
        let frame = Frame {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            camera,
            draws: &[draw],
        };
        ctx.draw_frame(&frame).unwrap();
        assert_eq!(ctx.frame_count(), 1);
        assert_eq!(ctx.last_frame().unwrap().draws, vec![draw]);

        // index buffer in a vertex slot
        let bad = DrawCall {
            vertex_buffers: [index; 3],
            ..draw
        };
        let frame = Frame {
            draws: &[bad],
            ..frame
        };
        assert_eq!(ctx.draw_frame(&frame), Err(GpuError::InvalidHandle));
        assert_eq!(ctx.frame_count(), 1);
    }

    #[test]
    fn lost_context_fails_everything() {
        let mut ctx = HeadlessContext::new(4, 4);
        ctx.set_lost(true);
        assert_eq!(
            ctx.create_buffer("x", BufferUsage::Vertex, &[]),
            Err(GpuError::ContextLost)
        );
        assert_eq!(ctx.configure(8, 8), Err(GpuError::ContextLost));
        ctx.set_lost(false);
        assert!(ctx.configure(8, 8).is_ok());
        assert_eq!(ctx.viewport(), (8, 8));
    }

    #[test]
    fn buffer_limit_reports_out_of_memory() {
        let mut ctx = HeadlessContext::new(4, 4);
        ctx.set_buffer_limit(Some(1));
        let _ = ctx.create_buffer("a", BufferUsage::Vertex, &[]).unwrap();
        assert_eq!(
            ctx.create_buffer("b", BufferUsage::Vertex, &[]),
            Err(GpuError::OutOfMemory)
        );
    }
}
