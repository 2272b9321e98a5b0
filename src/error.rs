//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::gpu::GpuError;
use crate::io::ParseError;

/// Errors produced by the molscope crate.
#[derive(Debug)]
pub enum ViewerError {
    /// Input bytes could not be turned into a structure.
    Parse(ParseError),
    /// A time step was negative, NaN or infinite.
    InvalidTimeStep(f64),
    /// A viewport dimension was zero.
    InvalidDimensions {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// Creating or writing a GPU resource failed.
    GpuResource(GpuError),
    /// Drawing a frame failed.
    Render(GpuError),
    /// GPU context initialization failure.
    Context(RenderContextError),
    /// Options could not be parsed, serialized or validated.
    Options(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// The session was disposed.
    Disposed,
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::InvalidTimeStep(dt) => {
                write!(f, "invalid time step {dt}: must be finite and >= 0")
            }
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid viewport {width}x{height}: both must be > 0")
            }
            Self::GpuResource(e) => write!(f, "GPU resource error: {e}"),
            Self::Render(e) => write!(f, "render error: {e}"),
            Self::Context(e) => write!(f, "GPU context error: {e}"),
            Self::Options(msg) => write!(f, "options error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Disposed => write!(f, "display session has been disposed"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::GpuResource(e) | Self::Render(e) => Some(e),
            Self::Context(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for ViewerError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RenderContextError> for ViewerError {
    fn from(e: RenderContextError) -> Self {
        Self::Context(e)
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
