//! Orbital camera for viewing a single molecule.
//!
//! Provides rotation, roll, panning, zoom and bounding-sphere fitting. The
//! controller is plain data; the renderer uploads its uniform.

/// Orbital camera controller managing rotation, pan and zoom.
pub mod controller;
/// Core camera struct and GPU uniform type.
pub mod core;

pub use self::controller::CameraController;
pub use self::core::{Camera, CameraUniform};
