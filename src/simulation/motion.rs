//! Per-atom motion parameters and the closed-form displacement function.

use std::f64::consts::TAU;

use glam::{Quat, Vec3};

use crate::options::SimulationOptions;
use crate::structure::Element;

/// Golden-ratio conjugate; spreads phases evenly over consecutive indices.
const PHASE_STEP: f64 = 0.618_033_988_749_895;

/// Mass of carbon, the reference for amplitude scaling.
const REFERENCE_MASS: f32 = 12.011;

const MIN_MASS_SCALE: f32 = 0.25;
const MAX_MASS_SCALE: f32 = 2.0;

/// Motion parameters fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AtomMotion {
    /// Unit vibration axis.
    pub direction: Vec3,
    /// Phase offset in radians.
    pub phase: f64,
    /// Amplitude multiplier from the atomic mass.
    pub scale: f32,
}

impl AtomMotion {
    pub(crate) fn new(index: usize, count: usize, element: Element) -> Self {
        Self {
            direction: fibonacci_direction(index, count),
            phase: TAU * (index as f64 * PHASE_STEP).fract(),
            scale: mass_scale(element),
        }
    }
}

/// `sqrt(m_C / m)`, clamped, so lighter atoms move further.
pub(crate) fn mass_scale(element: Element) -> f32 {
    (REFERENCE_MASS / element.atomic_mass())
        .sqrt()
        .clamp(MIN_MASS_SCALE, MAX_MASS_SCALE)
}

/// Point `index` of an `count`-point spherical Fibonacci lattice.
pub(crate) fn fibonacci_direction(index: usize, count: usize) -> Vec3 {
    let n = count.max(1) as f32;
    let i = index as f32;
    let y = 1.0 - 2.0 * (i + 0.5) / n;
    let r = (1.0 - y * y).max(0.0).sqrt();
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    let theta = golden_angle * i;
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

/// `rate * elapsed` reduced to `[0, 2π)`.
///
/// When the product overflows, `elapsed` is first reduced modulo one period
/// of `rate`, which keeps the angle finite.
pub(crate) fn turn(rate: f64, elapsed: f64) -> f64 {
    if rate == 0.0 || !rate.is_finite() || !elapsed.is_finite() {
        return 0.0;
    }
    let angle = rate * elapsed;
    if angle.is_finite() {
        angle.rem_euclid(TAU)
    } else {
        (elapsed.rem_euclid(TAU / rate.abs()) * rate).rem_euclid(TAU)
    }
}

/// Per-frame terms shared by every atom, evaluated once per update.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameTerms {
    /// `2π f t` reduced to one period, in f64 so long sessions keep
    /// precision.
    wave: f64,
    amplitude: f32,
    spin: Quat,
}

impl FrameTerms {
    pub(crate) fn at(elapsed: f64, options: &SimulationOptions) -> Self {
        let wave = turn(TAU * f64::from(options.vibration_frequency), elapsed);
        let spin_angle = turn(f64::from(options.spin_rate), elapsed) as f32;
        Self {
            wave,
            amplitude: options.vibration_amplitude,
            spin: Quat::from_rotation_y(spin_angle),
        }
    }

    /// Displaced position of one atom.
    pub(crate) fn apply(
        &self,
        base: Vec3,
        centroid: Vec3,
        motion: &AtomMotion,
    ) -> Vec3 {
        let s = (self.wave + motion.phase).sin() as f32;
        let offset = motion.direction * (self.amplitude * motion.scale * s);
        centroid + self.spin * (base - centroid + offset)
    }
}
