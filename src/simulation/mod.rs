//! Time-stepped kinematic animation of a loaded structure.
//!
//! Each atom vibrates sinusoidally along a fixed axis and the whole molecule
//! optionally spins about the vertical axis through its centroid. Positions
//! are a pure function of the elapsed time, so splitting an advance into
//! several smaller ones yields the same positions as one combined step.

mod motion;

use glam::Vec3;

use self::motion::{AtomMotion, FrameTerms};
use crate::error::ViewerError;
use crate::options::SimulationOptions;
use crate::structure::Structure;

/// Animation clock and the current per-atom positions.
#[derive(Debug, Clone)]
pub struct SimulationState {
    elapsed: f64,
    options: SimulationOptions,
    centroid: Vec3,
    motions: Vec<AtomMotion>,
    positions: Vec<Vec3>,
}

impl SimulationState {
    /// Fresh state at `elapsed = 0` for `structure`.
    pub fn initialize(structure: &Structure, options: &SimulationOptions) -> Self {
        let count = structure.atom_count();
        let motions = structure
            .atoms()
            .iter()
            .enumerate()
            .map(|(i, atom)| AtomMotion::new(i, count, atom.element))
            .collect();
        let mut state = Self {
            elapsed: 0.0,
            options: options.clone(),
            centroid: structure.centroid(),
            motions,
            positions: Vec::with_capacity(count),
        };
        state.recompute(structure);
        state
    }

    /// Advance the clock by `dt` seconds and recompute positions.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidTimeStep`] when `dt` is negative, NaN or
    /// infinite, or when the clock would overflow; the state is left
    /// unchanged.
    pub fn advance(
        &mut self,
        structure: &Structure,
        dt: f64,
    ) -> Result<(), ViewerError> {
        validate_time_step(dt)?;
        if dt == 0.0 {
            return Ok(());
        }
        let next = self.elapsed + dt;
        if !next.is_finite() {
            return Err(ViewerError::InvalidTimeStep(dt));
        }
        self.elapsed = next;
        self.recompute(structure);
        Ok(())
    }

    /// Replace the animation parameters, keeping the clock.
    pub fn set_options(&mut self, structure: &Structure, options: &SimulationOptions) {
        self.options = options.clone();
        self.recompute(structure);
    }

    /// Seconds simulated since initialization.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Current positions in atom order.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Current position of one atom.
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    /// Active animation parameters.
    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    fn recompute(&mut self, structure: &Structure) {
        debug_assert_eq!(structure.atom_count(), self.motions.len());
        let terms = FrameTerms::at(self.elapsed, &self.options);
        let centroid = self.centroid;
        self.positions.clear();
        self.positions.extend(
            structure
                .positions()
                .zip(&self.motions)
                .map(|(base, motion)| terms.apply(base, centroid, motion)),
        );
    }
}

/// Accept only finite, non-negative time steps.
pub fn validate_time_step(dt: f64) -> Result<(), ViewerError> {
    if dt.is_finite() && dt >= 0.0 {
        Ok(())
    } else {
        Err(ViewerError::InvalidTimeStep(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Atom, Element, StructureBuilder};

    fn water() -> Structure {
        let mut b = StructureBuilder::new();
        let _ = b.add_atom(Atom::new(Element::O, Vec3::ZERO));
        let _ = b.add_atom(Atom::new(Element::H, Vec3::new(0.757, 0.586, 0.0)));
        let _ = b.add_atom(Atom::new(Element::H, Vec3::new(-0.757, 0.586, 0.0)));
        b.finish().unwrap()
    }

    fn spinning() -> SimulationOptions {
        SimulationOptions {
            spin_rate: 0.7,
            ..SimulationOptions::default()
        }
    }

    #[test]
    fn starts_at_zero_with_one_position_per_atom() {
        let s = water();
        let sim = SimulationState::initialize(&s, &SimulationOptions::default());
        assert_eq!(sim.elapsed(), 0.0);
        assert_eq!(sim.positions().len(), 3);
        assert!(sim.position(3).is_none());
    }

    #[test]
    fn advance_is_additive() {
        let s = water();
        let mut split = SimulationState::initialize(&s, &spinning());
        let mut whole = split.clone();
        split.advance(&s, 0.25).unwrap();
        split.advance(&s, 0.5).unwrap();
        whole.advance(&s, 0.75).unwrap();
        assert_eq!(split.elapsed(), whole.elapsed());
        assert_eq!(split.positions(), whole.positions());
    }

    #[test]
    fn negative_and_non_finite_steps_are_rejected() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &spinning());
        sim.advance(&s, 0.5).unwrap();
        let before = sim.positions().to_vec();
        for dt in [-0.1, f64::NAN, f64::INFINITY] {
            let err = sim.advance(&s, dt).unwrap_err();
            assert!(matches!(err, ViewerError::InvalidTimeStep(_)));
        }
        assert_eq!(sim.elapsed(), 0.5);
        assert_eq!(sim.positions(), before.as_slice());
    }

    #[test]
    fn zero_step_changes_nothing() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &spinning());
        let before = sim.positions().to_vec();
        sim.advance(&s, 0.0).unwrap();
        assert_eq!(sim.elapsed(), 0.0);
        assert_eq!(sim.positions(), before.as_slice());
    }

    #[test]
    fn atoms_move_over_time() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &SimulationOptions::default());
        let before = sim.positions().to_vec();
        sim.advance(&s, 0.1).unwrap();
        assert_ne!(sim.positions(), before.as_slice());
    }

    #[test]
    fn full_vibration_period_returns_to_start() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &SimulationOptions::default());
        let before = sim.positions().to_vec();
        sim.advance(&s, 1.0).unwrap();
        for (a, b) in sim.positions().iter().zip(&before) {
            assert!(a.abs_diff_eq(*b, 1e-5));
        }
    }

    #[test]
    fn clock_overflow_is_rejected_and_positions_stay_finite() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &spinning());
        sim.advance(&s, f64::MAX).unwrap();
        assert!(sim.positions().iter().all(|p| p.is_finite()));

        let err = sim.advance(&s, f64::MAX).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidTimeStep(_)));
        assert_eq!(sim.elapsed(), f64::MAX);
        assert!(sim.positions().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn set_options_keeps_clock() {
        let s = water();
        let mut sim = SimulationState::initialize(&s, &SimulationOptions::default());
        sim.advance(&s, 2.0).unwrap();
        sim.set_options(&s, &spinning());
        assert_eq!(sim.elapsed(), 2.0);
        assert_eq!(sim.options().spin_rate, 0.7);
    }
}
