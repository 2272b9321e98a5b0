//! The display session: one drawing surface, at most one loaded molecule.
//!
//! The host drives a [`Session`] once per animation tick by calling
//! [`update_time`](Session::update_time) and then
//! [`render`](Session::render). Loading a molecule is atomic: either the
//! new structure, simulation and GPU resources all replace the old ones, or
//! nothing observable changes.

use glam::Vec2;

use crate::error::ViewerError;
use crate::gpu::GraphicsContext;
use crate::io;
use crate::options::ViewerOptions;
use crate::renderer::{MoleculeResources, Renderer};
use crate::simulation::{self, SimulationState};
use crate::structure::Structure;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, no molecule loaded yet.
    Uninitialized,
    /// A molecule is loaded and drawable.
    Loaded,
    /// Torn down; every call fails with [`ViewerError::Disposed`].
    Disposed,
}

/// Everything derived from one parsed file, replaced as a unit.
struct LoadedMolecule {
    structure: Structure,
    simulation: SimulationState,
    resources: MoleculeResources,
}

/// Public facade binding a renderer to a drawing surface.
pub struct Session<C: GraphicsContext> {
    surface_id: String,
    options: ViewerOptions,
    renderer: Renderer<C>,
    molecule: Option<LoadedMolecule>,
    degraded: bool,
    disposed: bool,
}

impl<C: GraphicsContext> Session<C> {
    /// Bind a session to `surface_id`, drawing through `context`.
    ///
    /// The context is expected to be sized to the surface already.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Options`] if `options` fail validation,
    /// [`ViewerError::GpuResource`] if the camera buffer cannot be created.
    pub fn new(
        surface_id: impl Into<String>,
        context: C,
        options: ViewerOptions,
    ) -> Result<Self, ViewerError> {
        options.validate()?;
        let renderer = Renderer::new(
            context,
            &options.render,
            &options.camera,
            &options.lighting,
        )?;
        let surface_id = surface_id.into();
        let (width, height) = renderer.context().viewport();
        log::debug!("session '{surface_id}' created at {width}x{height}");

        Ok(Self {
            surface_id,
            options,
            renderer,
            molecule: None,
            degraded: false,
            disposed: false,
        })
    }

    fn ensure_live(&self) -> Result<(), ViewerError> {
        if self.disposed {
            Err(ViewerError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Parse `bytes` as `format` and make it the displayed molecule.
    ///
    /// The previous molecule stays in place if parsing or the GPU build
    /// fails. A successful load resets the clock to zero, refits the camera
    /// and clears the degraded flag.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Parse`] or [`ViewerError::GpuResource`].
    pub fn add_molecule(
        &mut self,
        bytes: &[u8],
        format: &str,
    ) -> Result<(), ViewerError> {
        self.ensure_live()?;
        let structure = io::parse(bytes, format, &self.options.parsing)?;
        let simulation =
            SimulationState::initialize(&structure, &self.options.simulation);
        let resources = self.renderer.build(&structure)?;

        self.renderer.fit(&structure);
        log::info!(
            "loaded {format} molecule{}: {} atoms, {} bonds",
            if structure.title().is_empty() {
                String::new()
            } else {
                format!(" '{}'", structure.title())
            },
            structure.atom_count(),
            structure.bond_count()
        );
        let previous = self.molecule.replace(LoadedMolecule {
            structure,
            simulation,
            resources,
        });
        if let Some(old) = previous {
            self.renderer.release(old.resources);
        }
        self.degraded = false;
        Ok(())
    }

    /// Advance simulated time by `dt` seconds. A no-op while nothing is
    /// loaded.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidTimeStep`] for negative or non-finite `dt`,
    /// whether or not a molecule is loaded.
    pub fn update_time(&mut self, dt: f64) -> Result<(), ViewerError> {
        self.ensure_live()?;
        simulation::validate_time_step(dt)?;
        if let Some(m) = &mut self.molecule {
            m.simulation.advance(&m.structure, dt)?;
        }
        Ok(())
    }

    /// Draw one frame. A no-op while nothing is loaded.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Render`] if the context fails; the session is then
    /// marked degraded until the next successful
    /// [`add_molecule`](Self::add_molecule).
    pub fn render(&mut self) -> Result<(), ViewerError> {
        self.ensure_live()?;
        let Some(m) = &self.molecule else {
            return Ok(());
        };
        if let Err(e) = self.renderer.draw(&m.resources, &m.structure, &m.simulation) {
            if !self.degraded {
                log::warn!("session '{}' degraded: {e}", self.surface_id);
            }
            self.degraded = true;
            return Err(e);
        }
        Ok(())
    }

    /// Resize the drawable. Molecule data is untouched.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidDimensions`] if either dimension is zero.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.resize(width, height)
    }

    /// Orbit the camera by a pointer delta in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.orbit(Vec2::new(dx, dy));
        Ok(())
    }

    /// Pan the camera by a pointer delta in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.pan(Vec2::new(dx, dy));
        Ok(())
    }

    /// Zoom the camera; positive deltas move closer.
    pub fn zoom(&mut self, delta: f32) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.zoom(delta);
        Ok(())
    }

    /// Roll the camera by `delta` radians.
    pub fn roll(&mut self, delta: f32) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.roll(delta);
        Ok(())
    }

    /// Return the camera to the view fitted at load time.
    pub fn reset_camera(&mut self) -> Result<(), ViewerError> {
        self.ensure_live()?;
        self.renderer.reset_camera();
        Ok(())
    }

    /// Replace the viewer options.
    ///
    /// Appearance changes rebuild the loaded molecule's GPU resources; if
    /// that fails the previous options stay in effect. Parsing options apply
    /// from the next load.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Options`] for invalid values,
    /// [`ViewerError::GpuResource`] if the rebuild fails.
    pub fn set_options(&mut self, options: ViewerOptions) -> Result<(), ViewerError> {
        self.ensure_live()?;
        options.validate()?;

        let restyle = options.render != self.options.render;
        self.renderer
            .set_options(&options.render, &options.camera, &options.lighting);
        if let Some(m) = &mut self.molecule {
            if restyle {
                match self.renderer.build(&m.structure) {
                    Ok(resources) => {
                        let old = std::mem::replace(&mut m.resources, resources);
                        self.renderer.release(old);
                    }
                    Err(e) => {
                        self.renderer.set_options(
                            &self.options.render,
                            &self.options.camera,
                            &self.options.lighting,
                        );
                        return Err(e);
                    }
                }
            }
            m.simulation.set_options(&m.structure, &options.simulation);
        }
        self.options = options;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.disposed {
            SessionState::Disposed
        } else if self.molecule.is_some() {
            SessionState::Loaded
        } else {
            SessionState::Uninitialized
        }
    }

    /// The loaded structure.
    pub fn structure(&self) -> Option<&Structure> {
        self.molecule.as_ref().map(|m| &m.structure)
    }

    /// Simulation state of the loaded structure.
    pub fn simulation(&self) -> Option<&SimulationState> {
        self.molecule.as_ref().map(|m| &m.simulation)
    }

    /// Whether the last [`render`](Self::render) failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Identifier of the bound drawing surface.
    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }

    /// Drawable size in pixels.
    pub fn viewport(&self) -> (u32, u32) {
        self.renderer.context().viewport()
    }

    /// Active options.
    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// The renderer.
    pub fn renderer(&self) -> &Renderer<C> {
        &self.renderer
    }

    /// Mutable access to the renderer.
    pub fn renderer_mut(&mut self) -> &mut Renderer<C> {
        &mut self.renderer
    }

    /// Release every GPU resource this session owns. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(m) = self.molecule.take() {
            self.renderer.release(m.resources);
        }
        self.renderer.dispose();
        self.disposed = true;
        log::debug!("session '{}' disposed", self.surface_id);
    }
}
