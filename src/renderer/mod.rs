//! Instanced molecule rendering over a [`GraphicsContext`].
//!
//! [`Renderer::build`] turns a [`Structure`] into [`MoleculeResources`]:
//! one unit mesh per primitive plus static (colour, radius) and dynamic
//! (position, endpoint) instance buffers. [`Renderer::draw`] only rewrites
//! the dynamic buffers and the camera uniform, then submits one frame with
//! a sphere draw and, when the molecule has bonds, a cylinder draw.

pub mod instances;
pub mod mesh;
pub(crate) mod pipeline_util;

use glam::{Vec2, Vec3};

use crate::camera::CameraController;
use crate::error::ViewerError;
use crate::gpu::{
    BufferId, BufferUsage, DrawCall, Frame, GpuError, GraphicsContext,
    PipelineId, PipelineKind,
};
use crate::options::{CameraOptions, LightingOptions, RenderOptions};
use crate::simulation::SimulationState;
use crate::structure::Structure;

use self::instances::{BondEndpoints, srgb_to_linear};
use self::mesh::Mesh;

/// One instanced, indexed primitive: mesh, per-instance attributes and the
/// pipeline that draws them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InstancedMesh {
    pipeline: PipelineId,
    vertices: BufferId,
    indices: BufferId,
    index_count: u32,
    styles: BufferId,
    dynamic: BufferId,
    instance_count: u32,
}

impl InstancedMesh {
    fn draw_call(&self) -> DrawCall {
        DrawCall {
            pipeline: self.pipeline,
            vertex_buffers: [self.vertices, self.styles, self.dynamic],
            index_buffer: self.indices,
            index_count: self.index_count,
            instance_count: self.instance_count,
        }
    }

    fn buffers(&self) -> [BufferId; 4] {
        [self.vertices, self.indices, self.styles, self.dynamic]
    }
}

/// GPU buffers derived from one [`Structure`].
///
/// Only valid for the structure it was built from and the renderer that
/// built it. Hand it back through [`Renderer::release`] when the molecule
/// is replaced.
#[derive(Debug, PartialEq, Eq)]
pub struct MoleculeResources {
    atoms: InstancedMesh,
    bonds: Option<InstancedMesh>,
}

impl MoleculeResources {
    /// Number of atom instances.
    pub fn atom_count(&self) -> usize {
        self.atoms.instance_count as usize
    }

    /// Number of bond instances.
    pub fn bond_count(&self) -> usize {
        self.bonds.map_or(0, |b| b.instance_count as usize)
    }

    /// Buffers owned by these resources.
    pub fn buffers(&self) -> Vec<BufferId> {
        let mut ids = self.atoms.buffers().to_vec();
        if let Some(bonds) = &self.bonds {
            ids.extend_from_slice(&bonds.buffers());
        }
        ids
    }
}

/// Owns the graphics context, the camera and the pipelines shared by every
/// molecule.
pub struct Renderer<C: GraphicsContext> {
    context: C,
    options: RenderOptions,
    lighting: LightingOptions,
    camera: CameraController,
    camera_buffer: BufferId,
    atom_pipeline: Option<PipelineId>,
    bond_pipeline: Option<PipelineId>,
    released: bool,

    // per-frame scratch, reused so steady-state draws do not allocate
    atom_positions: Vec<[f32; 3]>,
    bond_endpoints: Vec<BondEndpoints>,
}

impl<C: GraphicsContext> Renderer<C> {
    /// Wrap `context` and allocate the camera uniform buffer.
    ///
    /// # Errors
    ///
    /// [`ViewerError::GpuResource`] if the uniform buffer cannot be created.
    pub fn new(
        mut context: C,
        options: &RenderOptions,
        camera: &CameraOptions,
        lighting: &LightingOptions,
    ) -> Result<Self, ViewerError> {
        let (width, height) = context.viewport();
        let mut camera = CameraController::new(camera, width, height);
        let uniform = camera.uniform(lighting);
        let camera_buffer = context
            .create_buffer(
                "Camera Uniform",
                BufferUsage::Uniform,
                bytemuck::bytes_of(&uniform),
            )
            .map_err(ViewerError::GpuResource)?;

        Ok(Self {
            context,
            options: options.clone(),
            lighting: lighting.clone(),
            camera,
            camera_buffer,
            atom_pipeline: None,
            bond_pipeline: None,
            released: false,
            atom_positions: Vec::new(),
            bond_endpoints: Vec::new(),
        })
    }

    /// Allocate every buffer needed to draw `structure`.
    ///
    /// Pipelines are created on first use and cached. On failure all
    /// buffers created by this call are released again.
    ///
    /// # Errors
    ///
    /// [`ViewerError::GpuResource`] on any allocation or pipeline failure,
    /// [`ViewerError::Disposed`] after [`dispose`](Self::dispose).
    pub fn build(
        &mut self,
        structure: &Structure,
    ) -> Result<MoleculeResources, ViewerError> {
        if self.released {
            return Err(ViewerError::Disposed);
        }
        let mut created = Vec::new();
        match self.try_build(structure, &mut created) {
            Ok(resources) => {
                log::debug!(
                    "built GPU resources: {} atoms, {} bonds, {} buffers",
                    resources.atom_count(),
                    resources.bond_count(),
                    created.len()
                );
                self.reserve_scratch(structure);
                Ok(resources)
            }
            Err(e) => {
                for id in created {
                    self.context.release_buffer(id);
                }
                Err(ViewerError::GpuResource(e))
            }
        }
    }

    fn try_build(
        &mut self,
        structure: &Structure,
        created: &mut Vec<BufferId>,
    ) -> Result<MoleculeResources, GpuError> {
        let base: Vec<Vec3> = structure.positions().collect();

        let sphere = mesh::icosphere(self.options.sphere_subdivisions);
        let styles = instances::atom_styles(structure, &self.options);
        let mut centres = Vec::with_capacity(base.len());
        instances::fill_atom_positions(&base, &mut centres);
        let atoms = self.upload_instanced(
            created,
            PipelineKind::AtomSpheres,
            &sphere,
            bytemuck::cast_slice(&styles),
            bytemuck::cast_slice(&centres),
            styles.len(),
        )?;

        if structure.bond_count() == 0 {
            return Ok(MoleculeResources { atoms, bonds: None });
        }

        let cylinder = mesh::cylinder(self.options.cylinder_segments);
        let styles = instances::bond_styles(structure, &self.options);
        let mut endpoints = Vec::with_capacity(styles.len());
        instances::fill_bond_endpoints(structure, &base, &mut endpoints);
        let bonds = self.upload_instanced(
            created,
            PipelineKind::BondCylinders,
            &cylinder,
            bytemuck::cast_slice(&styles),
            bytemuck::cast_slice(&endpoints),
            styles.len(),
        )?;

        Ok(MoleculeResources {
            atoms,
            bonds: Some(bonds),
        })
    }

    fn upload_instanced(
        &mut self,
        created: &mut Vec<BufferId>,
        kind: PipelineKind,
        mesh: &Mesh,
        styles: &[u8],
        dynamic: &[u8],
        instances: usize,
    ) -> Result<InstancedMesh, GpuError> {
        let pipeline = self.pipeline(kind)?;
        let [vertex_label, index_label, style_label, dynamic_label] = match kind {
            PipelineKind::AtomSpheres => {
                ["Sphere Vertices", "Sphere Indices", "Atom Styles", "Atom Positions"]
            }
            PipelineKind::BondCylinders => [
                "Cylinder Vertices",
                "Cylinder Indices",
                "Bond Styles",
                "Bond Endpoints",
            ],
        };
        Ok(InstancedMesh {
            pipeline,
            vertices: self.upload(
                created,
                vertex_label,
                BufferUsage::Vertex,
                bytemuck::cast_slice(&mesh.vertices),
            )?,
            indices: self.upload(
                created,
                index_label,
                BufferUsage::Index,
                bytemuck::cast_slice(&mesh.indices),
            )?,
            index_count: to_u32(mesh.indices.len())?,
            styles: self.upload(created, style_label, BufferUsage::Vertex, styles)?,
            dynamic: self.upload(created, dynamic_label, BufferUsage::Vertex, dynamic)?,
            instance_count: to_u32(instances)?,
        })
    }

    fn upload(
        &mut self,
        created: &mut Vec<BufferId>,
        label: &str,
        usage: BufferUsage,
        contents: &[u8],
    ) -> Result<BufferId, GpuError> {
        let id = self.context.create_buffer(label, usage, contents)?;
        created.push(id);
        Ok(id)
    }

    fn pipeline(&mut self, kind: PipelineKind) -> Result<PipelineId, GpuError> {
        let slot = match kind {
            PipelineKind::AtomSpheres => &mut self.atom_pipeline,
            PipelineKind::BondCylinders => &mut self.bond_pipeline,
        };
        if let Some(id) = *slot {
            return Ok(id);
        }
        let id = self.context.create_pipeline(kind)?;
        *slot = Some(id);
        Ok(id)
    }

    fn reserve_scratch(&mut self, structure: &Structure) {
        self.atom_positions.clear();
        self.atom_positions.reserve(structure.atom_count());
        self.bond_endpoints.clear();
        self.bond_endpoints.reserve(structure.bond_count());
    }

    /// Free the buffers of a molecule that is no longer displayed.
    pub fn release(&mut self, resources: MoleculeResources) {
        for id in resources.buffers() {
            self.context.release_buffer(id);
        }
    }

    /// Reconfigure the drawable and the camera aspect ratio.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidDimensions`] if either dimension is zero,
    /// [`ViewerError::GpuResource`] if the context cannot be reconfigured.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ViewerError> {
        if width == 0 || height == 0 {
            return Err(ViewerError::InvalidDimensions { width, height });
        }
        self.context
            .configure(width, height)
            .map_err(ViewerError::GpuResource)?;
        self.camera.resize(width, height);
        Ok(())
    }

    /// Draw one frame of `structure` at the state held by `simulation`.
    ///
    /// Writes into the buffers of `resources`; never allocates GPU memory.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Render`] if `resources` does not match `structure` or
    /// the context fails.
    pub fn draw(
        &mut self,
        resources: &MoleculeResources,
        structure: &Structure,
        simulation: &SimulationState,
    ) -> Result<(), ViewerError> {
        if self.released {
            return Err(ViewerError::Disposed);
        }
        let positions = simulation.positions();
        if resources.atom_count() != structure.atom_count()
            || resources.bond_count() != structure.bond_count()
            || positions.len() != structure.atom_count()
        {
            return Err(ViewerError::Render(GpuError::InvalidHandle));
        }
        self.submit(resources, structure, positions)
            .map_err(ViewerError::Render)
    }

    fn submit(
        &mut self,
        resources: &MoleculeResources,
        structure: &Structure,
        positions: &[Vec3],
    ) -> Result<(), GpuError> {
        instances::fill_atom_positions(positions, &mut self.atom_positions);
        self.context.write_buffer(
            resources.atoms.dynamic,
            0,
            bytemuck::cast_slice(&self.atom_positions),
        )?;

        if let Some(bonds) = &resources.bonds {
            instances::fill_bond_endpoints(structure, positions, &mut self.bond_endpoints);
            self.context.write_buffer(
                bonds.dynamic,
                0,
                bytemuck::cast_slice(&self.bond_endpoints),
            )?;
        }

        let uniform = self.camera.uniform(&self.lighting);
        self.context
            .write_buffer(self.camera_buffer, 0, bytemuck::bytes_of(&uniform))?;

        let atoms = resources.atoms.draw_call();
        let mut draws = [atoms, atoms];
        let count = match &resources.bonds {
            Some(bonds) => {
                draws[1] = bonds.draw_call();
                2
            }
            None => 1,
        };
        self.context.draw_frame(&Frame {
            clear_color: self.clear_color(),
            camera: self.camera_buffer,
            draws: &draws[..count],
        })
    }

    fn clear_color(&self) -> [f64; 4] {
        let [r, g, b] = self.options.clear_color.map(srgb_to_linear);
        [f64::from(r), f64::from(g), f64::from(b), 1.0]
    }

    /// Centre the camera on `structure` and back off until its bounding
    /// sphere, padded by the largest atom radius, fills the view.
    pub fn fit(&mut self, structure: &Structure) {
        let padding = structure
            .atoms()
            .iter()
            .map(|a| a.element.vdw_radius() * self.options.atom_scale)
            .fold(0.0f32, f32::max);
        let positions: Vec<Vec3> = structure.positions().collect();
        self.camera.fit_to_positions(&positions, padding);
    }

    /// Orbit by a pointer delta in pixels.
    pub fn orbit(&mut self, delta: Vec2) {
        self.camera.rotate(delta);
    }

    /// Pan by a pointer delta in pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }

    /// Zoom by scroll delta; positive moves closer.
    pub fn zoom(&mut self, delta: f32) {
        self.camera.zoom(delta);
    }

    /// Roll around the view axis by `angle` radians.
    pub fn roll(&mut self, angle: f32) {
        self.camera.roll(angle);
    }

    /// Return to the last fitted view.
    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }

    /// Replace appearance, camera and lighting settings. Appearance changes
    /// only reach the GPU on the next [`build`](Self::build).
    pub fn set_options(
        &mut self,
        options: &RenderOptions,
        camera: &CameraOptions,
        lighting: &LightingOptions,
    ) {
        self.options = options.clone();
        self.lighting = lighting.clone();
        self.camera.apply_options(camera);
    }

    /// The camera controller.
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// Current appearance settings.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The owned graphics context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable access to the graphics context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Free the camera buffer and cached pipelines. Further builds and
    /// draws fail with [`ViewerError::Disposed`]. Idempotent.
    pub fn dispose(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.context.release_buffer(self.camera_buffer);
        for pipeline in [self.atom_pipeline.take(), self.bond_pipeline.take()]
            .into_iter()
            .flatten()
        {
            self.context.release_pipeline(pipeline);
        }
        self.atom_positions = Vec::new();
        self.bond_endpoints = Vec::new();
    }
}

fn to_u32(len: usize) -> Result<u32, GpuError> {
    u32::try_from(len).map_err(|_| GpuError::OutOfMemory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessContext;
    use crate::options::SimulationOptions;
    use crate::structure::{Atom, BondOrder, Element, StructureBuilder};

    fn water() -> Structure {
        let mut b = StructureBuilder::new();
        let o = b.add_atom(Atom::new(Element::O, Vec3::ZERO));
        let h1 = b.add_atom(Atom::new(Element::H, Vec3::new(0.96, 0.0, 0.0)));
        let h2 = b.add_atom(Atom::new(Element::H, Vec3::new(-0.24, 0.93, 0.0)));
        b.add_bond(o, h1, BondOrder::Single);
        b.add_bond(o, h2, BondOrder::Single);
        b.finish().unwrap()
    }

    fn argon() -> Structure {
        let mut b = StructureBuilder::new();
        let _ = b.add_atom(Atom::new(Element::Ar, Vec3::ONE));
        b.finish().unwrap()
    }

    fn renderer() -> Renderer<HeadlessContext> {
        Renderer::new(
            HeadlessContext::new(640, 480),
            &RenderOptions::default(),
            &CameraOptions::default(),
            &LightingOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn build_allocates_one_set_per_primitive() {
        let mut r = renderer();
        let s = water();
        let res = r.build(&s).unwrap();
        assert_eq!(res.atom_count(), 3);
        assert_eq!(res.bond_count(), 2);
        // camera + 4 atom buffers + 4 bond buffers
        assert_eq!(r.context().live_buffers(), 9);
        assert_eq!(r.context().live_pipelines(), 2);
        let styles = r.context().buffer_data(res.atoms.styles).unwrap();
        assert_eq!(styles.len(), 3 * std::mem::size_of::<instances::AtomStyle>());
    }

    #[test]
    fn bondless_molecules_skip_cylinders() {
        let mut r = renderer();
        let s = argon();
        let res = r.build(&s).unwrap();
        assert_eq!(res.bond_count(), 0);
        assert_eq!(r.context().live_pipelines(), 1);

        let sim = SimulationState::initialize(&s, &SimulationOptions::default());
        r.draw(&res, &s, &sim).unwrap();
        assert_eq!(r.context().last_frame().unwrap().draws.len(), 1);
    }

    #[test]
    fn failed_build_releases_partial_buffers() {
        let mut r = renderer();
        r.context_mut().set_buffer_limit(Some(4));
        let err = r.build(&water()).unwrap_err();
        assert!(matches!(err, ViewerError::GpuResource(GpuError::OutOfMemory)));
        assert_eq!(r.context().live_buffers(), 1);

        r.context_mut().set_buffer_limit(None);
        assert!(r.build(&water()).is_ok());
    }

    #[test]
    fn draw_writes_without_allocating() {
        let mut r = renderer();
        let s = water();
        let res = r.build(&s).unwrap();
        let mut sim = SimulationState::initialize(&s, &SimulationOptions::default());
        r.draw(&res, &s, &sim).unwrap();
        let allocations = r.context().allocation_count();

        for _ in 0..10 {
            sim.advance(&s, 0.016).unwrap();
            r.draw(&res, &s, &sim).unwrap();
        }
        assert_eq!(r.context().allocation_count(), allocations);
        assert_eq!(r.context().frame_count(), 11);

        let frame = r.context().last_frame().unwrap();
        assert_eq!(frame.draws.len(), 2);
        assert_eq!(frame.draws[0].instance_count, 3);
        assert_eq!(frame.draws[1].instance_count, 2);

        let written: &[[f32; 3]] =
            bytemuck::cast_slice(r.context().buffer_data(res.atoms.dynamic).unwrap());
        assert_eq!(written[1], sim.positions()[1].to_array());
    }

    #[test]
    fn lost_context_is_a_render_error() {
        let mut r = renderer();
        let s = water();
        let res = r.build(&s).unwrap();
        let sim = SimulationState::initialize(&s, &SimulationOptions::default());
        r.context_mut().set_lost(true);
        let err = r.draw(&res, &s, &sim).unwrap_err();
        assert!(matches!(err, ViewerError::Render(GpuError::ContextLost)));
    }

    #[test]
    fn mismatched_resources_are_rejected() {
        let mut r = renderer();
        let s = water();
        let res = r.build(&argon()).unwrap();
        let sim = SimulationState::initialize(&s, &SimulationOptions::default());
        assert!(matches!(
            r.draw(&res, &s, &sim),
            Err(ViewerError::Render(GpuError::InvalidHandle))
        ));
    }

    #[test]
    fn resize_rejects_zero_and_updates_aspect() {
        let mut r = renderer();
        assert!(matches!(
            r.resize(0, 600),
            Err(ViewerError::InvalidDimensions { width: 0, height: 600 })
        ));
        r.resize(800, 400).unwrap();
        assert_eq!(r.context().viewport(), (800, 400));
        assert!((r.camera().camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn release_and_dispose_free_everything() {
        let mut r = renderer();
        let res = r.build(&water()).unwrap();
        r.release(res);
        assert_eq!(r.context().live_buffers(), 1);
        r.dispose();
        r.dispose();
        assert_eq!(r.context().live_buffers(), 0);
        assert_eq!(r.context().live_pipelines(), 0);
        assert!(matches!(r.build(&water()), Err(ViewerError::Disposed)));
    }

    #[test]
    fn fit_centres_on_structure() {
        let mut r = renderer();
        let s = water();
        r.fit(&s);
        assert!((r.camera().focus_point() - s.centroid()).length() < 1e-5);
        r.orbit(Vec2::new(40.0, 0.0));
        r.reset_camera();
        assert!((r.camera().focus_point() - s.centroid()).length() < 1e-5);
    }

    #[test]
    fn clear_colour_is_linear() {
        let r = renderer();
        let [red, green, blue, alpha] = r.clear_color();
        assert!(red < 0.53 && green < 0.8 && blue < 0.98);
        assert_eq!(alpha, 1.0);
    }
}
