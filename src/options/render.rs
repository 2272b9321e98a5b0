use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Rendering", inline)]
#[serde(default)]
/// Ball-and-stick appearance and mesh detail.
pub struct RenderOptions {
    /// Background colour (sRGB).
    #[schemars(skip)]
    pub clear_color: [f32; 3],
    /// Atom sphere radius as a fraction of the van der Waals radius.
    #[schemars(title = "Atom Scale", range(min = 0.05, max = 1.0), extend("step" = 0.01))]
    pub atom_scale: f32,
    /// Bond radius as a fraction of the smaller covalent radius.
    #[schemars(title = "Bond Scale", range(min = 0.02, max = 0.5), extend("step" = 0.01))]
    pub bond_scale: f32,
    /// Lower bound on the bond radius, in angstrom.
    #[schemars(skip)]
    pub min_bond_radius: f32,
    /// Icosphere subdivision level for atom spheres.
    #[schemars(skip)]
    pub sphere_subdivisions: u32,
    /// Radial segments of the bond cylinder.
    #[schemars(skip)]
    pub cylinder_segments: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.53, 0.8, 0.98],
            atom_scale: 0.25,
            bond_scale: 0.125,
            min_bond_radius: 0.05,
            sphere_subdivisions: 2,
            cylinder_segments: 16,
        }
    }
}

impl RenderOptions {
    /// Cylinder radius for a bond between atoms with the given covalent
    /// radii.
    pub fn bond_radius(&self, covalent_a: f32, covalent_b: f32) -> f32 {
        (covalent_a.min(covalent_b) * self.bond_scale).max(self.min_bond_radius)
    }
}
