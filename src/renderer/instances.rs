//! Per-instance vertex data for atoms and bonds.
//!
//! Static attributes (colour, radius) are written once per molecule; the
//! dynamic ones (positions, endpoints) are rewritten every frame from the
//! simulation state. Layouts must match the WGSL input structs.

use glam::Vec3;

use crate::options::RenderOptions;
use crate::structure::{Element, Structure};

/// Static per-atom data. Must match `AtomInput` locations 2-3.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AtomStyle {
    /// Linear RGB colour.
    pub color: [f32; 3],
    /// Sphere radius in angstrom.
    pub radius: f32,
}

/// Static per-bond data. Must match `BondInput` locations 2-4.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BondStyle {
    /// Linear RGB colour of the half nearer the first atom.
    pub color_a: [f32; 3],
    /// Cylinder radius in angstrom.
    pub radius: f32,
    /// Linear RGB colour of the half nearer the second atom.
    pub color_b: [f32; 3],
    /// Padding to 32 bytes.
    pub(crate) _pad: f32,
}

/// Dynamic per-bond data. Must match `BondInput` locations 5-6.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BondEndpoints {
    /// Current position of the first atom.
    pub start: [f32; 3],
    /// Current position of the second atom.
    pub end: [f32; 3],
}

/// Convert one sRGB channel to linear.
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Element colour in linear RGB.
pub fn linear_color(element: Element) -> [f32; 3] {
    element.cpk_color().map(srgb_to_linear)
}

/// Static atom attributes in atom order.
pub fn atom_styles(structure: &Structure, options: &RenderOptions) -> Vec<AtomStyle> {
    structure
        .atoms()
        .iter()
        .map(|atom| AtomStyle {
            color: linear_color(atom.element),
            radius: atom.element.vdw_radius() * options.atom_scale,
        })
        .collect()
}

/// Static bond attributes in bond order.
pub fn bond_styles(structure: &Structure, options: &RenderOptions) -> Vec<BondStyle> {
    let atoms = structure.atoms();
    structure
        .bonds()
        .iter()
        .map(|bond| {
            let a = atoms[bond.i].element;
            let b = atoms[bond.j].element;
            BondStyle {
                color_a: linear_color(a),
                radius: options.bond_radius(a.covalent_radius(), b.covalent_radius()),
                color_b: linear_color(b),
                _pad: 0.0,
            }
        })
        .collect()
}

/// Refill `out` with the current atom centres. Reuses the allocation.
pub fn fill_atom_positions(positions: &[Vec3], out: &mut Vec<[f32; 3]>) {
    out.clear();
    out.extend(positions.iter().map(|p| p.to_array()));
}

/// Refill `out` with the current bond endpoints. Reuses the allocation.
pub fn fill_bond_endpoints(
    structure: &Structure,
    positions: &[Vec3],
    out: &mut Vec<BondEndpoints>,
) {
    out.clear();
    out.extend(structure.bonds().iter().map(|bond| BondEndpoints {
        start: positions[bond.i].to_array(),
        end: positions[bond.j].to_array(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Atom, BondOrder, StructureBuilder};

    fn hydroxyl() -> Structure {
        let mut b = StructureBuilder::new();
        let o = b.add_atom(Atom::new(Element::O, Vec3::ZERO));
        let h = b.add_atom(Atom::new(Element::H, Vec3::new(0.96, 0.0, 0.0)));
        b.add_bond(o, h, BondOrder::Single);
        b.finish().unwrap()
    }

    #[test]
    fn instance_sizes_match_shader_strides() {
        assert_eq!(std::mem::size_of::<AtomStyle>(), 16);
        assert_eq!(std::mem::size_of::<BondStyle>(), 32);
        assert_eq!(std::mem::size_of::<BondEndpoints>(), 24);
    }

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.5);
    }

    #[test]
    fn styles_follow_elements() {
        let s = hydroxyl();
        let opts = RenderOptions::default();
        let atoms = atom_styles(&s, &opts);
        assert_eq!(atoms.len(), 2);
        assert!((atoms[0].radius - 1.52 * 0.25).abs() < 1e-6);
        assert_eq!(atoms[0].color, linear_color(Element::O));

        let bonds = bond_styles(&s, &opts);
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].color_a, linear_color(Element::O));
        assert_eq!(bonds[0].color_b, linear_color(Element::H));
        assert_eq!(bonds[0].radius, 0.05);
    }

    #[test]
    fn dynamic_fill_reuses_capacity() {
        let s = hydroxyl();
        let positions: Vec<Vec3> = s.positions().collect();
        let mut centres = Vec::with_capacity(8);
        let mut ends = Vec::with_capacity(8);
        fill_atom_positions(&positions, &mut centres);
        fill_bond_endpoints(&s, &positions, &mut ends);
        assert_eq!(centres, vec![[0.0; 3], [0.96, 0.0, 0.0]]);
        assert_eq!(ends[0].end, [0.96, 0.0, 0.0]);
        let cap = centres.capacity();
        fill_atom_positions(&positions, &mut centres);
        assert_eq!(centres.capacity(), cap);
    }
}
