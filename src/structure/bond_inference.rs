//! Covalent-radius bond inference for formats without connectivity.
//!
//! Two atoms are bonded when their distance lies in
//! `(MIN_BOND_DISTANCE, r_a + r_b + tolerance]`. Candidate pairs come from a
//! uniform hash grid whose cell edge equals the largest possible cutoff, so
//! only the 27 surrounding cells need to be visited per atom.

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::Atom;

/// Pairs closer than this are treated as overlapping atoms, not bonds.
pub const MIN_BOND_DISTANCE: f32 = 0.4;

/// Default slack added to the covalent radius sum, in angstrom.
pub const DEFAULT_TOLERANCE: f32 = 0.45;

type CellKey = (i32, i32, i32);

fn cell_of(p: Vec3, cell: f32) -> CellKey {
    let c = (p / cell).floor();
    (c.x as i32, c.y as i32, c.z as i32)
}

/// Infer bonds for `atoms`, returning sorted `(i, j)` pairs with `i < j`.
///
/// Deterministic: the result depends only on the positions, elements and
/// tolerance. A tolerance that makes a pair's cutoff non-positive bonds
/// nothing for that pair.
pub fn infer_bonds(atoms: &[Atom], tolerance: f32) -> Vec<(usize, usize)> {
    if atoms.len() < 2 {
        return Vec::new();
    }

    let max_radius = atoms
        .iter()
        .map(|a| a.element.covalent_radius())
        .fold(0.0f32, f32::max);
    let cell = (2.0 * max_radius + tolerance).max(MIN_BOND_DISTANCE * 2.0);

    let mut grid: FxHashMap<CellKey, Vec<usize>> = FxHashMap::default();
    for (i, atom) in atoms.iter().enumerate() {
        grid.entry(cell_of(atom.position, cell)).or_default().push(i);
    }

    let min_sq = MIN_BOND_DISTANCE * MIN_BOND_DISTANCE;
    let mut pairs = Vec::new();
    for (i, a) in atoms.iter().enumerate() {
        let (cx, cy, cz) = cell_of(a.position, cell);
        let ra = a.element.covalent_radius();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    let Some(members) = grid.get(&key) else {
                        continue;
                    };
                    for &j in members.iter().filter(|&&j| j > i) {
                        let b = &atoms[j];
                        let cutoff = ra + b.element.covalent_radius() + tolerance;
                        let d_sq = a.position.distance_squared(b.position);
                        if cutoff > 0.0 && d_sq > min_sq && d_sq <= cutoff * cutoff {
                            pairs.push((i, j));
                        }
                    }
                }
            }
        }
    }

    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Element;

    fn atom(e: Element, x: f32, y: f32, z: f32) -> Atom {
        Atom::new(e, Vec3::new(x, y, z))
    }

    #[test]
    fn carbon_monoxide_bonds() {
        let atoms = [
            atom(Element::C, 0.0, 0.0, 0.0),
            atom(Element::O, 1.2, 0.0, 0.0),
        ];
        assert_eq!(infer_bonds(&atoms, DEFAULT_TOLERANCE), vec![(0, 1)]);
    }

    #[test]
    fn distant_atoms_do_not_bond() {
        let atoms = [
            atom(Element::C, 0.0, 0.0, 0.0),
            atom(Element::C, 5.0, 0.0, 0.0),
        ];
        assert!(infer_bonds(&atoms, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn overlapping_atoms_do_not_bond() {
        let atoms = [
            atom(Element::C, 0.0, 0.0, 0.0),
            atom(Element::C, 0.1, 0.0, 0.0),
        ];
        assert!(infer_bonds(&atoms, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn negative_cutoff_bonds_nothing() {
        let atoms = [
            atom(Element::C, 0.0, 0.0, 0.0),
            atom(Element::C, 0.9, 0.0, 0.0),
        ];
        assert_eq!(infer_bonds(&atoms, 0.0), vec![(0, 1)]);
        assert!(infer_bonds(&atoms, -4.0).is_empty());
        assert!(infer_bonds(&atoms, f32::NAN).is_empty());
    }

    #[test]
    fn methane_has_four_ch_bonds() {
        let d = 0.63;
        let atoms = [
            atom(Element::C, 0.0, 0.0, 0.0),
            atom(Element::H, d, d, d),
            atom(Element::H, -d, -d, d),
            atom(Element::H, -d, d, -d),
            atom(Element::H, d, -d, -d),
        ];
        let bonds = infer_bonds(&atoms, DEFAULT_TOLERANCE);
        assert_eq!(bonds, vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn pairs_across_cell_boundaries_are_found() {
        // straddles the origin, where cell indices change sign
        let atoms = [
            atom(Element::C, -0.7, -0.01, -0.01),
            atom(Element::C, 0.7, 0.01, 0.01),
        ];
        assert_eq!(infer_bonds(&atoms, DEFAULT_TOLERANCE), vec![(0, 1)]);
    }

    #[test]
    fn chain_matches_brute_force() {
        let atoms: Vec<Atom> = (0..40)
            .map(|i| {
                let t = i as f32;
                atom(Element::C, t * 1.5, (t * 0.7).sin(), (t * 0.3).cos())
            })
            .collect();
        let mut expected = Vec::new();
        for i in 0..atoms.len() {
            for j in (i + 1)..atoms.len() {
                let d = atoms[i].position.distance(atoms[j].position);
                if d > MIN_BOND_DISTANCE && d <= 0.76 + 0.76 + DEFAULT_TOLERANCE {
                    expected.push((i, j));
                }
            }
        }
        assert_eq!(infer_bonds(&atoms, DEFAULT_TOLERANCE), expected);
    }
}
