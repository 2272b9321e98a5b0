//! Canonical in-memory molecule: atoms, bonds and their queries.
//!
//! A [`Structure`] can only be produced through [`StructureBuilder`], which
//! enforces the model invariants (finite positions, valid and distinct bond
//! indices, at least one atom) and drops duplicate bonds. Once built, a
//! structure is immutable.

/// Distance-based bond inference over a uniform spatial grid.
pub mod bond_inference;
/// Chemical element table.
pub mod element;

use std::fmt;

pub use element::Element;
use glam::Vec3;
use rustc_hash::FxHashSet;

/// A single atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical species.
    pub element: Element,
    /// Position in angstrom.
    pub position: Vec3,
    /// Atom label from the source file (empty when the format has none).
    pub name: String,
}

impl Atom {
    /// Unnamed atom.
    pub fn new(element: Element, position: Vec3) -> Self {
        Self {
            element,
            position,
            name: String::new(),
        }
    }

    /// Atom carrying a label from the source file.
    pub fn named(element: Element, position: Vec3, name: impl Into<String>) -> Self {
        Self {
            element,
            position,
            name: name.into(),
        }
    }
}

/// Bond multiplicity as declared by the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    /// Single bond; also used for inferred bonds.
    #[default]
    Single,
    /// Double bond.
    Double,
    /// Triple bond.
    Triple,
    /// Aromatic bond.
    Aromatic,
}

impl BondOrder {
    /// Map an MDL CTfile bond type code.
    pub fn from_ctfile(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Aromatic),
            _ => None,
        }
    }
}

/// An undirected bond stored with `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    /// Lower atom index.
    pub i: usize,
    /// Higher atom index.
    pub j: usize,
    /// Declared or inferred order.
    pub order: BondOrder,
}

impl Bond {
    /// Bond between two atoms, normalised so that `i < j`.
    pub fn new(a: usize, b: usize, order: BondOrder) -> Self {
        if a <= b {
            Self { i: a, j: b, order }
        } else {
            Self { i: b, j: a, order }
        }
    }

    /// The unordered atom pair.
    pub fn pair(&self) -> (usize, usize) {
        (self.i, self.j)
    }
}

/// Violations of the structural model invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// No atoms were added.
    Empty,
    /// An atom position contains NaN or infinity.
    NonFinitePosition {
        /// Index of the offending atom.
        atom: usize,
    },
    /// A bond references a missing atom or connects an atom to itself.
    InvalidBond {
        /// First index as given.
        i: usize,
        /// Second index as given.
        j: usize,
    },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "structure contains no atoms"),
            Self::NonFinitePosition { atom } => {
                write!(f, "atom {atom} has a non-finite position")
            }
            Self::InvalidBond { i, j } => {
                write!(f, "bond ({i}, {j}) does not connect two distinct atoms")
            }
        }
    }
}

impl std::error::Error for StructureError {}

/// An immutable, validated molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    title: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Structure {
    /// Title or comment line from the source file.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Atoms in parse order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Deduplicated bonds, `i < j`.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Atom by index.
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Number of atoms (never zero).
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds.
    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Base positions in atom order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.atoms.iter().map(|a| a.position)
    }

    /// Mean of all atom positions.
    pub fn centroid(&self) -> Vec3 {
        self.positions().sum::<Vec3>() / self.atoms.len() as f32
    }

    /// Largest distance from the centroid to any atom centre.
    pub fn bounding_radius(&self) -> f32 {
        let centroid = self.centroid();
        self.positions()
            .map(|p| (p - centroid).length())
            .fold(0.0f32, f32::max)
    }
}

/// Accumulates atoms and bonds, then validates them into a [`Structure`].
#[derive(Debug, Default)]
pub struct StructureBuilder {
    title: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl StructureBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with room for `atoms` atoms.
    pub fn with_capacity(atoms: usize) -> Self {
        Self {
            title: String::new(),
            atoms: Vec::with_capacity(atoms),
            bonds: Vec::new(),
        }
    }

    /// Set the structure title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Append an atom and return its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Append a bond. Validation happens in [`finish`](Self::finish).
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) {
        self.bonds.push(Bond::new(a, b, order));
    }

    /// Atoms added so far.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Number of atoms added so far.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Whether any bond has been added.
    pub fn has_bonds(&self) -> bool {
        !self.bonds.is_empty()
    }

    /// Validate and freeze. Duplicate bonds keep their first occurrence.
    pub fn finish(self) -> Result<Structure, StructureError> {
        if self.atoms.is_empty() {
            return Err(StructureError::Empty);
        }
        if let Some(atom) = self
            .atoms
            .iter()
            .position(|a| !a.position.is_finite())
        {
            return Err(StructureError::NonFinitePosition { atom });
        }

        let n = self.atoms.len();
        let mut seen = FxHashSet::default();
        let mut bonds = Vec::with_capacity(self.bonds.len());
        for bond in self.bonds {
            if bond.i == bond.j || bond.j >= n {
                return Err(StructureError::InvalidBond {
                    i: bond.i,
                    j: bond.j,
                });
            }
            if seen.insert(bond.pair()) {
                bonds.push(bond);
            }
        }

        Ok(Structure {
            title: self.title,
            atoms: self.atoms,
            bonds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> StructureBuilder {
        let mut b = StructureBuilder::new();
        let o = b.add_atom(Atom::new(Element::O, Vec3::ZERO));
        let h1 = b.add_atom(Atom::new(Element::H, Vec3::new(0.96, 0.0, 0.0)));
        let h2 = b.add_atom(Atom::new(Element::H, Vec3::new(-0.24, 0.93, 0.0)));
        b.add_bond(o, h1, BondOrder::Single);
        b.add_bond(o, h2, BondOrder::Single);
        b
    }

    #[test]
    fn bonds_are_normalised_and_deduplicated() {
        let mut b = water();
        b.add_bond(1, 0, BondOrder::Double);
        let s = b.finish().unwrap();
        assert_eq!(s.bond_count(), 2);
        assert_eq!(s.bonds()[0].pair(), (0, 1));
        // first declaration wins
        assert_eq!(s.bonds()[0].order, BondOrder::Single);
    }

    #[test]
    fn rejects_empty_structure() {
        assert_eq!(
            StructureBuilder::new().finish().unwrap_err(),
            StructureError::Empty
        );
    }

    #[test]
    fn rejects_self_and_dangling_bonds() {
        let mut b = water();
        b.add_bond(2, 2, BondOrder::Single);
        assert_eq!(
            b.finish().unwrap_err(),
            StructureError::InvalidBond { i: 2, j: 2 }
        );

        let mut b = water();
        b.add_bond(0, 7, BondOrder::Single);
        assert!(matches!(
            b.finish(),
            Err(StructureError::InvalidBond { i: 0, j: 7 })
        ));
    }

    #[test]
    fn rejects_non_finite_positions() {
        let mut b = water();
        let _ = b.add_atom(Atom::new(Element::C, Vec3::new(f32::NAN, 0.0, 0.0)));
        assert_eq!(
            b.finish().unwrap_err(),
            StructureError::NonFinitePosition { atom: 3 }
        );
    }

    #[test]
    fn centroid_and_radius() {
        let mut b = StructureBuilder::new();
        let _ = b.add_atom(Atom::new(Element::C, Vec3::new(-1.0, 0.0, 0.0)));
        let _ = b.add_atom(Atom::new(Element::C, Vec3::new(1.0, 0.0, 0.0)));
        let s = b.finish().unwrap();
        assert_eq!(s.centroid(), Vec3::ZERO);
        assert!((s.bounding_radius() - 1.0).abs() < 1e-6);
    }
}
