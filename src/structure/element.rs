//! Chemical element table: radii, CPK colours and masses.

use std::fmt;
use std::str::FromStr;

/// Closed set of chemical species the viewer knows how to draw.
///
/// Anything outside the table parses to [`Element::Unknown`], which still
/// resolves to a radius and colour so every atom stays renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Sc,
    Ti,
    V,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Rb,
    Sr,
    Ag,
    Cd,
    Sn,
    I,
    Xe,
    Cs,
    Ba,
    Pt,
    Au,
    Hg,
    Pb,
    /// Fallback for symbols outside the table.
    Unknown,
}

struct ElementInfo {
    symbol: &'static str,
    name: &'static str,
    number: u8,
    /// Covalent radius in angstrom (Cordero et al. 2008).
    covalent: f32,
    /// Van der Waals radius in angstrom.
    vdw: f32,
    /// Jmol CPK colour, 0xRRGGBB.
    color: u32,
    /// Standard atomic weight in u.
    mass: f32,
}

macro_rules! info {
    ($sym:literal, $name:literal, $num:literal, $cov:literal, $vdw:literal, $color:literal, $mass:literal) => {
        ElementInfo {
            symbol: $sym,
            name: $name,
            number: $num,
            covalent: $cov,
            vdw: $vdw,
            color: $color,
            mass: $mass,
        }
    };
}

// Order must match the enum declaration.
const TABLE: [ElementInfo; 50] = [
    info!("H", "Hydrogen", 1, 0.31, 1.20, 0xFF_FF_FF, 1.008),
    info!("He", "Helium", 2, 0.28, 1.40, 0xD9_FF_FF, 4.0026),
    info!("Li", "Lithium", 3, 1.28, 1.82, 0xCC_80_FF, 6.94),
    info!("Be", "Beryllium", 4, 0.96, 1.53, 0xC2_FF_00, 9.0122),
    info!("B", "Boron", 5, 0.84, 1.92, 0xFF_B5_B5, 10.81),
    info!("C", "Carbon", 6, 0.76, 1.70, 0x90_90_90, 12.011),
    info!("N", "Nitrogen", 7, 0.71, 1.55, 0x30_50_F8, 14.007),
    info!("O", "Oxygen", 8, 0.66, 1.52, 0xFF_0D_0D, 15.999),
    info!("F", "Fluorine", 9, 0.57, 1.47, 0x90_E0_50, 18.998),
    info!("Ne", "Neon", 10, 0.58, 1.54, 0xB3_E3_F5, 20.180),
    info!("Na", "Sodium", 11, 1.66, 2.27, 0xAB_5C_F2, 22.990),
    info!("Mg", "Magnesium", 12, 1.41, 1.73, 0x8A_FF_00, 24.305),
    info!("Al", "Aluminium", 13, 1.21, 1.84, 0xBF_A6_A6, 26.982),
    info!("Si", "Silicon", 14, 1.11, 2.10, 0xF0_C8_A0, 28.085),
    info!("P", "Phosphorus", 15, 1.07, 1.80, 0xFF_80_00, 30.974),
    info!("S", "Sulfur", 16, 1.05, 1.80, 0xFF_FF_30, 32.06),
    info!("Cl", "Chlorine", 17, 1.02, 1.75, 0x1F_F0_1F, 35.45),
    info!("Ar", "Argon", 18, 1.06, 1.88, 0x80_D1_E3, 39.948),
    info!("K", "Potassium", 19, 2.03, 2.75, 0x8F_40_D4, 39.098),
    info!("Ca", "Calcium", 20, 1.76, 2.31, 0x3D_FF_00, 40.078),
    info!("Sc", "Scandium", 21, 1.70, 2.11, 0xE6_E6_E6, 44.956),
    info!("Ti", "Titanium", 22, 1.60, 1.87, 0xBF_C2_C7, 47.867),
    info!("V", "Vanadium", 23, 1.53, 1.79, 0xA6_A6_AB, 50.942),
    info!("Cr", "Chromium", 24, 1.39, 1.89, 0x8A_99_C7, 51.996),
    info!("Mn", "Manganese", 25, 1.39, 1.97, 0x9C_7A_C7, 54.938),
    info!("Fe", "Iron", 26, 1.32, 1.94, 0xE0_66_33, 55.845),
    info!("Co", "Cobalt", 27, 1.26, 1.92, 0xF0_90_A0, 58.933),
    info!("Ni", "Nickel", 28, 1.24, 1.63, 0x50_D0_50, 58.693),
    info!("Cu", "Copper", 29, 1.32, 1.40, 0xC8_80_33, 63.546),
    info!("Zn", "Zinc", 30, 1.22, 1.39, 0x7D_80_B0, 65.38),
    info!("Ga", "Gallium", 31, 1.22, 1.87, 0xC2_8F_8F, 69.723),
    info!("Ge", "Germanium", 32, 1.20, 2.11, 0x66_8F_8F, 72.630),
    info!("As", "Arsenic", 33, 1.19, 1.85, 0xBD_80_E3, 74.922),
    info!("Se", "Selenium", 34, 1.20, 1.90, 0xFF_A1_00, 78.971),
    info!("Br", "Bromine", 35, 1.20, 1.85, 0xA6_29_29, 79.904),
    info!("Kr", "Krypton", 36, 1.16, 2.02, 0x5C_B8_D1, 83.798),
    info!("Rb", "Rubidium", 37, 2.20, 3.03, 0x70_2E_B0, 85.468),
    info!("Sr", "Strontium", 38, 1.95, 2.49, 0x00_FF_00, 87.62),
    info!("Ag", "Silver", 47, 1.45, 1.72, 0xC0_C0_C0, 107.87),
    info!("Cd", "Cadmium", 48, 1.44, 1.58, 0xFF_D9_8F, 112.41),
    info!("Sn", "Tin", 50, 1.39, 2.17, 0x66_80_80, 118.71),
    info!("I", "Iodine", 53, 1.39, 1.98, 0x94_00_94, 126.90),
    info!("Xe", "Xenon", 54, 1.40, 2.16, 0x42_9E_B0, 131.29),
    info!("Cs", "Caesium", 55, 2.44, 3.43, 0x57_17_8F, 132.91),
    info!("Ba", "Barium", 56, 2.15, 2.68, 0x00_C9_00, 137.33),
    info!("Pt", "Platinum", 78, 1.36, 1.75, 0xD0_D0_E0, 195.08),
    info!("Au", "Gold", 79, 1.36, 1.66, 0xFF_D1_23, 196.97),
    info!("Hg", "Mercury", 80, 1.32, 1.55, 0xB8_B8_D0, 200.59),
    info!("Pb", "Lead", 82, 1.46, 2.02, 0x57_59_61, 207.2),
    info!("X", "Unknown", 0, 1.50, 2.00, 0xFF_14_93, 12.011),
];

const ALL: [Element; 49] = [
    Element::H,
    Element::He,
    Element::Li,
    Element::Be,
    Element::B,
    Element::C,
    Element::N,
    Element::O,
    Element::F,
    Element::Ne,
    Element::Na,
    Element::Mg,
    Element::Al,
    Element::Si,
    Element::P,
    Element::S,
    Element::Cl,
    Element::Ar,
    Element::K,
    Element::Ca,
    Element::Sc,
    Element::Ti,
    Element::V,
    Element::Cr,
    Element::Mn,
    Element::Fe,
    Element::Co,
    Element::Ni,
    Element::Cu,
    Element::Zn,
    Element::Ga,
    Element::Ge,
    Element::As,
    Element::Se,
    Element::Br,
    Element::Kr,
    Element::Rb,
    Element::Sr,
    Element::Ag,
    Element::Cd,
    Element::Sn,
    Element::I,
    Element::Xe,
    Element::Cs,
    Element::Ba,
    Element::Pt,
    Element::Au,
    Element::Hg,
    Element::Pb,
];

/// Returned by [`Element::from_str`] for tokens outside the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownElement(pub String);

impl fmt::Display for UnknownElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown element '{}'", self.0)
    }
}

impl std::error::Error for UnknownElement {}

impl Element {
    fn info(self) -> &'static ElementInfo {
        &TABLE[self as usize]
    }

    /// Every known element, excluding [`Element::Unknown`].
    pub fn all() -> impl Iterator<Item = Self> {
        ALL.into_iter()
    }

    /// Chemical symbol with conventional capitalisation ("X" for unknown).
    pub fn symbol(self) -> &'static str {
        self.info().symbol
    }

    /// English element name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Atomic number (0 for [`Element::Unknown`]).
    pub fn atomic_number(self) -> u8 {
        self.info().number
    }

    /// Covalent radius in angstrom, used for bond inference and bond width.
    pub fn covalent_radius(self) -> f32 {
        self.info().covalent
    }

    /// Van der Waals radius in angstrom, used for atom sphere size.
    pub fn vdw_radius(self) -> f32 {
        self.info().vdw
    }

    /// Standard atomic weight in u.
    pub fn atomic_mass(self) -> f32 {
        self.info().mass
    }

    /// CPK colour as sRGB components in `0.0..=1.0`.
    pub fn cpk_color(self) -> [f32; 3] {
        let color = self.info().color;
        [
            ((color >> 16) & 0xFF) as f32 / 255.0,
            ((color >> 8) & 0xFF) as f32 / 255.0,
            (color & 0xFF) as f32 / 255.0,
        ]
    }

    /// Look up by symbol ("Cl", "CL", "cl") or full name ("Chlorine").
    pub fn from_symbol(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Self::all().find(|e| {
            e.symbol().eq_ignore_ascii_case(token)
                || e.name().eq_ignore_ascii_case(token)
        })
    }

    /// Look up by atomic number.
    pub fn from_atomic_number(number: u8) -> Option<Self> {
        Self::all().find(|e| e.atomic_number() == number)
    }

    /// Resolve a symbol, name or atomic number, falling back to
    /// [`Element::Unknown`].
    pub fn lookup(token: &str) -> Self {
        Self::from_symbol(token)
            .or_else(|| {
                token
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(Self::from_atomic_number)
            })
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = UnknownElement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| UnknownElement(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_enum_order() {
        for (i, e) in Element::all().enumerate() {
            assert_eq!(e as usize, i, "{e} out of order");
        }
        assert_eq!(Element::Unknown as usize, TABLE.len() - 1);
        assert_eq!(Element::Unknown.symbol(), "X");
    }

    #[test]
    fn symbol_lookup_is_case_insensitive() {
        assert_eq!(Element::from_symbol("CL"), Some(Element::Cl));
        assert_eq!(Element::from_symbol("cl"), Some(Element::Cl));
        assert_eq!(Element::from_symbol("Carbon"), Some(Element::C));
        assert_eq!(Element::from_symbol("Zz"), None);
        assert_eq!("Fe".parse::<Element>(), Ok(Element::Fe));
        assert!("Qq".parse::<Element>().is_err());
    }

    #[test]
    fn lookup_falls_back_to_unknown() {
        assert_eq!(Element::lookup("8"), Element::O);
        assert_eq!(Element::lookup("Xx"), Element::Unknown);
        assert_eq!(Element::lookup(""), Element::Unknown);
    }

    #[test]
    fn every_element_is_renderable() {
        for e in Element::all().chain(std::iter::once(Element::Unknown)) {
            assert!(e.covalent_radius() > 0.0);
            assert!(e.vdw_radius() > 0.0);
            assert!(e.atomic_mass() > 0.0);
            assert!(e.cpk_color().iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn oxygen_is_red() {
        let [r, g, b] = Element::O.cpk_color();
        assert_eq!(r, 1.0);
        assert!(g < 0.1 && b < 0.1);
    }
}
