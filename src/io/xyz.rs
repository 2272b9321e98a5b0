//! XYZ reader.
//!
//! The standard layout is an atom count, a free-form title line, then one
//! `element x y z` record per atom. Records beyond the declared count are
//! ignored (a second frame, for instance). When the first non-blank line is
//! not an integer the whole input is read as bare records with no header.
//!
//! Element tokens may be symbols, names or atomic numbers; anything
//! unrecognised becomes [`Element::Unknown`]. Extra columns after the
//! coordinates (charges, velocities) are ignored.

use glam::Vec3;

use super::{coordinate, finish, Format, ParseError, StructureReader};
use crate::options::BondInference;
use crate::structure::{Atom, Element, Structure, StructureBuilder};

/// Reader for `.xyz` files.
#[derive(Debug, Clone, Copy)]
pub struct XyzReader {
    bond_inference: BondInference,
}

impl XyzReader {
    /// Reader that infers bonds according to `bond_inference`.
    pub fn new(bond_inference: BondInference) -> Self {
        Self { bond_inference }
    }
}

impl StructureReader for XyzReader {
    fn format(&self) -> Format {
        Format::Xyz
    }

    fn read(&self, text: &str) -> Result<Structure, ParseError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
        let Some((first_no, first)) = lines.by_ref().find(|(_, l)| !l.trim().is_empty())
        else {
            return Err(ParseError::EmptyStructure);
        };

        let mut builder = StructureBuilder::new();
        match first.trim().parse::<usize>() {
            Ok(0) => return Err(ParseError::EmptyStructure),
            Ok(count) => {
                let mut last_line = first_no;
                if let Some((no, title)) = lines.next() {
                    builder.set_title(title.trim());
                    last_line = no;
                }
                for (no, line) in lines.by_ref() {
                    last_line = no;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = builder.add_atom(record(line, no)?);
                    if builder.atom_count() == count {
                        break;
                    }
                }
                if builder.atom_count() < count {
                    return Err(ParseError::malformed(
                        Format::Xyz,
                        last_line + 1,
                        format!(
                            "expected {count} atom records, found {}",
                            builder.atom_count()
                        ),
                    ));
                }
            }
            Err(_) => {
                let _ = builder.add_atom(record(first, first_no)?);
                for (no, line) in lines {
                    if !line.trim().is_empty() {
                        let _ = builder.add_atom(record(line, no)?);
                    }
                }
            }
        }

        finish(builder, Format::Xyz, Some(self.bond_inference))
    }
}

fn record(line: &str, no: usize) -> Result<Atom, ParseError> {
    let mut fields = line.split_whitespace();
    let (Some(symbol), Some(x), Some(y), Some(z)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ParseError::malformed(
            Format::Xyz,
            no,
            format!(
                "expected 'element x y z', found {} field(s)",
                line.split_whitespace().count()
            ),
        ));
    };

    let element = Element::lookup(symbol);
    if element == Element::Unknown {
        log::warn!("xyz line {no}: unknown element '{symbol}'");
    }
    let position = Vec3::new(
        coordinate(x, 'x', Format::Xyz, no)?,
        coordinate(y, 'y', Format::Xyz, no)?,
        coordinate(z, 'z', Format::Xyz, no)?,
    );
    Ok(Atom::named(element, position, symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::structure::bond_inference::DEFAULT_TOLERANCE;

    fn read(text: &str) -> Result<Structure, ParseError> {
        XyzReader::new(BondInference::default()).read(text)
    }

    #[test]
    fn water_with_header() {
        let text = "3\nwater molecule\nO 0.000 0.000 0.000\nH 0.757 0.586 0.000\nH -0.757 0.586 0.000\n";
        let s = read(text).unwrap();
        assert_eq!(s.title(), "water molecule");
        assert_eq!(s.atom_count(), 3);
        assert_eq!(s.atoms()[0].element, Element::O);
        assert_eq!(s.atoms()[2].position, Vec3::new(-0.757, 0.586, 0.0));
        let pairs: Vec<_> = s.bonds().iter().map(|b| b.pair()).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn headerless_records_infer_bonds() {
        let s = super::super::parse(
            b"C 0.0 0.0 0.0\nO 1.2 0.0 0.0\n",
            "xyz",
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(s.atom_count(), 2);
        assert_eq!(s.bonds().len(), 1);
        assert_eq!(s.bonds()[0].pair(), (0, 1));
    }

    #[test]
    fn inference_can_be_disabled() {
        let reader = XyzReader::new(BondInference::Disabled);
        let s = reader.read("C 0.0 0.0 0.0\nO 1.2 0.0 0.0\n").unwrap();
        assert_eq!(s.bond_count(), 0);
    }

    #[test]
    fn tolerance_is_honoured() {
        let reader = XyzReader::new(BondInference::CovalentRadii { tolerance: 0.0 });
        // C-O radius sum is 1.42
        let s = reader.read("C 0 0 0\nO 1.5 0 0\n").unwrap();
        assert_eq!(s.bond_count(), 0);
        let reader = XyzReader::new(BondInference::CovalentRadii {
            tolerance: DEFAULT_TOLERANCE,
        });
        assert_eq!(reader.read("C 0 0 0\nO 1.5 0 0\n").unwrap().bond_count(), 1);
    }

    #[test]
    fn stops_at_declared_count() {
        let text = "1\nframe 1\nHe 0 0 0\n1\nframe 2\nHe 1 1 1\n";
        let s = read(text).unwrap();
        assert_eq!(s.atom_count(), 1);
    }

    #[test]
    fn truncated_input_is_malformed() {
        let err = read("3\ntitle\nC 0 0 0\nC 1.5 0 0\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::MalformedInput { line: 5, .. }
        ));
    }

    #[test]
    fn bad_coordinate_reports_line() {
        let err = read("2\n\nC 0 0 0\nO 1.2 abc 0\n").unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = read("C 0 0\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        assert!(read("C NaN 0 0\n").is_err());
        assert!(read("C inf 0 0\n").is_err());
    }

    #[test]
    fn zero_count_and_blank_input_are_empty() {
        assert_eq!(read("0\nnothing\n"), Err(ParseError::EmptyStructure));
        assert_eq!(read("\n   \n"), Err(ParseError::EmptyStructure));
    }

    #[test]
    fn atomic_numbers_and_unknown_elements() {
        let s = read("8 0 0 0\nQq 5 5 5\n").unwrap();
        assert_eq!(s.atoms()[0].element, Element::O);
        assert_eq!(s.atoms()[1].element, Element::Unknown);
    }
}
