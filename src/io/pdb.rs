//! PDB reader.
//!
//! Reads `ATOM`/`HETATM` coordinate records from the first model only and
//! turns `CONECT` records into explicit bonds. Column positions follow the
//! wwPDB v3.3 fixed-width layout; everything outside the fields used here
//! is ignored.

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{column, coordinate, finish, Format, ParseError, StructureReader};
use crate::options::BondInference;
use crate::structure::{Atom, BondOrder, Element, Structure, StructureBuilder};

/// Reader for `.pdb` / `.ent` files.
#[derive(Debug, Clone, Copy)]
pub struct PdbReader {
    bond_inference: BondInference,
}

impl PdbReader {
    /// Reader that falls back to `bond_inference` when a file carries no
    /// `CONECT` records.
    pub fn new(bond_inference: BondInference) -> Self {
        Self { bond_inference }
    }
}

impl StructureReader for PdbReader {
    fn format(&self) -> Format {
        Format::Pdb
    }

    fn read(&self, text: &str) -> Result<Structure, ParseError> {
        let mut builder = StructureBuilder::new();
        let mut serials: FxHashMap<u32, usize> = FxHashMap::default();
        // atoms from skipped models or altlocs; CONECT to them is dropped
        let mut skipped: FxHashSet<u32> = FxHashSet::default();
        let mut title = String::new();
        let mut header = String::new();
        let mut first_model_done = false;
        let mut has_conect = false;

        for (idx, line) in text.lines().enumerate() {
            let no = idx + 1;
            let record = line.get(..6).unwrap_or(line).trim_end();
            match record {
                "ATOM" | "HETATM" => {
                    let serial = column(line, 6, 11).parse::<u32>().ok();
                    let alt_loc = column(line, 16, 17);
                    if first_model_done || !(alt_loc.is_empty() || alt_loc == "A") {
                        skipped.extend(serial);
                        continue;
                    }
                    let atom = atom_record(line, no)?;
                    let index = builder.add_atom(atom);
                    if let Some(serial) = serial {
                        let _ = serials.insert(serial, index);
                    }
                }
                "CONECT" => {
                    has_conect = true;
                    conect_record(line, no, &serials, &skipped, &mut builder)?;
                }
                "ENDMDL" => first_model_done = true,
                "TITLE" => {
                    let text = column(line, 10, 80);
                    if !text.is_empty() {
                        if !title.is_empty() {
                            title.push(' ');
                        }
                        title.push_str(text);
                    }
                }
                "HEADER" => header = column(line, 10, 50).to_owned(),
                "END" => break,
                _ => {}
            }
        }

        builder.set_title(if title.is_empty() { header } else { title });
        if builder.atom_count() == 0 {
            return Err(ParseError::EmptyStructure);
        }
        let inference = (!has_conect).then_some(self.bond_inference);
        finish(builder, Format::Pdb, inference)
    }
}

fn atom_record(line: &str, no: usize) -> Result<Atom, ParseError> {
    if line.len() < 54 {
        return Err(ParseError::malformed(
            Format::Pdb,
            no,
            format!("coordinate record is {} columns, need 54", line.len()),
        ));
    }
    let position = Vec3::new(
        coordinate(column(line, 30, 38), 'x', Format::Pdb, no)?,
        coordinate(column(line, 38, 46), 'y', Format::Pdb, no)?,
        coordinate(column(line, 46, 54), 'z', Format::Pdb, no)?,
    );
    let raw_name = line.get(12..16).unwrap_or("");
    let element = match Element::from_symbol(column(line, 76, 78)) {
        Some(e) => e,
        None => element_from_atom_name(raw_name),
    };
    Ok(Atom::named(element, position, raw_name.trim()))
}

/// Derive an element from the padded 4-character atom name. Names whose
/// element symbol is two letters start in column 13 (`FE  `); one-letter
/// elements start in column 14 (` CA ` is a carbon alpha).
fn element_from_atom_name(raw: &str) -> Element {
    let letters: String = raw
        .chars()
        .skip_while(|c| c.is_ascii_digit() || *c == ' ')
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let two_letter = raw.starts_with(|c: char| c.is_ascii_alphabetic());
    if two_letter {
        if let Some(e) = letters.get(..2).and_then(Element::from_symbol) {
            return e;
        }
    }
    letters
        .get(..1)
        .and_then(Element::from_symbol)
        .unwrap_or(Element::Unknown)
}

fn conect_record(
    line: &str,
    no: usize,
    serials: &FxHashMap<u32, usize>,
    skipped: &FxHashSet<u32>,
    builder: &mut StructureBuilder,
) -> Result<(), ParseError> {
    let serial_at = |start: usize| -> Result<Option<u32>, ParseError> {
        let field = column(line, start, start + 5);
        if field.is_empty() {
            return Ok(None);
        }
        field.parse::<u32>().map(Some).map_err(|_| {
            ParseError::malformed(Format::Pdb, no, format!("invalid CONECT serial '{field}'"))
        })
    };
    let resolve = |serial: u32| -> Result<Option<usize>, ParseError> {
        match serials.get(&serial) {
            Some(&index) => Ok(Some(index)),
            None if skipped.contains(&serial) => Ok(None),
            None => Err(ParseError::malformed(
                Format::Pdb,
                no,
                format!("CONECT references unknown atom serial {serial}"),
            )),
        }
    };

    let Some(source) = serial_at(6)? else {
        return Err(ParseError::malformed(
            Format::Pdb,
            no,
            "CONECT record without a source serial",
        ));
    };
    let source = resolve(source)?;
    for start in [11, 16, 21, 26] {
        let Some(target) = serial_at(start)? else {
            continue;
        };
        let target = resolve(target)?;
        if let (Some(a), Some(b)) = (source, target) {
            if a != b {
                builder.add_bond(a, b, BondOrder::Single);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHANOL: &str = "\
HEADER    ETHANOL TEST
TITLE     ETHANOL
HETATM    1  C1  EOH A   1       0.000   0.000   0.000  1.00  0.00           C
HETATM    2  C2  EOH A   1       1.520   0.000   0.000  1.00  0.00           C
HETATM    3  O   EOH A   1       2.020   1.350   0.000  1.00  0.00           O
CONECT    1    2
CONECT    2    1    3
CONECT    3    2
END
";

    fn read(text: &str) -> Result<Structure, ParseError> {
        PdbReader::new(BondInference::default()).read(text)
    }

    #[test]
    fn reads_atoms_title_and_conect() {
        let s = read(ETHANOL).unwrap();
        assert_eq!(s.title(), "ETHANOL");
        assert_eq!(s.atom_count(), 3);
        assert_eq!(s.atoms()[2].element, Element::O);
        assert_eq!(s.atoms()[1].name, "C2");
        assert_eq!(s.atoms()[1].position, Vec3::new(1.52, 0.0, 0.0));
        // CONECT lists both directions; duplicates collapse
        let pairs: Vec<_> = s.bonds().iter().map(|b| b.pair()).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn infers_bonds_without_conect() {
        let text: String = ETHANOL
            .lines()
            .filter(|l| !l.starts_with("CONECT"))
            .map(|l| format!("{l}\n"))
            .collect();
        let s = read(&text).unwrap();
        assert_eq!(s.bond_count(), 2);
    }

    #[test]
    fn conect_to_missing_serial_is_malformed() {
        let text = ETHANOL.replace("CONECT    3    2", "CONECT    3    9");
        let err = read(&text).unwrap_err();
        assert_eq!(err.line(), Some(8));
    }

    #[test]
    fn only_first_model_is_read() {
        let text = "\
MODEL        1
ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00           C
ENDMDL
MODEL        2
ATOM      1  N   GLY A   1       0.100   0.000   0.000  1.00  0.00           N
ATOM      2  CA  GLY A   1       1.550   0.000   0.000  1.00  0.00           C
ENDMDL
END
";
        let s = read(text).unwrap();
        assert_eq!(s.atom_count(), 2);
        assert_eq!(s.atoms()[0].position.x, 0.0);
    }

    #[test]
    fn alternate_locations_are_skipped() {
        let text = "\
ATOM      1  CA ASER A   1       0.000   0.000   0.000  0.50  0.00           C
ATOM      2  CA BSER A   1       0.300   0.000   0.000  0.50  0.00           C
ATOM      3  CB  SER A   1       1.530   0.000   0.000  1.00  0.00           C
CONECT    2    3
";
        let s = read(text).unwrap();
        assert_eq!(s.atom_count(), 2);
        assert_eq!(s.bond_count(), 0);
    }

    #[test]
    fn element_falls_back_to_atom_name() {
        let text = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000
HETATM    2 FE   HEM A   2       5.000   0.000   0.000
ATOM      3 1HB  ALA A   3       9.000   0.000   0.000
";
        let s = read(text).unwrap();
        assert_eq!(s.atoms()[0].element, Element::C);
        assert_eq!(s.atoms()[1].element, Element::Fe);
        assert_eq!(s.atoms()[2].element, Element::H);
    }

    #[test]
    fn short_or_bad_records_are_malformed() {
        let err = read("ATOM      1  C   GLY A   1       0.000\n").unwrap_err();
        assert_eq!(err.line(), Some(1));
        let err = read(
            "REMARK\nATOM      1  C   GLY A   1       0.000   x.xxx   0.000\n",
        )
        .unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn no_coordinate_records_is_empty() {
        assert_eq!(read("HEADER    NOTHING\nEND\n"), Err(ParseError::EmptyStructure));
    }
}
