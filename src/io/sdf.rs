//! MDL molfile / SD file reader (V2000 connection tables).
//!
//! Only the first record of a multi-record SD file is read. The bond block
//! is authoritative, so bonds are never inferred for this format.

use glam::Vec3;

use super::{column, coordinate, finish, Format, ParseError, StructureReader};
use crate::structure::{Atom, BondOrder, Element, Structure, StructureBuilder};

/// Reader for `.sdf` / `.mol` / `.mdl` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdfReader;

impl StructureReader for SdfReader {
    fn format(&self) -> Format {
        Format::Sdf
    }

    fn read(&self, text: &str) -> Result<Structure, ParseError> {
        let lines = first_record(text);
        if lines.len() < 4 {
            return Err(ParseError::malformed(
                Format::Sdf,
                lines.last().map_or(1, |(no, _)| *no),
                "record must contain a three-line header and a counts line",
            ));
        }

        let (counts_no, counts_line) = lines[3];
        if counts_line.contains("V3000") {
            return Err(ParseError::malformed(
                Format::Sdf,
                counts_no,
                "V3000 connection tables are not supported",
            ));
        }
        let (atom_count, bond_count) = parse_counts(counts_line, counts_no)?;
        if atom_count == 0 {
            return Err(ParseError::EmptyStructure);
        }

        let atom_start: usize = 4;
        let (bond_start, bond_end) = atom_start
            .checked_add(atom_count)
            .and_then(|start| Some((start, start.checked_add(bond_count)?)))
            .ok_or_else(|| {
                ParseError::malformed(Format::Sdf, counts_no, "atom or bond count out of range")
            })?;
        if lines.len() < bond_end {
            return Err(ParseError::malformed(
                Format::Sdf,
                lines.last().map_or(counts_no, |(no, _)| no + 1),
                format!(
                    "record ended before {atom_count} atoms and {bond_count} bonds were read"
                ),
            ));
        }

        let mut builder = StructureBuilder::with_capacity(atom_count);
        builder.set_title(lines[0].1.trim());
        for &(no, line) in &lines[atom_start..bond_start] {
            let _ = builder.add_atom(parse_atom(line, no)?);
        }
        for &(no, line) in &lines[bond_start..bond_end] {
            let (a, b, order) = parse_bond(line, no, atom_count)?;
            builder.add_bond(a, b, order);
        }

        finish(builder, Format::Sdf, None)
    }
}

fn first_record(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim() == "$$$$" && !lines.is_empty() {
            break;
        }
        lines.push((i + 1, line));
    }
    lines
}

/// Fixed-width integer field, falling back to whitespace tokens for files
/// written without column alignment.
fn int_field(line: &str, start: usize, token: usize) -> Option<usize> {
    column(line, start, start + 3)
        .parse()
        .ok()
        .or_else(|| line.split_whitespace().nth(token)?.parse().ok())
}

fn parse_counts(line: &str, no: usize) -> Result<(usize, usize), ParseError> {
    let atoms = int_field(line, 0, 0)
        .ok_or_else(|| ParseError::malformed(Format::Sdf, no, "invalid atom count"))?;
    let bonds = int_field(line, 3, 1)
        .ok_or_else(|| ParseError::malformed(Format::Sdf, no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_atom(line: &str, no: usize) -> Result<Atom, ParseError> {
    let position = Vec3::new(
        coordinate(column(line, 0, 10), 'x', Format::Sdf, no)?,
        coordinate(column(line, 10, 20), 'y', Format::Sdf, no)?,
        coordinate(column(line, 20, 30), 'z', Format::Sdf, no)?,
    );
    let symbol = column(line, 31, 34);
    if symbol.is_empty() {
        return Err(ParseError::malformed(
            Format::Sdf,
            no,
            "atom line has no element symbol",
        ));
    }
    // query atoms (A, Q, *, R#) have no element and draw as unknown
    let element = Element::from_symbol(symbol).unwrap_or(Element::Unknown);
    Ok(Atom::named(element, position, symbol))
}

fn parse_bond(
    line: &str,
    no: usize,
    atom_count: usize,
) -> Result<(usize, usize, BondOrder), ParseError> {
    let a = int_field(line, 0, 0)
        .ok_or_else(|| ParseError::malformed(Format::Sdf, no, "invalid first atom index"))?;
    let b = int_field(line, 3, 1)
        .ok_or_else(|| ParseError::malformed(Format::Sdf, no, "invalid second atom index"))?;
    let code = int_field(line, 6, 2)
        .ok_or_else(|| ParseError::malformed(Format::Sdf, no, "invalid bond type"))?;
    let order = u8::try_from(code)
        .ok()
        .and_then(BondOrder::from_ctfile)
        .ok_or_else(|| {
            ParseError::malformed(Format::Sdf, no, format!("unsupported bond type {code}"))
        })?;

    if a == 0 || b == 0 || a > atom_count || b > atom_count || a == b {
        return Err(ParseError::malformed(
            Format::Sdf,
            no,
            format!("bond {a}-{b} is outside atoms 1..={atom_count}"),
        ));
    }
    Ok((a - 1, b - 1, order))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CO2: &str = "\
carbon dioxide
  molscope

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.1600    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
   -1.1600    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  2  0
  1  3  2  0
M  END
$$$$
second
  molscope

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 N   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$$$$
";

    #[test]
    fn reads_first_record() {
        let s = SdfReader.read(CO2).unwrap();
        assert_eq!(s.title(), "carbon dioxide");
        assert_eq!(s.atom_count(), 3);
        assert_eq!(s.atoms()[1].element, Element::O);
        assert_eq!(s.atoms()[2].position, Vec3::new(-1.16, 0.0, 0.0));
        assert_eq!(s.bond_count(), 2);
        assert_eq!(s.bonds()[1].pair(), (0, 2));
        assert_eq!(s.bonds()[0].order, BondOrder::Double);
    }

    #[test]
    fn bonds_are_never_inferred() {
        let text = CO2.replace("  3  2  0", "  3  0  0");
        let text: String = text
            .lines()
            .filter(|l| !l.starts_with("  1  "))
            .map(|l| format!("{l}\n"))
            .collect();
        let s = SdfReader.read(&text).unwrap();
        assert_eq!(s.bond_count(), 0);
    }

    #[test]
    fn merged_count_columns_are_read_by_position() {
        let mut text = String::from("big\n\n\n100100  0  0  0  0  0  0  0  0999 V2000\n");
        for i in 0..100 {
            text.push_str(&format!("{:>10.4}    0.0000    0.0000 C   0  0\n", i as f32 * 1.5));
        }
        for i in 1..=99 {
            text.push_str(&format!("{:>3}{:>3}  1  0\n", i, i + 1));
        }
        text.push_str("100  1  1  0\n");
        let s = SdfReader.read(&text).unwrap();
        assert_eq!(s.atom_count(), 100);
        assert_eq!(s.bond_count(), 100);
    }

    #[test]
    fn v3000_is_rejected() {
        let text = "x\n\n\n  0  0  0     0  0            999 V3000\nM  V30 BEGIN CTAB\n";
        let err = SdfReader.read(text).unwrap_err();
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn truncated_block_is_malformed() {
        let text: String = CO2.lines().take(6).map(|l| format!("{l}\n")).collect();
        assert!(matches!(
            SdfReader.read(&text),
            Err(ParseError::MalformedInput { line: 7, .. })
        ));
    }

    #[test]
    fn out_of_range_bond_is_malformed() {
        let text = CO2.replace("  1  3  2  0", "  1  9  2  0");
        let err = SdfReader.read(&text).unwrap_err();
        assert_eq!(err.line(), Some(9));
    }

    #[test]
    fn oversized_counts_are_malformed() {
        let text = "t\n\n\n1     18446744073709551615\n    0.0000    0.0000    0.0000 C   0  0\nM  END\n";
        assert!(matches!(
            SdfReader.read(text),
            Err(ParseError::MalformedInput { line: 4, .. })
        ));
        let text = "t\n\n\n    18446744073709551615  0\nM  END\n";
        assert!(matches!(
            SdfReader.read(text),
            Err(ParseError::MalformedInput { line: 4, .. })
        ));
    }

    #[test]
    fn zero_atoms_is_empty() {
        let text = "none\n\n\n  0  0  0  0  0  0  0  0  0  0999 V2000\nM  END\n";
        assert_eq!(SdfReader.read(text), Err(ParseError::EmptyStructure));
    }
}
