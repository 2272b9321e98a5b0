//! Molecule file readers.
//!
//! Every supported format implements [`StructureReader`]; [`Format`] is the
//! closed set of recognised tags and [`Reader`] dispatches to the matching
//! implementation. The entry point most callers want is [`parse`].
//!
//! Format tags are matched ASCII case-insensitively after trimming
//! surrounding whitespace.

/// Parse error type.
pub mod error;
/// PDB fixed-column reader.
pub mod pdb;
/// MDL MOL / SDF V2000 reader.
pub mod sdf;
/// XYZ coordinate-record reader.
pub mod xyz;

use std::fmt;
use std::str::FromStr;

pub use error::ParseError;

use crate::options::{BondInference, ParseOptions};
use crate::structure::bond_inference::infer_bonds;
use crate::structure::{BondOrder, Structure, StructureBuilder, StructureError};

/// Recognised input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// XYZ: atom count, comment, then `symbol x y z` records.
    Xyz,
    /// Protein Data Bank fixed-column records with optional `CONECT`.
    Pdb,
    /// MDL molfile / SD file, V2000 connection table.
    Sdf,
}

impl Format {
    /// Every accepted tag, lower case.
    pub const TAGS: [&'static str; 6] = ["xyz", "pdb", "ent", "sdf", "mol", "mdl"];

    /// Reader for this format configured from `options`.
    pub fn reader(self, options: &ParseOptions) -> Reader {
        match self {
            Self::Xyz => Reader::Xyz(xyz::XyzReader::new(options.bond_inference)),
            Self::Pdb => Reader::Pdb(pdb::PdbReader::new(options.bond_inference)),
            Self::Sdf => Reader::Sdf(sdf::SdfReader),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xyz => write!(f, "XYZ"),
            Self::Pdb => write!(f, "PDB"),
            Self::Sdf => write!(f, "SDF"),
        }
    }
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "xyz" => Ok(Self::Xyz),
            "pdb" | "ent" => Ok(Self::Pdb),
            "sdf" | "mol" | "mdl" => Ok(Self::Sdf),
            _ => Err(ParseError::UnsupportedFormat(s.to_owned())),
        }
    }
}

/// Capability shared by all format readers.
pub trait StructureReader {
    /// Format this reader understands.
    fn format(&self) -> Format;

    /// Parse decoded text into a validated structure.
    fn read(&self, text: &str) -> Result<Structure, ParseError>;
}

/// Closed dispatch over the built-in readers.
#[derive(Debug, Clone, Copy)]
pub enum Reader {
    /// XYZ reader.
    Xyz(xyz::XyzReader),
    /// PDB reader.
    Pdb(pdb::PdbReader),
    /// SDF / MOL reader.
    Sdf(sdf::SdfReader),
}

impl StructureReader for Reader {
    fn format(&self) -> Format {
        match self {
            Self::Xyz(r) => r.format(),
            Self::Pdb(r) => r.format(),
            Self::Sdf(r) => r.format(),
        }
    }

    fn read(&self, text: &str) -> Result<Structure, ParseError> {
        match self {
            Self::Xyz(r) => r.read(text),
            Self::Pdb(r) => r.read(text),
            Self::Sdf(r) => r.read(text),
        }
    }
}

/// Parse `bytes` as the format named by `format`.
///
/// # Errors
///
/// [`ParseError::UnsupportedFormat`] for unknown tags (checked first, so it
/// is reported even for empty input), [`ParseError::EmptyStructure`] for
/// empty input or no atoms, [`ParseError::MalformedInput`] for bad records
/// or invalid UTF-8.
pub fn parse(
    bytes: &[u8],
    format: &str,
    options: &ParseOptions,
) -> Result<Structure, ParseError> {
    let format: Format = format.parse()?;
    if bytes.is_empty() {
        return Err(ParseError::EmptyStructure);
    }
    let text = decode(bytes, format)?;
    let structure = format.reader(options).read(text)?;
    log::debug!(
        "parsed {format}: {} atoms, {} bonds",
        structure.atom_count(),
        structure.bond_count()
    );
    Ok(structure)
}

fn decode(bytes: &[u8], format: Format) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| {
        let valid = &bytes[..e.valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        ParseError::malformed(format, line, "invalid UTF-8")
    })
}

/// Trimmed 0-based half-open column range of a fixed-width record, empty
/// when the line is too short.
pub(crate) fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    let start = start.min(end);
    line.get(start..end).unwrap_or("").trim()
}

/// Parse one coordinate token, rejecting non-numeric and non-finite values.
pub(crate) fn coordinate(
    token: &str,
    axis: char,
    format: Format,
    line: usize,
) -> Result<f32, ParseError> {
    let value = token.parse::<f32>().map_err(|_| {
        ParseError::malformed(format, line, format!("invalid {axis} coordinate '{token}'"))
    })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParseError::malformed(
            format,
            line,
            format!("non-finite {axis} coordinate '{token}'"),
        ))
    }
}

/// Run the configured inference and freeze the builder.
pub(crate) fn finish(
    mut builder: StructureBuilder,
    format: Format,
    inference: Option<BondInference>,
) -> Result<Structure, ParseError> {
    if let Some(BondInference::CovalentRadii { tolerance }) = inference {
        for (i, j) in infer_bonds(builder.atoms(), tolerance) {
            builder.add_bond(i, j, BondOrder::Single);
        }
    }
    builder.finish().map_err(|e| match e {
        StructureError::Empty => ParseError::EmptyStructure,
        other => ParseError::malformed(format, 0, other.to_string()),
    })
}
