use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::structure::bond_inference::DEFAULT_TOLERANCE;

/// How bonds are derived for formats that carry no connectivity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BondInference {
    /// Leave such structures without bonds.
    Disabled,
    /// Bond atoms closer than the sum of their covalent radii plus
    /// `tolerance` angstrom.
    CovalentRadii {
        /// Slack added to the radius sum.
        tolerance: f32,
    },
}

impl Default for BondInference {
    fn default() -> Self {
        Self::CovalentRadii {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Options consumed by the format readers.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Parsing", inline)]
#[serde(default)]
pub struct ParseOptions {
    /// Bond inference for XYZ files and PDB files without `CONECT`.
    pub bond_inference: BondInference,
}
