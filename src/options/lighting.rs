use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Headlamp shading parameters shared by the atom and bond shaders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lighting", inline)]
#[serde(default)]
pub struct LightingOptions {
    /// Constant term added to every fragment.
    #[schemars(title = "Ambient", range(min = 0.0, max = 0.7), extend("step" = 0.01))]
    pub ambient: f32,
    /// Lambert term scale.
    #[schemars(title = "Diffuse", range(min = 0.0, max = 1.5), extend("step" = 0.05))]
    pub diffuse: f32,
    /// Blinn-Phong highlight strength.
    #[schemars(title = "Specular", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub specular_intensity: f32,
    /// Blinn-Phong exponent.
    #[schemars(skip)]
    pub shininess: f32,
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            ambient: 0.3,
            diffuse: 0.75,
            specular_intensity: 0.35,
            shininess: 38.0,
        }
    }
}
