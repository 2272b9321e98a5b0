//! Viewer configuration with TOML and JSON support.
//!
//! Every tweakable setting (parsing, simulation, camera, lighting,
//! appearance) lives here. Native hosts load TOML files; the web host passes
//! JSON strings. All sections use `#[serde(default)]` so partial documents
//! work.

mod camera;
mod lighting;
mod parsing;
mod render;
mod simulation;

use std::path::Path;

pub use camera::CameraOptions;
pub use lighting::LightingOptions;
pub use parsing::{BondInference, ParseOptions};
pub use render::RenderOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use simulation::SimulationOptions;

use crate::error::ViewerError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct ViewerOptions {
    /// Format reader options.
    pub parsing: ParseOptions,
    /// Animation parameters.
    pub simulation: SimulationOptions,
    /// Camera projection and control parameters.
    pub camera: CameraOptions,
    /// Shading parameters.
    pub lighting: LightingOptions,
    /// Appearance and mesh detail.
    pub render: RenderOptions,
}

impl ViewerOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(ViewerOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let content = std::fs::read_to_string(path)?;
        let options: Self = toml::from_str(&content)
            .map_err(|e| ViewerError::Options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ViewerError::Options(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parse options from a JSON document, as sent by the web host.
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| ViewerError::Options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Serialize to a JSON document.
    pub fn to_json(&self) -> Result<String, ViewerError> {
        serde_json::to_string(self)
            .map_err(|e| ViewerError::Options(e.to_string()))
    }

    /// Reject values the viewer cannot work with.
    pub fn validate(&self) -> Result<(), ViewerError> {
        let invalid = |what: &str| Err(ViewerError::Options(what.to_owned()));

        if let BondInference::CovalentRadii { tolerance } =
            self.parsing.bond_inference
        {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return invalid("bond inference tolerance must be >= 0");
            }
        }

        let sim = &self.simulation;
        if !(sim.vibration_amplitude.is_finite()
            && sim.vibration_amplitude >= 0.0)
        {
            return invalid("vibration amplitude must be >= 0");
        }
        if !(sim.vibration_frequency.is_finite()
            && sim.vibration_frequency >= 0.0)
        {
            return invalid("vibration frequency must be >= 0");
        }
        if !sim.spin_rate.is_finite() {
            return invalid("spin rate must be finite");
        }

        let cam = &self.camera;
        if !(cam.fovy > 0.0 && cam.fovy < 180.0) {
            return invalid("field of view must be in (0, 180) degrees");
        }
        if !(cam.znear > 0.0 && cam.zfar > cam.znear) {
            return invalid("clip planes must satisfy 0 < znear < zfar");
        }
        if !(cam.min_distance > 0.0 && cam.max_distance >= cam.min_distance)
        {
            return invalid("zoom limits must satisfy 0 < min <= max");
        }

        let render = &self.render;
        if !(render.atom_scale > 0.0 && render.atom_scale.is_finite()) {
            return invalid("atom scale must be > 0");
        }
        if !(render.min_bond_radius > 0.0 && render.bond_scale >= 0.0) {
            return invalid("bond radius parameters must be positive");
        }
        if render.sphere_subdivisions > 5 {
            return invalid("sphere subdivisions must be at most 5");
        }
        if render.cylinder_segments < 3 {
            return invalid("bond cylinders need at least 3 segments");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = ViewerOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: ViewerOptions = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[simulation]
spin_rate = 0.5

[parsing.bond_inference]
mode = "disabled"
"#;
        let opts: ViewerOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.simulation.spin_rate, 0.5);
        assert_eq!(opts.simulation.vibration_amplitude, 0.04);
        assert_eq!(opts.parsing.bond_inference, BondInference::Disabled);
        assert_eq!(opts.render.clear_color, [0.53, 0.8, 0.98]);
    }

    #[test]
    fn json_with_tolerance() {
        let json = r#"{"parsing":{"bond_inference":{"mode":"covalent_radii","tolerance":0.3}}}"#;
        let opts = ViewerOptions::from_json(json).unwrap();
        assert_eq!(
            opts.parsing.bond_inference,
            BondInference::CovalentRadii { tolerance: 0.3 }
        );
        let back = ViewerOptions::from_json(&opts.to_json().unwrap()).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ViewerOptions::from_json(r#"{"render":{"atom_scale":0.0}}"#)
            .unwrap_err();
        assert!(matches!(err, ViewerError::Options(_)));
        assert!(ViewerOptions::from_json(r#"{"camera":{"fovy":190.0}}"#)
            .is_err());
        assert!(ViewerOptions::from_json("not json").is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("viewer.toml");
        let mut opts = ViewerOptions::default();
        opts.simulation.spin_rate = 1.25;
        opts.save(&path).unwrap();
        let loaded = ViewerOptions::load(&path).unwrap();
        assert_eq!(loaded, opts);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ViewerOptions::load(Path::new("/nonexistent/molscope.toml"))
            .unwrap_err();
        assert!(matches!(err, ViewerError::Io(_)));
    }

    #[test]
    fn bond_radius_has_floor() {
        let render = RenderOptions::default();
        // hydrogen: 0.31 / 8 < 0.05
        assert_eq!(render.bond_radius(0.31, 0.76), 0.05);
        assert!((render.bond_radius(0.76, 0.76) - 0.095).abs() < 1e-6);
    }

    #[test]
    fn schema_has_expected_sections() {
        let schema = serde_json::to_value(ViewerOptions::json_schema()).unwrap();
        let props = schema["properties"].as_object().unwrap();
        for key in ["parsing", "simulation", "camera", "lighting", "render"] {
            assert!(props.contains_key(key), "{key}");
        }
        let render = &props["render"]["properties"];
        assert!(render.get("atom_scale").is_some());
        assert!(render.get("clear_color").is_none());
    }
}
