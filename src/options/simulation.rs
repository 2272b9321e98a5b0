use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters of the kinematic animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Simulation", inline)]
#[serde(default)]
pub struct SimulationOptions {
    /// Peak vibration displacement of a carbon atom, in angstrom.
    #[schemars(title = "Amplitude", range(min = 0.0, max = 0.5), extend("step" = 0.01))]
    pub vibration_amplitude: f32,
    /// Vibration frequency in hertz.
    #[schemars(title = "Frequency", range(min = 0.0, max = 10.0), extend("step" = 0.1))]
    pub vibration_frequency: f32,
    /// Rigid rotation about the vertical axis, in radians per second.
    #[schemars(title = "Spin", range(min = -3.0, max = 3.0), extend("step" = 0.05))]
    pub spin_rate: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            vibration_amplitude: 0.04,
            vibration_frequency: 1.0,
            spin_rate: 0.0,
        }
    }
}
