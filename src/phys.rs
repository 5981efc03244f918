//! Energy and velocity conversions.

use serde::{Deserialize, Serialize};
use crate::units::C_C2;

/// How kinetic energy and velocity are related. Only tables tabulated as a function of
/// velocity (m/s) depend on this choice.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VelocityRegime {
    Classical,
    #[default]
    Relativistic,
}

impl VelocityRegime {
    /// E => v
    pub fn velocity(self, e: f64, mass: f64) -> f64 {
        self.velocity_from_em(e / mass)
    }

    /// v => E
    pub fn energy(self, v: f64, mass: f64) -> f64 {
        self.energy_per_mass(v) * mass
    }

    /// v => E/m
    pub fn energy_per_mass(self, v: f64) -> f64 {
        match self {
            VelocityRegime::Classical => 0.5 * v * v,
            VelocityRegime::Relativistic => {
                let gamma = 1.0 / (1.0 - v * v / C_C2).sqrt();
                C_C2 * (gamma - 1.0)
            }
        }
    }

    /// E/m => v
    pub fn velocity_from_em(self, em: f64) -> f64 {
        match self {
            VelocityRegime::Classical => (2.0 * em).sqrt(),
            VelocityRegime::Relativistic => {
                let gamma = 1.0 + em / C_C2;
                ((1.0 - gamma.powi(-2)) * C_C2).sqrt()
            }
        }
    }
}
