//! Stopping and straggling in compound targets.

use std::f64::consts::PI;

use crate::interpolation::InterpolationResult;
use crate::lookup::BinCache;
use crate::material::{Incident, Material};
use crate::registry::Gsto;
use crate::units::{C_BOHR_RADIUS, C_KEV};

/// Nuclear stopping cross section (J m^2) from the universal screening potential.
/// Masses may be given in any unit as long as both are in the same one.
pub fn nuclear_universal(e: f64, z1: usize, m1: f64, z2: usize, m2: f64) -> f64 {
    if !(e > 0.0) || z1 == 0 || z2 == 0 {
        return 0.0;
    }
    let (z1, z2) = (z1 as f64, z2 as f64);
    let screening = z1.powf(0.23) + z2.powf(0.23);
    let a_u = 0.8854 * C_BOHR_RADIUS / screening;
    let gamma = 4.0 * m1 * m2 / (m1 + m2).powi(2);
    let epsilon = (e / C_KEV) * 32.53 * m2 / (z1 * z2 * (m1 + m2) * screening);
    let s_n = if epsilon <= 30.0 {
        (1.0 + 1.1383 * epsilon).ln()
            / (2.0 * (epsilon + 0.01321 * epsilon.powf(0.21226) + 0.19593 * epsilon.sqrt()))
    } else {
        epsilon.ln() / (2.0 * epsilon)
    };
    s_n * PI * a_u.powi(2) * gamma * e / epsilon
}

/// Nuclear stopping of `incident` at energy `e` (J) in `target`, J m^2.
pub fn nuclear_stopping(incident: &Incident, target: &Material, e: f64) -> f64 {
    target
        .iter()
        .map(|(element, conc)| {
            conc * nuclear_universal(e, incident.z(), incident.mass(), element.z, element.avg_mass)
        })
        .sum()
}

/// Value of a lookup, or zero if there is none.
fn contribution(result: InterpolationResult, what: &str, z1: usize, z2: usize) -> f64 {
    match result.to_value() {
        Some(v) => v,
        None => {
            log::debug!("No {} for Z1={}, Z2={}: {:?}", what, z1, z2, result);
            0.0
        }
    }
}

impl Gsto {
    /// Electronic stopping of `incident` at energy `e` (J) in `target`, J m^2. Elements
    /// without data contribute nothing.
    pub fn electronic_stopping(
        &self,
        incident: &Incident,
        target: &Material,
        e: f64,
        cache: &mut BinCache,
    ) -> f64 {
        let em = e / incident.mass();
        target
            .iter()
            .map(|(element, conc)| {
                let result = self.stop_em(incident.z(), element.z, em, cache);
                conc * contribution(result, "stopping", incident.z(), element.z)
            })
            .sum()
    }

    /// Electronic plus nuclear stopping, J m^2. Positive, i.e. -dE/dx.
    pub fn total_stopping(
        &self,
        incident: &Incident,
        target: &Material,
        e: f64,
        cache: &mut BinCache,
    ) -> f64 {
        nuclear_stopping(incident, target, e) + self.electronic_stopping(incident, target, e, cache)
    }

    /// Energy loss straggling per areal density, J^2 m^2.
    pub fn straggling(
        &self,
        incident: &Incident,
        target: &Material,
        e: f64,
        cache: &mut BinCache,
    ) -> f64 {
        let em = e / incident.mass();
        target
            .iter()
            .map(|(element, conc)| {
                let result = self.stragg_em(incident.z(), element.z, em, cache);
                conc * contribution(result, "straggling", incident.z(), element.z)
            })
            .sum()
    }
}
