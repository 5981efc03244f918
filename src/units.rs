//! Physical constants and unit factors. Everything is in SI.

use std::f64::consts::PI;

/// Atomic mass unit, kg.
pub const C_U: f64 = 1.66053906660e-27;
/// Speed of light, m/s.
pub const C_C: f64 = 299792458.0;
pub const C_C2: f64 = C_C * C_C;
/// Elementary charge, C.
pub const C_E: f64 = 1.602176634e-19;
pub const C_EV: f64 = C_E;
pub const C_KEV: f64 = 1.0e3 * C_EV;
pub const C_MEV: f64 = 1.0e6 * C_EV;

/// Planck constant, J s.
pub const C_H: f64 = 6.62607015e-34;
pub const C_HBAR: f64 = C_H / (2.0 * PI);
/// Fine structure constant (CODATA 2018).
pub const C_ALPHA: f64 = 0.0072973525693;
pub const C_MU0: f64 = 2.0 * C_ALPHA * C_H / (C_E * C_E * C_C);
pub const C_EPSILON0: f64 = 1.0 / (C_MU0 * C_C2);
/// Electron mass, kg.
pub const C_ME: f64 = 9.1093837015e-31;
pub const C_BOHR_RADIUS: f64 = C_HBAR / (C_ALPHA * C_ME * C_C);

/// Thin film unit: 1e15 atoms/cm2 is 1e19 atoms/m2.
pub const C_TFU: f64 = 1.0e19;
/// eV/(1e15 atoms/cm2) in J m^2.
pub const C_EV_TFU: f64 = C_EV / C_TFU;
/// keV/u in J/kg.
pub const C_KEV_U: f64 = C_KEV / C_U;
/// MeV/u in J/kg.
pub const C_MEV_U: f64 = C_MEV / C_U;

/// Default integration step of the layer integrator, 1/m^2.
pub const DEFAULT_STOP_STEP: f64 = 10.0 * C_TFU;

/// Bohr straggling for Z1 in Z2, J^2 m^2.
pub fn bohr_straggling(z1: usize, z2: usize) -> f64 {
    let bohr = 4.0 * PI * C_E.powi(4) / (4.0 * PI * C_EPSILON0).powi(2);
    (z1 * z1 * z2) as f64 * bohr
}
