//! Interpolating lookups from assigned tables.

use crate::format::{TableKind, XScale, XUnit};
use crate::interpolation::{self, InterpolationResult};
use crate::registry::Gsto;
use crate::table::GstoFile;

/// Last bin found in each table. Lookups sweeping monotonically through energy mostly
/// land in the same bin as the previous one, so arbitrary grids can skip the search.
///
/// The cache belongs to the caller, so a loaded registry can be shared by any number of
/// computations, each with its own cache.
#[derive(Debug, Clone, Default)]
pub struct BinCache {
    bins: Vec<Option<usize>>,
}

impl BinCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, table: usize) -> &mut Option<usize> {
        if self.bins.len() <= table {
            self.bins.resize(table + 1, None);
        }
        &mut self.bins[table]
    }

    pub fn clear(&mut self) {
        self.bins.clear();
    }
}

impl GstoFile {
    /// Index `i` of the grid point with `em[i] <= em < em[i + 1]`, N - 1 at exactly the
    /// last point. `None` outside of the grid or before the table is loaded.
    ///
    /// Linear and log10 grids compute the index directly in the units of the file.
    /// Floating point rounding may put the result one bin off near grid points.
    pub fn index_of(&self, em: f64) -> Option<usize> {
        let n = self.em.len();
        if n < 2 || !(em >= self.em[0] && em <= self.em[n - 1]) {
            return None;
        }
        if em == self.em[n - 1] {
            return Some(n - 1);
        }
        let x = match self.x_unit {
            XUnit::MetersPerSecond => self.regime.velocity_from_em(em),
            _ => em,
        };
        let lo = match self.header.x_scale {
            XScale::Linear => ((x - self.xmin_speedup) * self.xdiv).floor(),
            XScale::Log10 => ((x.log10() - self.xmin_speedup) * self.xdiv).floor(),
            XScale::Arbitrary | XScale::None => {
                return Some(self.em.partition_point(|v| *v <= em) - 1);
            }
        };
        if lo < 0.0 {
            Some(0)
        } else {
            Some((lo as usize).min(n - 1))
        }
    }

    /// Segment to interpolate in, `[0, N - 2]`.
    fn bin_of(&self, em: f64, cached: &mut Option<usize>) -> Option<usize> {
        let xs = &self.em;
        let n = xs.len();
        match self.header.x_scale {
            XScale::Linear | XScale::Log10 => {
                let mut lo = self.index_of(em)?.min(n - 2);
                // correct for rounding in the direct computation
                if lo > 0 && em < xs[lo] {
                    lo -= 1;
                } else if lo + 2 < n && em >= xs[lo + 1] {
                    lo += 1;
                }
                Some(lo)
            }
            XScale::Arbitrary | XScale::None => {
                if let Some(lo) = *cached {
                    if interpolation::in_bin(em, xs, lo) {
                        return Some(lo);
                    }
                }
                let lo = interpolation::find_bin(em, xs)?;
                *cached = Some(lo);
                Some(lo)
            }
        }
    }

    fn interpolate(
        &self,
        z1: usize,
        z2: usize,
        em: f64,
        extrapolate: bool,
        cached: &mut Option<usize>,
    ) -> InterpolationResult {
        let ys = match self.data(z1, z2) {
            Some(ys) if ys.len() == self.em.len() => ys,
            _ => return InterpolationResult::NoData,
        };
        match self.bin_of(em, cached) {
            Some(lo) => interpolation::interpolate_bin(em, &self.em, ys, lo),
            None if extrapolate => interpolation::extrapolate(em, &self.em, ys),
            None => InterpolationResult::OutOfRange,
        }
    }
}

impl Gsto {
    /// Value for (Z1, Z2) from the table of the given kind assigned to the pair, at
    /// energy per mass `em` (J/kg).
    pub fn get_em(
        &self,
        kind: TableKind,
        z1: usize,
        z2: usize,
        em: f64,
        cache: &mut BinCache,
    ) -> InterpolationResult {
        let idx = match self.get_assigned(kind, z1, z2) {
            Some(idx) => idx,
            None => return InterpolationResult::NoTable,
        };
        self.files[idx].interpolate(z1, z2, em, self.extrapolate, cache.slot(idx))
    }

    /// Electronic stopping cross section, J m^2.
    pub fn stop_em(&self, z1: usize, z2: usize, em: f64, cache: &mut BinCache) -> InterpolationResult {
        self.get_em(TableKind::Electronic, z1, z2, em, cache)
    }

    /// Electronic stopping cross section at velocity `v` (m/s).
    pub fn stop_v(&self, z1: usize, z2: usize, v: f64, cache: &mut BinCache) -> InterpolationResult {
        self.stop_em(z1, z2, self.regime.energy_per_mass(v), cache)
    }

    /// Energy loss straggling, J^2 m^2.
    pub fn stragg_em(&self, z1: usize, z2: usize, em: f64, cache: &mut BinCache) -> InterpolationResult {
        self.get_em(TableKind::Straggling, z1, z2, em, cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phys::VelocityRegime;
    use crate::units::{C_EV_TFU, C_KEV_U};
    use std::f64::EPSILON;

    fn table(header: &str, body: &str) -> GstoFile {
        let mut t = GstoFile::from_bytes("test", format!("{}==END-OF-HEADER==\n{}", header, body).into_bytes())
            .unwrap();
        t.load(VelocityRegime::Relativistic, |_, _| true).unwrap();
        t
    }

    fn log_table() -> GstoFile {
        let body: String = (0..101).map(|i| format!("{}\n", i)).collect();
        table(
            "z1=1\nz2=1\nsto-unit=Jm2\nx-unit=J/kg\nx-min=10\nx-max=10000\nx-points=101\nx-scale=log10\n",
            &body,
        )
    }

    #[test]
    fn log_index() {
        let t = log_table();
        assert_eq!(t.index_of(10.0), Some(0));
        assert_eq!(t.index_of(10000.0), Some(100));
        assert_eq!(t.index_of(9.99), None);
        assert_eq!(t.index_of(10000.1), None);
        assert_eq!(t.index_of(f64::NAN), None);
        let i = t.index_of(100.0).unwrap();
        assert!((32..=34).contains(&i));
    }

    #[test]
    fn linear_lookup() {
        let t = table(
            "z1=1\nz2=1\nsto-unit=eV/(1e15 atoms/cm2)\nx-unit=keV/u\nx-min=1\nx-max=3\nx-points=3\nx-scale=linear\n",
            "10\n20\n30\n",
        );
        let mut slot = None;
        let v = t.interpolate(1, 1, 2.0 * C_KEV_U, false, &mut slot).to_interp().unwrap();
        assert!((v / C_EV_TFU - 20.0).abs() < 1e-9);
        let v = t.interpolate(1, 1, 2.5 * C_KEV_U, false, &mut slot).to_interp().unwrap();
        assert!((v / C_EV_TFU - 25.0).abs() < 1e-9);
        let v = t.interpolate(1, 1, 3.0 * C_KEV_U, false, &mut slot).to_interp().unwrap();
        assert!((v / C_EV_TFU - 30.0).abs() < 1e-9);
        assert_eq!(
            t.interpolate(1, 1, 4.0 * C_KEV_U, false, &mut slot),
            InterpolationResult::OutOfRange
        );
        let v = t.interpolate(1, 1, 4.0 * C_KEV_U, true, &mut slot).to_extrap().unwrap();
        assert!((v / C_EV_TFU - 30.0).abs() < 1e-9);
        let v = t.interpolate(1, 1, 0.5 * C_KEV_U, true, &mut slot).to_extrap().unwrap();
        assert!((v / C_EV_TFU - 5.0).abs() < 1e-9);
    }

    #[test]
    fn arbitrary_lookup_uses_cache() {
        let t = table(
            "z1=1\nz2=1\nsto-unit=Jm2\nx-unit=J/kg\nx-points=4\nx-scale=arb\n",
            "1\n2\n4\n8\n10\n20\n40\n80\n",
        );
        let mut slot = None;
        let v = t.interpolate(1, 1, 3.0, false, &mut slot).to_interp().unwrap();
        assert!(f64::abs(v - 30.0) < EPSILON);
        assert_eq!(slot, Some(1));
        let v = t.interpolate(1, 1, 3.5, false, &mut slot).to_interp().unwrap();
        assert!(f64::abs(v - 35.0) < EPSILON);
        assert_eq!(slot, Some(1));
        let v = t.interpolate(1, 1, 8.0, false, &mut slot).to_interp().unwrap();
        assert!(f64::abs(v - 80.0) < EPSILON);
        assert_eq!(slot, Some(2));
        // a stale cursor is ignored
        let mut stale = Some(2);
        let v = t.interpolate(1, 1, 1.5, false, &mut stale).to_interp().unwrap();
        assert!(f64::abs(v - 15.0) < EPSILON);
        assert_eq!(stale, Some(0));
    }

    #[test]
    fn missing_data() {
        let mut t = GstoFile::from_bytes(
            "test",
            "z1-min=1\nz1-max=2\nz2=1\nsto-unit=Jm2\nx-unit=J/kg\nx-min=1\nx-max=2\nx-points=2\nx-scale=linear\n\
             ==END-OF-HEADER==\n1\n2\n3\n4\n"
                .as_bytes()
                .to_vec(),
        )
        .unwrap();
        let mut slot = None;
        assert_eq!(t.interpolate(1, 1, 1.5, false, &mut slot), InterpolationResult::NoData);
        t.load(VelocityRegime::Relativistic, |z1, _| z1 == 2).unwrap();
        assert_eq!(t.interpolate(1, 1, 1.5, false, &mut slot), InterpolationResult::NoData);
        assert!(t.interpolate(2, 1, 1.5, false, &mut slot).is_interp());
    }

    #[test]
    fn cache_grows() {
        let mut cache = BinCache::new();
        *cache.slot(3) = Some(7);
        assert_eq!(*cache.slot(3), Some(7));
        assert_eq!(*cache.slot(0), None);
        cache.clear();
        assert_eq!(*cache.slot(3), None);
    }
}
