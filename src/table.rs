//! One stopping or straggling table.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GstoError, GstoResult};
use crate::format::{
    self, DataFormat, GstoHeader, StoppingUnit, StragglingUnit, TableKind, XScale, XUnit,
};
use crate::phys::VelocityRegime;
use crate::units::{bohr_straggling, C_EV_TFU, C_KEV_U, C_MEV_U};

trait BufReadSeek: BufRead + Seek {}

impl<T: BufRead + Seek> BufReadSeek for T {}

/// Where the bytes of a table come from.
#[derive(Debug, Clone)]
pub enum TableSource {
    Path(PathBuf),
    /// Table compiled into or generated by the program.
    Embedded(Arc<[u8]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Only the header has been read.
    HeaderOnly,
    Loaded,
    /// Loading failed. Combinations read before the failure remain usable.
    Failed,
}

#[derive(Debug, Clone)]
pub struct GstoFile {
    pub(crate) name: String,
    pub(crate) source: TableSource,
    /// As found in the file, before any unit conversion.
    pub(crate) header: GstoHeader,
    /// Abscissa unit after loading: keV/u and MeV/u become J/kg.
    pub(crate) x_unit: XUnit,
    pub(crate) xmin: f64,
    pub(crate) xmax: f64,
    /// Energy per mass of each grid point, J/kg.
    pub(crate) em: Vec<f64>,
    /// xmin or log10(xmin)
    pub(crate) xmin_speedup: f64,
    pub(crate) xdiv: f64,
    /// Per combination, in body order. SI units.
    pub(crate) data: Vec<Option<Vec<f64>>>,
    pub(crate) status: LoadStatus,
    /// Used to convert between velocity and energy per mass for m/s tables.
    pub(crate) regime: VelocityRegime,
}

impl GstoFile {
    /// Reads the header of the table at `path`. The body is read by [`GstoFile::load`].
    pub fn open<P: AsRef<Path>>(name: &str, path: P) -> GstoResult<Self> {
        Self::new(name, TableSource::Path(path.as_ref().to_path_buf()))
    }

    pub fn from_bytes<B: Into<Arc<[u8]>>>(name: &str, bytes: B) -> GstoResult<Self> {
        Self::new(name, TableSource::Embedded(bytes.into()))
    }

    fn new(name: &str, source: TableSource) -> GstoResult<Self> {
        let mut reader = open_reader(&source)?;
        let header = format::read_header(&mut reader, name)?;
        Ok(Self {
            name: name.to_string(),
            source,
            x_unit: header.x_unit,
            xmin: header.xmin,
            xmax: header.xmax,
            em: Vec::new(),
            xmin_speedup: 0.0,
            xdiv: 0.0,
            data: Vec::new(),
            status: LoadStatus::HeaderOnly,
            regime: VelocityRegime::default(),
            header,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data source given in the header, e.g. the program that produced the table.
    pub fn data_source(&self) -> Option<&str> {
        self.header.source.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            TableSource::Path(p) => Some(p),
            TableSource::Embedded(_) => None,
        }
    }

    pub fn header(&self) -> &GstoHeader {
        &self.header
    }

    pub fn kind(&self) -> TableKind {
        self.header.kind
    }

    pub fn xpoints(&self) -> usize {
        self.header.xpoints
    }

    pub fn x_scale(&self) -> XScale {
        self.header.x_scale
    }

    pub fn x_unit(&self) -> XUnit {
        self.x_unit
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn covers(&self, z1: usize, z2: usize) -> bool {
        self.header.covers(z1, z2)
    }

    /// Grid abscissas as energy per mass (J/kg). Empty until loaded.
    pub fn em(&self) -> &[f64] {
        &self.em
    }

    /// Data for (Z1, Z2) in SI units, if it has been loaded.
    pub fn data(&self, z1: usize, z2: usize) -> Option<&[f64]> {
        let i = self.header.comb_index(z1, z2)?;
        self.data.get(i).and_then(|d| d.as_deref())
    }

    pub fn n_loaded(&self) -> usize {
        self.data.iter().filter(|d| d.is_some()).count()
    }

    /// Reads the body, keeping only combinations for which `wanted` is true. Values are
    /// converted to SI units as they are stored.
    pub fn load<W>(&mut self, regime: VelocityRegime, wanted: W) -> GstoResult<()>
    where
        W: Fn(usize, usize) -> bool,
    {
        self.status = LoadStatus::Failed;
        self.regime = regime;
        self.data = vec![None; self.header.n_comb()];
        self.em.clear();
        let mut reader = open_reader(&self.source)?;
        let header = format::read_header(&mut reader, &self.name)?;
        if header != self.header {
            return Err(GstoError::InvalidHeader {
                name: self.name.clone(),
                reason: "header has changed since the table was added".to_string(),
            });
        }
        let mut abscissas = None;
        let result = {
            let header = &self.header;
            let data = &mut self.data;
            format::read_body(&mut reader, header, &self.name, wanted, |z1, z2, values| {
                if z1 == 0 {
                    abscissas = Some(values);
                } else if let Some(i) = header.comb_index(z1, z2) {
                    data[i] = Some(to_si(header, z1, z2, values));
                }
            })
        };
        if let Err(e) = self.build_grid(regime, abscissas) {
            // values without a usable grid answer nothing
            self.data.iter_mut().for_each(|d| *d = None);
            return Err(e);
        }
        result?;
        self.status = LoadStatus::Loaded;
        Ok(())
    }

    /// Converts the abscissa description to J/kg where possible and tabulates the grid.
    /// The grid is left empty unless it is finite and strictly increasing.
    fn build_grid(&mut self, regime: VelocityRegime, abscissas: Option<Vec<f64>>) -> GstoResult<()> {
        let n = self.header.xpoints;
        let unit = self.header.x_unit;
        let (xmin, xmax) = (self.header.xmin, self.header.xmax);
        let em: Vec<f64> = match self.header.x_scale {
            XScale::Linear => (0..n)
                .map(|i| em_from_file_units(xmin + (xmax - xmin) * (i as f64 / (n - 1) as f64), unit, regime))
                .collect(),
            XScale::Log10 => (0..n)
                .map(|i| em_from_file_units(xmin * (xmax / xmin).powf(i as f64 / (n - 1) as f64), unit, regime))
                .collect(),
            XScale::Arbitrary | XScale::None => match abscissas {
                Some(xs) => xs.into_iter().map(|x| em_from_file_units(x, unit, regime)).collect(),
                None => return Ok(()),
            },
        };
        if em.iter().any(|x| !x.is_finite()) {
            return Err(GstoError::InvalidHeader {
                name: self.name.clone(),
                reason: "abscissas are not finite in J/kg".to_string(),
            });
        }
        if em.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(GstoError::InvalidHeader {
                name: self.name.clone(),
                reason: "abscissas are not increasing".to_string(),
            });
        }
        self.em = em;
        let factor = match unit {
            XUnit::KevPerU => C_KEV_U,
            XUnit::MevPerU => C_MEV_U,
            _ => 1.0,
        };
        self.x_unit = match unit {
            XUnit::KevPerU | XUnit::MevPerU => XUnit::JoulesPerKg,
            other => other,
        };
        if self.header.x_scale == XScale::Arbitrary {
            // there are no header limits to go by
            let x_unit = self.x_unit;
            let native = |em: f64| match x_unit {
                XUnit::MetersPerSecond => regime.velocity_from_em(em),
                _ => em,
            };
            let (first, last) = (self.em[0], self.em[n - 1]);
            self.xmin = native(first);
            self.xmax = native(last);
        } else {
            self.xmin = xmin * factor;
            self.xmax = xmax * factor;
        }
        self.calculate_speedups();
        Ok(())
    }

    fn calculate_speedups(&mut self) {
        let n = (self.header.xpoints - 1) as f64;
        match self.header.x_scale {
            XScale::Linear => {
                self.xmin_speedup = self.xmin;
                self.xdiv = n / (self.xmax - self.xmin);
            }
            XScale::Log10 => {
                self.xmin_speedup = self.xmin.log10();
                self.xdiv = n / (self.xmax.log10() - self.xmin.log10());
            }
            XScale::Arbitrary | XScale::None => {
                self.xmin_speedup = 0.0;
                self.xdiv = 0.0;
            }
        }
    }

    /// Writes the part of the table within the given Z ranges. Text output is in
    /// eV/(1e15 atoms/cm2) or relative to Bohr straggling, binary output in SI units.
    pub fn write<W: Write>(
        &self,
        out: &mut W,
        format: DataFormat,
        z1: RangeInclusive<usize>,
        z2: RangeInclusive<usize>,
    ) -> GstoResult<()> {
        let h = &self.header;
        let z1_min = (*z1.start()).max(h.z1_min);
        let z1_max = (*z1.end()).min(h.z1_max);
        let z2_min = (*z2.start()).max(h.z2_min);
        let z2_max = (*z2.end()).min(h.z2_max);
        if z1_min > z1_max || z2_min > z2_max {
            return Err(GstoError::NotCovered {
                name: self.name.clone(),
                z1: *z1.start(),
                z2: *z2.start(),
            });
        }
        let mut out_header = GstoHeader {
            z1_min,
            z1_max,
            z2_min,
            z2_max,
            format,
            ..h.clone()
        };
        match (h.kind, format) {
            (TableKind::Electronic, DataFormat::Ascii) => out_header.sto_unit = StoppingUnit::EvTfu,
            (TableKind::Electronic, DataFormat::Binary) => out_header.sto_unit = StoppingUnit::Jm2,
            (TableKind::Straggling, DataFormat::Ascii) => out_header.stragg_unit = StragglingUnit::Bohr,
            (TableKind::Straggling, DataFormat::Binary) => out_header.stragg_unit = StragglingUnit::J2m2,
        }
        let abscissas: Option<Vec<f64>> = if h.x_scale == XScale::Arbitrary {
            let xs: Vec<f64> = self.em.iter().map(|em| em / C_KEV_U).collect();
            out_header.x_unit = XUnit::KevPerU;
            out_header.xmin = xs.first().copied().unwrap_or(0.0);
            out_header.xmax = xs.last().copied().unwrap_or(0.0);
            Some(xs)
        } else {
            None
        };

        let mut blocks = Vec::with_capacity(out_header.n_comb());
        for (z1, z2) in out_header.combinations() {
            let data = self.data(z1, z2).ok_or_else(|| GstoError::NoData {
                name: self.name.clone(),
                z1,
                z2,
            })?;
            let scale = match (out_header.sto_unit, out_header.stragg_unit) {
                (StoppingUnit::EvTfu, _) => 1.0 / C_EV_TFU,
                (_, StragglingUnit::Bohr) => 1.0 / bohr_straggling(z1, z2),
                _ => 1.0,
            };
            blocks.push(data.iter().map(|v| v * scale).collect::<Vec<f64>>());
        }

        format::write_header(out, &out_header)?;
        if let Some(xs) = abscissas {
            format::write_values(out, format, &xs)?;
        }
        for block in &blocks {
            format::write_values(out, format, block)?;
        }
        Ok(())
    }
}

fn open_reader(source: &TableSource) -> GstoResult<Box<dyn BufReadSeek>> {
    match source {
        TableSource::Path(path) => {
            let file = File::open(path).map_err(|e| GstoError::Open {
                path: path.clone(),
                source: e,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        TableSource::Embedded(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
    }
}

pub(crate) fn em_from_file_units(x: f64, unit: XUnit, regime: VelocityRegime) -> f64 {
    match unit {
        XUnit::MevPerU => x * C_MEV_U,
        XUnit::KevPerU => x * C_KEV_U,
        XUnit::MetersPerSecond => regime.energy_per_mass(x),
        XUnit::JoulesPerKg => x,
        XUnit::None => 0.0,
    }
}

fn to_si(header: &GstoHeader, z1: usize, z2: usize, mut values: Vec<f64>) -> Vec<f64> {
    let scale = match (header.sto_unit, header.stragg_unit) {
        (StoppingUnit::EvTfu, _) => C_EV_TFU,
        (_, StragglingUnit::Bohr) => bohr_straggling(z1, z2),
        _ => 1.0,
    };
    if scale != 1.0 {
        for v in &mut values {
            *v *= scale;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::C_C;

    fn table(header: &str, body: &str) -> GstoFile {
        GstoFile::from_bytes("test", format!("{}==END-OF-HEADER==\n{}", header, body).into_bytes()).unwrap()
    }

    const LINEAR: &str = "z1-min=1\nz1-max=2\nz2-min=1\nz2-max=2\nsto-unit=eV/(1e15 atoms/cm2)\n\
        x-unit=keV/u\nx-min=1\nx-max=3\nx-points=3\nx-scale=linear\nformat=ascii\n";
    const LINEAR_BODY: &str = "10\n20\n30\n11\n21\n31\n12\n22\n32\n13\n23\n33\n";

    #[test]
    fn header_only_until_loaded() {
        let t = table(LINEAR, LINEAR_BODY);
        assert_eq!(t.status(), LoadStatus::HeaderOnly);
        assert!(t.em().is_empty());
        assert!(t.data(1, 1).is_none());
        assert!(t.covers(2, 2));
        assert!(!t.covers(3, 1));
    }

    #[test]
    fn load_converts_to_si() {
        let mut t = table(LINEAR, LINEAR_BODY);
        t.load(VelocityRegime::Relativistic, |z1, z2| z1 == 1 && z2 == 1).unwrap();
        assert_eq!(t.status(), LoadStatus::Loaded);
        assert_eq!(t.n_loaded(), 1);
        assert!(t.data(1, 2).is_none());
        let d = t.data(1, 1).unwrap();
        assert!((d[1] - 20.0 * C_EV_TFU).abs() < 1e-9 * d[1]);
        assert_eq!(t.x_unit(), XUnit::JoulesPerKg);
        assert!((t.xmin() - C_KEV_U).abs() < 1e-9 * C_KEV_U);
        assert!((t.em()[2] - 3.0 * C_KEV_U).abs() < 1e-9 * t.em()[2]);
    }

    #[test]
    fn log_grid() {
        let header = LINEAR
            .replace("x-scale=linear", "x-scale=log10")
            .replace("x-min=1", "x-min=10")
            .replace("x-max=3", "x-max=1000");
        let mut t = table(&header, LINEAR_BODY);
        t.load(VelocityRegime::Relativistic, |_, _| true).unwrap();
        let expected = [10.0, 100.0, 1000.0];
        for (em, x) in t.em().iter().zip(expected.iter()) {
            assert!((em / C_KEV_U - x).abs() < 1e-9 * x);
        }
    }

    #[test]
    fn velocity_grid_stays_in_velocity() {
        let header = LINEAR
            .replace("x-unit=keV/u", "x-unit=m/s")
            .replace("x-min=1", "x-min=1e6")
            .replace("x-max=3", "x-max=3e6");
        let mut t = table(&header, LINEAR_BODY);
        t.load(VelocityRegime::Classical, |_, _| true).unwrap();
        assert_eq!(t.x_unit(), XUnit::MetersPerSecond);
        assert_eq!(t.xmin(), 1e6);
        assert!((t.em()[2] - 0.5 * 9e12).abs() < 1e-9 * t.em()[2]);
        assert!(t.xmax() < C_C);
    }

    #[test]
    fn arbitrary_grid() {
        let header = LINEAR.replace("x-scale=linear", "x-scale=arb");
        let mut t = table(&header, &("1\n2.5\n3\n".to_string() + LINEAR_BODY));
        t.load(VelocityRegime::Relativistic, |_, _| true).unwrap();
        assert!((t.em()[1] - 2.5 * C_KEV_U).abs() < 1e-9 * t.em()[1]);
        assert!((t.xmax() - 3.0 * C_KEV_U).abs() < 1e-9 * t.xmax());
    }

    #[test]
    fn decreasing_abscissas_are_rejected() {
        let header = LINEAR.replace("x-scale=linear", "x-scale=arb");
        let mut t = table(&header, &("1\n3\n2\n".to_string() + LINEAR_BODY));
        assert!(matches!(
            t.load(VelocityRegime::Relativistic, |_, _| true),
            Err(GstoError::InvalidHeader { .. })
        ));
        assert_eq!(t.status(), LoadStatus::Failed);
        assert!(t.em().is_empty());
        assert_eq!(t.n_loaded(), 0);
    }

    #[test]
    fn rejected_grid_gives_no_data() {
        use crate::interpolation::InterpolationResult;
        use crate::lookup::BinCache;
        use crate::registry::Gsto;

        let header = LINEAR
            .replace("x-scale=linear", "x-scale=arb")
            .replace("z1-max=2", "z1-max=1")
            .replace("z2-max=2", "z2-max=1");
        let bytes = format!("{}==END-OF-HEADER==\n1\n3\n2\n10\n30\n20\n", header).into_bytes();
        let mut gsto = Gsto::new(2, 2);
        let idx = gsto.add_embedded("unsorted", &bytes).unwrap();
        gsto.assign(1, 1, idx).unwrap();
        assert_eq!(gsto.load_all(), 0);
        assert_eq!(gsto.file(idx).unwrap().status(), LoadStatus::Failed);
        let mut cache = BinCache::new();
        assert_eq!(gsto.stop_em(1, 1, 2.5 * C_KEV_U, &mut cache), InterpolationResult::NoData);
    }

    #[test]
    fn velocity_grid_beyond_light_speed_is_rejected() {
        let header = LINEAR
            .replace("x-unit=keV/u", "x-unit=m/s")
            .replace("x-min=1", "x-min=1e6")
            .replace("x-max=3", "x-max=4e8");
        let mut t = table(&header, LINEAR_BODY);
        assert!(matches!(
            t.load(VelocityRegime::Relativistic, |_, _| true),
            Err(GstoError::InvalidHeader { .. })
        ));
        assert!(t.data(1, 1).is_none());
        assert!(t.em().is_empty());
    }

    #[test]
    fn bohr_units() {
        let header = LINEAR
            .replace("sto-unit=eV/(1e15 atoms/cm2)", "stragg-unit=bohr")
            .replace("z1-min=1", "type=straggling\nz1-min=1");
        let mut t = table(&header, LINEAR_BODY);
        t.load(VelocityRegime::Relativistic, |_, _| true).unwrap();
        let d = t.data(2, 2).unwrap();
        assert!((d[0] - 13.0 * bohr_straggling(2, 2)).abs() < 1e-9 * d[0]);
    }

    #[test]
    fn truncated_body_keeps_partial_data() {
        let mut t = table(LINEAR, "10\n20\n30\n11\n");
        assert!(matches!(
            t.load(VelocityRegime::Relativistic, |_, _| true),
            Err(GstoError::Truncated { .. })
        ));
        assert_eq!(t.status(), LoadStatus::Failed);
        assert!(t.data(1, 1).is_some());
        assert!(t.data(1, 2).is_none());
        assert_eq!(t.em().len(), 3);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            GstoFile::open("missing", "/nonexistent/stopping/table.dat"),
            Err(GstoError::Open { .. })
        ));
    }

    #[test]
    fn write_subset() {
        let mut t = table(LINEAR, LINEAR_BODY);
        t.load(VelocityRegime::Relativistic, |_, _| true).unwrap();
        let mut out = Vec::new();
        t.write(&mut out, DataFormat::Ascii, 2..=5, 1..=1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("z1=2\n"));
        assert!(text.contains("z2=1\n"));
        let values: Vec<f64> = text
            .split("==END-OF-HEADER==\n")
            .nth(1)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 3);
        assert!((values[1] - 22.0).abs() < 1e-9);
    }

    #[test]
    fn write_needs_data() {
        let mut t = table(LINEAR, LINEAR_BODY);
        t.load(VelocityRegime::Relativistic, |z1, _| z1 == 1).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            t.write(&mut out, DataFormat::Binary, 1..=2, 1..=2),
            Err(GstoError::NoData { z1: 2, z2: 1, .. })
        ));
        assert!(out.is_empty());
        assert!(matches!(
            t.write(&mut out, DataFormat::Binary, 3..=4, 1..=2),
            Err(GstoError::NotCovered { .. })
        ));
    }
}
