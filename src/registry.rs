//! Tables and the assignment of (Z1, Z2) pairs to them.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::config::GstoConfig;
use crate::elements;
use crate::error::{GstoError, GstoResult};
use crate::format::{DataFormat, StoppingUnit, StragglingUnit, TableKind};
use crate::material::Material;
use crate::phys::VelocityRegime;
use crate::table::GstoFile;
use crate::units::DEFAULT_STOP_STEP;

/// Table to use for a (Z1, Z2) pair regardless of registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Override {
    z1: usize,
    z2: usize,
    file: usize,
}

/// Stopping and straggling tables, and which of them answers for each (Z1, Z2) pair.
///
/// Tables are registered header first. Once the pairs of interest are assigned,
/// [`Gsto::load_all`] reads the data for those pairs only.
#[derive(Debug, Clone)]
pub struct Gsto {
    z1_max: usize,
    z2_max: usize,
    pub(crate) files: Vec<GstoFile>,
    stop_assignments: Vec<Option<usize>>,
    stragg_assignments: Vec<Option<usize>>,
    overrides: Vec<Override>,
    datadir: Option<PathBuf>,
    /// Integration step in layers, 1/m^2
    pub(crate) stop_step: f64,
    pub(crate) extrapolate: bool,
    pub(crate) regime: VelocityRegime,
}

impl Gsto {
    pub fn new(z1_max: usize, z2_max: usize) -> Self {
        let n_comb = z1_max * z2_max;
        Self {
            z1_max,
            z2_max,
            files: Vec::new(),
            stop_assignments: vec![None; n_comb],
            stragg_assignments: vec![None; n_comb],
            overrides: Vec::new(),
            datadir: None,
            stop_step: DEFAULT_STOP_STEP,
            extrapolate: false,
            regime: VelocityRegime::default(),
        }
    }

    /// Registry with settings from `config`. The table catalog and override file are
    /// read when given; problems with individual lines are logged and skipped.
    pub fn from_config(config: &GstoConfig) -> GstoResult<Self> {
        config.validate()?;
        if config.z1_max >= elements::SYMBOLS.len() || config.z2_max >= elements::SYMBOLS.len() {
            log::warn!(
                "Z max ({}, {}) is larger than the number of known elements.",
                config.z1_max,
                config.z2_max
            );
        }
        let mut gsto = Self::new(config.z1_max, config.z2_max);
        gsto.stop_step = config.stop_step;
        gsto.extrapolate = config.extrapolate;
        gsto.regime = config.velocity;
        gsto.datadir = config.datadir.clone();
        match &config.files_file {
            Some(path) => {
                gsto.read_settings_file(path)?;
            }
            None => log::warn!("No table catalog configured, there are no stopping tables."),
        }
        if let Some(path) = &config.assignments_file {
            gsto.read_assignments_file(path)?;
        }
        Ok(gsto)
    }

    pub fn z1_max(&self) -> usize {
        self.z1_max
    }

    pub fn z2_max(&self) -> usize {
        self.z2_max
    }

    pub fn stop_step(&self) -> f64 {
        self.stop_step
    }

    /// Ignored unless `step` is positive.
    pub fn set_stop_step(&mut self, step: f64) {
        if step.is_finite() && step > 0.0 {
            self.stop_step = step;
        } else {
            log::warn!("Invalid stop step {}, keeping {}.", step, self.stop_step);
        }
    }

    pub fn extrapolate(&self) -> bool {
        self.extrapolate
    }

    pub fn set_extrapolate(&mut self, extrapolate: bool) {
        self.extrapolate = extrapolate;
    }

    pub fn regime(&self) -> VelocityRegime {
        self.regime
    }

    pub fn set_regime(&mut self, regime: VelocityRegime) {
        self.regime = regime;
    }

    pub fn files(&self) -> &[GstoFile] {
        &self.files
    }

    /// Dense index of (Z1, Z2), `None` outside of `[1, Z max]`.
    fn index(&self, z1: usize, z2: usize) -> Option<usize> {
        if z1 < 1 || z1 > self.z1_max || z2 < 1 || z2 > self.z2_max {
            return None;
        }
        Some((z1 - 1) * self.z2_max + (z2 - 1))
    }

    fn layer(&self, kind: TableKind) -> &[Option<usize>] {
        match kind {
            TableKind::Electronic => &self.stop_assignments,
            TableKind::Straggling => &self.stragg_assignments,
        }
    }

    /// Registers the table at `path`. Only the header is read.
    pub fn add_file<P: AsRef<Path>>(&mut self, name: &str, path: P) -> GstoResult<usize> {
        let file = GstoFile::open(name, path)?;
        self.push_file(file)
    }

    /// Registers a table held in memory.
    pub fn add_embedded(&mut self, name: &str, bytes: &[u8]) -> GstoResult<usize> {
        let file = GstoFile::from_bytes(name, bytes.to_vec())?;
        self.push_file(file)
    }

    fn push_file(&mut self, file: GstoFile) -> GstoResult<usize> {
        if self.file_index(file.name()).is_some() {
            return Err(GstoError::Config(format!(
                "table name {} is already in use",
                file.name()
            )));
        }
        log::debug!(
            "Added {} table {}, Z1 {}..={}, Z2 {}..={}.",
            file.kind(),
            file.name(),
            file.header().z1_min,
            file.header().z1_max,
            file.header().z2_min,
            file.header().z2_max
        );
        self.files.push(file);
        Ok(self.files.len() - 1)
    }

    /// Reads a table catalog: one `name,path` entry per line (comma or tab separated,
    /// `#` comments). Relative paths are resolved against the data directory if one is
    /// configured, otherwise against the directory of the catalog. Returns the number of
    /// tables added.
    pub fn read_settings_file<P: AsRef<Path>>(&mut self, path: P) -> GstoResult<usize> {
        let path = path.as_ref();
        let reader = open(path)?;
        let base = match &self.datadir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let (mut n_files, mut n_errors) = (0, 0);
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let columns = match columns(&line) {
                Some(columns) => columns,
                None => continue,
            };
            let (name, file) = match columns.as_slice() {
                [name, file, ..] => (*name, Path::new(*file)),
                _ => {
                    log::warn!("Line {} in {} is malformed.", lineno + 1, path.display());
                    n_errors += 1;
                    continue;
                }
            };
            let file = if file.is_absolute() {
                file.to_path_buf()
            } else {
                base.join(file)
            };
            match self.add_file(name, &file) {
                Ok(_) => n_files += 1,
                Err(e) => {
                    log::warn!("Adding table {} from {} failed: {}", name, file.display(), e);
                    n_errors += 1;
                }
            }
        }
        log::debug!(
            "Read {}: added {} tables, {} failed.",
            path.display(),
            n_files,
            n_errors
        );
        Ok(n_files)
    }

    /// Reads overrides for automatic assignment: lines of `Z1,Z2,table`, Z given as element
    /// symbols. Returns the number of overrides read.
    pub fn read_assignments_file<P: AsRef<Path>>(&mut self, path: P) -> GstoResult<usize> {
        let path = path.as_ref();
        let reader = open(path)?;
        let mut n = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let columns = match columns(&line) {
                Some(columns) => columns,
                None => continue,
            };
            let (z1, z2, name) = match columns.as_slice() {
                [z1, z2, name, ..] => (*z1, *z2, *name),
                _ => {
                    log::warn!("Line {} in {} is malformed.", lineno + 1, path.display());
                    continue;
                }
            };
            let (z1, z2) = match (elements::find_z(z1), elements::find_z(z2)) {
                (Some(z1), Some(z2)) => (z1, z2),
                _ => {
                    log::warn!("No such element on line {} in {}.", lineno + 1, path.display());
                    continue;
                }
            };
            match self.file_index(name) {
                Some(file) => {
                    self.overrides.push(Override { z1, z2, file });
                    n += 1;
                }
                None => log::warn!("No such table: {} in {}", name, path.display()),
            }
        }
        Ok(n)
    }

    fn file_index(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name() == name)
    }

    /// Index of the table called `name`.
    pub fn get_file(&self, name: &str) -> GstoResult<usize> {
        self.file_index(name)
            .ok_or_else(|| GstoError::NoSuchTable(name.to_string()))
    }

    pub fn file(&self, idx: usize) -> Option<&GstoFile> {
        self.files.get(idx)
    }

    /// Assigns (Z1, Z2) to table `file`, replacing any earlier assignment of the same kind.
    pub fn assign(&mut self, z1: usize, z2: usize, file: usize) -> GstoResult<()> {
        let i = self.index(z1, z2).ok_or(GstoError::ZOutOfRange { z1, z2 })?;
        let f = self
            .files
            .get(file)
            .ok_or_else(|| GstoError::NoSuchTable(format!("#{}", file)))?;
        if !f.covers(z1, z2) {
            return Err(GstoError::NotCovered {
                name: f.name().to_string(),
                z1,
                z2,
            });
        }
        match f.kind() {
            TableKind::Electronic => self.stop_assignments[i] = Some(file),
            TableKind::Straggling => self.stragg_assignments[i] = Some(file),
        }
        Ok(())
    }

    /// Assigns every pair in the ranges, Z2 varying fastest. Stops at the first pair that
    /// can not be assigned; pairs before it stay assigned.
    pub fn assign_range(
        &mut self,
        z1: RangeInclusive<usize>,
        z2: RangeInclusive<usize>,
        file: usize,
    ) -> GstoResult<()> {
        for z1 in z1 {
            for z2 in z2.clone() {
                self.assign(z1, z2, file)?;
            }
        }
        Ok(())
    }

    /// Like [`Gsto::assign_range`], but nothing is assigned unless every pair can be.
    pub fn assign_range_atomic(
        &mut self,
        z1: RangeInclusive<usize>,
        z2: RangeInclusive<usize>,
        file: usize,
    ) -> GstoResult<()> {
        let f = self
            .files
            .get(file)
            .ok_or_else(|| GstoError::NoSuchTable(format!("#{}", file)))?;
        for z1 in z1.clone() {
            for z2 in z2.clone() {
                if self.index(z1, z2).is_none() {
                    return Err(GstoError::ZOutOfRange { z1, z2 });
                }
                if !f.covers(z1, z2) {
                    return Err(GstoError::NotCovered {
                        name: f.name().to_string(),
                        z1,
                        z2,
                    });
                }
            }
        }
        self.assign_range(z1, z2, file)
    }

    /// Assigns (Z1, Z2) for every element of `material`.
    pub fn assign_material(&mut self, z1: usize, material: &Material, file: usize) -> GstoResult<()> {
        for z2 in material.distinct_z() {
            self.assign(z1, z2, file)?;
        }
        Ok(())
    }

    /// Assigns (Z1, Z2) automatically. Overrides are applied first, then each kind is given
    /// the first registered table covering the pair. A pair already assigned keeps its
    /// table. Fails only if no table of any kind ends up assigned.
    pub fn auto_assign(&mut self, z1: usize, z2: usize) -> GstoResult<()> {
        let i = self.index(z1, z2).ok_or(GstoError::ZOutOfRange { z1, z2 })?;
        let mut success = false;
        let overrides: Vec<usize> = self
            .overrides
            .iter()
            .filter(|o| o.z1 == z1 && o.z2 == z2)
            .map(|o| o.file)
            .collect();
        for file in overrides {
            match self.assign(z1, z2, file) {
                Ok(()) => success = true,
                Err(e) => log::warn!(
                    "Could not assign Z1={}, Z2={} to {}: {}",
                    z1,
                    z2,
                    self.files[file].name(),
                    e
                ),
            }
        }
        for (idx, file) in self.files.iter().enumerate() {
            if !file.covers(z1, z2) {
                continue;
            }
            let slot = match file.kind() {
                TableKind::Electronic => &mut self.stop_assignments[i],
                TableKind::Straggling => &mut self.stragg_assignments[i],
            };
            if slot.is_none() {
                *slot = Some(idx);
            }
            success = true;
        }
        if success {
            Ok(())
        } else {
            Err(GstoError::NoTableFor { z1, z2 })
        }
    }

    /// Calls [`Gsto::auto_assign`] for each element of `material` in order, stopping at the
    /// first element that fails. Elements before it stay assigned, later ones are not tried.
    pub fn auto_assign_material(&mut self, z1: usize, material: &Material) -> GstoResult<()> {
        for z2 in material.distinct_z() {
            if let Err(e) = self.auto_assign(z1, z2) {
                log::warn!("{}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Index of the table of the given kind assigned to (Z1, Z2).
    pub fn get_assigned(&self, kind: TableKind, z1: usize, z2: usize) -> Option<usize> {
        let i = self.index(z1, z2)?;
        self.layer(kind)[i]
    }

    pub fn get_assigned_file(&self, kind: TableKind, z1: usize, z2: usize) -> Option<&GstoFile> {
        self.get_assigned(kind, z1, z2).map(|idx| &self.files[idx])
    }

    pub fn clear_assignments(&mut self) {
        self.stop_assignments.iter_mut().for_each(|a| *a = None);
        self.stragg_assignments.iter_mut().for_each(|a| *a = None);
    }

    /// Number of pairs assigned to table `file`.
    pub fn count_assignments(&self, file: usize) -> usize {
        self.stop_assignments
            .iter()
            .chain(self.stragg_assignments.iter())
            .filter(|a| **a == Some(file))
            .count()
    }

    fn is_assigned_to(&self, file: usize, z1: usize, z2: usize) -> bool {
        match self.files.get(file) {
            Some(f) => self.get_assigned(f.kind(), z1, z2) == Some(file),
            None => false,
        }
    }

    /// Reads the data of table `file` for the pairs assigned to it.
    pub fn load(&mut self, file: usize) -> GstoResult<()> {
        if file >= self.files.len() {
            return Err(GstoError::NoSuchTable(format!("#{}", file)));
        }
        let wanted: Vec<bool> = {
            let h = self.files[file].header();
            h.combinations()
                .map(|(z1, z2)| self.is_assigned_to(file, z1, z2))
                .collect()
        };
        let regime = self.regime;
        let f = &mut self.files[file];
        let h = f.header().clone();
        let result = f.load(regime, |z1, z2| {
            h.comb_index(z1, z2).map_or(false, |i| wanted[i])
        });
        match &result {
            Ok(()) => log::info!("Loaded {} pairs from table {}.", f.n_loaded(), f.name()),
            Err(e) => log::warn!("Loading table {} failed: {}", f.name(), e),
        }
        result
    }

    /// Loads every table with at least one assignment. Tables that fail to load are logged
    /// and skipped. Returns the number of tables loaded.
    pub fn load_all(&mut self) -> usize {
        let mut n_success = 0;
        for file in 0..self.files.len() {
            if self.count_assignments(file) == 0 {
                continue;
            }
            if self.load(file).is_ok() {
                n_success += 1;
            }
        }
        n_success
    }

    /// Writes a part of table `file`, see [`GstoFile::write`].
    pub fn write_table<W: Write>(
        &self,
        out: &mut W,
        file: usize,
        format: DataFormat,
        z1: RangeInclusive<usize>,
        z2: RangeInclusive<usize>,
    ) -> GstoResult<()> {
        let f = self
            .files
            .get(file)
            .ok_or_else(|| GstoError::NoSuchTable(format!("#{}", file)))?;
        f.write(out, format, z1, z2)
    }

    /// Human readable description of the registered tables.
    pub fn print_files<W: Write>(&self, out: &mut W, used_only: bool) -> GstoResult<()> {
        if self.files.is_empty() {
            writeln!(out, "There are no stopping or straggling tables.")?;
            return Ok(());
        }
        writeln!(out, "List of {} tables:", if used_only { "used" } else { "available" })?;
        for (idx, f) in self.files.iter().enumerate() {
            let assignments = self.count_assignments(idx);
            if used_only && assignments == 0 {
                continue;
            }
            let h = f.header();
            writeln!(out, "{}: {},", idx + 1, f.name())?;
            writeln!(out, "\ttype: {}", f.kind())?;
            match f.path() {
                Some(path) => writeln!(out, "\tfilename: {}", path.display())?,
                None => writeln!(out, "\tfilename: (embedded)")?,
            }
            if let Some(source) = f.data_source() {
                writeln!(out, "\tdata source: {}", source)?;
            }
            if assignments > 0 {
                writeln!(out, "\t{} assignments,", assignments)?;
            }
            write_z_range(out, "Z1", h.z1_min, h.z1_max)?;
            write_z_range(out, "Z2", h.z2_min, h.z2_max)?;
            writeln!(out, "\tx-points={}", h.xpoints)?;
            writeln!(out, "\tx-scale={}", h.x_scale)?;
            if f.x_unit() == h.x_unit {
                writeln!(out, "\tx-unit={}", h.x_unit)?;
            } else {
                writeln!(out, "\tx-unit={} (converted to {})", h.x_unit, f.x_unit())?;
            }
            writeln!(out, "\tx-min={:e}", f.xmin())?;
            writeln!(out, "\tx-max={:e}", f.xmax())?;
            match h.sto_unit {
                StoppingUnit::None => {}
                StoppingUnit::Jm2 => writeln!(out, "\tstopping unit={}", h.sto_unit)?,
                original => writeln!(
                    out,
                    "\tstopping unit={} (converted to {})",
                    original,
                    StoppingUnit::Jm2
                )?,
            }
            match h.stragg_unit {
                StragglingUnit::None => {}
                StragglingUnit::J2m2 => writeln!(out, "\tstraggling unit={}", h.stragg_unit)?,
                original => writeln!(
                    out,
                    "\tstraggling unit={} (converted to {})",
                    original,
                    StragglingUnit::J2m2
                )?,
            }
            writeln!(out, "\tformat={}", h.format)?;
        }
        Ok(())
    }

    /// Every assigned pair with its stopping and straggling tables.
    pub fn print_assignments<W: Write>(&self, out: &mut W) -> GstoResult<()> {
        writeln!(out, "List of assigned stopping and straggling tables:")?;
        for z1 in 1..=self.z1_max {
            for z2 in 1..=self.z2_max {
                let sto = self.get_assigned_file(TableKind::Electronic, z1, z2);
                let stg = self.get_assigned_file(TableKind::Straggling, z1, z2);
                if sto.is_none() && stg.is_none() {
                    continue;
                }
                write!(
                    out,
                    "  Z1={} ({}), Z2={} ({}):",
                    z1,
                    elements::symbol(z1),
                    z2,
                    elements::symbol(z2)
                )?;
                if let Some(f) = sto {
                    write!(out, " Stopping table {}.", f.name())?;
                }
                if let Some(f) = stg {
                    write!(out, " Straggling table {}.", f.name())?;
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

fn write_z_range<W: Write>(out: &mut W, label: &str, min: usize, max: usize) -> GstoResult<()> {
    if min == max {
        writeln!(out, "\t{} = {} ({})", label, min, elements::symbol(min))?;
    } else {
        writeln!(
            out,
            "\t{} ({}) <= {} <= {} ({}),",
            min,
            elements::symbol(min),
            label,
            max,
            elements::symbol(max)
        )?;
    }
    Ok(())
}

fn open(path: &Path) -> GstoResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| GstoError::Open {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Non-empty comma or tab separated columns, `None` for comments and blank lines.
fn columns(line: &str) -> Option<Vec<&str>> {
    if line.starts_with('#') {
        return None;
    }
    let columns: Vec<&str> = line
        .split(|c| c == ',' || c == '\t')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}
