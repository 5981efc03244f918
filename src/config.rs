use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GstoError, GstoResult};
use crate::phys::VelocityRegime;
use crate::units::DEFAULT_STOP_STEP;

fn default_z_max() -> usize {
    92
}

fn default_stop_step() -> f64 {
    DEFAULT_STOP_STEP
}

/// Settings for building a [`Gsto`](crate::Gsto).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GstoConfig {
    pub z1_max: usize,
    pub z2_max: usize,
    /// Base for relative paths in the table catalog.
    pub datadir: Option<PathBuf>,
    /// Table catalog, lines of `name,path`.
    pub files_file: Option<PathBuf>,
    /// Assignment overrides, lines of `Z1,Z2,name`.
    pub assignments_file: Option<PathBuf>,
    /// Layer integration step, 1/m^2
    pub stop_step: f64,
    pub extrapolate: bool,
    pub velocity: VelocityRegime,
}

impl Default for GstoConfig {
    fn default() -> Self {
        Self {
            z1_max: default_z_max(),
            z2_max: default_z_max(),
            datadir: None,
            files_file: None,
            assignments_file: None,
            stop_step: default_stop_step(),
            extrapolate: false,
            velocity: VelocityRegime::default(),
        }
    }
}

impl GstoConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> GstoResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GstoError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GstoResult<()> {
        if self.z1_max == 0 || self.z2_max == 0 {
            return Err(GstoError::Config("z1_max and z2_max must be at least 1".to_string()));
        }
        if !(self.stop_step.is_finite() && self.stop_step > 0.0) {
            return Err(GstoError::Config(format!(
                "stop_step must be positive, got {}",
                self.stop_step
            )));
        }
        Ok(())
    }
}
