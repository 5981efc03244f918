//! Stopping power and energy loss straggling of ions in matter.
//!
//! Tabulated electronic stopping and straggling are read from table files (see
//! [`format`]), each (Z1, Z2) pair is assigned to one table in a [`Gsto`] registry, and
//! lookups interpolate in the assigned table. Nuclear stopping is calculated from the
//! universal screening potential. [`Gsto::advance_through_layer`] integrates the energy
//! loss through a layer.
//!
//! All quantities are in SI units: energies in J, stopping in J m^2, straggling in
//! J^2 m^2 and thicknesses in 1/m^2.
//!
//! ```no_run
//! use gsto::{BinCache, Direction, Element, Gsto, GstoConfig, Incident, Layer, Material};
//! use gsto::units::{C_MEV, C_TFU, C_U};
//!
//! let config = GstoConfig::from_file("gsto.json")?;
//! let mut gsto = Gsto::from_config(&config)?;
//! let incident = Incident::with_mass_u(2, 4.0026);
//! let target = Material::elemental("Si", Element::new(14, 28.0855 * C_U));
//! gsto.auto_assign_material(incident.z(), &target)?;
//! gsto.load_all();
//!
//! let layer = Layer::new(target, 1000.0 * C_TFU);
//! let mut cache = BinCache::new();
//! let e = gsto.advance_through_layer(&incident, &layer, 2.0 * C_MEV, Direction::Forward, &mut cache);
//! # Ok::<(), gsto::GstoError>(())
//! ```

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod elements;
pub mod error;
pub mod format;
pub mod interpolation;
pub mod layer;
pub mod lookup;
pub mod material;
pub mod phys;
pub mod registry;
pub mod stop;
pub mod table;
pub mod units;

pub use config::GstoConfig;
pub use error::{GstoError, GstoResult};
pub use format::{DataFormat, GstoHeader, TableKind, XScale, XUnit};
pub use interpolation::InterpolationResult;
pub use layer::Direction;
pub use lookup::BinCache;
pub use material::{Element, Incident, Layer, Material};
pub use phys::VelocityRegime;
pub use registry::Gsto;
pub use stop::{nuclear_stopping, nuclear_universal};
pub use table::{GstoFile, LoadStatus};
