#![allow(dead_code)]

use gsto::format::{self, DataFormat, GstoHeader, StoppingUnit, StragglingUnit, TableKind, XScale, XUnit};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Electronic stopping table header in eV/(1e15 atoms/cm2) on a keV/u grid.
pub fn stopping_header(z1: (usize, usize), z2: (usize, usize), scale: XScale, x: (f64, f64), n: usize) -> GstoHeader {
    GstoHeader {
        source: Some("test".to_string()),
        kind: TableKind::Electronic,
        z1_min: z1.0,
        z1_max: z1.1,
        z2_min: z2.0,
        z2_max: z2.1,
        sto_unit: StoppingUnit::EvTfu,
        stragg_unit: StragglingUnit::None,
        x_unit: XUnit::KevPerU,
        format: DataFormat::Ascii,
        xmin: x.0,
        xmax: x.1,
        xpoints: n,
        x_scale: scale,
    }
}

/// Table bytes with `value(z1, z2, i)` as the data. Arbitrary grids get `abscissas`.
pub fn table_bytes<F>(header: &GstoHeader, abscissas: Option<&[f64]>, value: F) -> Vec<u8>
where
    F: Fn(usize, usize, usize) -> f64,
{
    let mut out = Vec::new();
    format::write_header(&mut out, header).unwrap();
    if let Some(xs) = abscissas {
        format::write_values(&mut out, header.format, xs).unwrap();
    }
    for (z1, z2) in header.combinations() {
        let values: Vec<f64> = (0..header.xpoints).map(|i| value(z1, z2, i)).collect();
        format::write_values(&mut out, header.format, &values).unwrap();
    }
    out
}

/// Stopping of roughly the right shape: rises to a maximum and falls off.
pub fn bragg_like(z1: usize, z2: usize, i: usize) -> f64 {
    let x = (i + 1) as f64;
    (z1 * 10 + z2) as f64 * x / (1.0 + 0.01 * x * x)
}
