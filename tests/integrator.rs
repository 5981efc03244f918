mod common;

use common::{init_logger, stopping_header, table_bytes};
use gsto::format::{DataFormat, StoppingUnit, StragglingUnit, TableKind as Kind, XScale};
use gsto::units::{C_KEV, C_KEV_U, C_TFU, C_U};
use gsto::{BinCache, Direction, Element, Gsto, Incident, Layer, Material};

fn helium() -> Incident {
    Incident::with_mass_u(2, 4.0026)
}

fn silicon() -> Material {
    Material::elemental("Si", Element::new(14, 28.0855 * C_U))
}

/// Smooth stopping of He in Si between 10 keV/u and 2 MeV/u, with a straggling table.
fn registry() -> Gsto {
    init_logger();
    let mut gsto = Gsto::new(92, 92);
    let header = stopping_header((2, 2), (14, 14), XScale::Log10, (10.0, 2000.0), 200);
    let sto = table_bytes(&header, None, |_, _, i| 20.0 + 0.1 * i as f64);
    let mut header = stopping_header((2, 2), (14, 14), XScale::Linear, (10.0, 2000.0), 2);
    header.kind = Kind::Straggling;
    header.sto_unit = StoppingUnit::None;
    header.stragg_unit = StragglingUnit::Bohr;
    header.format = DataFormat::Binary;
    let stg = table_bytes(&header, None, |_, _, _| 1.0);
    gsto.add_embedded("sto", &sto).unwrap();
    gsto.add_embedded("stg", &stg).unwrap();
    gsto.auto_assign_material(2, &silicon()).unwrap();
    assert_eq!(gsto.load_all(), 2);
    gsto
}

#[test]
fn zero_thickness_is_identity() {
    let gsto = registry();
    let mut cache = BinCache::new();
    let layer = Layer::new(silicon(), 0.0);
    let e = 1000.0 * C_KEV;
    assert_eq!(
        gsto.advance_through_layer(&helium(), &layer, e, Direction::Forward, &mut cache),
        e
    );
    assert_eq!(
        gsto.advance_through_layer_with_straggling(&helium(), &layer, e, 3.0, Direction::Forward, &mut cache),
        (e, 3.0)
    );
}

#[test]
fn thin_layer_matches_first_order() {
    let gsto = registry();
    let mut cache = BinCache::new();
    let e = 1000.0 * C_KEV;
    let thickness = 1.0 * C_TFU;
    let layer = Layer::new(silicon(), thickness);
    let out = gsto.advance_through_layer(&helium(), &layer, e, Direction::Forward, &mut cache);
    let stop = gsto.total_stopping(&helium(), &silicon(), e, &mut cache);
    let linear = e - stop * thickness;
    let loss = e - out;
    assert!(loss > 0.0);
    assert!((out - linear).abs() < 1e-3 * loss);
}

#[test]
fn thick_layer_energy_loss() {
    let gsto = registry();
    let mut cache = BinCache::new();
    let e = 1000.0 * C_KEV;
    let layer = Layer::new(silicon(), 1000.0 * C_TFU);
    let out = gsto.advance_through_layer(&helium(), &layer, e, Direction::Forward, &mut cache);
    // stopping is between 20 and 40 eV/tfu in this range
    let loss_ev = (e - out) / gsto::units::C_EV;
    assert!(loss_ev > 20_000.0 && loss_ev < 45_000.0, "loss {} eV", loss_ev);

    let back = gsto.advance_through_layer(&helium(), &layer, out, Direction::Backward, &mut cache);
    assert!((back - e).abs() < 1e-6 * e);
}

#[test]
fn layers_are_traversed_in_order() {
    let gsto = registry();
    let mut cache = BinCache::new();
    let e = 1500.0 * C_KEV;
    let a = Layer::new(silicon(), 300.0 * C_TFU);
    let b = Layer::new(silicon(), 500.0 * C_TFU);
    let both = gsto.advance_through_layers(&helium(), &[a.clone(), b.clone()], e, Direction::Forward, &mut cache);
    let first = gsto.advance_through_layer(&helium(), &a, e, Direction::Forward, &mut cache);
    let second = gsto.advance_through_layer(&helium(), &b, first, Direction::Forward, &mut cache);
    assert_eq!(both, second);
    let (e_s, s) =
        gsto.advance_through_layers_with_straggling(&helium(), &[a, b], e, 0.0, Direction::Forward, &mut cache);
    assert!((e_s - both).abs() < 1e-12 * both);
    assert!(s > 0.0);
}

#[test]
fn straggling_accumulates() {
    let gsto = registry();
    let mut cache = BinCache::new();
    let e = 1000.0 * C_KEV;
    let thin = Layer::new(silicon(), 100.0 * C_TFU);
    let thick = Layer::new(silicon(), 200.0 * C_TFU);
    let (_, s_thin) = gsto.advance_through_layer_with_straggling(&helium(), &thin, e, 0.0, Direction::Forward, &mut cache);
    let (_, s_thick) =
        gsto.advance_through_layer_with_straggling(&helium(), &thick, e, 0.0, Direction::Forward, &mut cache);
    let bohr = gsto::units::bohr_straggling(2, 14) * 100.0 * C_TFU;
    assert!((s_thin - bohr).abs() < 0.05 * bohr);
    assert!(s_thick > 1.8 * s_thin && s_thick < 2.2 * s_thin);
}

#[test]
fn stopped_ion_gives_zero() {
    let gsto = registry();
    let mut cache = BinCache::new();
    // a few keV is lost in the first step of a very thick layer
    let e = 1.0 * C_KEV;
    let layer = Layer::new(silicon(), 1e6 * C_TFU);
    assert_eq!(
        gsto.advance_through_layer(&helium(), &layer, e, Direction::Forward, &mut cache),
        0.0
    );
    assert_eq!(
        gsto.advance_through_layer_with_straggling(&helium(), &layer, e, 0.0, Direction::Forward, &mut cache),
        (0.0, 0.0)
    );
    let a = Layer::new(silicon(), 1e6 * C_TFU);
    let b = Layer::new(silicon(), 1.0 * C_TFU);
    assert_eq!(
        gsto.advance_through_layers(&helium(), &[a, b], 100.0 * C_KEV_U * helium().mass(), Direction::Forward, &mut cache),
        0.0
    );
}

#[test]
fn straggling_follows_stopping_slope() {
    init_logger();
    let mut gsto = Gsto::new(92, 92);
    // stopping in eV/tfu is a tenth of the energy in keV/u
    let header = stopping_header((2, 2), (14, 14), XScale::Linear, (10.0, 2010.0), 201);
    let sto = table_bytes(&header, None, |_, _, i| 1.0 + i as f64);
    let mut header = stopping_header((2, 2), (14, 14), XScale::Linear, (10.0, 2010.0), 2);
    header.kind = Kind::Straggling;
    header.sto_unit = StoppingUnit::None;
    header.stragg_unit = StragglingUnit::Bohr;
    let stg = table_bytes(&header, None, |_, _, i| 1.0 + 2.0 * i as f64);
    gsto.add_embedded("steep", &sto).unwrap();
    gsto.add_embedded("stg", &stg).unwrap();
    gsto.auto_assign_material(2, &silicon()).unwrap();
    assert_eq!(gsto.load_all(), 2);

    // a single step through the whole layer
    let thickness = 4000.0 * C_TFU;
    gsto.set_stop_step(thickness);
    let layer = Layer::new(silicon(), thickness);
    let mut cache = BinCache::new();
    let e = 1000.0 * C_KEV;
    let s0 = (5.0 * C_KEV) * (5.0 * C_KEV);
    let (e_out, s_out) =
        gsto.advance_through_layer_with_straggling(&helium(), &layer, e, s0, Direction::Forward, &mut cache);
    assert_eq!(
        e_out,
        gsto.advance_through_layer(&helium(), &layer, e, Direction::Forward, &mut cache)
    );

    let de = e_out - e;
    let ratio = gsto.total_stopping(&helium(), &silicon(), e_out, &mut cache)
        / gsto.total_stopping(&helium(), &silicon(), e, &mut cache);
    assert!(ratio * ratio < 0.9, "ratio {}", ratio);
    let omega2 = gsto.straggling(&helium(), &silicon(), e + de / 2.0, &mut cache);
    let expected = (s0 + thickness * omega2) * ratio * ratio;
    assert!((s_out - expected).abs() < 1e-9 * expected, "{} vs {}", s_out, expected);
    // without the correction the variance would be well above this
    assert!(s_out < 0.95 * (s0 + thickness * omega2));
}
