//! Energy loss and straggling through layers.

use crate::lookup::BinCache;
use crate::material::{Incident, Layer, Material};
use crate::registry::Gsto;

/// Which way the ion goes through a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Energy decreases, i.e. ordinary energy loss.
    Forward,
    /// Energy increases, for finding the energy before a layer.
    Backward,
}

impl Direction {
    pub fn factor(self) -> f64 {
        match self {
            Direction::Forward => -1.0,
            Direction::Backward => 1.0,
        }
    }
}

/// The ion has stopped, or the energy is no longer a normal number.
fn stopped(e: f64, target: &Material) -> bool {
    if e <= 0.0 {
        log::debug!("Ion stopped in {}.", target.name());
        true
    } else if !e.is_normal() {
        log::warn!("Energy is not a normal number in {}, giving up.", target.name());
        true
    } else {
        false
    }
}

impl Gsto {
    /// Steps of the integrator through `thickness`. The last step lands on the far
    /// surface; a remainder shorter than a millionth of a step is dropped.
    fn steps(&self, thickness: f64) -> impl Iterator<Item = f64> {
        let step = self.stop_step;
        let mut x = 0.0;
        std::iter::from_fn(move || {
            if !(x <= thickness) {
                return None;
            }
            let mut h = step;
            if x + h > thickness {
                h = thickness - x;
                if h < step * 1e-6 {
                    return None;
                }
            }
            x += h;
            Some(h)
        })
    }

    /// One fourth order Runge-Kutta step of length `h`. Returns the energy change and the
    /// stopping at the start of the step.
    fn rk4_step(
        &self,
        incident: &Incident,
        target: &Material,
        e: f64,
        h: f64,
        factor: f64,
        cache: &mut BinCache,
    ) -> (f64, f64) {
        let mut stop = |e| factor * self.total_stopping(incident, target, e, cache);
        let k1 = stop(e);
        let k2 = stop(e + (h / 2.0) * k1);
        let k3 = stop(e + (h / 2.0) * k2);
        let k4 = stop(e + h * k3);
        ((h / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4), k1)
    }

    /// Energy (J) of `incident` after going through `layer`. Returns zero if the ion stops
    /// or the integration becomes unstable.
    pub fn advance_through_layer(
        &self,
        incident: &Incident,
        layer: &Layer,
        e: f64,
        direction: Direction,
        cache: &mut BinCache,
    ) -> f64 {
        let factor = direction.factor();
        let mut e = e;
        for h in self.steps(layer.thickness()) {
            e += self.rk4_step(incident, layer.material(), e, h, factor, cache).0;
            if stopped(e, layer.material()) {
                return 0.0;
            }
        }
        e
    }

    /// Like [`Gsto::advance_through_layer`], also carrying the energy loss straggling
    /// variance `s` (J^2). Returns (0, 0) if the integration becomes unstable.
    pub fn advance_through_layer_with_straggling(
        &self,
        incident: &Incident,
        layer: &Layer,
        e: f64,
        s: f64,
        direction: Direction,
        cache: &mut BinCache,
    ) -> (f64, f64) {
        let factor = direction.factor();
        let target = layer.material();
        let (mut e, mut s) = (e, s);
        for h in self.steps(layer.thickness()) {
            let (de, k1) = self.rk4_step(incident, target, e, h, factor, cache);
            s += h * self.straggling(incident, target, e + de / 2.0, cache);
            if k1 != 0.0 {
                // spread in energy grows or shrinks with the stopping
                let ratio = factor * self.total_stopping(incident, target, e + de, cache) / k1;
                s *= ratio * ratio;
            }
            e += de;
            if stopped(e, target) {
                return (0.0, 0.0);
            }
        }
        (e, s)
    }

    /// Goes through `layers` in order, each starting with the energy the previous one
    /// ended with. Stops early if the ion stops.
    pub fn advance_through_layers(
        &self,
        incident: &Incident,
        layers: &[Layer],
        e: f64,
        direction: Direction,
        cache: &mut BinCache,
    ) -> f64 {
        let mut e = e;
        for layer in layers {
            e = self.advance_through_layer(incident, layer, e, direction, cache);
            if e == 0.0 {
                break;
            }
        }
        e
    }

    pub fn advance_through_layers_with_straggling(
        &self,
        incident: &Incident,
        layers: &[Layer],
        e: f64,
        s: f64,
        direction: Direction,
        cache: &mut BinCache,
    ) -> (f64, f64) {
        let (mut e, mut s) = (e, s);
        for layer in layers {
            let out = self.advance_through_layer_with_straggling(incident, layer, e, s, direction, cache);
            e = out.0;
            s = out.1;
            if e == 0.0 {
                break;
            }
        }
        (e, s)
    }
}
