use self::InterpolationResult::*;

/// Outcome of a table lookup. The non-value variants tell apart why nothing could be
/// returned.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum InterpolationResult {
    InterpolatedValue(f64),
    ExtrapolatedValue(f64),
    /// No table is assigned to the (Z1, Z2) combination.
    NoTable,
    /// A table is assigned but holds no data for the combination (not loaded, or
    /// the body was truncated before it).
    NoData,
    /// The abscissa is outside of the tabulated range and extrapolation is disabled.
    OutOfRange,
}

impl InterpolationResult {
    pub fn is_interp(&self) -> bool {
        matches!(*self, InterpolatedValue(_))
    }

    pub fn is_extrap(&self) -> bool {
        matches!(*self, ExtrapolatedValue(_))
    }

    pub fn is_value(&self) -> bool {
        matches!(*self, InterpolatedValue(_) | ExtrapolatedValue(_))
    }

    pub fn to_interp(&self) -> Option<f64> {
        match *self {
            InterpolatedValue(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_extrap(&self) -> Option<f64> {
        match *self {
            ExtrapolatedValue(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Option<f64> {
        match *self {
            InterpolatedValue(v) | ExtrapolatedValue(v) => Some(v),
            _ => None,
        }
    }
}

pub fn linear(x_low: f64, x_high: f64, y_low: f64, y_high: f64, x: f64) -> f64 {
    y_low + (y_high - y_low) * (x - x_low) / (x_high - x_low)
}

/// Index `lo` of the segment with `xs[lo] <= x < xs[lo + 1]`. The last grid point
/// belongs to the last segment.
pub(crate) fn find_bin(x: f64, xs: &[f64]) -> Option<usize> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let i = xs.partition_point(|v| *v <= x);
    if i == 0 {
        None
    } else if i == n {
        if x == xs[n - 1] {
            Some(n - 2)
        } else {
            None
        }
    } else {
        Some(i - 1)
    }
}

/// Whether `x` falls into segment `lo`.
pub(crate) fn in_bin(x: f64, xs: &[f64], lo: usize) -> bool {
    lo + 1 < xs.len() && xs[lo] <= x && x < xs[lo + 1]
}

pub(crate) fn interpolate_bin(x: f64, xs: &[f64], ys: &[f64], lo: usize) -> InterpolationResult {
    InterpolatedValue(linear(xs[lo], xs[lo + 1], ys[lo], ys[lo + 1], x))
}

/// Below the grid values go linearly to zero at the origin, above it the last value is
/// held.
pub(crate) fn extrapolate(x: f64, xs: &[f64], ys: &[f64]) -> InterpolationResult {
    let (first, last) = match (xs.first(), xs.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return NoData,
    };
    if x >= 0.0 && x < first {
        ExtrapolatedValue(linear(0.0, first, 0.0, ys[0], x))
    } else if x > last {
        ExtrapolatedValue(ys[xs.len() - 1])
    } else {
        OutOfRange
    }
}
