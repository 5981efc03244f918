//! Reading and writing of stopping/straggling table files.
//!
//! A table file starts with a text header of `key = value` lines terminated by
//! [`END_OF_HEADER`]. The body follows either as text (one value per line, `#` comment
//! lines allowed anywhere) or as raw native-endian doubles. In both encodings the body
//! runs over Z1 (outer loop) and Z2 (inner loop), `x-points` values per combination.
//! Tables on an arbitrary grid carry the `x-points` abscissa values first.

use std::fmt;
use std::io::{self, BufRead, Seek, SeekFrom, Write};
use std::str::FromStr;

use crate::error::{GstoError, GstoResult};

pub const END_OF_HEADER: &str = "==END-OF-HEADER==";

/// Unknown keys and malformed lines tolerated in one header.
const MAX_HEADER_ERRORS: usize = 10;

macro_rules! header_property {
    ($(#[$meta:meta])* $name:ident {
        $($(#[$vmeta:meta])* $variant:ident => $first:literal $(| $alias:literal)*),+ $(,)?
    }) => {
        $(#[$meta])*
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $first),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, ()> {
                match s {
                    $($first $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

header_property! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    HeaderKey {
        Source => "source",
        Type => "type",
        Z1 => "z1",
        Z1Min => "z1-min",
        Z1Max => "z1-max",
        Z2 => "z2",
        Z2Min => "z2-min",
        Z2Max => "z2-max",
        StoUnit => "sto-unit" | "stopping-unit",
        StraggUnit => "stragg-unit",
        XUnit => "x-unit",
        Format => "format",
        XMin => "x-min",
        XMax => "x-max",
        XPoints => "x-points",
        XScale => "x-scale",
    }
}

header_property! {
    /// What the table holds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    TableKind {
        #[default]
        Electronic => "electronic",
        Straggling => "straggling",
    }
}

header_property! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    StoppingUnit {
        #[default]
        None => "none",
        /// eV/(1e15 atoms/cm2)
        EvTfu => "eV/(1e15 atoms/cm2)",
        /// J m^2, the SI unit of stopping cross sections
        Jm2 => "Jm2",
    }
}

header_property! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    StragglingUnit {
        #[default]
        None => "none",
        /// Relative to Bohr straggling
        Bohr => "bohr",
        /// J^2 m^2
        J2m2 => "J2m2",
    }
}

header_property! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    XUnit {
        #[default]
        None => "none",
        MetersPerSecond => "m/s",
        KevPerU => "keV/u",
        MevPerU => "MeV/u",
        /// Energy per mass, NOT velocity squared
        JoulesPerKg => "J/kg",
    }
}

header_property! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    DataFormat {
        #[default]
        Ascii => "ascii",
        Binary => "binary",
    }
}

header_property! {
    /// How the abscissa points are spread between x-min and x-max.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    XScale {
        #[default]
        None => "none",
        Linear => "linear",
        Log10 => "log10",
        Arbitrary => "arb" | "arbitrary",
    }
}

/// Header of a table file. Values are in the units of the file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GstoHeader {
    pub source: Option<String>,
    pub kind: TableKind,
    pub z1_min: usize,
    pub z1_max: usize,
    pub z2_min: usize,
    pub z2_max: usize,
    pub sto_unit: StoppingUnit,
    pub stragg_unit: StragglingUnit,
    pub x_unit: XUnit,
    pub format: DataFormat,
    pub xmin: f64,
    pub xmax: f64,
    pub xpoints: usize,
    pub x_scale: XScale,
}

impl GstoHeader {
    pub fn covers(&self, z1: usize, z2: usize) -> bool {
        z1 >= self.z1_min && z1 <= self.z1_max && z2 >= self.z2_min && z2 <= self.z2_max
    }

    pub fn n_z2(&self) -> usize {
        self.z2_max + 1 - self.z2_min
    }

    pub fn n_comb(&self) -> usize {
        (self.z1_max + 1 - self.z1_min) * self.n_z2()
    }

    /// Position of (Z1, Z2) in the body, None if not covered.
    pub fn comb_index(&self, z1: usize, z2: usize) -> Option<usize> {
        if !self.covers(z1, z2) {
            return None;
        }
        Some((z1 - self.z1_min) * self.n_z2() + (z2 - self.z2_min))
    }

    /// (Z1, Z2) combinations in the order of the body.
    pub fn combinations(&self) -> impl Iterator<Item = (usize, usize)> {
        let (z2_min, z2_max) = (self.z2_min, self.z2_max);
        (self.z1_min..=self.z1_max).flat_map(move |z1| (z2_min..=z2_max).map(move |z2| (z1, z2)))
    }

    fn validate(&self, name: &str) -> GstoResult<()> {
        let invalid = |reason: &str| {
            Err(GstoError::InvalidHeader {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };
        if self.z1_min < 1 || self.z2_min < 1 {
            return invalid("Z ranges must start at 1 or above");
        }
        if self.z1_min > self.z1_max || self.z2_min > self.z2_max {
            return invalid("empty Z range");
        }
        if self.xpoints < 2 {
            return invalid("at least two x-points are needed");
        }
        if self.x_unit == XUnit::None {
            return invalid("no x-unit");
        }
        match self.kind {
            TableKind::Electronic => {
                if self.sto_unit == StoppingUnit::None || self.stragg_unit != StragglingUnit::None {
                    return invalid("electronic stopping tables need a sto-unit and no stragg-unit");
                }
            }
            TableKind::Straggling => {
                if self.stragg_unit == StragglingUnit::None || self.sto_unit != StoppingUnit::None {
                    return invalid("straggling tables need a stragg-unit and no sto-unit");
                }
            }
        }
        match self.x_scale {
            XScale::None => return invalid("no x-scale"),
            XScale::Linear | XScale::Log10 => {
                if !(self.xmin.is_finite() && self.xmax.is_finite() && self.xmin < self.xmax) {
                    return invalid("x-min must be less than x-max");
                }
                if self.x_scale == XScale::Log10 && self.xmin <= 0.0 {
                    return invalid("x-min must be positive on a log10 scale");
                }
            }
            XScale::Arbitrary => {}
        }
        Ok(())
    }
}

fn set_property<T: FromStr>(field: &mut T, key: HeaderKey, value: &str, name: &str, lineno: usize) {
    match value.parse() {
        Ok(v) => *field = v,
        Err(_) => log::warn!(
            "Unrecognized value \"{}\" for {} on line {} of table {}, ignored.",
            value,
            key,
            lineno,
            name
        ),
    }
}

/// Parses the header, leaving `reader` at the first byte of the body.
pub fn read_header<R: BufRead>(reader: &mut R, name: &str) -> GstoResult<GstoHeader> {
    let mut header = GstoHeader::default();
    let mut line = String::new();
    let mut lineno = 0;
    let mut n_errors = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(GstoError::PrematureEndOfHeader {
                name: name.to_string(),
            });
        }
        lineno += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed == END_OF_HEADER {
            break;
        }
        let parsed = trimmed
            .split_once('=')
            .and_then(|(k, v)| k.trim().parse::<HeaderKey>().ok().map(|key| (key, v.trim())));
        let (key, value) = match parsed {
            Some(kv) => kv,
            None => {
                log::warn!(
                    "Unknown header \"{}\" on line {} of table {}.",
                    trimmed,
                    lineno,
                    name
                );
                n_errors += 1;
                if n_errors >= MAX_HEADER_ERRORS {
                    return Err(GstoError::TooManyHeaderErrors {
                        name: name.to_string(),
                        count: n_errors,
                    });
                }
                continue;
            }
        };
        match key {
            HeaderKey::Source => header.source = Some(value.to_string()),
            HeaderKey::Type => set_property(&mut header.kind, key, value, name, lineno),
            HeaderKey::Z1 => {
                set_property(&mut header.z1_min, key, value, name, lineno);
                header.z1_max = header.z1_min;
            }
            HeaderKey::Z1Min => set_property(&mut header.z1_min, key, value, name, lineno),
            HeaderKey::Z1Max => set_property(&mut header.z1_max, key, value, name, lineno),
            HeaderKey::Z2 => {
                set_property(&mut header.z2_min, key, value, name, lineno);
                header.z2_max = header.z2_min;
            }
            HeaderKey::Z2Min => set_property(&mut header.z2_min, key, value, name, lineno),
            HeaderKey::Z2Max => set_property(&mut header.z2_max, key, value, name, lineno),
            HeaderKey::StoUnit => set_property(&mut header.sto_unit, key, value, name, lineno),
            HeaderKey::StraggUnit => set_property(&mut header.stragg_unit, key, value, name, lineno),
            HeaderKey::XUnit => set_property(&mut header.x_unit, key, value, name, lineno),
            HeaderKey::Format => set_property(&mut header.format, key, value, name, lineno),
            HeaderKey::XMin => set_property(&mut header.xmin, key, value, name, lineno),
            HeaderKey::XMax => set_property(&mut header.xmax, key, value, name, lineno),
            HeaderKey::XPoints => set_property(&mut header.xpoints, key, value, name, lineno),
            HeaderKey::XScale => set_property(&mut header.x_scale, key, value, name, lineno),
        }
    }
    header.validate(name)?;
    Ok(header)
}

struct BodyReader<'a, R> {
    reader: &'a mut R,
    name: &'a str,
    format: DataFormat,
    xpoints: usize,
    line: String,
    lineno: usize,
}

impl<'a, R: BufRead + Seek> BodyReader<'a, R> {
    fn truncated(&self, z1: usize, z2: usize, point: usize) -> GstoError {
        GstoError::Truncated {
            name: self.name.to_string(),
            z1,
            z2,
            point,
            xpoints: self.xpoints,
        }
    }

    /// Advances to the next data line. False at the end of the stream.
    fn next_record(&mut self) -> GstoResult<bool> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(false);
            }
            self.lineno += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Ok(true);
        }
    }

    fn parse_record(&self) -> GstoResult<f64> {
        let text = self.line.split_whitespace().next().unwrap_or("");
        text.parse().map_err(|_| GstoError::Parse {
            name: self.name.to_string(),
            line: self.lineno,
            text: text.to_string(),
        })
    }

    fn read_values(&mut self, z1: usize, z2: usize) -> GstoResult<Vec<f64>> {
        match self.format {
            DataFormat::Ascii => {
                let mut values = Vec::with_capacity(self.xpoints);
                for point in 0..self.xpoints {
                    if !self.next_record()? {
                        return Err(self.truncated(z1, z2, point));
                    }
                    values.push(self.parse_record()?);
                }
                Ok(values)
            }
            DataFormat::Binary => {
                let mut values = vec![0.0f64; self.xpoints];
                let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut values);
                let mut filled = 0;
                while filled < bytes.len() {
                    match self.reader.read(&mut bytes[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                if filled < bytes.len() {
                    return Err(self.truncated(z1, z2, filled / std::mem::size_of::<f64>()));
                }
                Ok(values)
            }
        }
    }

    /// Skips one combination without storing it. Running into the end of the stream is
    /// not an error here; it only matters if a combination after this one is needed.
    fn skip_values(&mut self) -> GstoResult<()> {
        match self.format {
            DataFormat::Ascii => {
                for _ in 0..self.xpoints {
                    if !self.next_record()? {
                        break;
                    }
                }
            }
            DataFormat::Binary => {
                let width = (self.xpoints * std::mem::size_of::<f64>()) as i64;
                self.reader.seek(SeekFrom::Current(width))?;
            }
        }
        Ok(())
    }
}

/// Reads the body following the header. The abscissa block of arbitrary grids is passed
/// to `sink` as combination (0, 0). Combinations for which `wanted` is false are skipped
/// without allocating. On error, combinations already passed to `sink` stay valid.
pub fn read_body<R, W, S>(
    reader: &mut R,
    header: &GstoHeader,
    name: &str,
    wanted: W,
    mut sink: S,
) -> GstoResult<()>
where
    R: BufRead + Seek,
    W: Fn(usize, usize) -> bool,
    S: FnMut(usize, usize, Vec<f64>),
{
    let mut body = BodyReader {
        reader,
        name,
        format: header.format,
        xpoints: header.xpoints,
        line: String::new(),
        lineno: 0,
    };
    if header.x_scale == XScale::Arbitrary {
        let xs = body.read_values(0, 0)?;
        sink(0, 0, xs);
    }
    let mut n_loaded = 0;
    for (z1, z2) in header.combinations() {
        if wanted(z1, z2) {
            let values = body.read_values(z1, z2)?;
            log::debug!("Loaded Z1={} Z2={} from table {}.", z1, z2, name);
            sink(z1, z2, values);
            n_loaded += 1;
        } else {
            body.skip_values()?;
        }
    }
    log::debug!(
        "Table {}: {} of {} combinations loaded.",
        name,
        n_loaded,
        header.n_comb()
    );
    Ok(())
}

/// Writes `header` followed by the end of header line.
pub fn write_header<W: Write>(out: &mut W, header: &GstoHeader) -> io::Result<()> {
    writeln!(out, "{}={}", HeaderKey::Type, header.kind)?;
    if let Some(source) = &header.source {
        writeln!(out, "{}={}", HeaderKey::Source, source)?;
    }
    if header.z1_min == header.z1_max {
        writeln!(out, "{}={}", HeaderKey::Z1, header.z1_min)?;
    } else {
        writeln!(out, "{}={}", HeaderKey::Z1Min, header.z1_min)?;
        writeln!(out, "{}={}", HeaderKey::Z1Max, header.z1_max)?;
    }
    if header.z2_min == header.z2_max {
        writeln!(out, "{}={}", HeaderKey::Z2, header.z2_min)?;
    } else {
        writeln!(out, "{}={}", HeaderKey::Z2Min, header.z2_min)?;
        writeln!(out, "{}={}", HeaderKey::Z2Max, header.z2_max)?;
    }
    match header.kind {
        TableKind::Electronic => writeln!(out, "{}={}", HeaderKey::StoUnit, header.sto_unit)?,
        TableKind::Straggling => writeln!(out, "{}={}", HeaderKey::StraggUnit, header.stragg_unit)?,
    }
    writeln!(out, "{}={}", HeaderKey::XUnit, header.x_unit)?;
    writeln!(out, "{}={:e}", HeaderKey::XMin, header.xmin)?;
    writeln!(out, "{}={:e}", HeaderKey::XMax, header.xmax)?;
    writeln!(out, "{}={}", HeaderKey::XPoints, header.xpoints)?;
    writeln!(out, "{}={}", HeaderKey::XScale, header.x_scale)?;
    writeln!(out, "{}={}", HeaderKey::Format, header.format)?;
    writeln!(out, "{}", END_OF_HEADER)
}

pub fn write_values<W: Write>(out: &mut W, format: DataFormat, values: &[f64]) -> io::Result<()> {
    match format {
        DataFormat::Ascii => {
            for v in values {
                writeln!(out, "{:e}", v)?;
            }
            Ok(())
        }
        DataFormat::Binary => out.write_all(bytemuck::cast_slice(values)),
    }
}
