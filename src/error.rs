use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GstoError {
    #[error("could not open \"{}\": {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("premature end of header in table {name}")]
    PrematureEndOfHeader { name: String },

    #[error("too many errors ({count}) in the header of table {name}")]
    TooManyHeaderErrors { name: String, count: usize },

    #[error("invalid header in table {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("table {name} ended prematurely at Z1={z1} Z2={z2} point {point}/{xpoints}")]
    Truncated {
        name: String,
        z1: usize,
        z2: usize,
        point: usize,
        xpoints: usize,
    },

    #[error("could not parse \"{text}\" on line {line} of table {name}")]
    Parse {
        name: String,
        line: usize,
        text: String,
    },

    #[error("Z1={z1}, Z2={z2} is outside of the registry range")]
    ZOutOfRange { z1: usize, z2: usize },

    #[error("table {name} does not cover Z1={z1}, Z2={z2}")]
    NotCovered { name: String, z1: usize, z2: usize },

    #[error("no table available for Z1={z1}, Z2={z2}")]
    NoTableFor { z1: usize, z2: usize },

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no data for Z1={z1}, Z2={z2} in table {name}")]
    NoData { name: String, z1: usize, z2: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GstoResult<T> = Result<T, GstoError>;
