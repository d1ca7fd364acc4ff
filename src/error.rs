use thiserror::Error;

/// Errors raised while building or querying a PV array geometry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid array parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("discretization requested for pv row {row}, but the array only has {n_pvrows} rows")]
    DiscretizationOutOfRange { row: usize, n_pvrows: usize },

    #[error("pv row {row} {side} side must have at least one segment")]
    EmptyDiscretization { row: usize, side: &'static str },

    #[error("surface parameter `{0}` was not declared for this array")]
    UnknownParameter(String),

    #[error("surface parameter `{0}` has not been set on every surface")]
    MissingParameter(String),

    #[error("surfaces have not been indexed; call `index_all_surfaces` first")]
    NotIndexed,

    #[error("surface indices are stale (indexed at revision {indexed}, geometry is at revision {current}); re-index before building matrices")]
    StaleIndex { indexed: u64, current: u64 },

    #[error("could not parse array parameters: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

impl From<serde_json::Error> for GeometryError {
    fn from(err: serde_json::Error) -> Self {
        GeometryError::Parse(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<GeometryError> for pyo3::PyErr {
    fn from(err: GeometryError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
