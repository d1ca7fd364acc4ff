//! Fused geometry pipeline: one call per sun position.
//!
//! Orchestrates: build array → cast shadows → cut ground → index → matrices.
//! Intermediate geometry stays in Rust; only the final arrays cross to Python.

use rayon::prelude::*;
use tracing::debug;

use crate::config::{ArrayParameters, GeometryConfig};
use crate::error::Result;
use crate::pvarray::OrderedPVArray;
use crate::view_matrix::ViewMatrices;

#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;

// ── Pure pipeline ──────────────────────────────────────────────────────────

/// Indexed array and its matrices for one sun position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryResult {
    pub array: OrderedPVArray,
    pub matrices: ViewMatrices,
}

pub fn compute_geometry_pure<S: AsRef<str>>(
    parameters: ArrayParameters,
    surface_params: &[S],
    config: GeometryConfig,
) -> Result<GeometryResult> {
    let mut array = OrderedPVArray::from_parameters(parameters, surface_params, config)?;
    array.cast_shadows();
    array.cuts_for_pvrow_view();
    array.index_all_surfaces();
    let matrices = array.build_view_matrices()?;
    Ok(GeometryResult { array, matrices })
}

/// Run the pipeline for many sun positions in parallel, results in input order.
pub fn compute_geometry_batch_pure<S: AsRef<str> + Sync>(
    parameters: &[ArrayParameters],
    surface_params: &[S],
    config: GeometryConfig,
) -> Vec<Result<GeometryResult>> {
    debug!(n_positions = parameters.len(), "batch geometry started");
    parameters
        .par_iter()
        .map(|p| compute_geometry_pure(p.clone(), surface_params, config))
        .collect()
}

// ── Python bindings ────────────────────────────────────────────────────────

/// Serialize a Python mapping with the stdlib `json` module so serde can read it.
#[cfg(feature = "python")]
pub(crate) fn dict_to_json(py: Python<'_>, dict: &Bound<'_, PyDict>) -> PyResult<String> {
    py.import("json")?.call_method1("dumps", (dict,))?.extract()
}

#[cfg(feature = "python")]
pub(crate) fn config_from_dict(py: Python<'_>, config: Option<&Bound<'_, PyDict>>) -> PyResult<GeometryConfig> {
    match config {
        Some(dict) => {
            let config: GeometryConfig = serde_json::from_str(&dict_to_json(py, dict)?)
                .map_err(crate::error::GeometryError::from)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(GeometryConfig::default()),
    }
}

/// Result of the fused geometry pipeline.
#[cfg(feature = "python")]
#[pyclass]
pub struct GeometryOutput {
    /// View-kind codes, `(n + 1) x (n + 1)`, sky last.
    #[pyo3(get)]
    pub view_matrix: Py<PyArray2<u8>>,
    /// Obstructing row index per pair, -1 when unobstructed.
    #[pyo3(get)]
    pub obstruction_matrix: Py<PyArray2<i64>>,
    #[pyo3(get)]
    pub surface_registry: Py<PyArray2<f64>>,
    /// Shaded length per row, columns front and back.
    #[pyo3(get)]
    pub pvrow_shaded_lengths: Py<PyArray2<f64>>,
    #[pyo3(get)]
    pub front_neighbors: Vec<Option<usize>>,
    #[pyo3(get)]
    pub back_neighbors: Vec<Option<usize>>,
    #[pyo3(get)]
    pub illum_side: String,
    #[pyo3(get)]
    pub has_direct_shading: bool,
    #[pyo3(get)]
    pub n_surfaces: usize,
}

/// Build, shade, cut and index an ordered pv array and return its matrices.
///
/// `params` is a geometry-description dict (same keys as the JSON record),
/// `config` optionally overrides tolerance and ground extent.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (params, surface_params = Vec::new(), config = None))]
pub fn compute_geometry(
    py: Python,
    params: &Bound<'_, PyDict>,
    surface_params: Vec<String>,
    config: Option<&Bound<'_, PyDict>>,
) -> PyResult<GeometryOutput> {
    let parameters = ArrayParameters::from_json(&dict_to_json(py, params)?)?;
    let config = config_from_dict(py, config)?;

    let GeometryResult { array, matrices } =
        py.allow_threads(|| compute_geometry_pure(parameters, surface_params.as_slice(), config))?;

    Ok(GeometryOutput {
        view_matrix: matrices.view.clone().into_pyarray(py).unbind(),
        obstruction_matrix: matrices.obstruction_codes().into_pyarray(py).unbind(),
        surface_registry: array.surface_registry().into_pyarray(py).unbind(),
        pvrow_shaded_lengths: array.pvrow_shaded_lengths().into_pyarray(py).unbind(),
        front_neighbors: array.front_neighbors().to_vec(),
        back_neighbors: array.back_neighbors().to_vec(),
        illum_side: array.illum_side().to_string(),
        has_direct_shading: array.has_direct_shading(),
        n_surfaces: array.n_surfaces(),
    })
}
