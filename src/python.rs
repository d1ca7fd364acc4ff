//! Python class wrapping [`OrderedPVArray`].

use std::collections::BTreeMap;

use numpy::{IntoPyArray, PyArray2};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::ArrayParameters;
use crate::pipeline::{config_from_dict, dict_to_json};
use crate::pvarray::OrderedPVArray;
use crate::registry::REGISTRY_COLUMNS;

/// Ordered pv array: ground plus evenly spaced parallel rows.
///
/// Typical use: `from_dict` → `cast_shadows` → `cuts_for_pvrow_view` →
/// `index_all_surfaces` → `view_matrices`.
#[pyclass(name = "OrderedPVArray")]
pub struct PyOrderedPVArray {
    inner: OrderedPVArray,
}

#[pymethods]
impl PyOrderedPVArray {
    #[staticmethod]
    #[pyo3(signature = (params, surface_params = Vec::new(), config = None))]
    pub fn from_dict(
        py: Python,
        params: &Bound<'_, PyDict>,
        surface_params: Vec<String>,
        config: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<Self> {
        let parameters = ArrayParameters::from_json(&dict_to_json(py, params)?)?;
        let config = config_from_dict(py, config)?;
        let inner = OrderedPVArray::from_parameters(parameters, surface_params.as_slice(), config)?;
        Ok(Self { inner })
    }

    pub fn cast_shadows(&mut self) {
        self.inner.cast_shadows();
    }

    /// Returns the number of ground surfaces added.
    pub fn cuts_for_pvrow_view(&mut self) -> usize {
        self.inner.cuts_for_pvrow_view()
    }

    /// Returns the number of indexed surfaces.
    pub fn index_all_surfaces(&mut self) -> usize {
        self.inner.index_all_surfaces()
    }

    pub fn update_params(&mut self, values: BTreeMap<String, f64>) -> PyResult<()> {
        self.inner.update_params(&values)?;
        Ok(())
    }

    /// `(view_matrix, obstruction_matrix)`; unobstructed pairs hold -1.
    pub fn view_matrices<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<(Bound<'py, PyArray2<u8>>, Bound<'py, PyArray2<i64>>)> {
        let matrices = py.allow_threads(|| self.inner.build_view_matrices())?;
        let obstruction = matrices.obstruction_codes();
        Ok((matrices.view.into_pyarray(py), obstruction.into_pyarray(py)))
    }

    #[getter]
    pub fn surface_registry<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.surface_registry().into_pyarray(py)
    }

    #[getter]
    pub fn registry_cols(&self) -> Vec<&'static str> {
        REGISTRY_COLUMNS.to_vec()
    }

    #[getter]
    pub fn pvrow_shaded_lengths<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.pvrow_shaded_lengths().into_pyarray(py)
    }

    #[getter]
    pub fn n_surfaces(&self) -> usize {
        self.inner.n_surfaces()
    }

    #[getter]
    pub fn surface_indices(&self) -> Vec<Option<usize>> {
        self.inner.surface_indices()
    }

    #[getter]
    pub fn front_neighbors(&self) -> Vec<Option<usize>> {
        self.inner.front_neighbors().to_vec()
    }

    #[getter]
    pub fn back_neighbors(&self) -> Vec<Option<usize>> {
        self.inner.back_neighbors().to_vec()
    }

    #[getter]
    pub fn edge_points(&self) -> Vec<(f64, f64)> {
        self.inner.edge_points().iter().map(|p| (p.x, p.y)).collect()
    }

    #[getter]
    pub fn illum_side(&self) -> &'static str {
        self.inner.illum_side().as_str()
    }

    #[getter]
    pub fn has_direct_shading(&self) -> bool {
        self.inner.has_direct_shading()
    }

    #[getter]
    pub fn is_flat(&self) -> bool {
        self.inner.is_flat()
    }

    #[getter]
    pub fn ground_shaded_length(&self) -> f64 {
        self.inner.ground().shaded_length()
    }

    /// Length-weighted average of a surface parameter over the ground.
    pub fn ground_param_weighted(&self, name: &str) -> PyResult<f64> {
        Ok(self.inner.ground().param_weighted(name)?)
    }

    fn __repr__(&self) -> String {
        format!(
            "OrderedPVArray(n_pvrows={}, n_surfaces={}, illum_side='{}')",
            self.inner.pvrows().len(),
            self.inner.n_surfaces(),
            self.inner.illum_side()
        )
    }
}
