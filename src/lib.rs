//! Two-dimensional geometry of ordered pv arrays: shading of the ground and
//! row faces, ground cutting, surface indexing and view/obstruction matrices.

pub mod collection;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ground;
pub mod pipeline;
pub mod pvarray;
pub mod pvrow;
pub mod registry;
pub mod shadowing;
pub mod surface;
pub mod view_matrix;

#[cfg(feature = "python")]
mod python;

pub use config::{ArrayParameters, GeometryConfig, SideCut};
pub use error::{GeometryError, Result};
pub use pipeline::{compute_geometry_batch_pure, compute_geometry_pure, GeometryResult};
pub use pvarray::OrderedPVArray;
pub use surface::{PVSurface, Side, SurfaceParams};
pub use view_matrix::{ViewKind, ViewMatrices};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn pvarray_geometry(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    register_geometry_module(py_module)?;
    register_pipeline_module(py_module)?;

    py_module.add("__doc__", "PV array 2D geometry, shading and view matrices implemented in Rust.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_geometry_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "geometry")?;
    submodule.add("__doc__", "Ordered pv array geometry and shading.")?;
    submodule.add_class::<python::PyOrderedPVArray>()?;
    submodule.add("REGISTRY_COLUMNS", registry::REGISTRY_COLUMNS.to_vec())?;
    submodule.add("DISTANCE_TOLERANCE", config::DISTANCE_TOLERANCE)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_pipeline_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "pipeline")?;
    submodule.add("__doc__", "Fused geometry pipeline, one FFI call per sun position.")?;
    submodule.add_class::<pipeline::GeometryOutput>()?;
    submodule.add_function(wrap_pyfunction!(pipeline::compute_geometry, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
