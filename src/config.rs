//! Geometry-description record and numeric configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// Default distance below which two points are considered identical.
pub const DISTANCE_TOLERANCE: f64 = 1e-8;
/// Default left bound of the finite ground approximating an infinite plane.
pub const MIN_X_GROUND: f64 = -1e2;
/// Default right bound of the finite ground.
pub const MAX_X_GROUND: f64 = 1e2;
/// Default ground height.
pub const Y_GROUND: f64 = 0.;

/// Numeric settings shared by every geometric operation of one array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub distance_tolerance: f64,
    pub x_min_ground: f64,
    pub x_max_ground: f64,
    pub y_ground: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: DISTANCE_TOLERANCE,
            x_min_ground: MIN_X_GROUND,
            x_max_ground: MAX_X_GROUND,
            y_ground: Y_GROUND,
        }
    }
}

impl GeometryConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.distance_tolerance.is_finite() && self.distance_tolerance > 0.) {
            return Err(invalid("distance_tolerance", "must be a positive finite number"));
        }
        if !(self.x_min_ground.is_finite() && self.x_max_ground.is_finite()) {
            return Err(invalid("x_min_ground", "ground bounds must be finite"));
        }
        if self.x_max_ground - self.x_min_ground <= self.distance_tolerance {
            return Err(invalid("x_max_ground", "must be greater than x_min_ground"));
        }
        if !self.y_ground.is_finite() {
            return Err(invalid("y_ground", "must be finite"));
        }
        Ok(())
    }
}

/// Number of segments requested for each side of one pv row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideCut {
    pub front: usize,
    pub back: usize,
}

impl Default for SideCut {
    fn default() -> Self {
        Self { front: 1, back: 1 }
    }
}

/// Geometry description of an ordered pv array at one sun position.
///
/// Angles are in degrees, lengths in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayParameters {
    pub n_pvrows: usize,
    pub pvrow_height: f64,
    pub pvrow_width: f64,
    pub surface_tilt: f64,
    pub surface_azimuth: f64,
    pub axis_azimuth: f64,
    pub gcr: f64,
    pub solar_zenith: f64,
    pub solar_azimuth: f64,
    /// Discretization per row index; rows not listed use one segment per side.
    #[serde(default)]
    pub cut: BTreeMap<usize, SideCut>,
    #[serde(default)]
    pub rho_ground: Option<f64>,
    #[serde(default)]
    pub rho_front_pvrow: Option<f64>,
    #[serde(default)]
    pub rho_back_pvrow: Option<f64>,
}

impl ArrayParameters {
    pub fn from_json(text: &str) -> Result<Self> {
        let params: ArrayParameters = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Horizontal distance between the centers of two consecutive rows.
    pub fn pvrow_spacing(&self) -> f64 {
        self.pvrow_width / self.gcr
    }

    pub fn side_cut(&self, pvrow_index: usize) -> SideCut {
        self.cut.get(&pvrow_index).copied().unwrap_or_default()
    }

    pub fn has_reflectivity(&self) -> bool {
        self.rho_ground.is_some() || self.rho_front_pvrow.is_some() || self.rho_back_pvrow.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_pvrows == 0 {
            return Err(invalid("n_pvrows", "must be at least 1"));
        }
        positive("pvrow_height", self.pvrow_height)?;
        positive("pvrow_width", self.pvrow_width)?;
        if !(self.gcr.is_finite() && self.gcr > 0. && self.gcr <= 1.) {
            return Err(invalid("gcr", "must be in (0, 1]"));
        }
        finite("surface_tilt", self.surface_tilt)?;
        if !(0. ..=180.).contains(&self.surface_tilt) {
            return Err(invalid("surface_tilt", "must be within [0, 180] degrees"));
        }
        finite("surface_azimuth", self.surface_azimuth)?;
        finite("axis_azimuth", self.axis_azimuth)?;
        finite("solar_zenith", self.solar_zenith)?;
        finite("solar_azimuth", self.solar_azimuth)?;
        for (&row, cut) in self.cut.iter() {
            if row >= self.n_pvrows {
                return Err(GeometryError::DiscretizationOutOfRange {
                    row,
                    n_pvrows: self.n_pvrows,
                });
            }
            if cut.front == 0 {
                return Err(GeometryError::EmptyDiscretization { row, side: "front" });
            }
            if cut.back == 0 {
                return Err(GeometryError::EmptyDiscretization { row, side: "back" });
            }
        }
        for (name, rho) in [
            ("rho_ground", self.rho_ground),
            ("rho_front_pvrow", self.rho_front_pvrow),
            ("rho_back_pvrow", self.rho_back_pvrow),
        ] {
            if let Some(value) = rho {
                finite(name, value)?;
            }
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> GeometryError {
    GeometryError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

fn finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(name, "must be finite"))
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(invalid(name, "must be strictly positive"))
    }
}
