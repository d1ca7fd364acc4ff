//! Oriented pv surfaces and their attached parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::geometry::{Point, Segment, Vector};

/// Physical face of a pv row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named scalar values attached to a surface.
///
/// Only names declared when the map is created can be set or read. A declared
/// name without a value is reported as missing, never as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceParams {
    values: BTreeMap<String, Option<f64>>,
}

impl SurfaceParams {
    pub fn declare<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            values: names
                .iter()
                .map(|name| (name.as_ref().to_string(), None))
                .collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(*value),
            Some(None) => Err(GeometryError::MissingParameter(name.to_string())),
            None => Err(GeometryError::UnknownParameter(name.to_string())),
        }
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(GeometryError::UnknownParameter(name.to_string())),
        }
    }
}

/// Oriented line segment with shading state, optional side tag, index and
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PVSurface {
    line: Segment,
    normal: Vector,
    shaded: bool,
    side: Option<Side>,
    index: Option<usize>,
    params: SurfaceParams,
}

impl PVSurface {
    pub fn new(
        line: Segment,
        normal: Vector,
        shaded: bool,
        side: Option<Side>,
        params: SurfaceParams,
    ) -> Self {
        Self {
            line,
            normal,
            shaded,
            side,
            index: None,
            params,
        }
    }

    /// Same surface over a different span of its line; the index is dropped.
    pub(crate) fn with_line(&self, line: Segment) -> Self {
        Self {
            line,
            normal: self.normal,
            shaded: self.shaded,
            side: self.side,
            index: None,
            params: self.params.clone(),
        }
    }

    pub fn line(&self) -> &Segment {
        &self.line
    }

    pub fn boundary(&self) -> (Point, Point) {
        (self.line.start, self.line.end)
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }

    pub fn length(&self) -> f64 {
        self.line.length()
    }

    pub fn centroid(&self) -> Point {
        self.line.centroid()
    }

    pub fn is_shaded(&self) -> bool {
        self.shaded
    }

    pub(crate) fn set_shaded(&mut self, shaded: bool) {
        self.shaded = shaded;
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = Some(index);
    }

    pub fn params(&self) -> &SurfaceParams {
        &self.params
    }

    pub fn get_param(&self, name: &str) -> Result<f64> {
        self.params.get(name)
    }

    pub fn set_param(&mut self, name: &str, value: f64) -> Result<()> {
        self.params.set(name, value)
    }
}
