//! Finite horizontal ground under the array.

use crate::config::GeometryConfig;
use crate::error::Result;
use crate::geometry::{Point, Segment, Vector};
use crate::pvrow::PVSegment;
use crate::surface::{PVSurface, SurfaceParams};

/// Ground line spanning `[x_min_ground, x_max_ground]` at `y_ground`, made of
/// one or more consecutive segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PVGround {
    original_line: Segment,
    segments: Vec<PVSegment>,
}

impl PVGround {
    /// Flat ground with a single segment, normal pointing up.
    pub fn flat(config: &GeometryConfig, params: &SurfaceParams) -> Self {
        let line = Segment::new(
            Point::new(config.x_min_ground, config.y_ground),
            Point::new(config.x_max_ground, config.y_ground),
        );
        Self::from_segments(line, &[line], params)
    }

    /// Ground made of the given consecutive pieces of `original_line`.
    pub fn from_segments(original_line: Segment, pieces: &[Segment], params: &SurfaceParams) -> Self {
        let normal = original_line.normal().unwrap_or(Vector::new(0., 1.));
        let segments = pieces
            .iter()
            .map(|piece| PVSegment::new(*piece, normal, None, params.clone()))
            .collect();
        Self {
            original_line,
            segments,
        }
    }

    /// Undivided ground line, unaffected by shading or cutting.
    pub fn original_line(&self) -> &Segment {
        &self.original_line
    }

    pub fn n_vector(&self) -> Vector {
        self.original_line.normal().unwrap_or(Vector::new(0., 1.))
    }

    pub fn segments(&self) -> &[PVSegment] {
        &self.segments
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(|seg| seg.length()).sum()
    }

    pub fn shaded_length(&self) -> f64 {
        self.segments.iter().map(|seg| seg.shaded_length()).sum()
    }

    pub fn illuminated_length(&self) -> f64 {
        self.segments.iter().map(|seg| seg.illuminated_length()).sum()
    }

    pub fn n_surfaces(&self) -> usize {
        self.segments.iter().map(|seg| seg.n_surfaces()).sum()
    }

    pub fn n_shaded(&self) -> usize {
        self.segments.iter().map(|seg| seg.n_shaded()).sum()
    }

    pub fn n_illuminated(&self) -> usize {
        self.segments.iter().map(|seg| seg.n_illuminated()).sum()
    }

    /// Surfaces in indexing order, segment by segment.
    pub fn all_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.segments.iter().flat_map(|seg| seg.surfaces_in_index_order())
    }

    /// Whether `point` lies on the ground line within its extent.
    pub fn contains(&self, point: &Point, tol: f64) -> bool {
        self.original_line.contains(point, tol)
    }

    pub(crate) fn reset(&mut self) {
        self.segments.iter_mut().for_each(|seg| seg.reset());
    }

    pub(crate) fn mark_shaded(&mut self, from: &Point, to: &Point, tol: f64) -> bool {
        self.segments
            .iter_mut()
            .fold(false, |shaded, seg| seg.mark_shaded(from, to, tol) || shaded)
    }

    /// Insert a break point on the ground. Points outside the ground, or on
    /// an existing boundary, leave it untouched.
    pub(crate) fn cut_at_point(&mut self, point: &Point, tol: f64) -> bool {
        if !self.contains(point, tol) {
            return false;
        }
        self.segments
            .iter_mut()
            .find(|seg| seg.line().contains(point, tol))
            .is_some_and(|seg| seg.split_at(point, tol))
    }

    pub fn param_length_weighted_sum(&self, name: &str) -> Result<f64> {
        self.segments
            .iter()
            .map(|seg| seg.param_length_weighted_sum(name))
            .sum()
    }

    pub fn param_weighted(&self, name: &str) -> Result<f64> {
        let length = self.length();
        let weighted = self.param_length_weighted_sum(name)?;
        Ok(if length > 0. { weighted / length } else { 0. })
    }

    pub(crate) fn set_param_all(&mut self, name: &str, value: f64) -> Result<()> {
        self.segments
            .iter_mut()
            .try_for_each(|seg| seg.set_param_all(name, value))
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [PVSegment] {
        &mut self.segments
    }
}
