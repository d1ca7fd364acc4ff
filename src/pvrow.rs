//! PV rows: two faces, each divided into fixed-width segments.

use std::ops::{Deref, DerefMut};

use crate::collection::SurfaceCollection;
use crate::config::SideCut;
use crate::error::Result;
use crate::geometry::{coords_from_center_tilt_width, Point, Segment, Vector};
use crate::surface::{PVSurface, Side, SurfaceParams};

/// Fixed sub-interval of a row face or of the ground, holding one surface
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PVSegment {
    collection: SurfaceCollection,
}

impl PVSegment {
    pub fn new(line: Segment, normal: Vector, side: Option<Side>, params: SurfaceParams) -> Self {
        Self {
            collection: SurfaceCollection::new(line, normal, side, params),
        }
    }

    pub fn collection(&self) -> &SurfaceCollection {
        &self.collection
    }
}

impl Deref for PVSegment {
    type Target = SurfaceCollection;

    fn deref(&self) -> &SurfaceCollection {
        &self.collection
    }
}

impl DerefMut for PVSegment {
    fn deref_mut(&mut self) -> &mut SurfaceCollection {
        &mut self.collection
    }
}

/// Split `line` into `n` equal consecutive segments.
pub(crate) fn divide_line(line: &Segment, n: usize) -> Vec<Segment> {
    let n = n.max(1);
    let step = line.vector() * (1. / n as f64);
    (0..n)
        .map(|i| {
            let start = if i == 0 { line.start } else { line.start + step * i as f64 };
            let end = if i == n - 1 { line.end } else { line.start + step * (i + 1) as f64 };
            Segment::new(start, end)
        })
        .collect()
}

/// One face of a pv row.
#[derive(Debug, Clone, PartialEq)]
pub struct PVRowSide {
    side: Side,
    line: Segment,
    normal: Vector,
    segments: Vec<PVSegment>,
}

impl PVRowSide {
    pub fn new(line: Segment, normal: Vector, side: Side, n_segments: usize, params: &SurfaceParams) -> Self {
        let segments = divide_line(&line, n_segments)
            .into_iter()
            .map(|piece| PVSegment::new(piece, normal, Some(side), params.clone()))
            .collect();
        Self {
            side,
            line,
            normal,
            segments,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn line(&self) -> &Segment {
        &self.line
    }

    /// Unit normal of the face.
    pub fn n_vector(&self) -> Vector {
        self.normal
    }

    pub fn segments(&self) -> &[PVSegment] {
        &self.segments
    }

    pub(crate) fn segments_mut(&mut self) -> &mut [PVSegment] {
        &mut self.segments
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

    /// Surfaces in indexing order, segment by segment.
    pub fn all_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.segments.iter().flat_map(|seg| seg.surfaces_in_index_order())
    }

    pub(crate) fn reset(&mut self) {
        self.segments.iter_mut().for_each(|seg| seg.reset());
    }

    /// Shade the interval between two points of the face line on every
    /// segment it overlaps.
    pub(crate) fn mark_shaded(&mut self, from: &Point, to: &Point, tol: f64) -> bool {
        self.segments
            .iter_mut()
            .fold(false, |shaded, seg| seg.mark_shaded(from, to, tol) || shaded)
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
}

/// A pv row with its front and back faces.
#[derive(Debug, Clone, PartialEq)]
pub struct PVRow {
    index: usize,
    line: Segment,
    front: PVRowSide,
    back: PVRowSide,
}

impl PVRow {
    /// Build a row from its two endpoints. The front normal is the left-hand
    /// normal of `start -> end`; the back normal is its opposite.
    pub fn from_line(
        line: Segment,
        index: usize,
        cut: SideCut,
        front_params: &SurfaceParams,
        back_params: &SurfaceParams,
    ) -> Self {
        let front_normal = line.normal().unwrap_or(Vector::new(0., 1.));
        Self {
            index,
            line,
            front: PVRowSide::new(line, front_normal, Side::Front, cut.front, front_params),
            back: PVRowSide::new(line, -front_normal, Side::Back, cut.back, back_params),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_center_tilt_width(
        center: Point,
        tilt: f64,
        width: f64,
        surface_azimuth: f64,
        axis_azimuth: f64,
        index: usize,
        cut: SideCut,
        front_params: &SurfaceParams,
        back_params: &SurfaceParams,
    ) -> Self {
        let line = coords_from_center_tilt_width(center, tilt, width, surface_azimuth, axis_azimuth);
        Self::from_line(line, index, cut, front_params, back_params)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn line(&self) -> &Segment {
        &self.line
    }

    pub fn boundary(&self) -> (Point, Point) {
        (self.line.start, self.line.end)
    }

    pub fn centroid(&self) -> Point {
        self.line.centroid()
    }

    pub fn highest_point(&self) -> Point {
        if self.line.start.y >= self.line.end.y {
            self.line.start
        } else {
            self.line.end
        }
    }

    pub fn lowest_point(&self) -> Point {
        if self.line.start.y < self.line.end.y {
            self.line.start
        } else {
            self.line.end
        }
    }

    pub fn front(&self) -> &PVRowSide {
        &self.front
    }

    pub fn back(&self) -> &PVRowSide {
        &self.back
    }

    pub fn side(&self, side: Side) -> &PVRowSide {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut PVRowSide {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    pub fn n_surfaces(&self) -> usize {
        self.front.n_surfaces() + self.back.n_surfaces()
    }

    /// Front surfaces then back surfaces, in indexing order.
    pub fn all_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.front.all_surfaces().chain(self.back.all_surfaces())
    }

    pub(crate) fn reset(&mut self) {
        self.front.reset();
        self.back.reset();
    }
}
