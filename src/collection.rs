//! Length-conserving partition of one straight line into illuminated and
//! shaded surfaces.
//!
//! Surfaces are kept in an arena ordered along the line; the illuminated and
//! shaded sub-collections are index lists into that arena and are rebuilt
//! after every topology change.

use crate::error::Result;
use crate::geometry::{Point, Segment, Vector};
use crate::surface::{PVSurface, Side, SurfaceParams};

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCollection {
    line: Segment,
    normal: Vector,
    side: Option<Side>,
    template: SurfaceParams,
    surfaces: Vec<PVSurface>,
    illuminated: Vec<usize>,
    shaded: Vec<usize>,
}

impl SurfaceCollection {
    /// Fully illuminated collection spanning `line`.
    pub fn new(line: Segment, normal: Vector, side: Option<Side>, params: SurfaceParams) -> Self {
        let mut collection = Self {
            line,
            normal,
            side,
            template: params,
            surfaces: Vec::new(),
            illuminated: Vec::new(),
            shaded: Vec::new(),
        };
        collection.reset();
        collection
    }

    /// Back to a single illuminated surface carrying the template parameters.
    pub fn reset(&mut self) {
        self.surfaces = vec![PVSurface::new(
            self.line,
            self.normal,
            false,
            self.side,
            self.template.clone(),
        )];
        self.rebuild_partition();
    }

    pub fn line(&self) -> &Segment {
        &self.line
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// All surfaces, ordered along the line.
    pub fn surfaces(&self) -> &[PVSurface] {
        &self.surfaces
    }

    pub fn illuminated(&self) -> impl Iterator<Item = &PVSurface> {
        self.illuminated.iter().map(move |&i| &self.surfaces[i])
    }

    pub fn shaded(&self) -> impl Iterator<Item = &PVSurface> {
        self.shaded.iter().map(move |&i| &self.surfaces[i])
    }

    /// Surfaces in indexing order: illuminated first, then shaded.
    pub fn surfaces_in_index_order(&self) -> impl Iterator<Item = &PVSurface> {
        self.illuminated().chain(self.shaded())
    }

    pub fn n_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn n_illuminated(&self) -> usize {
        self.illuminated.len()
    }

    pub fn n_shaded(&self) -> usize {
        self.shaded.len()
    }

    pub fn length(&self) -> f64 {
        self.surfaces.iter().map(PVSurface::length).sum()
    }

    pub fn illuminated_length(&self) -> f64 {
        self.illuminated().map(PVSurface::length).sum()
    }

    pub fn shaded_length(&self) -> f64 {
        self.shaded().map(PVSurface::length).sum()
    }

    /// Break the surface containing `point` in two. Returns `false` when the
    /// point is off the line or within tolerance of an existing boundary.
    pub fn split_at(&mut self, point: &Point, tol: f64) -> bool {
        if !self.line.contains(point, tol) {
            return false;
        }
        let position = self.line.position_of(point);
        self.split_at_position(position, tol)
    }

    /// Shade the part of the line between the projections of `from` and `to`,
    /// clipped to the collection. Returns `true` when something was shaded.
    pub fn mark_shaded(&mut self, from: &Point, to: &Point, tol: f64) -> bool {
        let a = self.line.position_of(from);
        let b = self.line.position_of(to);
        let lo = a.min(b).max(0.);
        let hi = a.max(b).min(self.line.length());
        if hi - lo <= tol {
            return false;
        }

        self.split_at_position(lo, tol);
        self.split_at_position(hi, tol);
        for surface in self.surfaces.iter_mut() {
            let mid = self.line.position_of(&surface.centroid());
            if mid > lo && mid < hi {
                surface.set_shaded(true);
            }
        }
        self.rebuild_partition();
        true
    }

    /// Length-weighted average of a parameter over all surfaces.
    pub fn param_weighted(&self, name: &str) -> Result<f64> {
        let length = self.length();
        let weighted = self.param_length_weighted_sum(name)?;
        if length > 0. {
            Ok(weighted / length)
        } else {
            Ok(0.)
        }
    }

    /// Σ value · length over all surfaces.
    pub fn param_length_weighted_sum(&self, name: &str) -> Result<f64> {
        self.surfaces
            .iter()
            .map(|surface| surface.get_param(name).map(|value| value * surface.length()))
            .sum()
    }

    /// Set a parameter on every surface. The value survives `reset`.
    pub fn set_param_all(&mut self, name: &str, value: f64) -> Result<()> {
        self.template.set(name, value)?;
        for surface in self.surfaces.iter_mut() {
            surface.set_param(name, value)?;
        }
        Ok(())
    }

    /// Assign consecutive indices in indexing order, starting at `*next`.
    pub(crate) fn assign_indices(&mut self, next: &mut usize) {
        for &i in self.illuminated.iter().chain(self.shaded.iter()) {
            self.surfaces[i].set_index(*next);
            *next += 1;
        }
    }

    fn split_at_position(&mut self, position: f64, tol: f64) -> bool {
        let found = self.surfaces.iter().position(|surface| {
            let (start, end) = surface.boundary();
            let lo = self.line.position_of(&start);
            let hi = self.line.position_of(&end);
            position > lo + tol && position < hi - tol
        });
        let Some(i) = found else {
            return false;
        };

        let cut = self.line.point_at(position);
        let (start, end) = self.surfaces[i].boundary();
        let left = self.surfaces[i].with_line(Segment::new(start, cut));
        let right = self.surfaces[i].with_line(Segment::new(cut, end));
        self.surfaces.splice(i..=i, [left, right]);
        self.rebuild_partition();
        true
    }

    fn rebuild_partition(&mut self) {
        self.illuminated.clear();
        self.shaded.clear();
        for (i, surface) in self.surfaces.iter().enumerate() {
            if surface.is_shaded() {
                self.shaded.push(i);
            } else {
                self.illuminated.push(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use approx::assert_relative_eq;

    const TOL: f64 = 1e-8;

    fn ground_like() -> SurfaceCollection {
        let line = Segment::new(Point::new(0., 0.), Point::new(10., 0.));
        SurfaceCollection::new(line, line.normal().unwrap(), None, SurfaceParams::declare(&["qinc"]))
    }

    fn assert_partition_consistent(coll: &SurfaceCollection) {
        assert_relative_eq!(
            coll.illuminated_length() + coll.shaded_length(),
            coll.line().length(),
            epsilon = 1e-9
        );
        // Consecutive surfaces share their boundary points
        for pair in coll.surfaces().windows(2) {
            assert!(pair[0].boundary().1.is_close(&pair[1].boundary().0, 1e-12));
        }
    }

    #[test]
    fn test_split_preserves_state() {
        let mut coll = ground_like();
        assert!(coll.split_at(&Point::new(4., 0.), TOL));
        assert_eq!(coll.n_surfaces(), 2);
        assert_eq!(coll.n_illuminated(), 2);
        // Existing boundary or off-line points do nothing
        assert!(!coll.split_at(&Point::new(4., 0.), TOL));
        assert!(!coll.split_at(&Point::new(0., 0.), TOL));
        assert!(!coll.split_at(&Point::new(5., 1.), TOL));
        assert!(!coll.split_at(&Point::new(12., 0.), TOL));
        assert_partition_consistent(&coll);
    }

    #[test]
    fn test_mark_shaded_interval() {
        let mut coll = ground_like();
        assert!(coll.mark_shaded(&Point::new(6., 0.), &Point::new(2., 0.), TOL));
        assert_eq!(coll.n_surfaces(), 3);
        assert_eq!(coll.n_illuminated(), 2);
        assert_eq!(coll.n_shaded(), 1);
        assert_relative_eq!(coll.shaded_length(), 4., epsilon = 1e-12);
        assert_partition_consistent(&coll);

        // Clipped at the collection boundary
        assert!(coll.mark_shaded(&Point::new(8., 0.), &Point::new(15., 0.), TOL));
        assert_relative_eq!(coll.shaded_length(), 6., epsilon = 1e-12);
        assert_eq!(coll.n_shaded(), 2);
        assert_partition_consistent(&coll);

        // Fully outside or degenerate intervals are ignored
        assert!(!coll.mark_shaded(&Point::new(-5., 0.), &Point::new(-1., 0.), TOL));
        assert!(!coll.mark_shaded(&Point::new(1., 0.), &Point::new(1., 0.), TOL));
        assert_eq!(coll.n_surfaces(), 4);
    }

    #[test]
    fn test_shading_over_existing_split() {
        let mut coll = ground_like();
        coll.split_at(&Point::new(5., 0.), TOL);
        coll.mark_shaded(&Point::new(3., 0.), &Point::new(7., 0.), TOL);
        assert_eq!(coll.n_shaded(), 2);
        assert_eq!(coll.n_illuminated(), 2);
        assert_relative_eq!(coll.shaded_length(), 4., epsilon = 1e-12);
        let order: Vec<bool> = coll.surfaces_in_index_order().map(PVSurface::is_shaded).collect();
        assert_eq!(order, vec![false, false, true, true]);
    }

    #[test]
    fn test_reset_restores_single_surface() {
        let mut coll = ground_like();
        coll.mark_shaded(&Point::new(3., 0.), &Point::new(7., 0.), TOL);
        coll.reset();
        assert_eq!(coll.n_surfaces(), 1);
        assert_eq!(coll.shaded_length(), 0.);
        assert_eq!(coll.illuminated_length(), 10.);
    }

    #[test]
    fn test_weighted_params() {
        let mut coll = ground_like();
        coll.mark_shaded(&Point::new(0., 0.), &Point::new(4., 0.), TOL);
        assert_eq!(
            coll.param_weighted("qinc"),
            Err(GeometryError::MissingParameter("qinc".into()))
        );
        assert_eq!(
            coll.param_weighted("albedo"),
            Err(GeometryError::UnknownParameter("albedo".into()))
        );

        coll.set_param_all("qinc", 2.).unwrap();
        assert_relative_eq!(coll.param_weighted("qinc").unwrap(), 2., epsilon = 1e-12);
        assert_relative_eq!(coll.param_length_weighted_sum("qinc").unwrap(), 20., epsilon = 1e-12);
    }

    #[test]
    fn test_assign_indices_illuminated_first() {
        let mut coll = ground_like();
        coll.mark_shaded(&Point::new(2., 0.), &Point::new(4., 0.), TOL);
        let mut next = 10;
        coll.assign_indices(&mut next);
        assert_eq!(next, 13);
        let indices: Vec<Option<usize>> = coll.surfaces_in_index_order().map(PVSurface::index).collect();
        assert_eq!(indices, vec![Some(10), Some(11), Some(12)]);
        // Shaded surface is in the middle of the line but indexed last
        assert_eq!(coll.surfaces()[1].index(), Some(12));
    }
}
