//! Shadow casting: row shadows on the ground and direct inter-row shading.
//!
//! The functions here are pure over the row/ground geometry; the array
//! drives them in `OrderedPVArray::cast_shadows`.

use tracing::trace;

use crate::geometry::{project_along, Point, Segment, Vector};
use crate::ground::PVGround;
use crate::pvrow::PVRow;
use crate::surface::Side;

/// Outcome of one casting pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowCast {
    pub illuminated_side: Side,
    /// Merged shadow intervals on the ground, as positions along the ground
    /// line, before clipping to the ground extent.
    pub ground_shadows: Vec<(f64, f64)>,
    pub has_direct_shading: bool,
}

/// Row face receiving direct sun, array-wide.
pub fn illuminated_side(front_normal: Vector, sun: Vector) -> Side {
    if front_normal.dot(&sun) >= 0. {
        Side::Front
    } else {
        Side::Back
    }
}

/// Merge overlapping or touching `(lo, hi)` intervals, sorted by start.
pub fn merge_intervals(mut intervals: Vec<(f64, f64)>, tol: f64) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (lo, hi) in intervals {
        match merged.last_mut() {
            Some(last) if lo <= last.1 + tol => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Shadow intervals of every row on the ground line, projected along the
/// sun direction. Empty when the sun is at or below the horizon.
pub fn ground_shadow_intervals(pvrows: &[PVRow], sun: Vector, ground_line: &Segment, tol: f64) -> Vec<(f64, f64)> {
    if sun.dy <= tol {
        return Vec::new();
    }
    let intervals = pvrows
        .iter()
        .filter_map(|pvrow| {
            let (a, b) = pvrow.boundary();
            let pa = project_along(a, sun, ground_line, tol)?;
            let pb = project_along(b, sun, ground_line, tol)?;
            let xa = ground_line.position_of(&pa.point);
            let xb = ground_line.position_of(&pb.point);
            Some((xa.min(xb), xa.max(xb)))
        })
        .collect();
    merge_intervals(intervals, tol)
}

/// Shadow cast by `caster` on the line of `target`, projecting along the
/// direction of the sun rays (away from the sun).
///
/// Returns `None` when the caster is not between the sun and the target.
pub fn direct_shadow_on(target: &PVRow, caster: &PVRow, sun: Vector, tol: f64) -> Option<(Point, Point)> {
    let (a, b) = caster.boundary();
    let pa = project_along(a, -sun, target.line(), tol)?;
    let pb = project_along(b, -sun, target.line(), tol)?;
    if pa.ray_parameter < 0. || pb.ray_parameter < 0. {
        return None;
    }
    Some((pa.point, pb.point))
}

/// Reset every surface, then shade the ground and the illuminated faces.
/// Nothing is shaded with the sun at or below the horizon.
///
/// `sun_side_neighbors[k]` is the neighbor of row `k` on the illuminated side.
pub(crate) fn cast_shadows_pure(
    ground: &mut PVGround,
    pvrows: &mut [PVRow],
    sun_side_neighbors: impl Fn(usize) -> Option<usize>,
    sun: Vector,
    illuminated_side: Side,
    tol: f64,
) -> ShadowCast {
    ground.reset();
    pvrows.iter_mut().for_each(PVRow::reset);

    let ground_line = *ground.original_line();
    let ground_shadows = ground_shadow_intervals(pvrows, sun, &ground_line, tol);
    for &(lo, hi) in ground_shadows.iter() {
        let from = ground_line.point_at(lo);
        let to = ground_line.point_at(hi);
        ground.mark_shaded(&from, &to, tol);
    }
    trace!(n_intervals = ground_shadows.len(), "ground shadows marked");

    let sun_up = sun.dy > tol;
    let shadows: Vec<Option<(Point, Point)>> = (0..pvrows.len())
        .filter(|_| sun_up)
        .map(|k| {
            sun_side_neighbors(k)
                .and_then(|m| pvrows.get(m))
                .and_then(|caster| direct_shadow_on(&pvrows[k], caster, sun, tol))
        })
        .collect();

    let mut has_direct_shading = false;
    for (pvrow, shadow) in pvrows.iter_mut().zip(shadows) {
        if let Some((from, to)) = shadow {
            let marked = pvrow.side_mut(illuminated_side).mark_shaded(&from, &to, tol);
            if marked {
                trace!(pvrow = pvrow.index(), side = %illuminated_side, "direct shading");
            }
            has_direct_shading |= marked;
        }
    }

    ShadowCast {
        illuminated_side,
        ground_shadows,
        has_direct_shading,
    }
}
