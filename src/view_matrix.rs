//! Pairwise view and obstruction matrices over indexed surfaces.
//!
//! Both matrices are `(n + 1) x (n + 1)`: one row/column per indexed surface
//! plus a last one for the sky. Cells are independent and evaluated in
//! parallel over read-only geometry.

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::geometry::{segment_intersects_polygon, segments_hull, Segment};
use crate::registry::{SurfaceOwner, SurfaceRecord};
use crate::surface::Side;

/// Kind of view from the row surface to the column surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ViewKind {
    None = 0,
    BackGround = 1,
    GroundBack = 2,
    BackGroundObstructed = 3,
    GroundBackObstructed = 4,
    FrontGroundObstructed = 5,
    GroundFrontObstructed = 6,
    PVRows = 7,
    FrontGround = 8,
    GroundFront = 9,
    ToSky = 10,
    PVRowsObstructed = 11,
}

impl ViewKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<ViewKind> {
        let kind = match code {
            0 => ViewKind::None,
            1 => ViewKind::BackGround,
            2 => ViewKind::GroundBack,
            3 => ViewKind::BackGroundObstructed,
            4 => ViewKind::GroundBackObstructed,
            5 => ViewKind::FrontGroundObstructed,
            6 => ViewKind::GroundFrontObstructed,
            7 => ViewKind::PVRows,
            8 => ViewKind::FrontGround,
            9 => ViewKind::GroundFront,
            10 => ViewKind::ToSky,
            11 => ViewKind::PVRowsObstructed,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_obstructed(self) -> bool {
        matches!(
            self,
            ViewKind::BackGroundObstructed
                | ViewKind::GroundBackObstructed
                | ViewKind::FrontGroundObstructed
                | ViewKind::GroundFrontObstructed
                | ViewKind::PVRowsObstructed
        )
    }

    /// View kind from `from` to `to` for a visible pair.
    fn between(from: &SurfaceOwner, to: &SurfaceOwner, obstructed: bool) -> ViewKind {
        match (from.side(), to.side(), obstructed) {
            (Some(Side::Back), None, false) => ViewKind::BackGround,
            (Some(Side::Back), None, true) => ViewKind::BackGroundObstructed,
            (Some(Side::Front), None, false) => ViewKind::FrontGround,
            (Some(Side::Front), None, true) => ViewKind::FrontGroundObstructed,
            (None, Some(Side::Back), false) => ViewKind::GroundBack,
            (None, Some(Side::Back), true) => ViewKind::GroundBackObstructed,
            (None, Some(Side::Front), false) => ViewKind::GroundFront,
            (None, Some(Side::Front), true) => ViewKind::GroundFrontObstructed,
            (Some(_), Some(_), false) => ViewKind::PVRows,
            (Some(_), Some(_), true) => ViewKind::PVRowsObstructed,
            // Ground never sees ground
            (None, None, _) => ViewKind::None,
        }
    }
}

/// View-kind codes and obstructing row per surface pair, sky last.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewMatrices {
    pub view: Array2<u8>,
    pub obstruction: Array2<Option<usize>>,
}

impl ViewMatrices {
    /// Number of surfaces, sky excluded.
    pub fn n_surfaces(&self) -> usize {
        self.view.nrows().saturating_sub(1)
    }

    /// 1 where any view exists, 0 elsewhere.
    pub fn mask(&self) -> Array2<u8> {
        self.view.mapv(|code| u8::from(code > 0))
    }

    pub fn kind(&self, i: usize, j: usize) -> Option<ViewKind> {
        self.view.get((i, j)).copied().and_then(ViewKind::from_code)
    }

    /// Obstruction matrix with -1 where no row obstructs the view.
    pub fn obstruction_codes(&self) -> Array2<i64> {
        self.obstruction.mapv(|row| row.map_or(-1, |r| r as i64))
    }
}

fn same_owner_line(a: &SurfaceOwner, b: &SurfaceOwner) -> bool {
    match (a.pvrow(), b.pvrow()) {
        (None, None) => true,
        (Some(ra), Some(rb)) => ra == rb,
        _ => false,
    }
}

/// Whether `other` lies strictly on the normal side of `surface`.
fn faces(surface: &SurfaceRecord, other: &SurfaceRecord, tol: f64) -> bool {
    (other.line.centroid() - surface.line.centroid()).dot(&surface.normal) > tol
}

/// Visibility of a pair of surfaces: `None` when they cannot see each
/// other, otherwise the lowest index of a row partially obstructing the view.
fn pair_visibility(
    a: &SurfaceRecord,
    b: &SurfaceRecord,
    pvrow_lines: &[Segment],
    tol: f64,
) -> Option<Option<usize>> {
    if same_owner_line(&a.owner, &b.owner) || a.line.is_colinear_with(&b.line, tol) {
        return None;
    }
    if !(faces(a, b, tol) && faces(b, a, tol)) {
        return None;
    }

    let owners = [a.owner.pvrow(), b.owner.pvrow()];
    let mut third_rows = pvrow_lines
        .iter()
        .enumerate()
        .filter(|(k, _)| !owners.contains(&Some(*k)));

    let sight = Segment::new(a.line.centroid(), b.line.centroid());
    if third_rows
        .clone()
        .any(|(_, line)| sight.intersection(line, tol).point().is_some())
    {
        return None;
    }

    let hull = segments_hull(&a.line, &b.line);
    let obstructing = third_rows
        .find(|(_, line)| segment_intersects_polygon(line, &hull))
        .map(|(k, _)| k);
    Some(obstructing)
}

/// Build both matrices from records sorted by surface index and the lines of
/// all rows in array order.
pub fn build_view_matrices_pure(records: &[SurfaceRecord], pvrow_lines: &[Segment], tol: f64) -> ViewMatrices {
    let n = records.len();
    let mut view = Array2::<u8>::zeros((n + 1, n + 1));
    let mut obstruction = Array2::<Option<usize>>::from_elem((n + 1, n + 1), None);

    Zip::indexed(&mut view)
        .and(&mut obstruction)
        .par_for_each(|(i, j), code, obstructed_by| {
            if i == n || i == j {
                return;
            }
            if j == n {
                *code = ViewKind::ToSky.code();
                return;
            }
            // Evaluate the canonical pair so both halves agree
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            if let Some(obstructing) = pair_visibility(&records[lo], &records[hi], pvrow_lines, tol) {
                let kind = ViewKind::between(&records[i].owner, &records[j].owner, obstructing.is_some());
                *code = kind.code();
                *obstructed_by = obstructing;
            }
        });

    debug!(
        n_surfaces = n,
        n_views = view.iter().filter(|&&code| code > 0).count(),
        "view matrices built"
    );
    ViewMatrices { view, obstruction }
}
