//! Flat registry of every surface of an array, in indexing order.

use ndarray::Array2;
use serde::Serialize;

use crate::geometry::{Segment, Vector};
use crate::ground::PVGround;
use crate::pvrow::PVRow;
use crate::surface::{PVSurface, Side};

/// Where a surface lives in the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SurfaceOwner {
    Ground { segment: usize },
    PVRow { row: usize, side: Side, segment: usize },
}

impl SurfaceOwner {
    /// Row index, `None` for the ground.
    pub fn pvrow(&self) -> Option<usize> {
        match self {
            SurfaceOwner::Ground { .. } => None,
            SurfaceOwner::PVRow { row, .. } => Some(*row),
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            SurfaceOwner::Ground { .. } => None,
            SurfaceOwner::PVRow { side, .. } => Some(*side),
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, SurfaceOwner::Ground { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceRecord {
    pub index: Option<usize>,
    pub owner: SurfaceOwner,
    pub shaded: bool,
    pub line: Segment,
    pub normal: Vector,
    pub length: f64,
}

impl SurfaceRecord {
    fn new(surface: &PVSurface, owner: SurfaceOwner) -> Self {
        Self {
            index: surface.index(),
            owner,
            shaded: surface.is_shaded(),
            line: *surface.line(),
            normal: surface.normal(),
            length: surface.length(),
        }
    }
}

/// Column names of [`registry_table`].
pub const REGISTRY_COLUMNS: [&str; 13] = [
    "index",
    "is_ground",
    "pvrow_index",
    "side",
    "segment_index",
    "shaded",
    "x1",
    "y1",
    "x2",
    "y2",
    "normal_x",
    "normal_y",
    "length",
];

/// One record per surface: ground segments first, then rows front/back.
pub fn surface_records(ground: &PVGround, pvrows: &[PVRow]) -> Vec<SurfaceRecord> {
    let mut records = Vec::with_capacity(
        ground.n_surfaces() + pvrows.iter().map(PVRow::n_surfaces).sum::<usize>(),
    );
    for (segment, seg) in ground.segments().iter().enumerate() {
        records.extend(
            seg.surfaces_in_index_order()
                .map(|surface| SurfaceRecord::new(surface, SurfaceOwner::Ground { segment })),
        );
    }
    for pvrow in pvrows {
        for side in [Side::Front, Side::Back] {
            for (segment, seg) in pvrow.side(side).segments().iter().enumerate() {
                let owner = SurfaceOwner::PVRow {
                    row: pvrow.index(),
                    side,
                    segment,
                };
                records.extend(
                    seg.surfaces_in_index_order()
                        .map(|surface| SurfaceRecord::new(surface, owner)),
                );
            }
        }
    }
    records
}

/// Numeric table of the records, columns as in [`REGISTRY_COLUMNS`].
///
/// Missing values (no index yet, row/side of a ground surface) are NaN; side
/// is 0 for front and 1 for back.
pub fn registry_table(records: &[SurfaceRecord]) -> Array2<f64> {
    let mut table = Array2::<f64>::from_elem((records.len(), REGISTRY_COLUMNS.len()), f64::NAN);
    for (mut row, record) in table.outer_iter_mut().zip(records) {
        let (pvrow, side, segment) = match record.owner {
            SurfaceOwner::Ground { segment } => (f64::NAN, f64::NAN, segment as f64),
            SurfaceOwner::PVRow { row, side, segment } => {
                let side = match side {
                    Side::Front => 0.,
                    Side::Back => 1.,
                };
                (row as f64, side, segment as f64)
            }
        };
        let values = [
            record.index.map_or(f64::NAN, |i| i as f64),
            if record.owner.is_ground() { 1. } else { 0. },
            pvrow,
            side,
            segment,
            if record.shaded { 1. } else { 0. },
            record.line.start.x,
            record.line.start.y,
            record.line.end.x,
            record.line.end.y,
            record.normal.dx,
            record.normal.dy,
            record.length,
        ];
        for (cell, value) in row.iter_mut().zip(values) {
            *cell = value;
        }
    }
    table
}
