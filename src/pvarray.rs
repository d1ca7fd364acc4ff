//! Ordered pv array: ground plus evenly spaced parallel rows.

use std::collections::BTreeMap;

use ndarray::Array2;
use tracing::debug;

use crate::config::{ArrayParameters, GeometryConfig};
use crate::error::{GeometryError, Result};
use crate::geometry::{project_along, solar_2d_vector, Point, Vector};
use crate::ground::PVGround;
use crate::pvrow::PVRow;
use crate::registry::{registry_table, surface_records, SurfaceRecord};
use crate::shadowing::{cast_shadows_pure, illuminated_side};
use crate::surface::{PVSurface, Side, SurfaceParams};
use crate::view_matrix::{build_view_matrices_pure, ViewMatrices};

/// Parameter declared on every surface when reflectivity values are given.
pub const RHO_PARAM: &str = "rho";

#[derive(Debug, Clone, PartialEq)]
pub struct OrderedPVArray {
    config: GeometryConfig,
    parameters: ArrayParameters,
    surface_params: Vec<String>,
    ground: PVGround,
    pvrows: Vec<PVRow>,
    solar_2d_vector: Vector,
    illum_side: Side,
    has_direct_shading: bool,
    front_neighbors: Vec<Option<usize>>,
    back_neighbors: Vec<Option<usize>>,
    edge_points: Vec<Point>,
    revision: u64,
    indexed_revision: Option<u64>,
}

impl OrderedPVArray {
    /// Build the ground and rows described by `parameters`.
    ///
    /// Every surface declares `surface_params`, plus `rho` when any
    /// reflectivity value is given; reflectivities are set right away.
    pub fn from_parameters<S: AsRef<str>>(
        parameters: ArrayParameters,
        surface_params: &[S],
        config: GeometryConfig,
    ) -> Result<Self> {
        config.validate()?;
        parameters.validate()?;

        let mut names: Vec<String> = surface_params.iter().map(|s| s.as_ref().to_string()).collect();
        if parameters.has_reflectivity() && !names.iter().any(|n| n == RHO_PARAM) {
            names.push(RHO_PARAM.to_string());
        }
        let template = SurfaceParams::declare(names.as_slice());
        let with_rho = |rho: Option<f64>| -> Result<SurfaceParams> {
            let mut params = template.clone();
            if let Some(value) = rho {
                params.set(RHO_PARAM, value)?;
            }
            Ok(params)
        };
        let ground_params = with_rho(parameters.rho_ground)?;
        let front_params = with_rho(parameters.rho_front_pvrow)?;
        let back_params = with_rho(parameters.rho_back_pvrow)?;

        let ground = PVGround::flat(&config, &ground_params);
        let spacing = parameters.pvrow_spacing();
        let y_center = parameters.pvrow_height + config.y_ground;
        let pvrows: Vec<PVRow> = (0..parameters.n_pvrows)
            .map(|k| {
                PVRow::from_center_tilt_width(
                    Point::new(k as f64 * spacing, y_center),
                    parameters.surface_tilt,
                    parameters.pvrow_width,
                    parameters.surface_azimuth,
                    parameters.axis_azimuth,
                    k,
                    parameters.side_cut(k),
                    &front_params,
                    &back_params,
                )
            })
            .collect();

        let sun = solar_2d_vector(
            parameters.solar_zenith,
            parameters.solar_azimuth,
            parameters.axis_azimuth,
        );
        let illum_side = illuminated_side(pvrows[0].front().n_vector(), sun);

        let mut array = Self {
            config,
            parameters,
            surface_params: names,
            ground,
            pvrows,
            solar_2d_vector: sun,
            illum_side,
            has_direct_shading: false,
            front_neighbors: Vec::new(),
            back_neighbors: Vec::new(),
            edge_points: Vec::new(),
            revision: 0,
            indexed_revision: None,
        };
        let (front, back) = array.get_neighbors();
        array.front_neighbors = front;
        array.back_neighbors = back;
        array.edge_points = array.compute_edge_points();

        debug!(
            n_pvrows = array.pvrows.len(),
            tilt = array.parameters.surface_tilt,
            illum_side = %array.illum_side,
            "ordered pv array created"
        );
        Ok(array)
    }

    /// Build from a JSON geometry description with default settings.
    pub fn from_json<S: AsRef<str>>(text: &str, surface_params: &[S]) -> Result<Self> {
        let parameters = ArrayParameters::from_json(text)?;
        Self::from_parameters(parameters, surface_params, GeometryConfig::default())
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ArrayParameters {
        &self.parameters
    }

    pub fn surface_params(&self) -> &[String] {
        &self.surface_params
    }

    pub fn ground(&self) -> &PVGround {
        &self.ground
    }

    pub fn pvrows(&self) -> &[PVRow] {
        &self.pvrows
    }

    pub fn solar_2d_vector(&self) -> Vector {
        self.solar_2d_vector
    }

    pub fn illum_side(&self) -> Side {
        self.illum_side
    }

    pub fn has_direct_shading(&self) -> bool {
        self.has_direct_shading
    }

    pub fn front_neighbors(&self) -> &[Option<usize>] {
        &self.front_neighbors
    }

    pub fn back_neighbors(&self) -> &[Option<usize>] {
        &self.back_neighbors
    }

    /// Intersections of the row planes with the ground line, one per row.
    pub fn edge_points(&self) -> &[Point] {
        &self.edge_points
    }

    pub fn is_flat(&self) -> bool {
        self.parameters.surface_tilt == 0.
    }

    /// Geometry revision, bumped by every casting or cutting pass.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether surface indices match the current geometry.
    pub fn is_indexed(&self) -> bool {
        self.indexed_revision == Some(self.revision)
    }

    /// Front and back neighbor of every row.
    ///
    /// A face's neighbor is the adjacent row that face looks at; rows at the
    /// outer edge have none, and a flat array has no neighbors at all.
    pub fn get_neighbors(&self) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        let n = self.pvrows.len();
        if self.is_flat() {
            return (vec![None; n], vec![None; n]);
        }
        let previous: Vec<Option<usize>> = (0..n).map(|k| k.checked_sub(1)).collect();
        let next: Vec<Option<usize>> = (0..n).map(|k| Some(k + 1).filter(|&m| m < n)).collect();
        let facing_left = self.pvrows[0].front().n_vector().dx < 0.;
        if facing_left {
            (previous, next)
        } else {
            (next, previous)
        }
    }

    fn compute_edge_points(&self) -> Vec<Point> {
        if self.is_flat() {
            return Vec::new();
        }
        let tol = self.config.distance_tolerance;
        let ground_line = self.ground.original_line();
        self.pvrows
            .iter()
            .filter_map(|pvrow| {
                let line = pvrow.line();
                project_along(line.start, line.vector(), ground_line, tol).map(|p| p.point)
            })
            .collect()
    }

    /// Neighbor of row `k` on the illuminated side.
    fn sun_side_neighbor(&self, k: usize) -> Option<usize> {
        let neighbors = match self.illum_side {
            Side::Front => &self.front_neighbors,
            Side::Back => &self.back_neighbors,
        };
        neighbors.get(k).copied().flatten()
    }

    /// Shade the ground and the illuminated faces. Every surface is reset
    /// first, so casting twice gives the same partition.
    pub fn cast_shadows(&mut self) {
        let tol = self.config.distance_tolerance;
        self.illum_side = illuminated_side(self.pvrows[0].front().n_vector(), self.solar_2d_vector);
        let neighbors: Vec<Option<usize>> = (0..self.pvrows.len())
            .map(|k| self.sun_side_neighbor(k))
            .collect();

        let cast = cast_shadows_pure(
            &mut self.ground,
            &mut self.pvrows,
            |k| neighbors.get(k).copied().flatten(),
            self.solar_2d_vector,
            self.illum_side,
            tol,
        );
        self.has_direct_shading = cast.has_direct_shading;
        self.revision += 1;
        debug!(
            illum_side = %cast.illuminated_side,
            ground_shaded = self.ground.shaded_length(),
            direct_shading = cast.has_direct_shading,
            "shadows cast"
        );
    }

    /// Break the ground where the row planes meet it, so that every ground
    /// surface lies entirely on one side of each row plane. Returns the
    /// number of surfaces added.
    pub fn cuts_for_pvrow_view(&mut self) -> usize {
        let tol = self.config.distance_tolerance;
        self.edge_points = self.compute_edge_points();
        let before = self.ground.n_surfaces();
        for point in self.edge_points.iter() {
            self.ground.cut_at_point(point, tol);
        }
        self.revision += 1;
        let added = self.ground.n_surfaces() - before;
        debug!(n_edge_points = self.edge_points.len(), added, "ground cut for pv row view");
        added
    }

    /// Give every surface a dense index: ground first, then rows front/back.
    pub fn index_all_surfaces(&mut self) -> usize {
        let mut next = 0;
        for seg in self.ground.segments_mut() {
            seg.assign_indices(&mut next);
        }
        for pvrow in self.pvrows.iter_mut() {
            for side in [Side::Front, Side::Back] {
                for seg in pvrow.side_mut(side).segments_mut() {
                    seg.assign_indices(&mut next);
                }
            }
        }
        self.indexed_revision = Some(self.revision);
        debug!(n_surfaces = next, revision = self.revision, "surfaces indexed");
        next
    }

    /// Every surface in indexing order.
    pub fn all_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.ground
            .all_surfaces()
            .chain(self.pvrows.iter().flat_map(PVRow::all_surfaces))
    }

    pub fn n_surfaces(&self) -> usize {
        self.ground.n_surfaces() + self.pvrows.iter().map(PVRow::n_surfaces).sum::<usize>()
    }

    /// Surface indices in indexing order; `None` before indexing.
    pub fn surface_indices(&self) -> Vec<Option<usize>> {
        self.all_surfaces().map(PVSurface::index).collect()
    }

    pub fn surface_records(&self) -> Vec<SurfaceRecord> {
        surface_records(&self.ground, &self.pvrows)
    }

    /// Numeric surface registry, see [`crate::registry::REGISTRY_COLUMNS`].
    pub fn surface_registry(&self) -> Array2<f64> {
        registry_table(&self.surface_records())
    }

    /// Shaded length of each row, columns front and back.
    pub fn pvrow_shaded_lengths(&self) -> Array2<f64> {
        let mut lengths = Array2::<f64>::zeros((self.pvrows.len(), 2));
        for (k, pvrow) in self.pvrows.iter().enumerate() {
            lengths[[k, 0]] = pvrow.front().shaded_length();
            lengths[[k, 1]] = pvrow.back().shaded_length();
        }
        lengths
    }

    /// Set named values on every surface of the array. Nothing is written
    /// if any name is undeclared.
    pub fn update_params(&mut self, values: &BTreeMap<String, f64>) -> Result<()> {
        if let Some(unknown) = values.keys().find(|name| !self.surface_params.contains(*name)) {
            return Err(GeometryError::UnknownParameter(unknown.clone()));
        }
        for (name, &value) in values {
            self.ground.set_param_all(name, value)?;
            for pvrow in self.pvrows.iter_mut() {
                pvrow.side_mut(Side::Front).set_param_all(name, value)?;
                pvrow.side_mut(Side::Back).set_param_all(name, value)?;
            }
        }
        Ok(())
    }

    /// View and obstruction matrices over the indexed surfaces plus the sky.
    pub fn build_view_matrices(&self) -> Result<ViewMatrices> {
        match self.indexed_revision {
            None => return Err(GeometryError::NotIndexed),
            Some(indexed) if indexed != self.revision => {
                return Err(GeometryError::StaleIndex {
                    indexed,
                    current: self.revision,
                })
            }
            Some(_) => {}
        }
        let mut records = self.surface_records();
        records.sort_by_key(|record| record.index);
        let pvrow_lines: Vec<_> = self.pvrows.iter().map(|pvrow| *pvrow.line()).collect();
        Ok(build_view_matrices_pure(
            &records,
            &pvrow_lines,
            self.config.distance_tolerance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::{discr_params, params, params_direct_shading};
    use crate::config::SideCut;
    use crate::view_matrix::ViewKind;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rstest::rstest;

    const NO_PARAMS: [&str; 0] = [];

    fn build(parameters: ArrayParameters) -> OrderedPVArray {
        OrderedPVArray::from_parameters(parameters, &NO_PARAMS, GeometryConfig::default()).unwrap()
    }

    fn assert_lengths_conserved(array: &OrderedPVArray) {
        let ground = array.ground();
        assert_relative_eq!(
            ground.shaded_length() + ground.illuminated_length(),
            ground.original_line().length(),
            epsilon = 1e-9
        );
        for pvrow in array.pvrows() {
            for side in [Side::Front, Side::Back] {
                let face = pvrow.side(side);
                assert_relative_eq!(
                    face.shaded_length() + face.illuminated_length(),
                    pvrow.line().length(),
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_from_parameters() {
        let array = build(params());
        assert_eq!(array.pvrows().len(), 3);
        assert_eq!(array.ground().length(), 200.);
        let row0 = &array.pvrows()[0];
        assert_eq!(row0.front().n_vector(), -row0.back().n_vector());
        assert!(row0.front().n_vector().dx > 0.);
        assert_eq!(row0.front().shaded_length(), 0.);
        assert_relative_eq!(array.pvrows()[1].centroid().x, 5., epsilon = 1e-12);
        assert_relative_eq!(array.pvrows()[1].centroid().y, 2.5, epsilon = 1e-12);
        assert!(!array.is_flat());

        // Reflectivity declared and set per surface kind
        assert_eq!(array.surface_params(), &["rho".to_string()]);
        let ground_rho = array.ground().all_surfaces().next().unwrap().get_param("rho");
        assert_eq!(ground_rho, Ok(0.2));
        assert_eq!(row0.back().all_surfaces().next().unwrap().get_param("rho"), Ok(0.03));
    }

    #[test]
    fn test_from_json() {
        let text = serde_json::to_string(&params()).unwrap();
        let array = OrderedPVArray::from_json(&text, &["qinc"]).unwrap();
        assert_eq!(array.parameters(), &params());
        assert_eq!(array.surface_params(), &["qinc".to_string(), "rho".to_string()]);

        let err = OrderedPVArray::from_json("{}", &NO_PARAMS).unwrap_err();
        assert!(matches!(err, GeometryError::Parse(_)));
    }

    #[test]
    fn test_invalid_description_fails_fast() {
        let mut p = params();
        p.n_pvrows = 0;
        let result = OrderedPVArray::from_parameters(p, &NO_PARAMS, GeometryConfig::default());
        assert!(matches!(result, Err(GeometryError::InvalidParameter { name: "n_pvrows", .. })));
    }

    #[test]
    fn test_discretization() {
        let array = build(discr_params());
        let pvrows = array.pvrows();
        assert_eq!(pvrows[0].front().segments().len(), 5);
        assert_eq!(pvrows[0].back().segments().len(), 1);
        assert_eq!(pvrows[1].back().segments().len(), 3);
        assert_eq!(array.n_surfaces(), 1 + 6 + 4 + 2);
    }

    #[test]
    fn test_ground_shadow_casting() {
        let mut array = build(params());
        array.cast_shadows();
        let seg = &array.ground().segments()[0];
        assert_eq!(seg.n_shaded(), 3);
        assert_eq!(seg.n_illuminated(), 4);
        assert_relative_eq!(array.ground().shaded_length(), 6.385066634855475, epsilon = 1e-9);
        assert_eq!(array.illum_side(), Side::Front);
        assert!(!array.has_direct_shading());
        assert_lengths_conserved(&array);
    }

    #[rstest]
    #[case::right(90., 90., 60., Side::Front, [1. / 3., 1. / 3., 0.])]
    #[case::left(270., 270., 60., Side::Front, [0., 1. / 3., 1. / 3.])]
    #[case::back(90., 270., 120., Side::Back, [0., 1. / 3., 1. / 3.])]
    fn test_direct_shading(
        #[case] surface_azimuth: f64,
        #[case] solar_azimuth: f64,
        #[case] surface_tilt: f64,
        #[case] expected_side: Side,
        #[case] expected_shading: [f64; 3],
    ) {
        let mut array = build(ArrayParameters {
            surface_azimuth,
            solar_azimuth,
            surface_tilt,
            ..params_direct_shading()
        });
        array.cast_shadows();

        let seg = &array.ground().segments()[0];
        assert_eq!(seg.n_shaded(), 1);
        assert_eq!(seg.n_illuminated(), 2);
        assert_eq!(array.ground().length(), 200.);
        assert_eq!(array.illum_side(), expected_side);
        assert!(array.has_direct_shading());

        let lengths = array.pvrow_shaded_lengths();
        let (lit, dark) = match expected_side {
            Side::Front => (0, 1),
            Side::Back => (1, 0),
        };
        for (k, expected) in expected_shading.iter().enumerate() {
            assert_abs_diff_eq!(lengths[[k, lit]], *expected, epsilon = 1e-7);
            assert_abs_diff_eq!(lengths[[k, dark]], 0., epsilon = 1e-12);
        }
        assert_lengths_conserved(&array);
    }

    #[rstest]
    #[case(92.)]
    #[case(100.)]
    fn test_sun_below_horizon_casts_no_shadow(#[case] solar_zenith: f64) {
        let mut array = build(ArrayParameters {
            solar_zenith,
            ..params_direct_shading()
        });
        array.cast_shadows();
        assert_eq!(array.ground().shaded_length(), 0.);
        assert!(!array.has_direct_shading());
        assert!(array.pvrow_shaded_lengths().iter().all(|&length| length == 0.));
        assert_lengths_conserved(&array);
    }

    #[rstest]
    #[case::front(90., 90., 60., Side::Front)]
    #[case::back(90., 270., 120., Side::Back)]
    fn test_direct_shading_discretized(
        #[case] surface_azimuth: f64,
        #[case] solar_azimuth: f64,
        #[case] surface_tilt: f64,
        #[case] side: Side,
    ) {
        let mut parameters = ArrayParameters {
            surface_azimuth,
            solar_azimuth,
            surface_tilt,
            ..params_direct_shading()
        };
        let cut = match side {
            Side::Front => SideCut { front: 7, back: 1 },
            Side::Back => SideCut { front: 1, back: 7 },
        };
        parameters.cut.insert(1, cut);
        let mut array = build(parameters);
        array.cast_shadows();

        let face = array.pvrows()[1].side(side);
        assert_abs_diff_eq!(face.shaded_length(), 1. / 3., epsilon = 1e-7);
        let segments = face.segments();
        let segment_length = segments[0].length();
        let fully_shaded = &segments[6];
        let partially_shaded = &segments[5];
        assert_eq!(fully_shaded.n_illuminated(), 0);
        assert_relative_eq!(fully_shaded.shaded_length(), segment_length, epsilon = 1e-9);
        assert!(partially_shaded.shaded_length() > 0.);
        assert!(partially_shaded.illuminated_length() > 0.);
        assert_relative_eq!(
            partially_shaded.shaded_length() + partially_shaded.illuminated_length(),
            segment_length,
            epsilon = 1e-9
        );
        assert!(segments[..5].iter().all(|seg| seg.n_shaded() == 0));
    }

    #[test]
    fn test_casting_is_idempotent() {
        let mut array = build(params_direct_shading());
        array.cast_shadows();
        let ground = array.ground().clone();
        let pvrows = array.pvrows().to_vec();
        array.cast_shadows();
        assert_eq!(array.ground(), &ground);
        assert_eq!(array.pvrows(), pvrows.as_slice());
    }

    #[test]
    fn test_cuts_for_pvrow_view() {
        let mut array = build(params());
        array.cast_shadows();
        let n_before = array.ground().n_surfaces();
        let length_before = array.ground().length();
        let shaded_before = array.ground().shaded_length();

        assert_eq!(array.cuts_for_pvrow_view(), 3);
        assert_eq!(array.ground().n_surfaces(), n_before + 3);
        assert_relative_eq!(array.ground().length(), length_before, epsilon = 1e-9);
        assert_relative_eq!(array.ground().shaded_length(), shaded_before, epsilon = 1e-9);
        assert_lengths_conserved(&array);

        let x_edge = 2.5 / 20f64.to_radians().tan();
        for (k, point) in array.edge_points().iter().enumerate() {
            assert_relative_eq!(point.x, 5. * k as f64 + x_edge, epsilon = 1e-9);
            assert_abs_diff_eq!(point.y, 0., epsilon = 1e-9);
        }

        // Cutting again finds the same break points
        assert_eq!(array.cuts_for_pvrow_view(), 0);
    }

    #[rstest]
    #[case::right(90., [Some(1), Some(2), None], [None, Some(0), Some(1)])]
    #[case::left(270., [None, Some(0), Some(1)], [Some(1), Some(2), None])]
    fn test_neighbors(
        #[case] surface_azimuth: f64,
        #[case] front: [Option<usize>; 3],
        #[case] back: [Option<usize>; 3],
    ) {
        let array = build(ArrayParameters {
            surface_azimuth,
            ..params()
        });
        assert_eq!(array.front_neighbors(), &front);
        assert_eq!(array.back_neighbors(), &back);
    }

    #[test]
    fn test_flat_array_has_no_neighbors_or_edge_points() {
        let array = build(ArrayParameters {
            surface_tilt: 0.,
            ..params()
        });
        assert!(array.is_flat());
        assert_eq!(array.front_neighbors(), &[None, None, None]);
        assert_eq!(array.back_neighbors(), &[None, None, None]);
        assert!(array.edge_points().is_empty());
    }

    #[rstest]
    #[case(20., 20.)]
    #[case(60., 60.)]
    fn test_azimuth_reversal_flips_normals(#[case] surface_tilt: f64, #[case] solar_zenith: f64) {
        let base = ArrayParameters {
            surface_tilt,
            solar_zenith,
            ..params_direct_shading()
        };
        let right = build(base.clone());
        let left = build(ArrayParameters {
            surface_azimuth: base.surface_azimuth + 180.,
            ..base
        });
        for (r, l) in right.pvrows().iter().zip(left.pvrows()) {
            assert_relative_eq!(r.front().n_vector().dx, -l.front().n_vector().dx, epsilon = 1e-12);
            assert_relative_eq!(r.front().n_vector().dy, l.front().n_vector().dy, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_surface_indices() {
        let mut array = build(params());
        array.cast_shadows();
        array.cuts_for_pvrow_view();
        let n = array.n_surfaces();
        assert_eq!(array.all_surfaces().count(), n);
        assert_eq!(array.surface_indices(), vec![None; n]);

        assert_eq!(array.index_all_surfaces(), n);
        let expected: Vec<Option<usize>> = (0..n).map(Some).collect();
        assert_eq!(array.surface_indices(), expected);
        assert!(array.is_indexed());

        // Ground comes first, illuminated before shaded
        let registry = array.surface_registry();
        assert_eq!(registry.nrows(), n);
        assert_eq!(registry.ncols(), crate::registry::REGISTRY_COLUMNS.len());
        assert_eq!(registry[[0, 1]], 1.);
        assert_eq!(registry[[0, 5]], 0.);
        let n_ground = array.ground().n_surfaces();
        assert_eq!(registry[[n_ground - 1, 5]], 1.);
        assert_eq!(registry[[n_ground, 1]], 0.);
        assert_eq!(registry[[n_ground, 3]], 0.);
    }

    #[test]
    fn test_view_matrices_require_fresh_index() {
        let mut array = build(params());
        assert_eq!(array.build_view_matrices().unwrap_err(), GeometryError::NotIndexed);

        array.cast_shadows();
        array.index_all_surfaces();
        assert!(array.build_view_matrices().is_ok());

        array.cuts_for_pvrow_view();
        assert_eq!(
            array.build_view_matrices().unwrap_err(),
            GeometryError::StaleIndex { indexed: 1, current: 2 }
        );
        assert!(!array.is_indexed());
    }

    #[test]
    fn test_update_params() {
        let mut array = OrderedPVArray::from_parameters(params(), &["qinc"], GeometryConfig::default()).unwrap();
        array.cast_shadows();
        array.cuts_for_pvrow_view();
        assert!(array.ground().param_weighted("qinc").is_err());

        let values = BTreeMap::from([("qinc".to_string(), 1.)]);
        array.update_params(&values).unwrap();
        assert!(array.all_surfaces().all(|surf| surf.get_param("qinc") == Ok(1.)));
        assert_relative_eq!(array.ground().param_weighted("qinc").unwrap(), 1., epsilon = 1e-12);
        assert_relative_eq!(
            array.ground().param_length_weighted_sum("qinc").unwrap(),
            array.ground().length(),
            epsilon = 1e-9
        );
        for pvrow in array.pvrows() {
            for side in [Side::Front, Side::Back] {
                let face = pvrow.side(side);
                assert_relative_eq!(face.param_weighted("qinc").unwrap(), 1., epsilon = 1e-12);
                assert_relative_eq!(face.param_length_weighted_sum("qinc").unwrap(), face.length(), epsilon = 1e-9);
            }
        }

        // Values survive another casting pass
        array.cast_shadows();
        assert!(array.all_surfaces().all(|surf| surf.get_param("qinc") == Ok(1.)));

        let unknown = BTreeMap::from([("albedo".to_string(), 1.)]);
        assert_eq!(
            array.update_params(&unknown),
            Err(GeometryError::UnknownParameter("albedo".into()))
        );

        // A bad name anywhere in the map leaves every surface untouched
        let mixed = BTreeMap::from([("qinc".to_string(), 2.), ("zzz".to_string(), 3.)]);
        assert_eq!(
            array.update_params(&mixed),
            Err(GeometryError::UnknownParameter("zzz".into()))
        );
        assert!(array.all_surfaces().all(|surf| surf.get_param("qinc") == Ok(1.)));
    }

    #[test]
    fn test_view_matrix_symmetry() {
        let mut array = build(ArrayParameters {
            surface_azimuth: 270.,
            ..params()
        });
        array.cast_shadows();
        array.cuts_for_pvrow_view();
        array.index_all_surfaces();
        let vm = array.build_view_matrices().unwrap();
        let n = array.n_surfaces();
        assert_eq!(vm.view.dim(), (n + 1, n + 1));

        let mask = vm.mask();
        for i in 0..n {
            assert_eq!(mask[[i, i]], 0);
            for j in 0..n {
                assert_eq!(mask[[i, j]], mask[[j, i]]);
                assert_eq!(vm.obstruction[[i, j]], vm.obstruction[[j, i]]);
            }
        }
        // Ground surfaces never see each other
        let n_ground = array.ground().n_surfaces();
        for i in 0..n_ground {
            for j in 0..n_ground {
                assert_eq!(vm.view[[i, j]], 0);
            }
            assert_eq!(vm.kind(i, n), Some(ViewKind::ToSky));
        }
        // Both faces of one row never see each other
        let records = array.surface_records();
        for i in n_ground..n {
            for j in n_ground..n {
                if records[i].owner.pvrow() == records[j].owner.pvrow() {
                    assert_eq!(vm.view[[i, j]], 0);
                }
            }
        }
    }

    #[test]
    fn test_view_matrix_flat() {
        let mut array = build(ArrayParameters {
            surface_tilt: 0.,
            cut: BTreeMap::new(),
            ..params()
        });
        array.cast_shadows();
        assert_eq!(array.cuts_for_pvrow_view(), 0);
        let n = array.index_all_surfaces();
        assert_eq!(n, 7 + 6);

        let vm = array.build_view_matrices().unwrap();
        assert_eq!(vm.view.dim(), (n + 1, n + 1));

        let mut records = array.surface_records();
        records.sort_by_key(|record| record.index);
        for i in 0..n {
            // Every surface sees the sky, the sky sees nothing
            assert_eq!(vm.kind(i, n), Some(ViewKind::ToSky));
            assert_eq!(vm.view[[n, i]], 0);
            for j in 0..n {
                // Rows share one line, fronts face the sky only
                let expected = match (records[i].owner.side(), records[j].owner.side()) {
                    (Some(Side::Back), None) => ViewKind::BackGround,
                    (None, Some(Side::Back)) => ViewKind::GroundBack,
                    _ => ViewKind::None,
                };
                assert_eq!(vm.kind(i, j), Some(expected), "pair ({i}, {j})");
                assert_eq!(vm.obstruction[[i, j]], None);
            }
        }
    }

    #[test]
    fn test_almost_flat_array() {
        let mut array = build(ArrayParameters {
            surface_tilt: 0.01,
            solar_zenith: 89.9,
            cut: BTreeMap::new(),
            rho_ground: None,
            rho_front_pvrow: None,
            rho_back_pvrow: None,
            ..params()
        });
        array.cast_shadows();
        array.cuts_for_pvrow_view();

        assert_eq!(array.ground().segments()[0].n_shaded(), 0);
        assert_eq!(array.edge_points().len(), 3);
        let tol = array.config().distance_tolerance;
        for point in array.edge_points() {
            assert!(!array.ground().contains(point, tol));
        }

        array.index_all_surfaces();
        let vm = array.build_view_matrices().unwrap();
        let expected = array![
            [0, 0, 1, 0, 1, 0, 1, 1],
            [0, 0, 0, 0, 1, 0, 0, 1],
            [1, 0, 0, 0, 0, 0, 0, 1],
            [0, 0, 0, 0, 0, 0, 1, 1],
            [1, 1, 0, 0, 0, 0, 0, 1],
            [0, 0, 0, 0, 0, 0, 0, 1],
            [1, 0, 0, 1, 0, 0, 0, 1],
            [0, 0, 0, 0, 0, 0, 0, 0u8],
        ];
        assert_eq!(vm.mask(), expected);
        // Front faces do not see the ground
        for k in 0..3 {
            assert_eq!(vm.view[[1 + 2 * k, 0]], 0);
        }
    }
}
