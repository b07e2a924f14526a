/// Local horizontal direction, degrees. Azimuth is measured from north
/// through east.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Horizontal {
    pub(crate) azimuth: f64,
    pub(crate) altitude: f64,
}

impl Horizontal {
    pub(crate) fn new(azimuth: f64, altitude: f64) -> Self {
        Self { azimuth, altitude }
    }

    /// Unit vector in the (east, north, up) frame.
    pub(crate) fn unit_vector(self) -> [f64; 3] {
        let (sa, ca) = self.azimuth.to_radians().sin_cos();
        let (se, ce) = self.altitude.to_radians().sin_cos();
        [ce * sa, ce * ca, se]
    }

    pub(crate) fn from_enu(v: [f64; 3]) -> Self {
        let horiz = (v[0] * v[0] + v[1] * v[1]).sqrt();
        Self {
            azimuth: normalize_azimuth(v[0].atan2(v[1]).to_degrees()),
            altitude: v[2].atan2(horiz).to_degrees(),
        }
    }
}

/// Wraps any finite azimuth into `[0, 360)`.
pub(crate) fn normalize_azimuth(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let r = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

pub(crate) fn clamp_altitude(deg: f64) -> f64 {
    deg.clamp(-90.0, 90.0)
}

/// Stereographic camera-plane coordinates, degrees. `y` grows upward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CameraPlane {
    pub(crate) x: f64,
    pub(crate) y: f64,
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Projects `target` onto the plane tangent to the sky at `center`.
///
/// The right axis is taken from the camera azimuth alone so the basis stays
/// well defined when looking straight up or down. The antipode of the centre
/// is the singular point; it comes back non-finite and is culled downstream.
pub(crate) fn stereographic(center: Horizontal, target: Horizontal) -> CameraPlane {
    let f = center.unit_vector();
    let (sa, ca) = center.azimuth.to_radians().sin_cos();
    let right = [ca, -sa, 0.0];
    let up = cross(right, f);

    let v = target.unit_vector();
    let denom = 1.0 + dot(v, f);
    if denom <= 1e-12 {
        return CameraPlane {
            x: f64::NAN,
            y: f64::NAN,
        };
    }
    let k = 2.0 / denom;
    CameraPlane {
        x: (k * dot(v, right)).to_degrees(),
        y: (k * dot(v, up)).to_degrees(),
    }
}

/// Position on the character grid, fractional until rasterised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScreenPoint {
    pub(crate) row: f64,
    pub(crate) col: f64,
}

impl ScreenPoint {
    /// `(row, col)` of the cell containing this point.
    pub(crate) fn cell(self) -> (i32, i32) {
        (self.row.floor() as i32, self.col.floor() as i32)
    }

    /// Squared distance to another point in cell units.
    pub(crate) fn dist_sq(self, other: ScreenPoint) -> f64 {
        let dr = self.row - other.row;
        let dc = self.col - other.col;
        dr * dr + dc * dc
    }
}

/// Points farther than twice the half-FOV are dropped; the boundary itself
/// is kept.
pub(crate) fn is_culled(p: CameraPlane, fov: f64) -> bool {
    if !p.x.is_finite() || !p.y.is_finite() {
        return true;
    }
    p.x * p.x + p.y * p.y > fov * fov
}

/// Scales camera-plane coordinates to a screen of `rows` x `cols` cells.
/// Returns `None` for culled or degenerate points.
pub(crate) fn to_screen(p: CameraPlane, fov: f64, rows: i32, cols: i32) -> Option<ScreenPoint> {
    if is_culled(p, fov) {
        return None;
    }
    let half = fov / 2.0;
    let col = (p.x / half + 1.0) * (cols as f64 / 2.0);
    let row = (-p.y / half + 1.0) * (rows as f64 / 2.0);
    if !col.is_finite() || !row.is_finite() {
        return None;
    }
    Some(ScreenPoint { row, col })
}

/// Centre of a screen of the given size.
pub(crate) fn screen_center(rows: i32, cols: i32) -> ScreenPoint {
    ScreenPoint {
        row: rows as f64 / 2.0,
        col: cols as f64 / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn normalize_is_in_range_and_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut samples: Vec<f64> = (0..2000).map(|_| rng.gen_range(-5000.0..5000.0)).collect();
        samples.extend([0.0, 360.0, -360.0, 720.0, -0.0, -1e-18, 359.999_999, 1e12, -1e12]);
        for a in samples {
            let n = normalize_azimuth(a);
            assert!((0.0..360.0).contains(&n), "{a} -> {n}");
            assert_eq!(normalize_azimuth(n), n);
        }
    }

    #[test]
    fn non_finite_azimuth_collapses_to_zero() {
        assert_eq!(normalize_azimuth(f64::NAN), 0.0);
        assert_eq!(normalize_azimuth(f64::INFINITY), 0.0);
    }

    #[test]
    fn center_direction_maps_to_origin_for_any_camera() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let c = Horizontal::new(rng.gen_range(0.0..360.0), rng.gen_range(-90.0..=90.0));
            let p = stereographic(c, c);
            assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn small_offsets_read_as_degrees() {
        let c = Horizontal::new(180.0, 0.0);
        let westward = stereographic(c, Horizontal::new(181.0, 0.0));
        // facing south, larger azimuth is toward the west, which is on the right
        assert_relative_eq!(westward.x, 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(westward.y, 0.0, epsilon = 1e-9);

        let above = stereographic(c, Horizontal::new(180.0, 1.0));
        assert_abs_diff_eq!(above.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(above.y, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn zenith_camera_is_well_defined() {
        let c = Horizontal::new(90.0, 90.0);
        let p = stereographic(c, Horizontal::new(0.0, 89.0));
        assert!(p.x.is_finite() && p.y.is_finite());
        assert_relative_eq!((p.x * p.x + p.y * p.y).sqrt(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn antipode_is_culled() {
        let c = Horizontal::new(10.0, 20.0);
        let anti = Horizontal::new(190.0, -20.0);
        let p = stereographic(c, anti);
        assert!(is_culled(p, 120.0));
        assert!(to_screen(p, 120.0, 24, 80).is_none());
    }

    #[test]
    fn center_lands_on_screen_center_for_every_fov() {
        for fov in [0.001, 0.01, 0.5, 5.0, 10.0, 60.0, 120.0] {
            let p = to_screen(CameraPlane { x: 0.0, y: 0.0 }, fov, 24, 80).unwrap();
            assert_abs_diff_eq!(p.col, 40.0, epsilon = 0.5);
            assert_abs_diff_eq!(p.row, 12.0, epsilon = 0.5);
            assert_eq!(p.cell(), (12, 40));
        }
    }

    #[test]
    fn half_fov_reaches_the_screen_edge() {
        let p = to_screen(CameraPlane { x: 5.0, y: 5.0 }, 10.0, 24, 80).unwrap();
        assert_relative_eq!(p.col, 80.0);
        assert_relative_eq!(p.row, 0.0);
    }

    #[test]
    fn cull_boundary_is_drawn_every_time() {
        let fov = 10.0;
        let on_edge = CameraPlane { x: 6.0, y: 8.0 };
        assert_eq!(on_edge.x * on_edge.x + on_edge.y * on_edge.y, fov * fov);
        for _ in 0..100 {
            assert!(!is_culled(on_edge, fov));
            assert!(to_screen(on_edge, fov, 24, 80).is_some());
        }
        let beyond = CameraPlane { x: 6.0, y: 8.000_001 };
        assert!(is_culled(beyond, fov));
    }

    #[test]
    fn non_finite_points_are_culled() {
        assert!(is_culled(CameraPlane { x: f64::NAN, y: 0.0 }, 10.0));
        assert!(is_culled(CameraPlane { x: 0.0, y: f64::INFINITY }, 10.0));
    }

    #[test]
    fn enu_round_trip_keeps_direction() {
        let h = Horizontal::new(231.5, -12.25);
        let back = Horizontal::from_enu(h.unit_vector());
        assert_relative_eq!(back.azimuth, h.azimuth, epsilon = 1e-9);
        assert_relative_eq!(back.altitude, h.altitude, epsilon = 1e-9);
    }
}
