//! Local 2D flattenings of a spherical patch.
//!
//! These projections only stabilize 2D triangulation. Final vertex positions
//! are always re-derived from the original geographic coordinates.

use serde::{Deserialize, Serialize};

use super::{Vec2, Vec3, unit_vector};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Triangulate raw (lon, lat) directly.
    Legacy,
    /// Orthographic projection onto the tangent plane at the patch centroid.
    Tangent,
    /// Lambert azimuthal equal-area about the patch centroid.
    Lambert,
}

impl ProjectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionMode::Legacy => "legacy",
            ProjectionMode::Tangent => "tangent",
            ProjectionMode::Lambert => "lambert",
        }
    }
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orthonormal east/north/up basis anchored at a spherical centroid.
///
/// `east x north == up`, so counter-clockwise order seen from outside the
/// sphere stays counter-clockwise in the projected plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LocalFrame {
    pub up: Vec3,
    pub east: Vec3,
    pub north: Vec3,
    pub lat0_rad: f64,
    pub lon0_rad: f64,
}

impl LocalFrame {
    /// Frame at the spherical centroid (mean of unit vectors, renormalized)
    /// of `(lat_deg, lon_deg)` samples.
    ///
    /// Returns `None` for an empty sample set. Perfectly cancelling samples
    /// fall back to the first sample's direction.
    pub fn from_lat_lon<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut sum = Vec3::ZERO;
        let mut first: Option<Vec3> = None;
        for (lat, lon) in points {
            let u = unit_vector(lat, lon);
            first.get_or_insert(u);
            sum = sum + u;
        }
        let first = first?;
        let up = sum.normalized().unwrap_or(first);
        Some(Self::at(up))
    }

    pub fn at(up: Vec3) -> Self {
        // World up is +Y; switch reference near the poles.
        let reference = if up.y.abs() < 0.99 {
            Vec3::new(0.0, 1.0, 0.0)
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        let east = reference
            .cross(up)
            .normalized()
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let north = up.cross(east);

        let lat0_rad = up.y.clamp(-1.0, 1.0).asin();
        let lon0_rad = up.x.atan2(up.z);

        Self {
            up,
            east,
            north,
            lat0_rad,
            lon0_rad,
        }
    }

    pub fn project(&self, mode: ProjectionMode, lat_deg: f64, lon_deg: f64) -> Vec2 {
        match mode {
            ProjectionMode::Legacy => Vec2::new(lon_deg, lat_deg),
            ProjectionMode::Tangent => self.project_tangent(lat_deg, lon_deg),
            ProjectionMode::Lambert => self.project_lambert(lat_deg, lon_deg),
        }
    }

    pub fn project_tangent(&self, lat_deg: f64, lon_deg: f64) -> Vec2 {
        let v = unit_vector(lat_deg, lon_deg);
        Vec2::new(v.dot(self.east), v.dot(self.north))
    }

    pub fn project_lambert(&self, lat_deg: f64, lon_deg: f64) -> Vec2 {
        let lat = lat_deg.to_radians();
        let dlon = lon_deg.to_radians() - self.lon0_rad;
        let (sin_lat0, cos_lat0) = self.lat0_rad.sin_cos();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let cos_dlon = dlon.cos();

        // The antipode is singular; clamp it onto the projection's outer circle.
        let denom = (1.0 + sin_lat0 * sin_lat + cos_lat0 * cos_lat * cos_dlon).max(1e-12);
        let k = (2.0 / denom).sqrt();
        Vec2::new(
            k * cos_lat * dlon.sin(),
            k * (cos_lat0 * sin_lat - sin_lat0 * cos_lat * cos_dlon),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalFrame, ProjectionMode};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn signed_area(pts: &[(f64, f64)], frame: &LocalFrame, mode: ProjectionMode) -> f64 {
        let p: Vec<_> = pts
            .iter()
            .map(|&(lon, lat)| frame.project(mode, lat, lon))
            .collect();
        let mut a = 0.0;
        for i in 0..p.len() {
            let j = (i + 1) % p.len();
            a += p[i].cross(p[j]);
        }
        a * 0.5
    }

    #[test]
    fn centroid_of_symmetric_patch_is_its_center() {
        let frame =
            LocalFrame::from_lat_lon([(10.0, 20.0), (-10.0, 20.0), (0.0, 30.0), (0.0, 10.0)])
                .expect("frame");
        assert_close(frame.lat0_rad.to_degrees(), 0.0, 1e-9);
        assert_close(frame.lon0_rad.to_degrees(), 20.0, 1e-9);
    }

    #[test]
    fn centroid_projects_to_origin() {
        let frame = LocalFrame::from_lat_lon([(45.0, -100.0)]).expect("frame");
        for mode in [ProjectionMode::Tangent, ProjectionMode::Lambert] {
            let p = frame.project(mode, 45.0, -100.0);
            assert_close(p.x, 0.0, 1e-9);
            assert_close(p.y, 0.0, 1e-9);
        }
    }

    #[test]
    fn east_is_positive_x_and_north_is_positive_y() {
        let frame = LocalFrame::from_lat_lon([(0.0, 0.0)]).expect("frame");
        for mode in [ProjectionMode::Tangent, ProjectionMode::Lambert] {
            assert!(frame.project(mode, 0.0, 5.0).x > 0.0);
            assert!(frame.project(mode, 5.0, 0.0).y > 0.0);
        }
    }

    #[test]
    fn projections_preserve_counter_clockwise_winding() {
        // CCW in (lon, lat), around the south pole and at mid latitude.
        let square = [(-10.0, -10.0), (10.0, -10.0), (10.0, 10.0), (-10.0, 10.0)];
        let frame = LocalFrame::from_lat_lon(square.iter().map(|&(lon, lat)| (lat, lon)))
            .expect("frame");
        for mode in [
            ProjectionMode::Legacy,
            ProjectionMode::Tangent,
            ProjectionMode::Lambert,
        ] {
            assert!(signed_area(&square, &frame, mode) > 0.0, "{mode}");
        }

        let cap = [(0.0, -70.0), (90.0, -70.0), (180.0, -70.0), (-90.0, -70.0)];
        let polar = LocalFrame::from_lat_lon(cap.iter().map(|&(lon, lat)| (lat, lon)))
            .expect("frame");
        // Walking eastward around the south pole is clockwise seen from outside.
        assert!(signed_area(&cap, &polar, ProjectionMode::Lambert) < 0.0);
    }

    #[test]
    fn lambert_antipode_stays_finite() {
        let frame = LocalFrame::from_lat_lon([(0.0, 0.0)]).expect("frame");
        let p = frame.project_lambert(0.0, 180.0);
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
