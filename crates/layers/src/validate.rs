use foundation::math::unit_vector;
use formats::{GeoPoint, RING_CLOSURE_EPS_DEG, Ring, closed, open_slice};
use serde::Serialize;

/// Spherical triangle area (square degrees) below which a vertex is collinear.
pub const DEFAULT_COLLINEAR_EPSILON: f64 = 1e-10;

const DEG2_PER_STERADIAN: f64 = (180.0 / std::f64::consts::PI) * (180.0 / std::f64::consts::PI);

/// What [`validate_ring`] changed or found. Diagnostic only.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RingValidationReport {
    pub removed_duplicates: usize,
    pub removed_collinear: usize,
    pub self_intersections: usize,
}

impl RingValidationReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Cleans a ring before triangulation.
///
/// Consecutive duplicates and collinear vertices are dropped (never below
/// three vertices); self-intersections are counted but left in place.
/// Collinear means on one great circle, so vertices along a parallel survive.
/// Returns the closed, cleaned ring.
pub fn validate_ring(ring: &[GeoPoint], collinear_epsilon: f64) -> (Ring, RingValidationReport) {
    let mut report = RingValidationReport::default();

    let mut points: Vec<GeoPoint> = Vec::with_capacity(ring.len());
    for &p in open_slice(ring) {
        match points.last() {
            Some(last) if last.coincides(p, RING_CLOSURE_EPS_DEG) => report.removed_duplicates += 1,
            _ => points.push(p),
        }
    }
    while points.len() > 1 && points[0].coincides(points[points.len() - 1], RING_CLOSURE_EPS_DEG) {
        points.pop();
        report.removed_duplicates += 1;
    }

    report.removed_collinear = drop_collinear(&mut points, collinear_epsilon);
    report.self_intersections = count_self_intersections(&points);

    (closed(&points), report)
}

fn drop_collinear(points: &mut Vec<GeoPoint>, epsilon: f64) -> usize {
    let mut removed = 0;
    let mut i = 0;
    let mut unchanged = 0;
    while points.len() > 3 && unchanged < points.len() {
        let n = points.len();
        let prev = points[(i + n - 1) % n];
        let cur = points[i % n];
        let next = points[(i + 1) % n];
        if sphere_triangle_area(prev, cur, next) < epsilon {
            points.remove(i % n);
            removed += 1;
            unchanged = 0;
            i %= points.len();
        } else {
            i = (i + 1) % n;
            unchanged += 1;
        }
    }
    removed
}

/// Number of properly crossing segment pairs in an open ring.
///
/// Adjacent segments (sharing a vertex) are not compared.
pub fn count_self_intersections(points: &[GeoPoint]) -> usize {
    let n = points.len();
    if n < 4 {
        return 0;
    }

    let mut count = 0;
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (points[j], points[(j + 1) % n]);
            if segments_cross(a, b, c, d) {
                count += 1;
            }
        }
    }
    count
}

/// Area in square degrees of the small spherical triangle `abc`.
///
/// Half the triple product of the unit vectors; zero exactly when the three
/// vertices share a great circle.
fn sphere_triangle_area(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
    let (ua, ub, uc) = (
        unit_vector(a.lat_deg, a.lon_deg),
        unit_vector(b.lat_deg, b.lon_deg),
        unit_vector(c.lat_deg, c.lon_deg),
    );
    0.5 * ua.dot(ub.cross(uc)).abs() * DEG2_PER_STERADIAN
}

fn signed_area(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
    0.5 * ((b.lon_deg - a.lon_deg) * (c.lat_deg - a.lat_deg)
        - (b.lat_deg - a.lat_deg) * (c.lon_deg - a.lon_deg))
}

fn segments_cross(a: GeoPoint, b: GeoPoint, c: GeoPoint, d: GeoPoint) -> bool {
    let d1 = signed_area(a, b, c);
    let d2 = signed_area(a, b, d);
    let d3 = signed_area(c, d, a);
    let d4 = signed_area(c, d, b);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}
