//! Attribution of hole parts to the outer parts of a split polygon.

use foundation::bounds::Aabb2;
use formats::{GeoPoint, Ring, open_slice};

/// Padding (degrees) applied to candidate part bounds before the containment test.
pub const HOLE_BBOX_PAD_DEG: f64 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HoleAssignment {
    pub part_index: usize,
    /// No part contained the hole; `part_index` is 0.
    pub fallback: bool,
}

/// Picks the outer part a hole belongs to.
///
/// The hole's first vertex is tested against each part in order, shifted by
/// whichever of 0, +360 and -360 brings it closest to the part's bounds center.
/// The first containing part wins.
pub fn assign_hole(hole: &[GeoPoint], outer_parts: &[Ring]) -> HoleAssignment {
    let fallback = HoleAssignment {
        part_index: 0,
        fallback: true,
    };
    let Some(probe) = hole.first() else {
        return fallback;
    };

    for (part_index, part) in outer_parts.iter().enumerate() {
        let Some(bounds) = Aabb2::from_points(part.iter().map(|p| p.as_array())) else {
            continue;
        };
        let center_lon = bounds.center()[0];
        let lon = [0.0, 360.0, -360.0]
            .into_iter()
            .map(|shift| probe.lon_deg + shift)
            .fold(probe.lon_deg, |best, lon| {
                if (lon - center_lon).abs() < (best - center_lon).abs() {
                    lon
                } else {
                    best
                }
            });
        let point = [lon, probe.lat_deg];
        if !bounds.padded(HOLE_BBOX_PAD_DEG).contains(point) {
            continue;
        }
        if point_in_ring(point, part) {
            return HoleAssignment {
                part_index,
                fallback: false,
            };
        }
    }
    fallback
}

/// Even-odd ray casting test in (lon, lat).
pub fn point_in_ring(p: [f64; 2], ring: &[GeoPoint]) -> bool {
    let pts = open_slice(ring);
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let (x, y) = (p[0], p[1]);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (pts[i].lon_deg, pts[i].lat_deg);
        let (xj, yj) = (pts[j].lon_deg, pts[j].lat_deg);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{HoleAssignment, assign_hole, point_in_ring};
    use formats::{GeoPoint, Ring};

    fn ring(coords: &[[f64; 2]]) -> Ring {
        coords.iter().map(|c| GeoPoint::new(c[0], c[1])).collect()
    }

    fn parts() -> Vec<Ring> {
        vec![
            ring(&[[180.0, 10.0], [170.0, 10.0], [170.0, 0.0], [180.0, 0.0], [180.0, 10.0]]),
            ring(&[[-180.0, 0.0], [-170.0, 0.0], [-170.0, 10.0], [-180.0, 10.0], [-180.0, 0.0]]),
        ]
    }

    #[test]
    fn ray_cast_inside_and_outside() {
        let square = ring(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]);
        assert!(point_in_ring([2.0, 2.0], &square));
        assert!(!point_in_ring([5.0, 2.0], &square));
        assert!(!point_in_ring([2.0, 2.0], &square[..2]));
    }

    #[test]
    fn hole_goes_to_containing_part() {
        let west = ring(&[[-176.0, 4.0], [-174.0, 4.0], [-174.0, 6.0], [-176.0, 6.0]]);
        assert_eq!(
            assign_hole(&west, &parts()),
            HoleAssignment {
                part_index: 1,
                fallback: false,
            }
        );
        let east = ring(&[[174.0, 4.0], [176.0, 4.0], [176.0, 6.0]]);
        assert_eq!(assign_hole(&east, &parts()).part_index, 0);
    }

    #[test]
    fn shifted_longitude_is_matched() {
        // Same hole expressed past the seam (185 == -175).
        let hole = ring(&[[185.0, 4.0], [186.0, 4.0], [186.0, 6.0]]);
        assert_eq!(assign_hole(&hole, &parts()).part_index, 1);
    }

    #[test]
    fn orphan_hole_falls_back_to_first_part() {
        let hole = ring(&[[0.0, 50.0], [1.0, 50.0], [1.0, 51.0]]);
        assert_eq!(
            assign_hole(&hole, &parts()),
            HoleAssignment {
                part_index: 0,
                fallback: true,
            }
        );
    }
}
