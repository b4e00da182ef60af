//! Antimeridian and pole handling for polygon rings.
//!
//! Rings arrive in raw (lon, lat) and leave as compact parts: every non-polar
//! part spans at most 180° of longitude, so triangulating it in a flat plane
//! never wraps around the globe.

use foundation::math::{stable_median, wrap_lon_deg};
use formats::{GeoPoint, RING_CLOSURE_EPS_DEG, Ring, closed, open_slice};
use serde::Serialize;
use tracing::trace;

/// Minimum wrapped longitude span for a ring to be considered polar.
pub const POLAR_SPAN_DEG: f64 = 300.0;
/// Latitude beyond which a vertex counts as polar.
pub const POLAR_LAT_DEG: f64 = 60.0;

const MAX_MERIDIAN_SPLIT_DEPTH: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RingClass {
    Plain,
    Split,
    Polar,
}

/// Derived result of [`normalize_ring`]. Every part is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRing {
    pub classification: RingClass,
    pub parts: Vec<Ring>,
    /// Longitude span of the input after wrapping into [-180, 180].
    pub span_deg: f64,
}

impl NormalizedRing {
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

/// Longitude extent of `ring` after wrapping each longitude into [-180, 180].
pub fn longitude_span(ring: &[GeoPoint]) -> f64 {
    let (min, max) = lon_range(ring.iter().map(|p| wrap_lon_deg(p.lon_deg)));
    if min > max { 0.0 } else { max - min }
}

/// Longitude extent of `ring` as stored, without wrapping.
pub fn raw_span(ring: &[GeoPoint]) -> f64 {
    let (min, max) = lon_range(ring.iter().map(|p| p.lon_deg));
    if min > max { 0.0 } else { max - min }
}

pub fn normalize_ring(ring: &[GeoPoint]) -> NormalizedRing {
    let open = open_slice(ring);
    let span_deg = longitude_span(open);
    if open.is_empty() {
        return NormalizedRing {
            classification: RingClass::Plain,
            parts: Vec::new(),
            span_deg,
        };
    }

    let polar_vertices = open
        .iter()
        .filter(|p| p.lat_deg.abs() > POLAR_LAT_DEG)
        .count();
    if span_deg >= POLAR_SPAN_DEG && polar_vertices * 2 > open.len() {
        return NormalizedRing {
            classification: RingClass::Polar,
            parts: vec![closed(open)],
            span_deg,
        };
    }

    if span_deg <= 180.0 {
        return NormalizedRing {
            classification: RingClass::Plain,
            parts: vec![closed(open)],
            span_deg,
        };
    }

    let wrapped: Vec<GeoPoint> = open
        .iter()
        .map(|p| GeoPoint::new(wrap_lon_deg(p.lon_deg), p.lat_deg))
        .collect();

    let mut parts: Vec<Ring> = Vec::new();
    for fragment in split_at_seam(&wrapped) {
        split_wide(compact_around_median(&fragment), 0, &mut parts);
    }

    let parts: Vec<Ring> = parts
        .into_iter()
        .filter(|part| {
            let distinct = distinct_points(part);
            let keep = distinct >= 3;
            if !keep {
                trace!(points = part.len(), distinct, "dropping degenerate seam fragment");
            }
            keep
        })
        .map(|part| closed(&part))
        .collect();

    NormalizedRing {
        classification: RingClass::Split,
        parts,
        span_deg,
    }
}

/// Splits an open ring with wrapped longitudes wherever an edge jumps more
/// than 180°, inserting interpolated seam points on both sides.
///
/// Output fragments are open.
fn split_at_seam(points: &[GeoPoint]) -> Vec<Vec<GeoPoint>> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let mut fragments: Vec<Vec<GeoPoint>> = vec![vec![points[0]]];
    let mut crossings = 0usize;
    let mut closing_crossed = false;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        if let Some((near, far)) = seam_crossing(a, b) {
            crossings += 1;
            closing_crossed = i + 1 == n;
            if let Some(current) = fragments.last_mut() {
                current.push(near);
            }
            fragments.push(vec![far]);
        }
        if i + 1 < n {
            if let Some(current) = fragments.last_mut() {
                current.push(b);
            }
        }
    }

    if crossings == 0 {
        return fragments;
    }

    // The walk started mid-fragment: the trailing piece continues into the leading one.
    let Some(mut tail) = fragments.pop() else {
        return fragments;
    };
    if crossings % 2 == 0 || tail.len() < 2 {
        tail.append(&mut fragments[0]);
        fragments[0] = tail;
    } else {
        // An odd count encircles a pole; keep both ends as separate parts.
        if !closing_crossed {
            tail.push(points[0]);
        }
        fragments.push(tail);
    }
    fragments
}

/// Seam points `(near, far)` for an edge crossing ±180°, latitude interpolated linearly.
fn seam_crossing(a: GeoPoint, b: GeoPoint) -> Option<(GeoPoint, GeoPoint)> {
    let delta = b.lon_deg - a.lon_deg;
    let (seam, b_lon) = if delta < -180.0 {
        (180.0, b.lon_deg + 360.0)
    } else if delta > 180.0 {
        (-180.0, b.lon_deg - 360.0)
    } else {
        return None;
    };
    let t = (seam - a.lon_deg) / (b_lon - a.lon_deg);
    let lat = a.lat_deg + t * (b.lat_deg - a.lat_deg);
    Some((GeoPoint::new(seam, lat), GeoPoint::new(-seam, lat)))
}

/// Shifts each vertex by a multiple of 360° to lie within 180° of the median longitude.
fn compact_around_median(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let lons: Vec<f64> = points.iter().map(|p| p.lon_deg).collect();
    let Some(median) = stable_median(&lons) else {
        return Vec::new();
    };
    points
        .iter()
        .map(|p| {
            let mut lon = p.lon_deg;
            while lon - median > 180.0 {
                lon -= 360.0;
            }
            while lon - median < -180.0 {
                lon += 360.0;
            }
            GeoPoint::new(lon, p.lat_deg)
        })
        .collect()
}

/// Splits a compact part wider than 180° at its central meridian, recursively.
fn split_wide(part: Vec<GeoPoint>, depth: usize, out: &mut Vec<Vec<GeoPoint>>) {
    let span = raw_span(&part);
    if span <= 180.0 || part.len() < 3 || depth >= MAX_MERIDIAN_SPLIT_DEPTH {
        out.push(part);
        return;
    }

    let (min, max) = lon_range(part.iter().map(|p| p.lon_deg));
    let center = (min + max) * 0.5;
    trace!(span, center, depth, "splitting wide part at central meridian");

    // Rotate so the central meridian becomes the seam.
    let rotated: Vec<GeoPoint> = part
        .iter()
        .map(|p| GeoPoint::new(wrap_lon_deg(p.lon_deg - center + 180.0), p.lat_deg))
        .collect();
    let fragments = split_at_seam(&rotated);
    if fragments.len() < 2 {
        out.push(part);
        return;
    }

    for fragment in fragments {
        let restored: Vec<GeoPoint> = fragment
            .into_iter()
            .map(|p| GeoPoint::new(wrap_lon_deg(p.lon_deg + center - 180.0), p.lat_deg))
            .collect();
        split_wide(compact_around_median(&restored), depth + 1, out);
    }
}

/// Vertices of an open or closed ring that differ from their cyclic predecessor.
fn distinct_points(points: &[GeoPoint]) -> usize {
    let open = open_slice(points);
    let n = open.len();
    if n < 2 {
        return n;
    }
    (0..n)
        .filter(|&i| !open[i].coincides(open[(i + n - 1) % n], RING_CLOSURE_EPS_DEG))
        .count()
}

fn lon_range(lons: impl Iterator<Item = f64>) -> (f64, f64) {
    lons.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), lon| {
        (lo.min(lon), hi.max(lon))
    })
}

#[cfg(test)]
mod tests {
    use super::{RingClass, longitude_span, normalize_ring, raw_span};
    use formats::{GeoPoint, Ring, is_closed};
    use pretty_assertions::assert_eq;

    fn ring(coords: &[[f64; 2]]) -> Ring {
        coords.iter().map(|c| GeoPoint::new(c[0], c[1])).collect()
    }

    #[test]
    fn plain_ring_is_returned_unchanged() {
        let square = ring(&[[-10.0, -10.0], [10.0, -10.0], [10.0, 10.0], [-10.0, 10.0], [-10.0, -10.0]]);
        let out = normalize_ring(&square);
        assert_eq!(out.classification, RingClass::Plain);
        assert_eq!(out.parts, vec![square.clone()]);
        assert_eq!(out.span_deg, 20.0);

        // Open input only gains its closing point.
        let open = normalize_ring(&square[..4]);
        assert_eq!(open.parts, vec![square]);
    }

    #[test]
    fn antimeridian_box_splits_into_two_parts() {
        let r = ring(&[[170.0, 0.0], [-170.0, 0.0], [-170.0, 10.0], [170.0, 10.0], [170.0, 0.0]]);
        let out = normalize_ring(&r);
        assert_eq!(out.classification, RingClass::Split);
        assert_eq!(out.part_count(), 2);
        for part in &out.parts {
            assert!(is_closed(part));
            assert!(raw_span(part) <= 180.0, "span {}", raw_span(part));
        }

        // One part east of the seam, one west.
        let mut sides: Vec<bool> = out
            .parts
            .iter()
            .map(|p| p.iter().all(|v| v.lon_deg >= 170.0))
            .collect();
        sides.sort();
        assert_eq!(sides, vec![false, true]);
    }

    #[test]
    fn seam_points_interpolate_latitude() {
        let r = ring(&[[170.0, 0.0], [-170.0, 10.0], [-170.0, 20.0], [170.0, 20.0]]);
        let out = normalize_ring(&r);
        assert_eq!(out.part_count(), 2);
        let has_mid = out.parts.iter().flatten().any(|p| {
            (p.lon_deg.abs() - 180.0).abs() < 1e-9 && (p.lat_deg - 5.0).abs() < 1e-9
        });
        assert!(has_mid);
    }

    #[test]
    fn odd_crossing_ring_yields_separate_parts() {
        // Encircles the north pole at 50°N; not polar (no vertex above 60°).
        let coords: Vec<[f64; 2]> = (0..12).map(|i| [i as f64 * 30.0, 50.0]).collect();
        let out = normalize_ring(&ring(&coords));
        assert_eq!(out.classification, RingClass::Split);
        assert!(out.part_count() >= 2);
        for part in &out.parts {
            assert!(is_closed(part));
            assert!(raw_span(part) <= 180.0 + 1e-9, "span {}", raw_span(part));
        }
    }

    #[test]
    fn wide_ring_without_seam_crossing_splits_at_central_meridian() {
        let r = ring(&[
            [-120.0, 0.0],
            [0.0, 0.0],
            [120.0, 0.0],
            [120.0, 10.0],
            [0.0, 10.0],
            [-120.0, 10.0],
        ]);
        let out = normalize_ring(&r);
        assert_eq!(out.classification, RingClass::Split);
        assert_eq!(out.part_count(), 2);
        for part in &out.parts {
            assert!(raw_span(part) <= 180.0);
        }
    }

    #[test]
    fn polar_cap_is_kept_whole() {
        let coords: Vec<[f64; 2]> = (0..36).map(|i| [-180.0 + i as f64 * 10.0, 75.0]).collect();
        let r = ring(&coords);
        assert!(longitude_span(&r) >= 300.0);
        let out = normalize_ring(&r);
        assert_eq!(out.classification, RingClass::Polar);
        assert_eq!(out.part_count(), 1);
        assert!(is_closed(&out.parts[0]));
    }

    #[test]
    fn vertex_on_the_seam_leaves_no_sliver_part() {
        let r = ring(&[[180.0, 0.0], [-170.0, 0.0], [-170.0, 10.0], [180.0, 10.0]]);
        let out = normalize_ring(&r);
        assert_eq!(out.classification, RingClass::Split);
        assert_eq!(out.part_count(), 1);
        let part = &out.parts[0];
        assert!(is_closed(part));
        assert!((raw_span(part) - 10.0).abs() < 1e-9, "span {}", raw_span(part));
    }

    #[test]
    fn empty_ring_has_no_parts() {
        let out = normalize_ring(&[]);
        assert_eq!(out.classification, RingClass::Plain);
        assert!(out.parts.is_empty());
    }
}
