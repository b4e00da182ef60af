//! Segment index for hover resolution of border lines.
//!
//! Every line feature is decomposed into 2-point segments stored in a BVH
//! over lon/lat boxes. Queries probe at the raw longitude and at ±360° so
//! segments stored on the far side of the antimeridian are still found.

use foundation::bounds::Aabb2;
use formats::{GeoPoint, LineFeature};
use tracing::debug;

use crate::spatial::{Bvh, Item};

#[derive(Debug, Clone, PartialEq)]
pub struct BorderIndexEntry {
    pub feature_id: String,
    pub a: GeoPoint,
    /// Second endpoint, shifted by ±360° when needed so the segment does not wrap.
    pub b: GeoPoint,
    pub bounds: Aabb2,
}

impl BorderIndexEntry {
    pub fn new(feature_id: impl Into<String>, a: GeoPoint, b: GeoPoint) -> Self {
        let b = unwrap_towards(a, b);
        let bounds = Aabb2::from_points([a.as_array(), b.as_array()])
            .unwrap_or_else(|| Aabb2::new(a.as_array(), a.as_array()));
        Self {
            feature_id: feature_id.into(),
            a,
            b,
            bounds,
        }
    }
}

/// Immutable spatial index over border segments.
///
/// Rebuilt wholesale whenever the active feature set changes; see
/// [`BorderIndex::rebuild`].
#[derive(Debug, Clone, Default)]
pub struct BorderIndex {
    entries: Vec<BorderIndexEntry>,
    bvh: Bvh,
}

impl BorderIndex {
    pub fn build(features: &[LineFeature]) -> Self {
        let mut entries: Vec<BorderIndexEntry> = Vec::new();
        for feature in features {
            if feature.coordinates.len() < 2 {
                debug!(feature = %feature.id, "line with fewer than 2 points not indexed");
                continue;
            }
            for w in feature.coordinates.windows(2) {
                entries.push(BorderIndexEntry::new(feature.id.as_str(), w[0], w[1]));
            }
        }

        let items = entries
            .iter()
            .enumerate()
            .map(|(id, e)| Item {
                id,
                bounds: e.bounds,
            })
            .collect();
        let bvh = Bvh::build(items);
        debug!(segments = entries.len(), "border index built");
        Self { entries, bvh }
    }

    /// Replaces the index contents. The old index stays valid until the new
    /// one is fully built.
    pub fn rebuild(&mut self, features: &[LineFeature]) {
        *self = Self::build(features);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BorderIndexEntry] {
        &self.entries
    }

    /// Feature id of the segment nearest to the probe.
    ///
    /// Candidates are segments whose bounds intersect the probe box of
    /// `radius_deg`; among them, the one with the closest endpoint under an
    /// equirectangular metric (longitude scaled by cos(probe latitude)) wins.
    /// Ties go to the earlier segment.
    pub fn query_nearest_segment_id(
        &self,
        lon_deg: f64,
        lat_deg: f64,
        radius_deg: f64,
    ) -> Option<&str> {
        if self.entries.is_empty() || !radius_deg.is_finite() || radius_deg < 0.0 {
            return None;
        }
        let cos_lat = lat_deg.to_radians().cos().abs();

        let mut best: Option<(f64, usize)> = None;
        let mut candidates: Vec<usize> = Vec::new();
        for offset in [0.0, 360.0, -360.0] {
            let probe = [lon_deg + offset, lat_deg];
            candidates.clear();
            self.bvh
                .collect_aabb(&Aabb2::around(probe, radius_deg), &mut candidates);

            for &idx in &candidates {
                let e = &self.entries[idx];
                let d = equirect_dist2(probe, e.a, cos_lat).min(equirect_dist2(probe, e.b, cos_lat));
                let better = match best {
                    None => true,
                    Some((bd, bi)) => d < bd || (d == bd && idx < bi),
                };
                if better {
                    best = Some((d, idx));
                }
            }
        }

        best.map(|(_, idx)| self.entries[idx].feature_id.as_str())
    }
}

/// Free-function form of [`BorderIndex::query_nearest_segment_id`].
pub fn query_nearest_segment_id(
    index: &BorderIndex,
    lon_deg: f64,
    lat_deg: f64,
    radius_deg: f64,
) -> Option<&str> {
    index.query_nearest_segment_id(lon_deg, lat_deg, radius_deg)
}

fn equirect_dist2(probe: [f64; 2], p: GeoPoint, cos_lat: f64) -> f64 {
    let dx = (p.lon_deg - probe[0]) * cos_lat;
    let dy = p.lat_deg - probe[1];
    dx * dx + dy * dy
}

fn unwrap_towards(anchor: GeoPoint, p: GeoPoint) -> GeoPoint {
    let mut lon = p.lon_deg;
    while lon - anchor.lon_deg > 180.0 {
        lon -= 360.0;
    }
    while lon - anchor.lon_deg < -180.0 {
        lon += 360.0;
    }
    GeoPoint::new(lon, p.lat_deg)
}

#[cfg(test)]
mod tests {
    use super::{BorderIndex, query_nearest_segment_id};
    use formats::LineFeature;
    use pretty_assertions::assert_eq;

    fn features() -> Vec<LineFeature> {
        vec![
            LineFeature::from_lon_lat("fr-de", &[[7.5, 47.5], [8.2, 49.0], [6.4, 50.3]]),
            LineFeature::from_lon_lat("us-ca", &[[-123.0, 49.0], [-95.0, 49.0]]),
            LineFeature::from_lon_lat("ru-us", &[[170.0, 65.0], [-170.0, 66.0]]),
            LineFeature::from_lon_lat("degenerate", &[[0.0, 0.0]]),
        ]
    }

    #[test]
    fn splits_lines_into_segments() {
        let index = BorderIndex::build(&features());
        assert_eq!(index.len(), 4);
        let ids: Vec<&str> = index.entries().iter().map(|e| e.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["fr-de", "fr-de", "us-ca", "ru-us"]);
    }

    #[test]
    fn probe_at_segment_midpoint_returns_its_feature() {
        let index = BorderIndex::build(&features());
        let mid_lon = (7.5 + 8.2) / 2.0;
        let mid_lat = (47.5 + 49.0) / 2.0;
        assert_eq!(
            query_nearest_segment_id(&index, mid_lon, mid_lat, 1.0),
            Some("fr-de")
        );
        assert_eq!(
            index.query_nearest_segment_id(-109.0, 49.0, 1.0),
            Some("us-ca")
        );
    }

    #[test]
    fn antimeridian_segment_is_found_on_both_sides() {
        let index = BorderIndex::build(&features());
        let seg = &index.entries()[3];
        assert_eq!(seg.feature_id, "ru-us");
        // Stored without wrapping: second endpoint moved to 190.
        assert_eq!(seg.b.lon_deg, 190.0);

        assert_eq!(index.query_nearest_segment_id(179.5, 65.5, 1.0), Some("ru-us"));
        assert_eq!(index.query_nearest_segment_id(-179.5, 65.5, 1.0), Some("ru-us"));
    }

    #[test]
    fn far_probe_returns_none() {
        let index = BorderIndex::build(&features());
        assert_eq!(index.query_nearest_segment_id(0.0, -60.0, 1.0), None);
        assert_eq!(BorderIndex::default().query_nearest_segment_id(0.0, 0.0, 5.0), None);
    }

    #[test]
    fn rebuild_replaces_previous_segments() {
        let mut index = BorderIndex::build(&features());
        index.rebuild(&[LineFeature::from_lon_lat("only", &[[0.0, 0.0], [1.0, 0.0]])]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.query_nearest_segment_id(7.8, 48.0, 1.0), None);
        assert_eq!(index.query_nearest_segment_id(0.5, 0.0, 1.0), Some("only"));
    }
}
