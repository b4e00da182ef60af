use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn as_array(self) -> [f64; 2] {
        [self.lon_deg, self.lat_deg]
    }

    /// Same position within `eps` degrees on both axes.
    pub fn coincides(self, other: GeoPoint, eps: f64) -> bool {
        (self.lon_deg - other.lon_deg).abs() <= eps && (self.lat_deg - other.lat_deg).abs() <= eps
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(v: [f64; 2]) -> Self {
        GeoPoint::new(v[0], v[1])
    }
}

/// Ordered (lon, lat) sequence describing a polygon boundary.
pub type Ring = Vec<GeoPoint>;

/// Tolerance (degrees) for treating two ring vertices as the same point.
pub const RING_CLOSURE_EPS_DEG: f64 = 1e-9;

pub fn is_closed(ring: &[GeoPoint]) -> bool {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() >= 2 => first.coincides(*last, RING_CLOSURE_EPS_DEG),
        _ => false,
    }
}

/// Copy of `ring` with the first point repeated at the end if needed.
pub fn closed(ring: &[GeoPoint]) -> Ring {
    let mut out = ring.to_vec();
    if !out.is_empty() && !is_closed(&out) {
        out.push(out[0]);
    }
    out
}

/// View of `ring` without its closing duplicate.
pub fn open_slice(ring: &[GeoPoint]) -> &[GeoPoint] {
    if is_closed(ring) {
        &ring[..ring.len() - 1]
    } else {
        ring
    }
}

/// A border or boundary polyline. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFeature {
    pub id: String,
    pub coordinates: Vec<GeoPoint>,
}

impl LineFeature {
    pub fn new(id: impl Into<String>, coordinates: Vec<GeoPoint>) -> Self {
        Self {
            id: id.into(),
            coordinates,
        }
    }

    pub fn from_lon_lat(id: impl Into<String>, coords: &[[f64; 2]]) -> Self {
        Self::new(id, coords.iter().copied().map(GeoPoint::from).collect())
    }
}

/// Territory outline: `rings[0]` is the outer boundary, `rings[1..]` are holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    pub id: String,
    pub rings: Vec<Ring>,
}

impl PolygonFeature {
    pub fn new(id: impl Into<String>, rings: Vec<Ring>) -> Self {
        Self {
            id: id.into(),
            rings,
        }
    }

    pub fn from_lon_lat(id: impl Into<String>, rings: &[&[[f64; 2]]]) -> Self {
        Self::new(
            id,
            rings
                .iter()
                .map(|r| r.iter().copied().map(GeoPoint::from).collect())
                .collect(),
        )
    }

    pub fn outer(&self) -> Option<&Ring> {
        self.rings.first()
    }

    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }
}
