use std::fmt;

use foundation::math::{ProjectionMode, dequantize, quantize};
use formats::Ring;

/// Decimal places kept when hashing coordinates; absorbs float noise.
pub const HASH_DECIMALS: u32 = 4;

/// Hex characters kept from the content digest.
const HASH_HEX_LEN: usize = 16;

/// Short deterministic digest of ring coordinates.
///
/// Each coordinate is rounded to [`HASH_DECIMALS`] places before hashing, so
/// perturbations below half a grid step (5e-5 degrees) do not change the hash.
/// Ring boundaries are part of the digest.
pub fn content_hash(rings: &[Ring]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(rings.len() as u64).to_le_bytes());
    for ring in rings {
        hasher.update(&(ring.len() as u64).to_le_bytes());
        for p in ring {
            hasher.update(&quantize(p.lon_deg, HASH_DECIMALS).to_le_bytes());
            hasher.update(&quantize(p.lat_deg, HASH_DECIMALS).to_le_bytes());
        }
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..HASH_HEX_LEN].to_string()
}

/// How the projection was chosen for a cached build.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProjectionKey {
    /// Per-part heuristic; `fallback` records whether the legacy fallback was enabled.
    Auto { fallback: bool },
    Fixed(ProjectionMode),
}

impl fmt::Display for ProjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionKey::Auto { fallback: false } => f.write_str("auto"),
            ProjectionKey::Auto { fallback: true } => f.write_str("auto-fallback"),
            ProjectionKey::Fixed(mode) => write!(f, "{mode}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtrusionKey {
    Flat,
    Shell { thickness_q: i64 },
}

impl ExtrusionKey {
    pub fn from_thickness(thickness: f64) -> Self {
        let thickness_q = quantize(thickness.max(0.0), HASH_DECIMALS);
        if thickness_q == 0 {
            ExtrusionKey::Flat
        } else {
            ExtrusionKey::Shell { thickness_q }
        }
    }

    pub fn is_extruded(self) -> bool {
        matches!(self, ExtrusionKey::Shell { .. })
    }

    /// Thickness a build under this key must use; `Flat` is exactly 0.
    pub fn thickness(self) -> f64 {
        match self {
            ExtrusionKey::Flat => 0.0,
            ExtrusionKey::Shell { thickness_q } => dequantize(thickness_q, HASH_DECIMALS),
        }
    }
}

impl fmt::Display for ExtrusionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtrusionKey::Flat => f.write_str("flat"),
            ExtrusionKey::Shell { thickness_q } => write!(f, "shell:{thickness_q}"),
        }
    }
}

/// Sphere radius and base elevation the mesh was built for (quantized).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceKey {
    pub radius_q: i64,
    pub elevation_q: i64,
}

impl SurfaceKey {
    pub fn new(radius: f64, elevation: f64) -> Self {
        Self {
            radius_q: quantize(radius, HASH_DECIMALS),
            elevation_q: quantize(elevation, HASH_DECIMALS),
        }
    }
}

/// Content-addressed cache key.
///
/// Reproducible from the feature id, ring content, projection selection,
/// extrusion, target surface and pipeline version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryKey {
    pub feature_id: String,
    pub content_hash: String,
    pub projection: ProjectionKey,
    pub extrusion: ExtrusionKey,
    pub surface: SurfaceKey,
    pub pipeline_version: String,
}

impl GeometryKey {
    pub fn new(
        feature_id: impl Into<String>,
        rings: &[Ring],
        projection: ProjectionKey,
        extrusion: ExtrusionKey,
        surface: SurfaceKey,
        pipeline_version: impl Into<String>,
    ) -> Self {
        Self {
            feature_id: feature_id.into(),
            content_hash: content_hash(rings),
            projection,
            extrusion,
            surface,
            pipeline_version: pipeline_version.into(),
        }
    }
}

impl fmt::Display for GeometryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|r{}e{}|{}",
            self.feature_id,
            self.content_hash,
            self.projection,
            self.extrusion,
            self.surface.radius_q,
            self.surface.elevation_q,
            self.pipeline_version
        )
    }
}
