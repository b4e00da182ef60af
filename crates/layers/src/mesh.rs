//! Cap triangulation and shell extrusion for one polygon part.
//!
//! Triangulation runs in a 2D plane chosen by [`ProjectionMode`]; the plane
//! only decides topology. Every 3D vertex is re-derived from the original
//! (lat, lon) so all modes land on the same sphere surface.

use earcutr::earcut;
use foundation::math::{LocalFrame, ProjectionMode, Vec2, lat_lon_to_vec3};
use foundation::mesh::MeshData;
use formats::{GeoPoint, Ring, open_slice};
use tracing::debug;

/// Default minimum hole perimeter (degrees) for side walls to be generated.
pub const DEFAULT_MIN_HOLE_WALL_PERIMETER_DEG: f64 = 0.5;

/// Surface placement and extrusion for [`build_part_mesh`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshParams {
    pub radius: f64,
    /// Base elevation, absolute in the radius' units.
    pub elevation: f64,
    /// Shell height above the base; 0 builds a flat cap.
    pub thickness: f64,
    pub min_hole_wall_perimeter_deg: f64,
}

impl MeshParams {
    pub fn flat(radius: f64, elevation: f64) -> Self {
        Self {
            radius,
            elevation,
            thickness: 0.0,
            min_hole_wall_perimeter_deg: DEFAULT_MIN_HOLE_WALL_PERIMETER_DEG,
        }
    }

    pub fn extruded(radius: f64, elevation: f64, thickness: f64) -> Self {
        Self {
            thickness,
            ..Self::flat(radius, elevation)
        }
    }

    pub fn is_extruded(&self) -> bool {
        self.thickness > 0.0
    }
}

/// One ring after winding correction, with its 2D projection.
struct PlanarRing {
    geo: Vec<GeoPoint>,
    planar: Vec<Vec2>,
}

impl PlanarRing {
    fn len(&self) -> usize {
        self.geo.len()
    }

    fn signed_area(&self) -> f64 {
        let n = self.planar.len();
        (0..n)
            .map(|i| self.planar[i].cross(self.planar[(i + 1) % n]))
            .sum::<f64>()
            * 0.5
    }

    fn orient(&mut self, ccw: bool) {
        if (self.signed_area() > 0.0) != ccw {
            self.geo.reverse();
            self.planar.reverse();
        }
    }

    fn perimeter_deg(&self) -> f64 {
        let n = self.geo.len();
        (0..n)
            .map(|i| {
                let (a, b) = (self.geo[i], self.geo[(i + 1) % n]);
                (b.lon_deg - a.lon_deg).hypot(b.lat_deg - a.lat_deg)
            })
            .sum()
    }
}

/// Triangulates one outer part with its holes.
///
/// Returns `None` when the outer ring is degenerate or triangulation fails.
/// Holes with fewer than three points are ignored.
pub fn build_part_mesh(
    outer: &[GeoPoint],
    holes: &[Ring],
    mode: ProjectionMode,
    params: &MeshParams,
) -> Option<MeshData> {
    let outer = open_slice(outer);
    if outer.len() < 3 {
        return None;
    }

    let center_lon = outer.iter().map(|p| p.lon_deg).sum::<f64>() / outer.len() as f64;
    let holes: Vec<Vec<GeoPoint>> = holes
        .iter()
        .map(|h| open_slice(h))
        .filter(|h| h.len() >= 3)
        .map(|h| h.iter().map(|p| unwrap_near(*p, center_lon)).collect())
        .collect();

    let frame = match mode {
        ProjectionMode::Legacy => None,
        ProjectionMode::Tangent | ProjectionMode::Lambert => Some(LocalFrame::from_lat_lon(
            outer
                .iter()
                .chain(holes.iter().flatten())
                .map(|p| (p.lat_deg, p.lon_deg)),
        )?),
    };
    let project = |p: &GeoPoint| match &frame {
        Some(frame) => frame.project(mode, p.lat_deg, p.lon_deg),
        None => Vec2::new(p.lon_deg, p.lat_deg),
    };
    let planar = |geo: Vec<GeoPoint>| PlanarRing {
        planar: geo.iter().map(&project).collect(),
        geo,
    };

    let mut rings: Vec<PlanarRing> = Vec::with_capacity(1 + holes.len());
    let mut outer_ring = planar(outer.to_vec());
    outer_ring.orient(true);
    rings.push(outer_ring);
    for hole in holes {
        let mut hole_ring = planar(hole);
        hole_ring.orient(false);
        rings.push(hole_ring);
    }

    let mut coords: Vec<f64> = Vec::new();
    let mut hole_starts: Vec<usize> = Vec::new();
    let mut vertex_count = 0;
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            hole_starts.push(vertex_count);
        }
        for p in &ring.planar {
            coords.push(p.x);
            coords.push(p.y);
        }
        vertex_count += ring.len();
    }

    let triangles = match earcut(&coords, &hole_starts, 2) {
        Ok(ix) => ix,
        Err(_) => {
            debug!(%mode, vertices = vertex_count, "earcut failed");
            return None;
        }
    };
    if triangles.is_empty() {
        return None;
    }

    let planar_at = |i: usize| Vec2::new(coords[i * 2], coords[i * 2 + 1]);
    let mut caps: Vec<[u32; 3]> = triangles
        .chunks_exact(3)
        .map(|t| {
            let area = (planar_at(t[1]) - planar_at(t[0])).cross(planar_at(t[2]) - planar_at(t[0]));
            // Counter-clockwise in the east/north plane faces away from the globe.
            if area < 0.0 {
                [t[0] as u32, t[2] as u32, t[1] as u32]
            } else {
                [t[0] as u32, t[1] as u32, t[2] as u32]
            }
        })
        .collect();

    let geo: Vec<GeoPoint> = rings.iter().flat_map(|r| r.geo.iter().copied()).collect();
    let place = |elevation: f64| {
        geo.iter()
            .map(move |p| lat_lon_to_vec3(p.lat_deg, p.lon_deg, elevation, params.radius).to_f32())
    };

    let mut mesh = MeshData::empty(mode);
    if !params.is_extruded() {
        mesh.positions = place(params.elevation).collect();
        mesh.indices = caps.iter().flatten().copied().collect();
        mesh.cap_triangles = caps.len();
        return Some(mesh);
    }

    // Base vertices are [0, n), top vertices [n, 2n).
    let n = geo.len() as u32;
    mesh.positions = place(params.elevation)
        .chain(place(params.elevation + params.thickness))
        .collect();

    for [a, b, c] in &caps {
        mesh.indices.extend_from_slice(&[a + n, b + n, c + n]);
    }
    for [a, b, c] in &mut caps {
        std::mem::swap(b, c);
        mesh.indices.extend_from_slice(&[*a, *b, *c]);
    }
    mesh.cap_triangles = caps.len() * 2;

    let mut start = 0u32;
    for (i, ring) in rings.iter().enumerate() {
        let len = ring.len() as u32;
        let is_hole = i > 0;
        if !is_hole || ring.perimeter_deg() > params.min_hole_wall_perimeter_deg {
            // Holes are clockwise, so the same corner order faces into the hole.
            for k in 0..len {
                let bi = start + k;
                let bj = start + (k + 1) % len;
                let (ti, tj) = (bi + n, bj + n);
                mesh.indices.extend_from_slice(&[bi, bj, tj, bi, tj, ti]);
                mesh.wall_triangles += 2;
            }
        }
        start += len;
    }

    Some(mesh)
}

fn unwrap_near(p: GeoPoint, center_lon: f64) -> GeoPoint {
    let mut lon = p.lon_deg;
    while lon - center_lon > 180.0 {
        lon -= 360.0;
    }
    while lon - center_lon < -180.0 {
        lon += 360.0;
    }
    GeoPoint::new(lon, p.lat_deg)
}
