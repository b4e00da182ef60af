//! Per-part choice of the 2D projection used to triangulate caps.

use foundation::math::{ProjectionMode, stable_median};
use foundation::mesh::MeshData;

use crate::rings::RingClass;

/// Rings wider than this triangulate on the tangent plane.
pub const TANGENT_SPAN_DEG: f64 = 60.0;
/// Longest / median cap edge ratio above which a legacy build is redone.
pub const DEFAULT_FALLBACK_EDGE_RATIO: f64 = 12.0;

pub fn select_projection(class: RingClass, outer_parts: usize, span_deg: f64) -> ProjectionMode {
    match class {
        RingClass::Polar => ProjectionMode::Lambert,
        _ if outer_parts > 1 || span_deg > TANGENT_SPAN_DEG => ProjectionMode::Tangent,
        _ => ProjectionMode::Legacy,
    }
}

/// Ratio of the longest to the median cap triangle edge (3D lengths).
///
/// `None` when the mesh has no cap triangles or the median edge is degenerate.
pub fn cap_edge_ratio(mesh: &MeshData) -> Option<f64> {
    let mut lengths: Vec<f64> = Vec::with_capacity(mesh.cap_triangles * 3);
    for t in mesh.cap_triangle_range() {
        let [a, b, c] = mesh.triangle(t);
        lengths.push(a.distance(b));
        lengths.push(b.distance(c));
        lengths.push(c.distance(a));
    }
    let median = stable_median(&lengths)?;
    if median <= f64::EPSILON {
        return None;
    }
    let longest = lengths.iter().copied().fold(0.0, f64::max);
    Some(longest / median)
}

/// True when a legacy cap looks stretched enough to rebuild on the tangent plane.
pub fn needs_fallback(mesh: &MeshData, max_edge_ratio: f64) -> bool {
    mesh.projection == ProjectionMode::Legacy
        && cap_edge_ratio(mesh).is_some_and(|ratio| ratio > max_edge_ratio)
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_FALLBACK_EDGE_RATIO, cap_edge_ratio, needs_fallback, select_projection};
    use crate::rings::RingClass;
    use foundation::math::ProjectionMode;
    use foundation::mesh::MeshData;

    fn mesh(tris: &[[[f32; 3]; 3]], projection: ProjectionMode) -> MeshData {
        let mut m = MeshData::empty(projection);
        for tri in tris {
            for p in tri {
                m.indices.push(m.positions.len() as u32);
                m.positions.push(*p);
            }
        }
        m.cap_triangles = tris.len();
        m
    }

    #[test]
    fn heuristic_matches_ring_shape() {
        assert_eq!(select_projection(RingClass::Polar, 1, 359.0), ProjectionMode::Lambert);
        assert_eq!(select_projection(RingClass::Split, 2, 340.0), ProjectionMode::Tangent);
        assert_eq!(select_projection(RingClass::Plain, 1, 90.0), ProjectionMode::Tangent);
        assert_eq!(select_projection(RingClass::Plain, 1, 20.0), ProjectionMode::Legacy);
    }

    #[test]
    fn stretched_cap_triggers_fallback() {
        let unit = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let sliver = [[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let m = mesh(&[unit, unit, sliver], ProjectionMode::Legacy);
        let ratio = cap_edge_ratio(&m).expect("ratio");
        assert!(ratio > 99.0, "ratio {ratio}");
        assert!(needs_fallback(&m, DEFAULT_FALLBACK_EDGE_RATIO));

        let even = mesh(&[unit, unit], ProjectionMode::Legacy);
        assert!(!needs_fallback(&even, DEFAULT_FALLBACK_EDGE_RATIO));

        let tangent = mesh(&[unit, unit, sliver], ProjectionMode::Tangent);
        assert!(!needs_fallback(&tangent, DEFAULT_FALLBACK_EDGE_RATIO));
    }

    #[test]
    fn empty_mesh_has_no_ratio() {
        assert_eq!(cap_edge_ratio(&MeshData::empty(ProjectionMode::Legacy)), None);
    }
}
