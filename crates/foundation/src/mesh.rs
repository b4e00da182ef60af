use crate::math::{ProjectionMode, Vec3};

/// Indexed triangle mesh ready for upload.
///
/// Index layout contract: the first `cap_triangles` triangles are cap
/// (surface) triangles, the following `wall_triangles` are side walls.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub cap_triangles: usize,
    pub wall_triangles: usize,
    /// Projection that decided the cap topology.
    pub projection: ProjectionMode,
}

impl MeshData {
    pub fn empty(projection: ProjectionMode) -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
            cap_triangles: 0,
            wall_triangles: 0,
            projection,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Approximate heap footprint of the vertex and index buffers.
    pub fn size_estimate_bytes(&self) -> usize {
        self.positions.len() * std::mem::size_of::<[f32; 3]>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }

    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let i = &self.indices[t * 3..t * 3 + 3];
        [
            Vec3::from_f32(self.positions[i[0] as usize]),
            Vec3::from_f32(self.positions[i[1] as usize]),
            Vec3::from_f32(self.positions[i[2] as usize]),
        ]
    }

    pub fn cap_triangle_range(&self) -> std::ops::Range<usize> {
        0..self.cap_triangles
    }

    pub fn wall_triangle_range(&self) -> std::ops::Range<usize> {
        self.cap_triangles..self.cap_triangles + self.wall_triangles
    }
}

#[cfg(test)]
mod tests {
    use super::MeshData;
    use crate::math::ProjectionMode;

    #[test]
    fn size_estimate_counts_positions_and_indices() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            cap_triangles: 2,
            wall_triangles: 0,
            projection: ProjectionMode::Legacy,
        };
        assert_eq!(mesh.size_estimate_bytes(), 4 * 12 + 6 * 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.wall_triangle_range(), 2..2);
    }
}
