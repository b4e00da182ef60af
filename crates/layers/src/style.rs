use serde::{Deserialize, Serialize};

/// Which triangle faces a renderer should draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Depth bias applied when drawing caps flush with other surfaces.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

impl Default for PolygonOffset {
    fn default() -> Self {
        Self {
            factor: -1.0,
            units: -1.0,
        }
    }
}

/// Material shared by every territory primitive of a group.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceMaterial {
    pub color: [f32; 3],
    pub opacity: f32,
    pub side: Side,
    pub polygon_offset: Option<PolygonOffset>,
}

impl SurfaceMaterial {
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineMaterial {
    pub color: [f32; 3],
    pub opacity: f32,
}

impl LineMaterial {
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}
