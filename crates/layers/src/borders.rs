use std::sync::Arc;

use foundation::math::lat_lon_to_vec3;
use formats::LineFeature;
use tracing::debug;

use crate::style::LineMaterial;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BorderLineOptions {
    pub radius: f64,
    pub elevation: f64,
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Default for BorderLineOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            elevation: 0.002,
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
        }
    }
}

/// One polyline on the globe surface, named `border:<id>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrimitive {
    pub name: String,
    pub feature_id: String,
    pub positions: Vec<[f32; 3]>,
}

impl LinePrimitive {
    pub fn segment_count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub lines: Vec<LinePrimitive>,
    pub material: Arc<LineMaterial>,
}

impl LineGroup {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.lines.iter().map(|l| l.positions.len()).sum()
    }
}

/// Projects each line feature onto the sphere. Lines with fewer than two points are skipped.
pub fn build_border_lines(features: &[LineFeature], options: &BorderLineOptions) -> LineGroup {
    let material = Arc::new(LineMaterial {
        color: options.color,
        opacity: options.opacity,
    });

    let mut lines: Vec<LinePrimitive> = Vec::with_capacity(features.len());
    for feature in features {
        if feature.coordinates.len() < 2 {
            debug!(feature = %feature.id, points = feature.coordinates.len(), "skipping short border line");
            continue;
        }
        let positions = feature
            .coordinates
            .iter()
            .map(|p| lat_lon_to_vec3(p.lat_deg, p.lon_deg, options.elevation, options.radius).to_f32())
            .collect();
        lines.push(LinePrimitive {
            name: format!("border:{}", feature.id),
            feature_id: feature.id.clone(),
            positions,
        });
    }

    LineGroup { lines, material }
}

#[cfg(test)]
mod tests {
    use super::{BorderLineOptions, build_border_lines};
    use foundation::math::Vec3;
    use formats::LineFeature;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_lines_and_skips_short_ones() {
        let features = vec![
            LineFeature::from_lon_lat("fr-de", &[[7.5, 47.5], [8.2, 49.0], [6.4, 50.3]]),
            LineFeature::from_lon_lat("stub", &[[0.0, 0.0]]),
            LineFeature::from_lon_lat("ru-us", &[[170.0, 65.0], [-170.0, 66.0]]),
        ];
        let options = BorderLineOptions {
            radius: 10.0,
            elevation: 0.5,
            color: [1.0, 0.0, 0.0],
            opacity: 0.5,
        };
        let group = build_border_lines(&features, &options);

        let names: Vec<&str> = group.lines.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["border:fr-de", "border:ru-us"]);
        assert_eq!(group.vertex_count(), 5);
        assert_eq!(group.lines[0].segment_count(), 2);
        assert!(group.material.is_transparent());

        for p in group.lines.iter().flat_map(|l| &l.positions) {
            let d = Vec3::from_f32(*p).length();
            assert!((d - 10.5).abs() < 1e-4, "distance {d}");
        }
    }
}
