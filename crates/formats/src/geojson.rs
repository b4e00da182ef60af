//! GeoJSON FeatureCollection ingest into line and polygon features.
//!
//! Mapping:
//! - `LineString` -> one `LineFeature`; `MultiLineString` -> one per member (`<id>/<n>`).
//! - `Polygon` -> one `PolygonFeature`; `MultiPolygon` -> one per member (`<id>/<n>`).
//! - Point geometries are ignored.
//!
//! Feature ids come from the top-level `id`, then `properties.id`, then the
//! feature's index (`feature-<index>`).

use serde_json::{Map, Value};
use tracing::debug;

use crate::features::{GeoPoint, LineFeature, PolygonFeature, Ring};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub lines: Vec<LineFeature>,
    pub polygons: Vec<PolygonFeature>,
}

#[derive(Debug)]
pub enum FeatureError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::Json(err) => write!(f, "JSON parse error: {err}"),
            FeatureError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            FeatureError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for FeatureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl FeatureSet {
    pub fn from_geojson_str(payload: &str) -> Result<Self, FeatureError> {
        let value: Value = serde_json::from_str(payload).map_err(FeatureError::Json)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, FeatureError> {
        let obj = value
            .as_object()
            .ok_or(FeatureError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(FeatureError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(FeatureError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(FeatureError::NotAFeatureCollection)?;

        let mut out = FeatureSet::default();
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: &str| FeatureError::InvalidFeature {
                index,
                reason: reason.to_string(),
            };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object"))?;

            let id = feature_id(feat_obj, index);
            let Some(geometry) = feat_obj.get("geometry").filter(|g| !g.is_null()) else {
                debug!(feature = %id, "feature without geometry skipped");
                continue;
            };
            out.push_geometry(&id, geometry)
                .map_err(|reason| FeatureError::InvalidFeature { index, reason })?;
        }

        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.polygons.is_empty()
    }

    fn push_geometry(&mut self, id: &str, value: &Value) -> Result<(), String> {
        let obj = value
            .as_object()
            .ok_or("geometry must be an object".to_string())?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or("geometry missing type".to_string())?;
        let coords = obj
            .get("coordinates")
            .ok_or("geometry missing coordinates".to_string())?;

        match ty {
            "LineString" => {
                self.lines.push(LineFeature::new(id, parse_points(coords)?));
            }
            "MultiLineString" => {
                for (n, line) in parse_lines(coords)?.into_iter().enumerate() {
                    self.lines.push(LineFeature::new(format!("{id}/{n}"), line));
                }
            }
            "Polygon" => {
                self.polygons
                    .push(PolygonFeature::new(id, parse_polygon(coords)?));
            }
            "MultiPolygon" => {
                for (n, rings) in parse_multi_polygon(coords)?.into_iter().enumerate() {
                    self.polygons
                        .push(PolygonFeature::new(format!("{id}/{n}"), rings));
                }
            }
            "Point" | "MultiPoint" => {
                debug!(feature = %id, "point geometry ignored");
            }
            other => return Err(format!("unsupported geometry type: {other}")),
        }
        Ok(())
    }
}

fn feature_id(feat: &Map<String, Value>, index: usize) -> String {
    let from_value = |v: Option<&Value>| match v {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    from_value(feat.get("id"))
        .or_else(|| {
            from_value(
                feat.get("properties")
                    .and_then(|p| p.as_object())
                    .and_then(|p| p.get("id")),
            )
        })
        .unwrap_or_else(|| format!("feature-{index}"))
}

fn parse_point(coords: &Value) -> Result<GeoPoint, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(GeoPoint::new(lon, lat))
}

fn parse_points(coords: &Value) -> Result<Vec<GeoPoint>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_lines(coords: &Value) -> Result<Vec<Vec<GeoPoint>>, String> {
    let arr = coords
        .as_array()
        .ok_or("MultiLineString coordinates must be an array".to_string())?;
    arr.iter().map(parse_points).collect()
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_points).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}

#[cfg(test)]
mod tests {
    use super::{FeatureError, FeatureSet};
    use crate::features::GeoPoint;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "fr-es",
                "properties": {},
                "geometry": { "type": "LineString", "coordinates": [[-1.8, 43.3], [3.2, 42.4]] }
            },
            {
                "type": "Feature",
                "properties": { "id": 250 },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[0, 0], [2, 0], [2, 2], [0, 0]]],
                        [[[5, 5], [6, 5], [6, 6], [5, 5]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": { "type": "Point", "coordinates": [1, 1] }
            },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#;

    #[test]
    fn maps_geometries_to_features() {
        let set = FeatureSet::from_geojson_str(SAMPLE).expect("parse");
        assert_eq!(set.lines.len(), 1);
        assert_eq!(set.lines[0].id, "fr-es");
        assert_eq!(
            set.lines[0].coordinates,
            vec![GeoPoint::new(-1.8, 43.3), GeoPoint::new(3.2, 42.4)]
        );

        let ids: Vec<&str> = set.polygons.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["250/0", "250/1"]);
        assert_eq!(set.polygons[1].rings[0][0], GeoPoint::new(5.0, 5.0));
    }

    #[test]
    fn rejects_non_collections() {
        let err = FeatureSet::from_geojson_str(r#"{"type": "Feature"}"#).unwrap_err();
        assert!(matches!(err, FeatureError::NotAFeatureCollection));

        let err = FeatureSet::from_geojson_str("{").unwrap_err();
        assert!(matches!(err, FeatureError::Json(_)));
    }

    #[test]
    fn reports_index_of_bad_feature() {
        let payload = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, "x"]]}}
        ]}"#;
        let err = FeatureSet::from_geojson_str(payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid feature at index 0: lat must be a number"
        );
    }
}
