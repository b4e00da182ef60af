use std::fmt;
use std::path::Path;

use cache::{CacheConfig, ProjectionKey};
use foundation::math::ProjectionMode;
use serde::{Deserialize, Serialize};

use crate::mesh::DEFAULT_MIN_HOLE_WALL_PERIMETER_DEG;
use crate::projection::DEFAULT_FALLBACK_EDGE_RATIO;
use crate::validate::DEFAULT_COLLINEAR_EPSILON;

/// Tuning for the territory pipeline. Constructed once and passed by reference.
///
/// Changing anything other than `projection_override` or `legacy_fallback`
/// alters mesh output without changing cache keys; bump
/// `cache.pipeline_version` alongside such changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Forces one projection for every part, bypassing the heuristic.
    pub projection_override: Option<ProjectionMode>,
    /// Rebuild stretched legacy caps on the tangent plane.
    pub legacy_fallback: bool,
    pub fallback_edge_ratio: f64,
    pub collinear_epsilon: f64,
    pub min_hole_wall_perimeter_deg: f64,
    /// Run duplicate/collinear cleanup and self-intersection counting.
    pub validate: bool,
    pub cache: CacheConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            projection_override: None,
            legacy_fallback: true,
            fallback_edge_ratio: DEFAULT_FALLBACK_EDGE_RATIO,
            collinear_epsilon: DEFAULT_COLLINEAR_EPSILON,
            min_hole_wall_perimeter_deg: DEFAULT_MIN_HOLE_WALL_PERIMETER_DEG,
            validate: true,
            cache: CacheConfig::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(payload).map_err(|e| ConfigError::Parse(e.to_string()))?;
        options.check()?;
        Ok(options)
    }

    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&payload)
    }

    /// Cache key component describing how projections are chosen.
    pub fn projection_key(&self) -> ProjectionKey {
        match self.projection_override {
            Some(mode) => ProjectionKey::Fixed(mode),
            None => ProjectionKey::Auto {
                fallback: self.legacy_fallback,
            },
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !(self.fallback_edge_ratio > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fallback_edge_ratio must be > 1, got {}",
                self.fallback_edge_ratio
            )));
        }
        if !(self.collinear_epsilon >= 0.0) {
            return Err(ConfigError::Invalid("collinear_epsilon must be >= 0".to_string()));
        }
        if !(self.min_hole_wall_perimeter_deg >= 0.0) {
            return Err(ConfigError::Invalid(
                "min_hole_wall_perimeter_deg must be >= 0".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid("cache.max_entries must be > 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse(String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "read {path}: {message}"),
            ConfigError::Parse(msg) => write!(f, "invalid pipeline config: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid pipeline config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PipelineOptions};
    use cache::ProjectionKey;
    use foundation::math::ProjectionMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_yields_defaults() {
        let options = PipelineOptions::from_json_str("{}").expect("parse");
        assert_eq!(options, PipelineOptions::default());
        assert_eq!(options.projection_key(), ProjectionKey::Auto { fallback: true });
    }

    #[test]
    fn partial_config_overrides_fields() {
        let options = PipelineOptions::from_json_str(
            r#"{"projection_override": "lambert", "cache": {"max_entries": 4, "pipeline_version": "v9"}}"#,
        )
        .expect("parse");
        assert_eq!(options.projection_override, Some(ProjectionMode::Lambert));
        assert_eq!(options.cache.max_entries, 4);
        assert_eq!(options.cache.max_vertex_budget, 2_000_000);
        assert_eq!(options.cache.pipeline_version, "v9");
        assert_eq!(options.projection_key(), ProjectionKey::Fixed(ProjectionMode::Lambert));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            PipelineOptions::from_json_str(r#"{"fallback_edge_ratio": 0.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PipelineOptions::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
        let missing = PipelineOptions::load_json_file("/definitely/not/here.json");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
