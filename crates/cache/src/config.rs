use serde::{Deserialize, Serialize};

pub const DEFAULT_PIPELINE_VERSION: &str = "globe-geometry-v1";

/// Budgets and versioning for a [`crate::GeometryCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_vertex_budget: usize,
    /// Key component; bumping it invalidates every previously stored entry.
    pub pipeline_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            max_vertex_budget: 2_000_000,
            pipeline_version: DEFAULT_PIPELINE_VERSION.to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new(max_entries: usize, max_vertex_budget: usize) -> Self {
        Self {
            max_entries,
            max_vertex_budget,
            ..Self::default()
        }
    }

    pub fn with_pipeline_version(mut self, version: impl Into<String>) -> Self {
        self.pipeline_version = version.into();
        self
    }
}

/// Observability snapshot of a geometry cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub vertices: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub max_entries: usize,
    pub max_vertex_budget: usize,
}

#[cfg(test)]
mod tests {
    use super::{CacheConfig, DEFAULT_PIPELINE_VERSION};

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: CacheConfig = serde_json::from_str(r#"{"max_entries": 8}"#).expect("parse");
        assert_eq!(cfg.max_entries, 8);
        assert_eq!(cfg.max_vertex_budget, CacheConfig::default().max_vertex_budget);
        assert_eq!(cfg.pipeline_version, DEFAULT_PIPELINE_VERSION);
    }
}
