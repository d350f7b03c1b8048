use serde::{Deserialize, Serialize};

use furnix_core::{Error, Result};

/// Tunables for the query paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Added per unit of cosine similarity to the liked centroid.
    pub liked_weight: f32,
    /// Added per unit of cosine similarity to the disliked centroid. Negative.
    pub disliked_weight: f32,
    /// Cosine similarity at or above which a neighbour is treated as the
    /// query item itself. A tunable heuristic, not a semantic boundary.
    pub self_match_threshold: f32,
    /// Result count for `get_similar_items`.
    pub similar_items_k: usize,
    /// Nearest neighbours kept per scene item.
    pub scene_neighbors: usize,
    /// Best candidate scenes kept before sampling.
    pub scene_candidates: usize,
    /// Scenes returned to the caller.
    pub scene_sample_size: usize,
    /// Upper bound on the cartesian product of neighbour lists.
    pub max_candidate_scenes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liked_weight: 0.25,
            disliked_weight: -0.25,
            self_match_threshold: 0.99,
            similar_items_k: 10,
            scene_neighbors: 3,
            scene_candidates: 10,
            scene_sample_size: 5,
            max_candidate_scenes: 100_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.liked_weight.is_finite() || !self.disliked_weight.is_finite() {
            return Err(Error::InvalidConfig("preference weights must be finite".into()));
        }
        if !(self.self_match_threshold > -1.0 && self.self_match_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "self_match_threshold must be in (-1, 1], got {}",
                self.self_match_threshold
            )));
        }
        if self.scene_neighbors == 0 || self.scene_candidates == 0 || self.scene_sample_size == 0 {
            return Err(Error::InvalidConfig("scene sizes must be non-zero".into()));
        }
        if self.max_candidate_scenes == 0 {
            return Err(Error::InvalidConfig("max_candidate_scenes must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.liked_weight, 0.25);
        assert_eq!(config.disliked_weight, -0.25);
        assert_eq!(config.scene_neighbors, 3);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"self_match_threshold": 0.95, "scene_sample_size": 2}"#).unwrap();
        assert_eq!(config.self_match_threshold, 0.95);
        assert_eq!(config.scene_sample_size, 2);
        assert_eq!(config.similar_items_k, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = EngineConfig {
            self_match_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = EngineConfig {
            scene_sample_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
