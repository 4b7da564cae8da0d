//! Join configuration.

use bindjoin_error::{JoinError, Result};
use bindjoin_exec::HashJoinSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinAlgorithm {
    #[default]
    Hash,
    NestedLoop,
}

/// Which input of a left join the hash table is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSide {
    /// Build from the preserved side; unmatched rows come after all matches.
    #[default]
    Left,
    /// Build from the optional side; unmatched rows are emitted in stream order.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    pub algorithm: JoinAlgorithm,
    pub left_join_build_side: BuildSide,
    /// Bound the probe table's seen variables by the join key.
    pub bound_seen_vars_by_key: bool,
    /// Infer a key from the first rows when none is supplied.
    pub infer_join_key: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            algorithm: JoinAlgorithm::Hash,
            left_join_build_side: BuildSide::Left,
            bound_seen_vars_by_key: true,
            infer_join_key: true,
        }
    }
}

impl JoinConfig {
    /// Parse a JSON object; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| JoinError::config(err.to_string()))
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: JoinAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn with_left_join_build_side(mut self, side: BuildSide) -> Self {
        self.left_join_build_side = side;
        self
    }

    #[must_use]
    pub fn hash_settings(&self) -> HashJoinSettings {
        HashJoinSettings {
            bound_seen_vars_by_key: self.bound_seen_vars_by_key,
            infer_join_key: self.infer_join_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(JoinConfig::from_json_str("{}").unwrap(), JoinConfig::default());
    }

    #[test]
    fn fields_parse_in_snake_case() {
        let config = JoinConfig::from_json_str(
            r#"{"algorithm":"nested_loop","left_join_build_side":"right","infer_join_key":false}"#,
        )
        .unwrap();
        assert_eq!(config.algorithm, JoinAlgorithm::NestedLoop);
        assert_eq!(config.left_join_build_side, BuildSide::Right);
        assert!(config.bound_seen_vars_by_key);
        assert!(!config.hash_settings().infer_join_key);
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let err = JoinConfig::from_json_str(r#"{"algorithm":"merge"}"#).unwrap_err();
        assert!(matches!(err, JoinError::Config { .. }));
        let err = JoinConfig::from_json_str(r#"{"algo":"hash"}"#).unwrap_err();
        assert!(matches!(err, JoinError::Config { .. }));
    }

    #[test]
    fn serializes_back_to_the_same_config() {
        let config = JoinConfig::default().with_algorithm(JoinAlgorithm::NestedLoop);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(JoinConfig::from_json_str(&json).unwrap(), config);
    }
}
