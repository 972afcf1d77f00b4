//! Inspector Configuration

use serde::Deserialize;

use crate::Result;

/// Default positional marker attribute written by the framework's debug listener
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-ngid";

/// Default separator between marker path segments
pub const DEFAULT_MARKER_SEPARATOR: char = '#';

/// Inspector configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Positional marker convention
    pub marker: MarkerConfig,

    /// Attributes never reported as component properties
    pub reserved_attributes: Vec<String>,

    /// State keys starting with this prefix are framework bookkeeping
    pub reserved_state_prefix: String,

    /// Which part of the surface the mutation observer watches
    pub observe_scope: ObserveScope,

    /// Largest run of empty slots an out-of-order add may open in the model
    pub max_index_gap: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            marker: MarkerConfig::default(),
            reserved_attributes: vec!["class".to_string(), DEFAULT_MARKER_ATTRIBUTE.to_string()],
            reserved_state_prefix: "__".to_string(),
            observe_scope: ObserveScope::Roots,
            max_index_gap: 64,
        }
    }
}

impl InspectorConfig {
    /// Parse overrides from JSON; absent keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_observe_scope(mut self, scope: ObserveScope) -> Self {
        self.observe_scope = scope;
        self
    }

    pub fn is_reserved_attribute(&self, name: &str) -> bool {
        name == self.marker.attribute || self.reserved_attributes.iter().any(|r| r == name)
    }

    pub fn is_reserved_state_key(&self, key: &str) -> bool {
        !self.reserved_state_prefix.is_empty() && key.starts_with(&self.reserved_state_prefix)
    }
}

/// Framework-assigned positional marker
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Attribute holding the marker, e.g. `data-ngid="0#2#1"`
    pub attribute: String,
    /// Segment separator inside the marker
    pub separator: char,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            separator: DEFAULT_MARKER_SEPARATOR,
        }
    }
}

/// Observation scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObserveScope {
    /// Each root's own subtree, plus the child lists of the roots' parents
    /// so roots coming and going are reported. Other content is unwatched.
    #[default]
    Roots,
    /// The whole document
    Document,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InspectorConfig::default();
        assert_eq!(config.marker.attribute, "data-ngid");
        assert_eq!(config.marker.separator, '#');
        assert!(config.is_reserved_attribute("class"));
        assert!(config.is_reserved_attribute("data-ngid"));
        assert!(!config.is_reserved_attribute("title"));
        assert!(config.is_reserved_state_key("__ngContext"));
        assert!(!config.is_reserved_state_key("count"));
    }

    #[test]
    fn test_partial_json_override() {
        let config = InspectorConfig::from_json_str(
            r#"{ "observe_scope": "document", "marker": { "attribute": "data-cid" } }"#,
        ).unwrap();

        assert_eq!(config.observe_scope, ObserveScope::Document);
        assert_eq!(config.marker.attribute, "data-cid");
        assert_eq!(config.marker.separator, '#');
        assert!(config.is_reserved_attribute("data-cid"));
        assert_eq!(config.max_index_gap, 64);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = InspectorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::InspectorError::Config(_)));
    }
}
