//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for an [`crate::Engine`].
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use blackboard_core::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "trace_nodes": true }"#).unwrap();
/// assert!(config.trace_nodes);
/// assert!(config.dedup_constants);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reuse an existing equal constant in [`crate::Engine::constant`].
    pub dedup_constants: bool,

    /// Emit a `trace!` event for every node a pass touches.
    pub trace_nodes: bool,

    /// Upper argument count for the variadic standard library functions.
    pub max_variadic_args: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedup_constants: true,
            trace_nodes: false,
            max_variadic_args: 16,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn fields_override() {
        let config =
            EngineConfig::from_json_str(r#"{"dedup_constants": false, "max_variadic_args": 4}"#)
                .unwrap();
        assert!(!config.dedup_constants);
        assert_eq!(config.max_variadic_args, 4);
        assert!(!config.trace_nodes);
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let err = EngineConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }
}
