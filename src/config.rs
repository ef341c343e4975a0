//! Signer Configuration
//!
//! Settings shared by every signing request handled by one chain instance:
//! - default derivation path template
//! - derivation batch limit
//! - the `value1` message compatibility rewrite
//! - debug logging

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::evm::address::PathTemplate;

pub const DEFAULT_PATH_TEMPLATE: &str = "m/44'/60'/0'/0/{index}";
pub const DEFAULT_MAX_DERIVATION_BATCH: usize = 1000;

/// Signer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignerConfig {
    /// Used when a derive request carries no template
    pub path_template: String,
    /// Largest accepted index list
    pub max_derivation_batch: usize,
    /// Apply the `value1` -> `value` message rewrite before hashing
    pub legacy_message_patch: bool,
    pub debug_logging: bool,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            max_derivation_batch: DEFAULT_MAX_DERIVATION_BATCH,
            legacy_message_patch: true,
            debug_logging: false,
        }
    }
}

impl SignerConfig {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        PathTemplate::parse(&self.path_template)?;
        if self.max_derivation_batch == 0 {
            return Err(CoreError::invalid_input("maxDerivationBatch must be greater than 0"));
        }
        Ok(())
    }

    pub fn default_path_template(&self) -> CoreResult<PathTemplate> {
        PathTemplate::parse(&self.path_template)
    }

    pub fn with_path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = template.into();
        self
    }

    pub fn with_legacy_message_patch(mut self, enabled: bool) -> Self {
        self.legacy_message_patch = enabled;
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SignerConfig::default();
        assert_eq!(config.path_template, "m/44'/60'/0'/0/{index}");
        assert_eq!(config.max_derivation_batch, 1000);
        assert!(config.legacy_message_patch);
        assert!(!config.debug_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SignerConfig::from_json(r#"{"legacyMessagePatch": false}"#).unwrap();
        assert!(!config.legacy_message_patch);
        assert_eq!(config.max_derivation_batch, DEFAULT_MAX_DERIVATION_BATCH);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SignerConfig::default().with_path_template("m/44'/60'/0'/0/0");
        assert!(matches!(config.validate(), Err(CoreError::InvalidPathTemplate(_))));

        let result = SignerConfig::from_json(r#"{"maxDerivationBatch": 0}"#);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
