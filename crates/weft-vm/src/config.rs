//! Module configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use weft_evm::VmParams;
use weft_storage::DbConfig;

use crate::error::VmResult;

/// Contract module configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Gas schedule and execution limits
    #[serde(default)]
    pub params: VmParams,
    /// State database options
    #[serde(default = "default_db_config")]
    pub db: DbConfig,
}

fn default_db_config() -> DbConfig {
    DbConfig::default()
}

impl VmConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> VmResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> VmResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(path = %path.display(), "loaded vm config");
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> VmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject unusable parameters
    pub fn validate(&self) -> VmResult<()> {
        self.params.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;
    use weft_evm::ParamsError;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = VmConfig::from_json("{}").unwrap();
        assert_eq!(config, VmConfig::default());
        assert_eq!(config.params.max_code_size, VmParams::default().max_code_size);
    }

    #[test]
    fn test_partial_params_override() {
        let config = VmConfig::from_json(r#"{"params": {"max_code_size": 100}}"#).unwrap();
        assert_eq!(config.params.max_code_size, 100);
        assert_eq!(config.params.call_create_depth, 1024);
        assert_eq!(config.params.op_gas.len(), 256);
    }

    #[test]
    fn test_rejects_zero_code_size() {
        let err = VmConfig::from_json(r#"{"params": {"max_code_size": 0}}"#).unwrap_err();
        assert!(matches!(err, VmError::InvalidParams(ParamsError::ZeroMaxCodeSize)));
    }

    #[test]
    fn test_rejects_short_gas_table() {
        let err = VmConfig::from_json(r#"{"params": {"op_gas": [1, 2, 3]}}"#).unwrap_err();
        assert!(matches!(err, VmError::InvalidParams(ParamsError::OpGasTableSize(3))));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vm.json");
        let mut config = VmConfig::default();
        config.params.call_stipend = 3000;
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        assert_eq!(VmConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(VmConfig::from_json("{"), Err(VmError::Json(_))));
    }
}
