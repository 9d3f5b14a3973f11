use serde::{Deserialize, Serialize};
use std::path::Path;
use tidemark_core::constants::{DEFAULT_MIN_CONFIRMATIONS, MAX_MULTISIG_KEYS};
use tidemark_core::error::TidemarkError;

/// Configuration for whitelist onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Depth at which a registration counts as membership.
    pub min_confirmations: u64,
    /// Largest multisig group accepted in a KYC file (at most 15).
    pub max_multisig_keys: usize,
    /// Write KYC file entries encrypted to the onboarding key.
    pub seal_kyc_files: bool,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            max_multisig_keys: MAX_MULTISIG_KEYS,
            seal_kyc_files: true,
        }
    }
}

impl WhitelistConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TidemarkError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&text).map_err(|e| TidemarkError::Serialization(e.to_string()))?;
        if config.max_multisig_keys == 0 || config.max_multisig_keys > MAX_MULTISIG_KEYS {
            return Err(TidemarkError::Other(format!(
                "max_multisig_keys must be within 1..={MAX_MULTISIG_KEYS}"
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: WhitelistConfig = serde_json::from_str(r#"{"min_confirmations": 6}"#).unwrap();
        assert_eq!(cfg.min_confirmations, 6);
        assert_eq!(cfg.max_multisig_keys, MAX_MULTISIG_KEYS);
        assert!(cfg.seal_kyc_files);
    }
}
