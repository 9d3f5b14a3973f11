use serde::{Deserialize, Serialize};
use std::path::Path;
use tidemark_core::constants::COIN;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Amount, Destination, PubKey, Timestamp};

/// Default WHITELIST supply held by the policy authority.
pub const DEFAULT_WHITELIST_SUPPLY: Amount = 500_000 * COIN;
/// Default native supply.
pub const DEFAULT_NATIVE_SUPPLY: Amount = 21_000_000 * COIN;

/// Founding allocations and the policy onboarding key.
///
/// Every node of one chain must use identical params; the genesis
/// transaction id is derived from them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenesisParams {
    pub native_supply: Amount,
    /// Address receiving the native supply.
    pub native_destination: String,
    pub whitelist_supply: Amount,
    /// Address of the whitelist holder (the policy authority).
    pub whitelist_destination: String,
    /// Hex of the compressed onboarding (KYC) public key.
    pub onboarding_pubkey: String,
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl GenesisParams {
    /// Params with default supplies for a local chain.
    pub fn regtest(native_to: Destination, whitelist_to: Destination, onboarding_key: &PubKey) -> Self {
        Self {
            native_supply: DEFAULT_NATIVE_SUPPLY,
            native_destination: native_to.to_address(),
            whitelist_supply: DEFAULT_WHITELIST_SUPPLY,
            whitelist_destination: whitelist_to.to_address(),
            onboarding_pubkey: onboarding_key.to_hex(),
            timestamp: 0,
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TidemarkError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| TidemarkError::Serialization(e.to_string()))
    }

    pub fn native_destination(&self) -> Result<Destination, TidemarkError> {
        Destination::from_address(&self.native_destination)
    }

    pub fn whitelist_destination(&self) -> Result<Destination, TidemarkError> {
        Destination::from_address(&self.whitelist_destination)
    }

    pub fn onboarding_key(&self) -> Result<PubKey, TidemarkError> {
        tidemark_crypto::normalize_pubkey(&PubKey::from_hex(&self.onboarding_pubkey)?)
    }
}
