use serde::{Deserialize, Serialize};

use tidemark_kyc::{OnboardingReceipt, ValidationReport};
use tidemark_state::{AddressInfo, Block};

/// One single-key identity as sent by callers of `tidemark_createKycFile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcSingleKeyEntry {
    pub address: String,
    /// Untweaked public key, hex.
    pub pubkey: String,
}

/// One N-of-M group identity over untweaked keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcMultisigEntry {
    #[serde(rename = "nmultisig")]
    pub threshold: usize,
    pub pubkeys: Vec<String>,
}

/// Returned by `tidemark_createKycFile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcCreatedKycFile {
    #[serde(rename = "onboardpubkey")]
    pub onboard_pubkey: String,
    #[serde(rename = "kycfile")]
    pub kyc_file: String,
}

/// Returned by `tidemark_validateKycFile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcValidation {
    #[serde(rename = "iswhitelisted")]
    pub is_whitelisted: bool,
    pub addresses: Vec<String>,
}

impl From<ValidationReport> for RpcValidation {
    fn from(r: ValidationReport) -> Self {
        Self {
            is_whitelisted: r.is_whitelisted,
            addresses: r.addresses.iter().map(|a| a.to_address()).collect(),
        }
    }
}

/// Returned by `tidemark_onboardUser` and `tidemark_readWhitelist`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcOnboardReceipt {
    pub txid: String,
    pub addresses: Vec<String>,
    pub skipped: usize,
}

impl From<OnboardingReceipt> for RpcOnboardReceipt {
    fn from(r: OnboardingReceipt) -> Self {
        Self {
            txid: r.tx_id.to_hex(),
            addresses: r.members.iter().map(|a| a.to_address()).collect(),
            skipped: r.skipped,
        }
    }
}

/// Returned by `tidemark_validateAddress` and `tidemark_importPrivKey`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcAddressInfo {
    pub address: String,
    #[serde(rename = "ismine")]
    pub is_mine: bool,
    /// Spending (tweaked) key, when the wallet holds it.
    pub pubkey: Option<String>,
    /// Untweaked key the address was derived from.
    #[serde(rename = "derivedpubkey")]
    pub derived_pubkey: Option<String>,
}

impl From<AddressInfo> for RpcAddressInfo {
    fn from(info: AddressInfo) -> Self {
        Self {
            address: info.address.to_address(),
            is_mine: info.is_mine,
            pubkey: info.pubkey.map(|k| k.to_hex()),
            derived_pubkey: info.derived_pubkey.map(|k| k.to_hex()),
        }
    }
}

/// Returned by `tidemark_createMultisig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcMultisig {
    pub address: String,
    /// `[N, M, tweaked keys…]`, hex.
    #[serde(rename = "redeemscript")]
    pub redeem_script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcBlock {
    pub height: u64,
    pub timestamp: i64,
    pub tx: Vec<String>,
}

impl From<Block> for RpcBlock {
    fn from(b: Block) -> Self {
        Self {
            height: b.height,
            timestamp: b.timestamp,
            tx: b.tx_ids.iter().map(|t| t.to_hex()).collect(),
        }
    }
}

/// Returned by `tidemark_getRawTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcRawTransaction {
    pub txid: String,
    /// Hex-encoded bincode(Transaction).
    pub hex: String,
    /// `None` while the transaction is pending.
    pub height: Option<u64>,
    pub confirmations: u64,
}
