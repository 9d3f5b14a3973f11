use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ASSET_ID_DOMAIN, PUBKEY_HASH_VERSION, SCRIPT_HASH_VERSION};
use crate::error::TidemarkError;

/// Amount in base units of whichever asset an output carries.
pub type Amount = u64;

/// Block height. Genesis is height 0.
pub type Height = u64;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

// ── TxId ─────────────────────────────────────────────────────────────────────

/// 32-byte transaction identifier: BLAKE3 of the canonical serialized tx body.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, TidemarkError> {
        let bytes = hex::decode(s).map_err(|e| TidemarkError::InvalidTxId(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TidemarkError::InvalidTxId(format!("expected 32 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({}…)", &self.to_hex()[..16])
    }
}

// ── OutPoint ─────────────────────────────────────────────────────────────────

/// Reference to one output of a previous transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Storage key: txid bytes followed by the big-endian output index.
    pub fn to_key(&self) -> [u8; 36] {
        let mut key = [0u8; 36];
        key[..32].copy_from_slice(&self.txid.0);
        key[32..].copy_from_slice(&self.vout.to_be_bytes());
        key
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutPoint({:?}:{})", self.txid, self.vout)
    }
}

// ── AssetId ──────────────────────────────────────────────────────────────────

/// 32-byte asset tag: BLAKE3(ASSET_ID_DOMAIN || label).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    pub fn from_label(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ASSET_ID_DOMAIN);
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({}…)", &self.to_hex()[..16])
    }
}

// ── PubKey ───────────────────────────────────────────────────────────────────

/// Compressed SEC1 secp256k1 public key (33 bytes).
///
/// Held as raw bytes; point validity is checked by `tidemark-crypto`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PubKey(pub Vec<u8>);

impl PubKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, TidemarkError> {
        let bytes = hex::decode(s).map_err(|e| TidemarkError::InvalidKey(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PubKey({}…)", &hex[..hex.len().min(16)])
    }
}

// ── KeyId / ScriptId ─────────────────────────────────────────────────────────

/// 20-byte key hash: first 20 bytes of BLAKE3(compressed pubkey).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct KeyId(pub [u8; 20]);

/// 20-byte script hash: first 20 bytes of BLAKE3(script bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct ScriptId(pub [u8; 20]);

// ── Destination ──────────────────────────────────────────────────────────────

/// Where an output pays to, and the identity a whitelist entry admits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Destination {
    /// Pay to the hash of a single (tweaked) public key.
    PubKeyHash(KeyId),
    /// Pay to the hash of a multisig script built from tweaked keys.
    ScriptHash(ScriptId),
}

impl Destination {
    fn version_and_payload(&self) -> (u8, &[u8; 20]) {
        match self {
            Destination::PubKeyHash(id) => (PUBKEY_HASH_VERSION, &id.0),
            Destination::ScriptHash(id) => (SCRIPT_HASH_VERSION, &id.0),
        }
    }

    /// Storage key: version byte followed by the 20-byte hash.
    pub fn to_key(&self) -> [u8; 21] {
        let (version, payload) = self.version_and_payload();
        let mut key = [0u8; 21];
        key[0] = version;
        key[1..].copy_from_slice(payload);
        key
    }

    /// Base-58 address: version || hash || first 4 bytes of BLAKE3(version || hash).
    pub fn to_address(&self) -> String {
        let key = self.to_key();
        let checksum = blake3::hash(&key);
        let mut raw = key.to_vec();
        raw.extend_from_slice(&checksum.as_bytes()[..4]);
        bs58::encode(raw).into_string()
    }

    pub fn from_address(s: &str) -> Result<Self, TidemarkError> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|e| TidemarkError::InvalidAddress(format!("{s}: {e}")))?;
        if raw.len() != 25 {
            return Err(TidemarkError::InvalidAddress(format!(
                "{s}: expected 25 bytes, got {}",
                raw.len()
            )));
        }
        let (key, checksum) = raw.split_at(21);
        if &blake3::hash(key).as_bytes()[..4] != checksum {
            return Err(TidemarkError::InvalidAddress(format!("{s}: bad checksum")));
        }
        let mut id = [0u8; 20];
        id.copy_from_slice(&key[1..]);
        match key[0] {
            PUBKEY_HASH_VERSION => Ok(Destination::PubKeyHash(KeyId(id))),
            SCRIPT_HASH_VERSION => Ok(Destination::ScriptHash(ScriptId(id))),
            v => Err(TidemarkError::InvalidAddress(format!("{s}: unknown version byte {v:#04x}"))),
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Destination::ScriptHash(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Destination({})", self.to_address())
    }
}
