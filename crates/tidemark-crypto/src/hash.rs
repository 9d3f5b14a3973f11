use sha3::{Digest, Sha3_256};
use tidemark_core::types::{KeyId, PubKey, ScriptId, TxId};

/// Compute BLAKE3 hash of arbitrary bytes → 32-byte array.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// SHA3-256 of the concatenation of `parts`.
pub fn sha3_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn hash20(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&blake3_hash(data)[..20]);
    out
}

/// Derive the 20-byte key hash of a compressed public key.
pub fn key_id_from_pubkey(pubkey: &PubKey) -> KeyId {
    KeyId(hash20(pubkey.as_bytes()))
}

/// Derive the 20-byte script hash of serialized script bytes.
pub fn script_id_from_bytes(script: &[u8]) -> ScriptId {
    ScriptId(hash20(script))
}

/// Derive a TxId from the canonical transaction body bytes using BLAKE3.
pub fn tx_id_from_body(body_bytes: &[u8]) -> TxId {
    TxId::from_bytes(blake3_hash(body_bytes))
}
