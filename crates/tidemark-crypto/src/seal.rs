use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tidemark_core::constants::{KYC_SEAL_CONTEXT, SEAL_NONCE_LEN};
use tidemark_core::error::TidemarkError;
use tidemark_core::types::PubKey;
use zeroize::Zeroizing;

use crate::keypair::KeyPair;

/// Fresh random nonce for one sealed body.
pub fn random_nonce() -> [u8; SEAL_NONCE_LEN] {
    let mut nonce = [0u8; SEAL_NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

fn seal_key(ours: &KeyPair, theirs: &PubKey) -> Result<Zeroizing<[u8; 32]>, TidemarkError> {
    let shared = ours.shared_secret(theirs)?;
    Ok(Zeroizing::new(blake3::derive_key(KYC_SEAL_CONTEXT, shared.as_ref())))
}

/// Encrypt `plaintext` to the owner of `theirs` (ChaCha20-Poly1305 under a
/// BLAKE3-derived ECDH key). Either side of the pair can open it.
pub fn seal(
    ours: &KeyPair,
    theirs: &PubKey,
    nonce: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, TidemarkError> {
    if nonce.len() != SEAL_NONCE_LEN {
        return Err(TidemarkError::Seal(format!("nonce must be {SEAL_NONCE_LEN} bytes")));
    }
    let key = seal_key(ours, theirs)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| TidemarkError::Seal("encryption failed".into()))
}

pub fn open(
    ours: &KeyPair,
    theirs: &PubKey,
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, TidemarkError> {
    if nonce.len() != SEAL_NONCE_LEN {
        return Err(TidemarkError::Seal(format!("nonce must be {SEAL_NONCE_LEN} bytes")));
    }
    let key = seal_key(ours, theirs)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| TidemarkError::Seal("authentication failed: wrong key or corrupted body".into()))
}
