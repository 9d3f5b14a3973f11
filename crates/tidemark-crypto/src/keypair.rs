use k256::SecretKey;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Destination, KeyId, PubKey};
use zeroize::Zeroizing;

use crate::ecdsa::{encode_point, sign};
use crate::hash::key_id_from_pubkey;

/// A secp256k1 keypair with its compressed public key and key hash.
///
/// `k256::SecretKey` wipes its scalar on drop; exported bytes are wrapped
/// in `Zeroizing`.
#[derive(Clone)]
pub struct KeyPair {
    pub key_id: KeyId,
    pub public_key: PubKey,
    secret_key: SecretKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut rand::rngs::OsRng))
    }

    pub fn from_secret(secret_key: SecretKey) -> Self {
        let public_key = encode_point(&secret_key.public_key());
        let key_id = key_id_from_pubkey(&public_key);
        Self { key_id, public_key, secret_key }
    }

    /// Restore a KeyPair from a raw 32-byte scalar (e.g. loaded from the wallet tree).
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, TidemarkError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| TidemarkError::InvalidKey("secret key is not a valid scalar".into()))?;
        Ok(Self::from_secret(secret))
    }

    pub fn from_secret_hex(s: &str) -> Result<Self, TidemarkError> {
        let bytes = Zeroizing::new(
            hex::decode(s.trim()).map_err(|e| TidemarkError::InvalidKey(format!("secret hex: {e}")))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// Sign `message` using this keypair's secret key.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        sign(&self.secret_key, message)
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret_key.to_bytes().to_vec())
    }

    /// The pay-to-key-hash destination of this key, untouched by any tweak.
    pub fn destination(&self) -> Destination {
        Destination::PubKeyHash(self.key_id)
    }

    /// Raw ECDH shared x-coordinate with `their_public`.
    pub fn shared_secret(&self, their_public: &PubKey) -> Result<Zeroizing<[u8; 32]>, TidemarkError> {
        let point = crate::ecdsa::parse_point(their_public)?;
        let shared =
            k256::ecdh::diffie_hellman(self.secret_key.to_nonzero_scalar(), point.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes());
        Ok(out)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}
