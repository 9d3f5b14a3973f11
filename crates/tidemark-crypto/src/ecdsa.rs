use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::PubKey;

/// Parse a compressed or uncompressed SEC1 key, rejecting points off the curve.
pub fn parse_point(pubkey: &PubKey) -> Result<k256::PublicKey, TidemarkError> {
    k256::PublicKey::from_sec1_bytes(pubkey.as_bytes())
        .map_err(|_| TidemarkError::InvalidKey(format!("{pubkey}: not a valid secp256k1 point")))
}

/// Compressed 33-byte encoding of a curve point.
pub fn encode_point(point: &k256::PublicKey) -> PubKey {
    PubKey(point.to_encoded_point(true).as_bytes().to_vec())
}

/// Canonicalize a key to its compressed form; fails on invalid points.
pub fn normalize_pubkey(pubkey: &PubKey) -> Result<PubKey, TidemarkError> {
    Ok(encode_point(&parse_point(pubkey)?))
}

/// Sign `message` with a secp256k1 secret key. Returns a 64-byte compact signature.
pub fn sign(secret: &k256::SecretKey, message: &[u8]) -> Vec<u8> {
    let signing_key = SigningKey::from(secret);
    let sig: Signature = signing_key.sign(message);
    sig.to_bytes().to_vec()
}

/// Verify a compact ECDSA signature.
pub fn verify_signature(
    public_key: &PubKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), TidemarkError> {
    let vk = VerifyingKey::from_sec1_bytes(public_key.as_bytes())
        .map_err(|_| TidemarkError::InvalidKey(public_key.to_string()))?;
    let sig = Signature::from_slice(signature)
        .map_err(|_| TidemarkError::InvalidSignature("malformed signature".into()))?;
    vk.verify(message, &sig)
        .map_err(|_| TidemarkError::InvalidSignature("signature does not verify".into()))
}
