use k256::elliptic_curve::ff::PrimeField;
use k256::elliptic_curve::Field;
use k256::{ProjectivePoint, Scalar, SecretKey};
use tidemark_core::constants::TWEAK_DOMAIN;
use tidemark_core::entry::OnboardEntry;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Destination, PubKey};

use crate::ecdsa::{encode_point, parse_point};
use crate::hash::{key_id_from_pubkey, sha3_256};
use crate::keypair::KeyPair;
use crate::script::multisig_destination;

/// Binds user keys to one chain's onboarding key.
///
/// For a user key `P` and onboarding key `K` the tweak is
/// `t = SHA3-256(TWEAK_DOMAIN || K || P)` and the tweaked key is
/// `P' = P + t*G`. The holder of `P`'s secret `s` spends with `s + t`.
/// Addresses admitted to the whitelist are always derived from `P'`.
#[derive(Clone, Debug)]
pub struct KeyTweaker {
    onboarding_key: PubKey,
}

impl KeyTweaker {
    pub fn new(onboarding_key: PubKey) -> Result<Self, TidemarkError> {
        let onboarding_key = crate::ecdsa::normalize_pubkey(&onboarding_key)?;
        Ok(Self { onboarding_key })
    }

    pub fn onboarding_key(&self) -> &PubKey {
        &self.onboarding_key
    }

    fn tweak_scalar(&self, user: &PubKey) -> Result<Scalar, TidemarkError> {
        let digest = sha3_256(&[TWEAK_DOMAIN, self.onboarding_key.as_bytes(), user.as_bytes()]);
        let scalar: Option<Scalar> = Scalar::from_repr(digest.into()).into();
        match scalar {
            Some(t) if !bool::from(t.is_zero()) => Ok(t),
            _ => Err(TidemarkError::InvalidKey(format!("{user}: tweak out of range"))),
        }
    }

    /// Deterministic tweaked form of `user`.
    pub fn tweak(&self, user: &PubKey) -> Result<PubKey, TidemarkError> {
        let point = parse_point(user)?;
        let user = encode_point(&point);
        let t = self.tweak_scalar(&user)?;
        let tweaked = point.to_projective() + ProjectivePoint::GENERATOR * t;
        let tweaked = k256::PublicKey::from_affine(tweaked.to_affine())
            .map_err(|_| TidemarkError::InvalidKey(format!("{user}: tweaked key is the identity")))?;
        Ok(encode_point(&tweaked))
    }

    /// True iff `tweaked` is exactly the tweak of `user`.
    pub fn verify(&self, user: &PubKey, tweaked: &PubKey) -> bool {
        match (self.tweak(user), crate::ecdsa::normalize_pubkey(tweaked)) {
            (Ok(expected), Ok(given)) => expected == given,
            _ => false,
        }
    }

    /// Spending keypair for the tweaked form of `user`'s key.
    pub fn tweak_secret(&self, user: &KeyPair) -> Result<KeyPair, TidemarkError> {
        let t = self.tweak_scalar(&user.public_key)?;
        let s: Scalar = *user.secret_key().to_nonzero_scalar();
        let tweaked = s + t;
        if bool::from(tweaked.is_zero()) {
            return Err(TidemarkError::InvalidKey("tweaked secret is zero".into()));
        }
        let secret = SecretKey::from_bytes(&tweaked.to_repr())
            .map_err(|_| TidemarkError::InvalidKey("tweaked secret out of range".into()))?;
        Ok(KeyPair::from_secret(secret))
    }

    /// Pay-to-key-hash address of the tweaked form of `user`.
    pub fn address_for(&self, user: &PubKey) -> Result<Destination, TidemarkError> {
        Ok(Destination::PubKeyHash(key_id_from_pubkey(&self.tweak(user)?)))
    }

    /// Script-hash address of an N-of-M group over the tweaked member keys.
    pub fn multisig_address(
        &self,
        threshold: usize,
        pubkeys: &[PubKey],
    ) -> Result<Destination, TidemarkError> {
        let tweaked = pubkeys.iter().map(|pk| self.tweak(pk)).collect::<Result<Vec<_>, _>>()?;
        multisig_destination(threshold, &tweaked)
    }

    /// Check entry shape and return the destination it admits.
    ///
    /// A single-key entry's stated address must equal the hash of its
    /// tweaked key, otherwise `TweakMismatch`.
    pub fn entry_destination(&self, entry: &OnboardEntry) -> Result<Destination, TidemarkError> {
        entry.check_shape()?;
        match entry {
            OnboardEntry::SingleKey(e) => {
                let derived = self.address_for(&e.pubkey)?;
                if derived != e.address {
                    return Err(TidemarkError::TweakMismatch { address: e.address.to_address() });
                }
                Ok(derived)
            }
            OnboardEntry::Multisig(e) => self.multisig_address(e.threshold, &e.pubkeys),
        }
    }
}
