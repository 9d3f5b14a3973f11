use serde::{Deserialize, Serialize};

use crate::constants::{MAX_MULTISIG_KEYS, PUBKEY_LEN};
use crate::error::TidemarkError;
use crate::types::{Destination, PubKey};

// ── OnboardEntry ──────────────────────────────────────────────────────────────

/// A plain pay-to-key-hash identity.
///
/// `pubkey` is the user's untweaked key; `address` must be the hash of its
/// tweaked form under the chain's onboarding key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingleKeyEntry {
    pub address: Destination,
    pub pubkey: PubKey,
}

/// An N-of-M group identity over untweaked member keys, in order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultisigEntry {
    pub threshold: usize,
    pub pubkeys: Vec<PubKey>,
}

/// One identity to admit to the whitelist.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OnboardEntry {
    SingleKey(SingleKeyEntry),
    Multisig(MultisigEntry),
}

impl MultisigEntry {
    pub fn new(threshold: usize, pubkeys: Vec<PubKey>) -> Result<Self, TidemarkError> {
        let entry = Self { threshold, pubkeys };
        entry.check_shape()?;
        Ok(entry)
    }

    /// `1 <= threshold <= keys <= MAX_MULTISIG_KEYS`, no repeated member key.
    pub fn check_shape(&self) -> Result<(), TidemarkError> {
        let keys = self.pubkeys.len();
        if self.threshold == 0 || self.threshold > keys || keys > MAX_MULTISIG_KEYS {
            return Err(TidemarkError::InvalidThreshold {
                threshold: self.threshold,
                keys,
                max: MAX_MULTISIG_KEYS,
            });
        }
        for (i, pk) in self.pubkeys.iter().enumerate() {
            if self.pubkeys[..i].contains(pk) {
                return Err(TidemarkError::InvalidKey(format!("duplicate multisig member {pk}")));
            }
        }
        Ok(())
    }
}

impl OnboardEntry {
    pub fn single(address: Destination, pubkey: PubKey) -> Self {
        OnboardEntry::SingleKey(SingleKeyEntry { address, pubkey })
    }

    /// Untweaked keys carried by the entry, in order.
    pub fn pubkeys(&self) -> &[PubKey] {
        match self {
            OnboardEntry::SingleKey(e) => std::slice::from_ref(&e.pubkey),
            OnboardEntry::Multisig(e) => &e.pubkeys,
        }
    }

    /// Byte-level checks that need no curve arithmetic.
    pub fn check_shape(&self) -> Result<(), TidemarkError> {
        for pk in self.pubkeys() {
            if pk.0.len() != PUBKEY_LEN {
                return Err(TidemarkError::InvalidKey(format!(
                    "{pk}: expected {PUBKEY_LEN} bytes, got {}",
                    pk.0.len()
                )));
            }
        }
        match self {
            OnboardEntry::SingleKey(e) => {
                if e.address.is_script() {
                    return Err(TidemarkError::InvalidAddress(format!(
                        "{}: single-key entries need a key-hash address",
                        e.address
                    )));
                }
                Ok(())
            }
            OnboardEntry::Multisig(e) => e.check_shape(),
        }
    }
}
