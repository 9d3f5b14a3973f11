use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::{Transaction, Witness};
use tidemark_core::types::{Destination, KeyId, PubKey};
use tidemark_crypto::{key_id_from_pubkey, tx_id_from_body, KeyPair, KeyTweaker};
use tracing::debug;

use crate::db::StateDb;

const SPEND_PREFIX: &[u8] = b"spend/";
const ONBOARD_PREFIX: &[u8] = b"onboard/";

/// A secret able to sign for one pay-to-key-hash destination.
///
/// `derived_from` is set for addresses handed out by `get_new_address`: it
/// holds the untweaked key whose tweak produced the spend key.
#[derive(Clone, Serialize, Deserialize)]
struct SpendKey {
    secret: Vec<u8>,
    derived_from: Option<PubKey>,
}

#[derive(Clone, Serialize, Deserialize)]
struct OnboardKey {
    secret: Vec<u8>,
}

/// Result of `get_new_address`, `import_privkey` and `validate_address`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: Destination,
    pub is_mine: bool,
    /// Key that signs for the address (the tweaked key for derived addresses).
    pub pubkey: Option<PubKey>,
    /// Untweaked key the address was derived from.
    pub derived_pubkey: Option<PubKey>,
}

/// Node-local key store persisted in the `wallet` tree.
pub struct Wallet {
    db: Arc<StateDb>,
}

fn spend_key(id: &KeyId) -> Vec<u8> {
    [SPEND_PREFIX, &id.0[..]].concat()
}

impl Wallet {
    pub fn new(db: Arc<StateDb>) -> Self {
        Self { db }
    }

    fn tweaker(&self) -> Result<KeyTweaker, TidemarkError> {
        KeyTweaker::new(self.db.onboarding_key()?)
    }

    fn store_spend(&self, kp: &KeyPair, derived_from: Option<PubKey>) -> Result<(), TidemarkError> {
        let record = SpendKey { secret: kp.secret_bytes().to_vec(), derived_from };
        self.db.put_wallet(&spend_key(&kp.key_id), &record)
    }

    /// Fresh address bound to this chain's onboarding key.
    pub fn get_new_address(&self) -> Result<AddressInfo, TidemarkError> {
        let base = KeyPair::generate();
        let spend = self.tweaker()?.tweak_secret(&base)?;
        self.store_spend(&spend, Some(base.public_key.clone()))?;
        debug!(address = %spend.destination(), "generated derived address");
        Ok(AddressInfo {
            address: spend.destination(),
            is_mine: true,
            pubkey: Some(spend.public_key.clone()),
            derived_pubkey: Some(base.public_key),
        })
    }

    /// Import a raw secret as a plain, untweaked key.
    pub fn import_privkey(&self, secret_hex: &str) -> Result<AddressInfo, TidemarkError> {
        let kp = KeyPair::from_secret_hex(secret_hex)?;
        self.store_spend(&kp, None)?;
        debug!(address = %kp.destination(), "imported private key");
        Ok(AddressInfo {
            address: kp.destination(),
            is_mine: true,
            pubkey: Some(kp.public_key.clone()),
            derived_pubkey: None,
        })
    }

    /// Derived addresses must still match their untweaked key under this
    /// chain's onboarding key.
    pub fn validate_address(&self, address: &Destination) -> Result<AddressInfo, TidemarkError> {
        let record = match address {
            Destination::PubKeyHash(id) => self.db.get_wallet::<SpendKey>(&spend_key(id))?,
            Destination::ScriptHash(_) => None,
        };
        match record {
            Some(rec) => {
                let kp = KeyPair::from_secret_bytes(&rec.secret)?;
                if let Some(base) = &rec.derived_from {
                    if !self.tweaker()?.verify(base, &kp.public_key) {
                        return Err(TidemarkError::TweakMismatch { address: address.to_address() });
                    }
                }
                Ok(AddressInfo {
                    address: *address,
                    is_mine: true,
                    pubkey: Some(kp.public_key),
                    derived_pubkey: rec.derived_from,
                })
            }
            None => Ok(AddressInfo { address: *address, is_mine: false, pubkey: None, derived_pubkey: None }),
        }
    }

    pub fn spend_keypair(&self, id: &KeyId) -> Result<Option<KeyPair>, TidemarkError> {
        match self.db.get_wallet::<SpendKey>(&spend_key(id))? {
            Some(rec) => Ok(Some(KeyPair::from_secret_bytes(&rec.secret)?)),
            None => Ok(None),
        }
    }

    /// Key hashes this wallet can sign for.
    pub fn owned_key_ids(&self) -> Result<Vec<KeyId>, TidemarkError> {
        let mut ids = Vec::new();
        for (suffix, _) in self.db.scan_wallet::<SpendKey>(SPEND_PREFIX)? {
            let arr: [u8; 20] = suffix
                .as_slice()
                .try_into()
                .map_err(|_| TidemarkError::Storage("corrupt wallet key".into()))?;
            ids.push(KeyId(arr));
        }
        Ok(ids)
    }

    /// `(address, untweaked pubkey)` for every derived address.
    pub fn derived_keys(&self) -> Result<Vec<(Destination, PubKey)>, TidemarkError> {
        let mut out = Vec::new();
        for (_, rec) in self.db.scan_wallet::<SpendKey>(SPEND_PREFIX)? {
            if let Some(base) = rec.derived_from {
                let kp = KeyPair::from_secret_bytes(&rec.secret)?;
                out.push((kp.destination(), base));
            }
        }
        Ok(out)
    }

    // ── Onboarding keys ──────────────────────────────────────────────────────

    pub fn new_onboard_keypair(&self) -> Result<KeyPair, TidemarkError> {
        let kp = KeyPair::generate();
        let key = [ONBOARD_PREFIX, kp.public_key.as_bytes()].concat();
        self.db.put_wallet(&key, &OnboardKey { secret: kp.secret_bytes().to_vec() })?;
        Ok(kp)
    }

    pub fn onboard_keypair(&self, pubkey: &PubKey) -> Result<Option<KeyPair>, TidemarkError> {
        let key = [ONBOARD_PREFIX, pubkey.as_bytes()].concat();
        match self.db.get_wallet::<OnboardKey>(&key)? {
            Some(rec) => Ok(Some(KeyPair::from_secret_bytes(&rec.secret)?)),
            None => Ok(None),
        }
    }

    /// The policy onboarding keypair, present only on the policy node.
    pub fn kyc_keypair(&self) -> Result<Option<KeyPair>, TidemarkError> {
        let onboarding_key = self.db.onboarding_key()?;
        self.spend_keypair(&key_id_from_pubkey(&onboarding_key))
    }

    // ── Signing ──────────────────────────────────────────────────────────────

    /// Fix the transaction id and attach a witness to every input.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> Result<(), TidemarkError> {
        let body = tx.body_bytes();
        tx.tx_id = tx_id_from_body(&body);
        for input in tx.inputs.iter_mut() {
            let utxo = self
                .db
                .get_utxo(&input.prevout)?
                .ok_or_else(|| TidemarkError::UnknownInput(input.prevout.to_string()))?;
            let id = match utxo.output.destination() {
                Some(Destination::PubKeyHash(id)) => *id,
                _ => return Err(TidemarkError::MissingSecret(input.prevout.to_string())),
            };
            let kp = self
                .spend_keypair(&id)?
                .ok_or_else(|| TidemarkError::MissingSecret(Destination::PubKeyHash(id).to_address()))?;
            input.witness = Some(Witness { pubkey: kp.public_key.clone(), signature: kp.sign(&body) });
        }
        Ok(())
    }
}
