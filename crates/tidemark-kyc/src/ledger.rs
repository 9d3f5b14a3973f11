//! The two narrow seams through which onboarding reaches node state.
//!
//! `Ledger` covers chain reads and transaction submission; `KeyStore` covers
//! the onboarding keys held by the local wallet. `NodeHandle` implements both.

use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::Transaction;
use tidemark_core::types::{Amount, AssetId, Destination, PubKey, TxId};
use tidemark_crypto::KeyPair;
use tidemark_state::{MemberRecord, NodeHandle, Utxo};

pub trait Ledger: Send + Sync {
    /// Policy onboarding key fixed at genesis.
    fn onboarding_key(&self) -> Result<PubKey, TidemarkError>;
    fn asset_id(&self, label: &str) -> Result<AssetId, TidemarkError>;
    /// Confirmed outputs of `asset` the local wallet can spend.
    fn owned_unspent(&self, asset: &AssetId) -> Result<Vec<Utxo>, TidemarkError>;
    fn balance(&self, asset: &AssetId) -> Result<Amount, TidemarkError>;
    fn sign_transaction(&self, tx: &mut Transaction) -> Result<(), TidemarkError>;
    fn submit_transaction(&self, tx: &Transaction) -> Result<TxId, TidemarkError>;
    fn member(&self, destination: &Destination) -> Result<Option<MemberRecord>, TidemarkError>;
    fn is_registration_pending(&self, destination: &Destination) -> Result<bool, TidemarkError>;
    /// `Some(0)` while pending, `None` for unknown transactions.
    fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, TidemarkError>;
}

pub trait KeyStore: Send + Sync {
    fn new_onboard_keypair(&self) -> Result<KeyPair, TidemarkError>;
    fn onboard_keypair(&self, pubkey: &PubKey) -> Result<Option<KeyPair>, TidemarkError>;
    /// Secret of the onboarding key; only the policy node has it.
    fn kyc_keypair(&self) -> Result<Option<KeyPair>, TidemarkError>;
    /// `(address, untweaked pubkey)` for every derived wallet address.
    fn derived_keys(&self) -> Result<Vec<(Destination, PubKey)>, TidemarkError>;
}

impl Ledger for NodeHandle {
    fn onboarding_key(&self) -> Result<PubKey, TidemarkError> {
        self.db.onboarding_key()
    }

    fn asset_id(&self, label: &str) -> Result<AssetId, TidemarkError> {
        self.engine.asset_id(label)
    }

    fn owned_unspent(&self, asset: &AssetId) -> Result<Vec<Utxo>, TidemarkError> {
        NodeHandle::owned_unspent(self, asset)
    }

    fn balance(&self, asset: &AssetId) -> Result<Amount, TidemarkError> {
        NodeHandle::balance(self, asset)
    }

    fn sign_transaction(&self, tx: &mut Transaction) -> Result<(), TidemarkError> {
        self.wallet.sign_transaction(tx)
    }

    fn submit_transaction(&self, tx: &Transaction) -> Result<TxId, TidemarkError> {
        self.engine.submit(tx)
    }

    fn member(&self, destination: &Destination) -> Result<Option<MemberRecord>, TidemarkError> {
        self.engine.member(destination)
    }

    fn is_registration_pending(&self, destination: &Destination) -> Result<bool, TidemarkError> {
        self.engine.is_registration_pending(destination)
    }

    fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, TidemarkError> {
        self.engine.confirmations(tx_id)
    }
}

impl KeyStore for NodeHandle {
    fn new_onboard_keypair(&self) -> Result<KeyPair, TidemarkError> {
        self.wallet.new_onboard_keypair()
    }

    fn onboard_keypair(&self, pubkey: &PubKey) -> Result<Option<KeyPair>, TidemarkError> {
        self.wallet.onboard_keypair(pubkey)
    }

    fn kyc_keypair(&self) -> Result<Option<KeyPair>, TidemarkError> {
        self.wallet.kyc_keypair()
    }

    fn derived_keys(&self) -> Result<Vec<(Destination, PubKey)>, TidemarkError> {
        self.wallet.derived_keys()
    }
}
