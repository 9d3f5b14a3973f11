use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Amount, AssetId, Destination};
use tracing::info;

use crate::db::{StateDb, Utxo};
use crate::engine::ChainEngine;
use crate::wallet::Wallet;

/// Explicitly owned node state: database, ledger engine and wallet.
///
/// Opened once at startup and passed by `Arc` to every component that
/// needs it; `close` flushes the database.
pub struct NodeHandle {
    pub db: Arc<StateDb>,
    pub engine: ChainEngine,
    pub wallet: Wallet,
}

impl NodeHandle {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TidemarkError> {
        let db = Arc::new(StateDb::open(path.as_ref())?);
        info!(path = %path.as_ref().display(), "opened node state");
        Ok(Self::from_db(db))
    }

    pub fn open_temporary() -> Result<Self, TidemarkError> {
        Ok(Self::from_db(Arc::new(StateDb::open_temporary()?)))
    }

    pub fn from_db(db: Arc<StateDb>) -> Self {
        Self { engine: ChainEngine::new(db.clone()), wallet: Wallet::new(db.clone()), db }
    }

    /// Destinations the wallet can sign for.
    pub fn owned_destinations(&self) -> Result<HashSet<Destination>, TidemarkError> {
        Ok(self
            .wallet
            .owned_key_ids()?
            .into_iter()
            .map(Destination::PubKeyHash)
            .collect())
    }

    pub fn owned_unspent(&self, asset: &AssetId) -> Result<Vec<Utxo>, TidemarkError> {
        self.engine.unspent_for(asset, &self.owned_destinations()?)
    }

    pub fn balance(&self, asset: &AssetId) -> Result<Amount, TidemarkError> {
        self.engine.balance_for(asset, &self.owned_destinations()?)
    }

    pub fn close(&self) -> Result<(), TidemarkError> {
        self.db.flush()?;
        info!("closed node state");
        Ok(())
    }
}
