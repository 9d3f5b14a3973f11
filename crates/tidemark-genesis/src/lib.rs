//! tidemark-genesis
//!
//! Builds the founding ledger state, writing directly into a `StateDb`
//! without going through mempool admission (the genesis transaction has no
//! inputs and no signatures).
//!
//! Genesis allocations:
//!
//! 1. Native supply     → `native_destination`
//! 2. WHITELIST supply  → `whitelist_destination` (the policy authority)
//!
//! The policy onboarding key is recorded in chain metadata. It is never
//! rotated; every registration must be addressed to it.

pub mod params;

pub use params::GenesisParams;

use tidemark_core::constants::{META_ONBOARDING_KEY, NATIVE_ASSET_LABEL, WHITELIST_ASSET_LABEL};
use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::{Transaction, TxOut};
use tidemark_core::types::{Amount, AssetId, OutPoint, TxId};
use tidemark_crypto::tx_id_from_body;
use tidemark_state::{Block, StateDb, TxRecord, Utxo};
use tracing::info;

/// What genesis created.
#[derive(Clone, Debug)]
pub struct GenesisInfo {
    pub tx_id: TxId,
    pub native_asset: AssetId,
    pub whitelist_asset: AssetId,
    pub whitelist_outpoint: OutPoint,
}

/// Apply the genesis state to an empty `StateDb`.
///
/// This is the only place assets are created. Fails with
/// `GenesisAlreadyApplied` if the database already has a block.
pub fn apply_genesis(db: &StateDb, params: &GenesisParams) -> Result<GenesisInfo, TidemarkError> {
    if db.tip_height()?.is_some() {
        return Err(TidemarkError::GenesisAlreadyApplied);
    }
    info!("applying Tidemark genesis state");

    let native_asset = AssetId::from_label(NATIVE_ASSET_LABEL);
    let whitelist_asset = AssetId::from_label(WHITELIST_ASSET_LABEL);
    let onboarding_key = params.onboarding_key()?;

    // ── Founding transaction ─────────────────────────────────────────────────
    let outputs = vec![
        TxOut::pay(native_asset, params.native_supply, params.native_destination()?),
        TxOut::pay(whitelist_asset, params.whitelist_supply, params.whitelist_destination()?),
    ];
    let mut tx = Transaction::unsigned(vec![], outputs, 0);
    tx.tx_id = tx_id_from_body(&tx.body_bytes());

    for (vout, output) in tx.outputs.iter().enumerate() {
        db.put_utxo(&Utxo { outpoint: OutPoint::new(tx.tx_id, vout as u32), output: output.clone(), height: 0 })?;
    }
    info!(
        destination = %params.native_destination,
        supply = params.native_supply,
        "genesis: native allocation"
    );
    info!(
        destination = %params.whitelist_destination,
        supply = params.whitelist_supply,
        "genesis: WHITELIST allocation"
    );

    let tx_id = tx.tx_id;
    db.put_transaction(&TxRecord { tx, height: 0 })?;
    db.put_meta(META_ONBOARDING_KEY, onboarding_key.as_bytes())?;
    info!(onboarding_key = %onboarding_key, "genesis: onboarding key recorded");

    // ── Verify supply ────────────────────────────────────────────────────────
    verify_genesis_supply(db, &native_asset, params.native_supply, NATIVE_ASSET_LABEL)?;
    verify_genesis_supply(db, &whitelist_asset, params.whitelist_supply, WHITELIST_ASSET_LABEL)?;

    db.put_block(&Block { height: 0, timestamp: params.timestamp, tx_ids: vec![tx_id] })?;
    db.flush()?;
    info!(tx_id = %tx_id, "genesis state committed to disk");

    Ok(GenesisInfo {
        tx_id,
        native_asset,
        whitelist_asset,
        whitelist_outpoint: OutPoint::new(tx_id, 1),
    })
}

/// Verify that the unspent outputs of `asset` sum to exactly `expected`.
fn verify_genesis_supply(
    db: &StateDb,
    asset: &AssetId,
    expected: Amount,
    label: &str,
) -> Result<(), TidemarkError> {
    let mut total: u128 = 0;
    for utxo in db.iter_utxos() {
        let utxo = utxo?;
        if &utxo.output.asset == asset {
            total += utxo.output.value as u128;
        }
    }
    if total != expected as u128 {
        return Err(TidemarkError::GenesisSupplyMismatch {
            asset: label.to_string(),
            expected,
            got: total as u64,
        });
    }
    info!(asset = label, total = expected, "genesis supply verified");
    Ok(())
}
