use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use tidemark_core::constants::{NATIVE_ASSET_LABEL, WHITELIST_ASSET_LABEL};
use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::{OutputKind, Registration, Transaction};
use tidemark_core::types::{Amount, AssetId, Destination, Height, OutPoint, Timestamp, TxId};
use tidemark_crypto::{key_id_from_pubkey, tx_id_from_body, verify_signature, KeyTweaker};
use tracing::{debug, info, warn};

use crate::db::{Block, BlockWrite, MemberRecord, StateDb, TxRecord, Utxo};

/// Where a transaction currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed { height: Height, confirmations: u64 },
}

// ── ChainEngine ───────────────────────────────────────────────────────────────

/// Single-node UTXO ledger: mempool admission, block minting and the
/// whitelist membership registry.
///
/// `submit` and `mint_block` are serialized by one mutex; reads go straight
/// to the database. A transaction may only spend confirmed outputs, so two
/// pending transactions never depend on each other.
pub struct ChainEngine {
    pub db: Arc<StateDb>,
    write_lock: Mutex<()>,
    native: AssetId,
    whitelist: AssetId,
}

impl ChainEngine {
    pub fn new(db: Arc<StateDb>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
            native: AssetId::from_label(NATIVE_ASSET_LABEL),
            whitelist: AssetId::from_label(WHITELIST_ASSET_LABEL),
        }
    }

    pub fn asset_id(&self, label: &str) -> Result<AssetId, TidemarkError> {
        match label {
            NATIVE_ASSET_LABEL => Ok(self.native),
            WHITELIST_ASSET_LABEL => Ok(self.whitelist),
            other => Err(TidemarkError::UnknownAsset(other.to_string())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, TidemarkError> {
        self.write_lock
            .lock()
            .map_err(|_| TidemarkError::Other("ledger write lock poisoned".into()))
    }

    // ── Mempool admission ────────────────────────────────────────────────────

    /// Validate a signed transaction against confirmed state and the mempool,
    /// then queue it for the next block.
    pub fn submit(&self, tx: &Transaction) -> Result<TxId, TidemarkError> {
        let _guard = self.lock()?;
        let pending = self.db.mempool()?;
        self.validate(tx, &pending)?;
        self.db.push_mempool(tx)?;
        info!(
            tx_id = %tx.tx_id,
            inputs = tx.inputs.len(),
            registrations = tx.registrations().count(),
            "accepted transaction into mempool"
        );
        Ok(tx.tx_id)
    }

    fn validate(&self, tx: &Transaction, pending: &[(u64, Transaction)]) -> Result<(), TidemarkError> {
        // ── Id integrity ─────────────────────────────────────────────────────
        let body = tx.body_bytes();
        if tx_id_from_body(&body) != tx.tx_id {
            return Err(TidemarkError::TxIdMismatch);
        }

        // ── Duplicate check ──────────────────────────────────────────────────
        if self.db.transaction_exists(&tx.tx_id) || pending.iter().any(|(_, p)| p.tx_id == tx.tx_id) {
            return Err(TidemarkError::DuplicateTransaction(tx.tx_id.to_hex()));
        }
        if tx.is_genesis() {
            return Err(TidemarkError::NoInputs);
        }

        // ── Inputs ───────────────────────────────────────────────────────────
        let pending_spends: HashSet<OutPoint> = pending
            .iter()
            .flat_map(|(_, p)| p.inputs.iter().map(|i| i.prevout))
            .collect();
        let mut seen = HashSet::new();
        let mut inputs_by_asset: BTreeMap<AssetId, u128> = BTreeMap::new();

        for input in &tx.inputs {
            let prevout = input.prevout;
            if !seen.insert(prevout) || pending_spends.contains(&prevout) {
                return Err(TidemarkError::DoubleSpend(prevout.to_string()));
            }
            let utxo = match self.db.get_utxo(&prevout)? {
                Some(u) => u,
                // An output of a known transaction that is no longer unspent was spent in a block.
                None if self.db.transaction_exists(&prevout.txid) => {
                    return Err(TidemarkError::DoubleSpend(prevout.to_string()))
                }
                None => return Err(TidemarkError::UnknownInput(prevout.to_string())),
            };
            self.check_witness(&utxo, input.witness.as_ref(), &body)?;
            *inputs_by_asset.entry(utxo.output.asset).or_default() += utxo.output.value as u128;
        }

        // ── Outputs and conservation ─────────────────────────────────────────
        let mut outputs_by_asset: BTreeMap<AssetId, u128> = BTreeMap::new();
        for out in &tx.outputs {
            if out.asset != self.native && out.asset != self.whitelist {
                return Err(TidemarkError::UnknownAsset(out.asset.to_hex()));
            }
            *outputs_by_asset.entry(out.asset).or_default() += out.value as u128;
        }
        let assets: HashSet<AssetId> = inputs_by_asset.keys().chain(outputs_by_asset.keys()).copied().collect();
        for asset in assets {
            let inputs = inputs_by_asset.get(&asset).copied().unwrap_or(0);
            let outputs = outputs_by_asset.get(&asset).copied().unwrap_or(0);
            let fee = if asset == self.native { tx.fee as u128 } else { 0 };
            if inputs != outputs + fee {
                return Err(TidemarkError::AssetImbalance {
                    asset: asset.to_hex(),
                    inputs: saturate(inputs),
                    outputs: saturate(outputs),
                    fee: saturate(fee),
                });
            }
        }
        if tx.fee > 0 && !inputs_by_asset.contains_key(&self.native) {
            return Err(TidemarkError::AssetImbalance {
                asset: self.native.to_hex(),
                inputs: 0,
                outputs: 0,
                fee: tx.fee,
            });
        }

        // ── Registrations ────────────────────────────────────────────────────
        if tx.registrations().next().is_some() {
            if !inputs_by_asset.contains_key(&self.whitelist) {
                return Err(TidemarkError::InvalidRegistration(
                    "registrations must spend a WHITELIST output".into(),
                ));
            }
            let tweaker = KeyTweaker::new(self.db.onboarding_key()?)?;
            let pending_members = self.pending_destinations(&tweaker, pending)?;
            let mut in_tx = HashSet::new();
            for out in &tx.outputs {
                let OutputKind::Register(reg) = &out.kind else { continue };
                if out.asset != self.whitelist || out.value != 0 {
                    return Err(TidemarkError::InvalidRegistration(
                        "registration outputs carry zero WHITELIST value".into(),
                    ));
                }
                let dest = self.registration_destination(&tweaker, reg)?;
                if self.db.get_member(&dest)?.is_some() || pending_members.contains(&dest) {
                    return Err(TidemarkError::AlreadyWhitelisted(dest.to_address()));
                }
                if !in_tx.insert(dest) {
                    return Err(TidemarkError::InvalidRegistration(format!(
                        "{dest} registered twice in one transaction"
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_witness(
        &self,
        utxo: &Utxo,
        witness: Option<&tidemark_core::transaction::Witness>,
        body: &[u8],
    ) -> Result<(), TidemarkError> {
        let prevout = utxo.outpoint.to_string();
        let key_id = match utxo.output.destination() {
            Some(Destination::PubKeyHash(id)) => *id,
            Some(Destination::ScriptHash(_)) | None => {
                return Err(TidemarkError::InvalidSignature(format!("{prevout}: not a key-hash output")))
            }
        };
        let witness = witness.ok_or_else(|| TidemarkError::InvalidSignature(prevout.clone()))?;
        if key_id_from_pubkey(&witness.pubkey) != key_id {
            return Err(TidemarkError::InvalidSignature(format!("{prevout}: key does not match output")));
        }
        verify_signature(&witness.pubkey, body, &witness.signature)
            .map_err(|_| TidemarkError::InvalidSignature(prevout))
    }

    /// Destination admitted by a registration, rejecting foreign onboarding keys.
    fn registration_destination(
        &self,
        tweaker: &KeyTweaker,
        reg: &Registration,
    ) -> Result<Destination, TidemarkError> {
        if &reg.kyc_pubkey != tweaker.onboarding_key() {
            return Err(TidemarkError::InvalidRegistration(format!(
                "registration addressed to foreign onboarding key {}",
                reg.kyc_pubkey
            )));
        }
        tweaker
            .entry_destination(&reg.entry)
            .map_err(|e| TidemarkError::InvalidRegistration(e.to_string()))
    }

    fn pending_destinations(
        &self,
        tweaker: &KeyTweaker,
        pending: &[(u64, Transaction)],
    ) -> Result<HashSet<Destination>, TidemarkError> {
        let mut out = HashSet::new();
        for (_, tx) in pending {
            for reg in tx.registrations() {
                out.insert(self.registration_destination(tweaker, reg)?);
            }
        }
        Ok(out)
    }

    // ── Block production ─────────────────────────────────────────────────────

    /// Confirm every pending transaction in one block. Returns the new block.
    pub fn mint_block(&self, timestamp: Timestamp) -> Result<Block, TidemarkError> {
        let _guard = self.lock()?;
        let tip = self.db.tip_height()?.ok_or(TidemarkError::GenesisMissing)?;
        let height = tip + 1;
        let pending = self.db.mempool()?;
        let tweaker = KeyTweaker::new(self.db.onboarding_key()?)?;

        let mut write = BlockWrite::default();
        let mut tx_ids = Vec::with_capacity(pending.len());
        for (seq, tx) in pending {
            write.mempool_drained.push(seq);
            for input in &tx.inputs {
                write.spent.push(input.prevout.to_key());
            }
            for (vout, out) in tx.outputs.iter().enumerate() {
                match &out.kind {
                    OutputKind::Pay(_) => write.created.push(Utxo {
                        outpoint: OutPoint::new(tx.tx_id, vout as u32),
                        output: out.clone(),
                        height,
                    }),
                    OutputKind::Register(reg) => {
                        let destination = self.registration_destination(&tweaker, reg)?;
                        write.members.push(MemberRecord {
                            destination,
                            entry: reg.entry.clone(),
                            onboard_pubkey: reg.onboard_pubkey.clone(),
                            tx_id: tx.tx_id,
                            height,
                        });
                    }
                }
            }
            tx_ids.push(tx.tx_id);
            write.transactions.push(TxRecord { tx, height });
        }

        let block = Block { height, timestamp, tx_ids };
        write.block = Some(block.clone());
        self.db.commit_block(&write)?;
        if !write.members.is_empty() {
            info!(height, members = write.members.len(), "whitelisted new members");
        }
        info!(height, txs = block.tx_ids.len(), "minted block");
        Ok(block)
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn tip_height(&self) -> Result<Height, TidemarkError> {
        self.db.tip_height()?.ok_or(TidemarkError::GenesisMissing)
    }

    pub fn status(&self, tx_id: &TxId) -> Result<Option<TxStatus>, TidemarkError> {
        if let Some(record) = self.db.get_transaction(tx_id)? {
            let tip = self.tip_height()?;
            return Ok(Some(TxStatus::Confirmed {
                height: record.height,
                confirmations: tip.saturating_sub(record.height) + 1,
            }));
        }
        if self.db.mempool()?.iter().any(|(_, tx)| &tx.tx_id == tx_id) {
            return Ok(Some(TxStatus::Pending));
        }
        Ok(None)
    }

    /// Confirmation depth: `Some(0)` while pending, `None` if unknown.
    pub fn confirmations(&self, tx_id: &TxId) -> Result<Option<u64>, TidemarkError> {
        Ok(self.status(tx_id)?.map(|s| match s {
            TxStatus::Pending => 0,
            TxStatus::Confirmed { confirmations, .. } => confirmations,
        }))
    }

    pub fn member(&self, destination: &Destination) -> Result<Option<MemberRecord>, TidemarkError> {
        self.db.get_member(destination)
    }

    pub fn is_registration_pending(&self, destination: &Destination) -> Result<bool, TidemarkError> {
        let tweaker = KeyTweaker::new(self.db.onboarding_key()?)?;
        let pending = self.db.mempool()?;
        Ok(self.pending_destinations(&tweaker, &pending)?.contains(destination))
    }

    /// Confirmed transaction, or a pending one with no height.
    pub fn get_transaction(&self, tx_id: &TxId) -> Result<Option<(Transaction, Option<Height>)>, TidemarkError> {
        if let Some(record) = self.db.get_transaction(tx_id)? {
            return Ok(Some((record.tx, Some(record.height))));
        }
        Ok(self
            .db
            .mempool()?
            .into_iter()
            .find(|(_, tx)| &tx.tx_id == tx_id)
            .map(|(_, tx)| (tx, None)))
    }

    /// Confirmed unspent outputs of `asset` paying to any of `destinations`.
    pub fn unspent_for(
        &self,
        asset: &AssetId,
        destinations: &HashSet<Destination>,
    ) -> Result<Vec<Utxo>, TidemarkError> {
        let mut out = Vec::new();
        for utxo in self.db.iter_utxos() {
            let utxo = utxo?;
            if &utxo.output.asset != asset {
                continue;
            }
            if utxo.output.destination().is_some_and(|d| destinations.contains(d)) {
                out.push(utxo);
            }
        }
        out.sort_by_key(|u| (u.height, u.outpoint.to_key()));
        debug!(asset = %asset, count = out.len(), "collected unspent outputs");
        Ok(out)
    }

    pub fn balance_for(
        &self,
        asset: &AssetId,
        destinations: &HashSet<Destination>,
    ) -> Result<Amount, TidemarkError> {
        let total: u128 = self
            .unspent_for(asset, destinations)?
            .iter()
            .map(|u| u.output.value as u128)
            .sum();
        u64::try_from(total).map_err(|_| {
            warn!(asset = %asset, "balance overflows u64");
            TidemarkError::Other("balance overflow".into())
        })
    }
}

/// Per-asset sums are u128; error fields report them clamped to u64.
fn saturate(sum: u128) -> u64 {
    u64::try_from(sum).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::constants::META_ONBOARDING_KEY;
    use tidemark_core::entry::{MultisigEntry, OnboardEntry};
    use tidemark_core::transaction::{Registration, TxOut, Witness};
    use tidemark_crypto::KeyPair;

    // ── Helpers ──────────────────────────────────────────────────────────────

    struct Chain {
        engine: ChainEngine,
        kyc: KeyPair,
        holder: KeyPair,
        whitelist_utxo: OutPoint,
        native_utxo: OutPoint,
    }

    /// Genesis-like seed: onboarding key in meta, one WHITELIST and one native output.
    fn seed_chain() -> Chain {
        let db = Arc::new(StateDb::open_temporary().expect("open temp db"));
        let kyc = KeyPair::generate();
        let holder = KeyPair::generate();
        db.put_meta(META_ONBOARDING_KEY, kyc.public_key.as_bytes()).unwrap();
        db.put_block(&Block { height: 0, timestamp: 0, tx_ids: vec![] }).unwrap();

        let outputs = vec![
            TxOut::pay(AssetId::from_label(WHITELIST_ASSET_LABEL), 1_000, holder.destination()),
            TxOut::pay(AssetId::from_label(NATIVE_ASSET_LABEL), 5_000, holder.destination()),
        ];
        let mut genesis = Transaction::unsigned(vec![], outputs, 0);
        genesis.tx_id = tx_id_from_body(&genesis.body_bytes());
        for (vout, output) in genesis.outputs.iter().enumerate() {
            db.put_utxo(&Utxo { outpoint: OutPoint::new(genesis.tx_id, vout as u32), output: output.clone(), height: 0 })
                .unwrap();
        }
        let whitelist_utxo = OutPoint::new(genesis.tx_id, 0);
        let native_utxo = OutPoint::new(genesis.tx_id, 1);
        db.put_transaction(&TxRecord { tx: genesis, height: 0 }).unwrap();
        Chain { engine: ChainEngine::new(db), kyc, holder, whitelist_utxo, native_utxo }
    }

    fn sign(tx: &mut Transaction, kp: &KeyPair) {
        let body = tx.body_bytes();
        tx.tx_id = tx_id_from_body(&body);
        for input in tx.inputs.iter_mut() {
            input.witness = Some(Witness { pubkey: kp.public_key.clone(), signature: kp.sign(&body) });
        }
    }

    fn registration_tx(chain: &Chain, entries: Vec<OnboardEntry>) -> Transaction {
        let wl = AssetId::from_label(WHITELIST_ASSET_LABEL);
        let mut outputs = vec![TxOut::pay(wl, 1_000, chain.holder.destination())];
        for entry in entries {
            outputs.push(TxOut {
                asset: wl,
                value: 0,
                kind: OutputKind::Register(Registration {
                    kyc_pubkey: chain.kyc.public_key.clone(),
                    onboard_pubkey: chain.kyc.public_key.clone(),
                    entry,
                }),
            });
        }
        let mut tx = Transaction::unsigned(vec![chain.whitelist_utxo], outputs, 0);
        sign(&mut tx, &chain.holder);
        tx
    }

    fn single(chain: &Chain) -> (OnboardEntry, Destination) {
        let tweaker = KeyTweaker::new(chain.kyc.public_key.clone()).unwrap();
        let user = KeyPair::generate();
        let dest = tweaker.address_for(&user.public_key).unwrap();
        (OnboardEntry::single(dest, user.public_key), dest)
    }

    // ── Registrations ────────────────────────────────────────────────────────

    #[test]
    fn registration_becomes_member_after_block() {
        let chain = seed_chain();
        let (entry, dest) = single(&chain);
        let tx = registration_tx(&chain, vec![entry]);
        chain.engine.submit(&tx).unwrap();

        assert!(chain.engine.member(&dest).unwrap().is_none());
        assert!(chain.engine.is_registration_pending(&dest).unwrap());
        assert_eq!(chain.engine.confirmations(&tx.tx_id).unwrap(), Some(0));

        let block = chain.engine.mint_block(10).unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.tx_ids, vec![tx.tx_id]);
        let member = chain.engine.member(&dest).unwrap().unwrap();
        assert_eq!(member.tx_id, tx.tx_id);
        assert_eq!(chain.engine.confirmations(&tx.tx_id).unwrap(), Some(1));
        assert!(!chain.engine.is_registration_pending(&dest).unwrap());
    }

    #[test]
    fn whitelist_value_returned_to_holder() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        chain.engine.submit(&registration_tx(&chain, vec![entry])).unwrap();
        chain.engine.mint_block(10).unwrap();

        let wl = AssetId::from_label(WHITELIST_ASSET_LABEL);
        let mine: HashSet<_> = [chain.holder.destination()].into_iter().collect();
        assert_eq!(chain.engine.balance_for(&wl, &mine).unwrap(), 1_000);
    }

    #[test]
    fn racing_spends_of_one_output_conflict() {
        let chain = seed_chain();
        let (a, _) = single(&chain);
        let (b, _) = single(&chain);
        chain.engine.submit(&registration_tx(&chain, vec![a])).unwrap();
        let err = chain.engine.submit(&registration_tx(&chain, vec![b])).unwrap_err();
        assert!(matches!(err, TidemarkError::DoubleSpend(_)));

        chain.engine.mint_block(10).unwrap();
        let (c, _) = single(&chain);
        let err = chain.engine.submit(&registration_tx(&chain, vec![c])).unwrap_err();
        assert!(matches!(err, TidemarkError::DoubleSpend(_)));
    }

    #[test]
    fn untweaked_address_rejected() {
        let chain = seed_chain();
        let user = KeyPair::generate();
        let bad = OnboardEntry::single(user.destination(), user.public_key.clone());
        let err = chain.engine.submit(&registration_tx(&chain, vec![bad])).unwrap_err();
        assert!(matches!(err, TidemarkError::InvalidRegistration(_)));
    }

    #[test]
    fn duplicate_registration_in_one_tx_rejected() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        let err = chain
            .engine
            .submit(&registration_tx(&chain, vec![entry.clone(), entry]))
            .unwrap_err();
        assert!(matches!(err, TidemarkError::InvalidRegistration(_)));
    }

    #[test]
    fn registering_existing_member_rejected() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        chain.engine.submit(&registration_tx(&chain, vec![entry.clone()])).unwrap();
        chain.engine.mint_block(10).unwrap();

        // Spend the returned WHITELIST change to try the same entry again.
        let wl = AssetId::from_label(WHITELIST_ASSET_LABEL);
        let mine: HashSet<_> = [chain.holder.destination()].into_iter().collect();
        let change = chain.engine.unspent_for(&wl, &mine).unwrap()[0].outpoint;
        let chain = Chain { whitelist_utxo: change, ..chain };
        let err = chain.engine.submit(&registration_tx(&chain, vec![entry])).unwrap_err();
        assert!(matches!(err, TidemarkError::AlreadyWhitelisted(_)));
    }

    #[test]
    fn multisig_registration_admits_script_destination() {
        let chain = seed_chain();
        let tweaker = KeyTweaker::new(chain.kyc.public_key.clone()).unwrap();
        let keys: Vec<_> = (0..3).map(|_| KeyPair::generate().public_key).collect();
        let entry = OnboardEntry::Multisig(MultisigEntry::new(2, keys.clone()).unwrap());
        chain.engine.submit(&registration_tx(&chain, vec![entry])).unwrap();
        chain.engine.mint_block(10).unwrap();

        let group = tweaker.multisig_address(2, &keys).unwrap();
        assert!(chain.engine.member(&group).unwrap().is_some());
        let subset = tweaker.multisig_address(2, &keys[..2]).unwrap();
        assert!(chain.engine.member(&subset).unwrap().is_none());
    }

    // ── Conservation and signatures ──────────────────────────────────────────

    #[test]
    fn value_mismatch_rejected() {
        let chain = seed_chain();
        let wl = AssetId::from_label(WHITELIST_ASSET_LABEL);
        let mut tx = Transaction::unsigned(
            vec![chain.whitelist_utxo],
            vec![TxOut::pay(wl, 999, chain.holder.destination())],
            0,
        );
        sign(&mut tx, &chain.holder);
        assert!(matches!(chain.engine.submit(&tx).unwrap_err(), TidemarkError::AssetImbalance { .. }));
    }

    #[test]
    fn overflowing_output_sum_reported_saturated() {
        let chain = seed_chain();
        let wl = AssetId::from_label(WHITELIST_ASSET_LABEL);
        let to = chain.holder.destination();
        let mut tx = Transaction::unsigned(
            vec![chain.whitelist_utxo],
            vec![TxOut::pay(wl, u64::MAX, to), TxOut::pay(wl, u64::MAX, to)],
            0,
        );
        sign(&mut tx, &chain.holder);
        match chain.engine.submit(&tx).unwrap_err() {
            TidemarkError::AssetImbalance { inputs, outputs, .. } => {
                assert_eq!(inputs, 1_000);
                assert_eq!(outputs, u64::MAX);
            }
            other => panic!("expected AssetImbalance, got {other}"),
        }
    }

    #[test]
    fn native_fee_accounted() {
        let chain = seed_chain();
        let native = AssetId::from_label(NATIVE_ASSET_LABEL);
        let mut tx = Transaction::unsigned(
            vec![chain.native_utxo],
            vec![TxOut::pay(native, 4_990, KeyPair::generate().destination())],
            10,
        );
        sign(&mut tx, &chain.holder);
        chain.engine.submit(&tx).unwrap();
    }

    #[test]
    fn wrong_signer_rejected() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        let mut tx = registration_tx(&chain, vec![entry]);
        sign(&mut tx, &KeyPair::generate());
        assert!(matches!(chain.engine.submit(&tx).unwrap_err(), TidemarkError::InvalidSignature(_)));
    }

    #[test]
    fn duplicate_tx_rejected() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        let tx = registration_tx(&chain, vec![entry]);
        chain.engine.submit(&tx).unwrap();
        assert!(matches!(chain.engine.submit(&tx).unwrap_err(), TidemarkError::DuplicateTransaction(_)));
    }

    #[test]
    fn tampered_id_rejected() {
        let chain = seed_chain();
        let (entry, _) = single(&chain);
        let mut tx = registration_tx(&chain, vec![entry]);
        tx.tx_id = TxId::from_bytes([1u8; 32]);
        assert!(matches!(chain.engine.submit(&tx).unwrap_err(), TidemarkError::TxIdMismatch));
    }
}
