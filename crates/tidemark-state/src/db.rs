use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionError;
use sled::Transactional;
use std::path::Path;
use tidemark_core::constants::{META_ONBOARDING_KEY, META_TIP_HEIGHT};
use tidemark_core::entry::OnboardEntry;
use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::{Transaction, TxOut};
use tidemark_core::types::{Destination, Height, OutPoint, PubKey, Timestamp, TxId};

// ── Records ───────────────────────────────────────────────────────────────────

/// A confirmed, unspent, spendable output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub output: TxOut,
    pub height: Height,
}

/// A confirmed transaction and the height it was included at.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx: Transaction,
    pub height: Height,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub height: Height,
    pub timestamp: Timestamp,
    pub tx_ids: Vec<TxId>,
}

/// A committed whitelist membership.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberRecord {
    pub destination: Destination,
    pub entry: OnboardEntry,
    pub onboard_pubkey: PubKey,
    pub tx_id: TxId,
    pub height: Height,
}

/// Every write belonging to one block, applied in a single sled transaction.
#[derive(Default)]
pub struct BlockWrite {
    pub spent: Vec<[u8; 36]>,
    pub created: Vec<Utxo>,
    pub transactions: Vec<TxRecord>,
    pub members: Vec<MemberRecord>,
    pub mempool_drained: Vec<u64>,
    pub block: Option<Block>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TidemarkError> {
    bincode::serialize(value).map_err(|e| TidemarkError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TidemarkError> {
    bincode::deserialize(bytes).map_err(|e| TidemarkError::Serialization(e.to_string()))
}

// ── StateDb ───────────────────────────────────────────────────────────────────

/// Persistent ledger state backed by sled.
///
/// Named trees:
///   utxos        — OutPoint key (36 bytes)   → bincode(Utxo)
///   transactions — TxId bytes                → bincode(TxRecord)
///   blocks       — height (u64 BE)           → bincode(Block)
///   members      — Destination key (21 bytes)→ bincode(MemberRecord)
///   mempool      — sequence (u64 BE)         → bincode(Transaction)
///   wallet       — prefixed key bytes        → bincode(wallet record)
///   meta         — utf8 key bytes            → raw bytes
pub struct StateDb {
    db: sled::Db,
    utxos: sled::Tree,
    transactions: sled::Tree,
    blocks: sled::Tree,
    members: sled::Tree,
    mempool: sled::Tree,
    wallet: sled::Tree,
    meta: sled::Tree,
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TidemarkError> {
        let db = sled::open(path).map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Self::from_db(db)
    }

    /// In-memory database removed on drop.
    pub fn open_temporary() -> Result<Self, TidemarkError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, TidemarkError> {
        let tree = |name: &str| db.open_tree(name).map_err(|e| TidemarkError::Storage(e.to_string()));
        Ok(Self {
            utxos: tree("utxos")?,
            transactions: tree("transactions")?,
            blocks: tree("blocks")?,
            members: tree("members")?,
            mempool: tree("mempool")?,
            wallet: tree("wallet")?,
            meta: tree("meta")?,
            db,
        })
    }

    // ── UTXOs ────────────────────────────────────────────────────────────────

    pub fn get_utxo(&self, outpoint: &OutPoint) -> Result<Option<Utxo>, TidemarkError> {
        match self.utxos.get(outpoint.to_key()).map_err(|e| TidemarkError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_utxo(&self, utxo: &Utxo) -> Result<(), TidemarkError> {
        self.utxos
            .insert(&utxo.outpoint.to_key()[..], encode(utxo)?)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn iter_utxos(&self) -> impl Iterator<Item = Result<Utxo, TidemarkError>> + '_ {
        self.utxos.iter().map(|item| {
            let (_, bytes) = item.map_err(|e| TidemarkError::Storage(e.to_string()))?;
            decode(&bytes)
        })
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    pub fn get_transaction(&self, tx_id: &TxId) -> Result<Option<TxRecord>, TidemarkError> {
        match self.transactions.get(tx_id.as_bytes()).map_err(|e| TidemarkError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_transaction(&self, record: &TxRecord) -> Result<(), TidemarkError> {
        self.transactions
            .insert(&record.tx.tx_id.as_bytes()[..], encode(record)?)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn transaction_exists(&self, tx_id: &TxId) -> bool {
        self.transactions.contains_key(tx_id.as_bytes()).unwrap_or(false)
    }

    // ── Blocks ───────────────────────────────────────────────────────────────

    pub fn get_block(&self, height: Height) -> Result<Option<Block>, TidemarkError> {
        match self.blocks.get(height.to_be_bytes()).map_err(|e| TidemarkError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_block(&self, block: &Block) -> Result<(), TidemarkError> {
        self.blocks
            .insert(&block.height.to_be_bytes()[..], encode(block)?)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        self.put_meta(META_TIP_HEIGHT, &block.height.to_be_bytes())
    }

    /// Height of the last block, or `None` before genesis.
    pub fn tip_height(&self) -> Result<Option<Height>, TidemarkError> {
        match self.get_meta(META_TIP_HEIGHT)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| TidemarkError::Storage("corrupt tip height".into()))?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    // ── Members ──────────────────────────────────────────────────────────────

    pub fn get_member(&self, destination: &Destination) -> Result<Option<MemberRecord>, TidemarkError> {
        match self.members.get(destination.to_key()).map_err(|e| TidemarkError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    // ── Mempool ──────────────────────────────────────────────────────────────

    pub fn push_mempool(&self, tx: &Transaction) -> Result<u64, TidemarkError> {
        let seq = self.db.generate_id().map_err(|e| TidemarkError::Storage(e.to_string()))?;
        self.mempool
            .insert(&seq.to_be_bytes()[..], encode(tx)?)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(seq)
    }

    /// Pending transactions in arrival order, with their sequence numbers.
    pub fn mempool(&self) -> Result<Vec<(u64, Transaction)>, TidemarkError> {
        let mut out = Vec::new();
        for item in self.mempool.iter() {
            let (key, bytes) = item.map_err(|e| TidemarkError::Storage(e.to_string()))?;
            let arr: [u8; 8] = key
                .as_ref()
                .try_into()
                .map_err(|_| TidemarkError::Storage("corrupt mempool key".into()))?;
            out.push((u64::from_be_bytes(arr), decode(&bytes)?));
        }
        Ok(out)
    }

    // ── Wallet ───────────────────────────────────────────────────────────────

    pub fn put_wallet<T: Serialize>(&self, key: &[u8], value: &T) -> Result<(), TidemarkError> {
        self.wallet
            .insert(key, encode(value)?)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_wallet<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, TidemarkError> {
        match self.wallet.get(key).map_err(|e| TidemarkError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn scan_wallet<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>, TidemarkError> {
        let mut out = Vec::new();
        for item in self.wallet.scan_prefix(prefix) {
            let (key, bytes) = item.map_err(|e| TidemarkError::Storage(e.to_string()))?;
            out.push((key[prefix.len()..].to_vec(), decode(&bytes)?));
        }
        Ok(out)
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), TidemarkError> {
        self.meta
            .insert(key.as_bytes(), value)
            .map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, TidemarkError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(|e| TidemarkError::Storage(e.to_string()))
    }

    /// The policy onboarding key recorded at genesis.
    pub fn onboarding_key(&self) -> Result<PubKey, TidemarkError> {
        self.get_meta(META_ONBOARDING_KEY)?
            .map(PubKey)
            .ok_or(TidemarkError::GenesisMissing)
    }

    // ── Atomic block commit ──────────────────────────────────────────────────

    /// Apply all writes of one block atomically across trees.
    pub fn commit_block(&self, write: &BlockWrite) -> Result<(), TidemarkError> {
        let created = write
            .created
            .iter()
            .map(|u| Ok((u.outpoint.to_key(), encode(u)?)))
            .collect::<Result<Vec<_>, TidemarkError>>()?;
        let transactions = write
            .transactions
            .iter()
            .map(|r| Ok((*r.tx.tx_id.as_bytes(), encode(r)?)))
            .collect::<Result<Vec<_>, TidemarkError>>()?;
        let members = write
            .members
            .iter()
            .map(|m| Ok((m.destination.to_key(), encode(m)?)))
            .collect::<Result<Vec<_>, TidemarkError>>()?;
        let block = match &write.block {
            Some(b) => Some((b.height.to_be_bytes(), encode(b)?)),
            None => None,
        };

        (&self.utxos, &self.transactions, &self.blocks, &self.members, &self.mempool, &self.meta)
            .transaction(|(utxos, txs, blocks, mems, mempool, meta)| {
                for key in &write.spent {
                    utxos.remove(&key[..])?;
                }
                for (key, bytes) in &created {
                    utxos.insert(&key[..], bytes.as_slice())?;
                }
                for (key, bytes) in &transactions {
                    txs.insert(&key[..], bytes.as_slice())?;
                }
                for (key, bytes) in &members {
                    mems.insert(&key[..], bytes.as_slice())?;
                }
                for seq in &write.mempool_drained {
                    mempool.remove(&seq.to_be_bytes()[..])?;
                }
                if let Some((key, bytes)) = &block {
                    blocks.insert(&key[..], bytes.as_slice())?;
                    meta.insert(META_TIP_HEIGHT.as_bytes(), &key[..])?;
                }
                Ok::<(), ConflictableTransactionError<TidemarkError>>(())
            })
            .map_err(|e| TidemarkError::Storage(e.to_string()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), TidemarkError> {
        self.db.flush().map_err(|e| TidemarkError::Storage(e.to_string()))?;
        Ok(())
    }
}
