use serde::{Deserialize, Serialize};

use crate::entry::OnboardEntry;
use crate::types::{Amount, AssetId, Destination, OutPoint, PubKey, TxId};

// ── Registration ─────────────────────────────────────────────────────────────

/// Payload of a whitelist registration output.
///
/// `kyc_pubkey` is the policy onboarding key the batch was addressed to and
/// `onboard_pubkey` the user's per-batch onboard key (equal to `kyc_pubkey`
/// for administrative imports). The admitted destination is derived from
/// `entry`, never stored separately, so the ledger can re-check it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub kyc_pubkey: PubKey,
    pub onboard_pubkey: PubKey,
    pub entry: OnboardEntry,
}

// ── Outputs ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputKind {
    /// Spendable value paid to a destination.
    Pay(Destination),
    /// Zero-value, unspendable whitelist registration.
    Register(Registration),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOut {
    pub asset: AssetId,
    pub value: Amount,
    pub kind: OutputKind,
}

impl TxOut {
    pub fn pay(asset: AssetId, value: Amount, to: Destination) -> Self {
        Self { asset, value, kind: OutputKind::Pay(to) }
    }

    pub fn destination(&self) -> Option<&Destination> {
        match &self.kind {
            OutputKind::Pay(d) => Some(d),
            OutputKind::Register(_) => None,
        }
    }

    pub fn registration(&self) -> Option<&Registration> {
        match &self.kind {
            OutputKind::Register(r) => Some(r),
            OutputKind::Pay(_) => None,
        }
    }
}

// ── Inputs ───────────────────────────────────────────────────────────────────

/// Proof that the spender controls the key behind a pay-to-key-hash output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Witness {
    pub pubkey: PubKey,
    /// 64-byte compact ECDSA signature over the body bytes.
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub witness: Option<Witness>,
}

impl TxIn {
    pub fn unsigned(prevout: OutPoint) -> Self {
        Self { prevout, witness: None }
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

/// A UTXO transaction. Genesis transactions have no inputs.
///
/// The transaction ID (`tx_id`) is computed as BLAKE3 of the canonical
/// bincode serialization of the body: input outpoints, outputs and fee.
/// Witnesses are excluded so signing does not change the id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub tx_id: TxId,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    /// Fee in the native asset. Policy transactions carry zero.
    pub fee: Amount,
}

/// The body bytes that are hashed to produce tx_id and covered by signatures.
#[derive(Serialize)]
pub struct TransactionBody<'a> {
    pub prevouts: Vec<&'a OutPoint>,
    pub outputs: &'a Vec<TxOut>,
    pub fee: Amount,
}

impl Transaction {
    /// Build an unsigned transaction with a zeroed id. The real id is set
    /// from `body_bytes` when the transaction is signed.
    pub fn unsigned(prevouts: Vec<OutPoint>, outputs: Vec<TxOut>, fee: Amount) -> Self {
        Self {
            tx_id: TxId::from_bytes([0u8; 32]),
            inputs: prevouts.into_iter().map(TxIn::unsigned).collect(),
            outputs,
            fee,
        }
    }

    /// Extract the body for hashing / signing.
    pub fn body(&self) -> TransactionBody<'_> {
        TransactionBody {
            prevouts: self.inputs.iter().map(|i| &i.prevout).collect(),
            outputs: &self.outputs,
            fee: self.fee,
        }
    }

    /// Serialize the body to canonical bytes (bincode).
    pub fn body_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.body()).expect("body serialization is infallible")
    }

    pub fn is_genesis(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Registration> {
        self.outputs.iter().filter_map(TxOut::registration)
    }
}
