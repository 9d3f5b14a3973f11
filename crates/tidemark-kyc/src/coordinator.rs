use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tidemark_core::entry::{MultisigEntry, OnboardEntry, SingleKeyEntry};
use tidemark_core::error::TidemarkError;
use tidemark_core::types::{Destination, PubKey, TxId};
use tidemark_crypto::seal::random_nonce;
use tidemark_crypto::KeyTweaker;
use tracing::{debug, info};

use crate::codec;
use crate::config::WhitelistConfig;
use crate::kyc_file::{read_text, write_text, KycFile};
use crate::ledger::{KeyStore, Ledger};
use crate::record_set::KycRecordSet;
use crate::whitelist::{OnboardingReceipt, ValidationReport, WhitelistLedgerAdapter};

// ── Batch lifecycle ───────────────────────────────────────────────────────────

/// `Created → Serialized → (Validated)? → Committed → Confirmed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    Created,
    Serialized,
    Validated,
    Committed { tx_id: TxId },
    Confirmed { tx_id: TxId },
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Created => write!(f, "created"),
            BatchState::Serialized => write!(f, "serialized"),
            BatchState::Validated => write!(f, "validated"),
            BatchState::Committed { tx_id } => write!(f, "committed in {tx_id}"),
            BatchState::Confirmed { tx_id } => write!(f, "confirmed in {tx_id}"),
        }
    }
}

/// One KYC batch moving through onboarding.
#[derive(Clone, Debug)]
pub struct OnboardingBatch {
    state: BatchState,
    file: KycFile,
    text: Option<String>,
}

impl OnboardingBatch {
    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn file(&self) -> &KycFile {
        &self.file
    }

    pub fn records(&self) -> &KycRecordSet {
        &self.file.records
    }

    /// Serialized text, once `serialize` ran or the batch was loaded from text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn invalid(&self, action: &str) -> TidemarkError {
        TidemarkError::InvalidBatchState { state: self.state.to_string(), action: action.to_string() }
    }
}

/// Output of `create_kyc_file`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedKycFile {
    pub onboard_pubkey: PubKey,
    pub contents: String,
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// Drives batches from user key material to confirmed membership.
///
/// Never retries: a failed commit leaves the batch where it was.
pub struct OnboardingCoordinator<N> {
    node: Arc<N>,
    adapter: WhitelistLedgerAdapter<N>,
}

impl<N: Ledger + KeyStore> OnboardingCoordinator<N> {
    pub fn new(node: Arc<N>, config: WhitelistConfig) -> Self {
        Self { adapter: WhitelistLedgerAdapter::new(node.clone(), config), node }
    }

    pub fn adapter(&self) -> &WhitelistLedgerAdapter<N> {
        &self.adapter
    }

    fn config(&self) -> &WhitelistConfig {
        self.adapter.config()
    }

    fn tweaker(&self) -> Result<KeyTweaker, TidemarkError> {
        KeyTweaker::new(self.node.onboarding_key()?)
    }

    /// User side: assemble a batch under a fresh onboard key.
    pub fn create_batch(
        &self,
        singles: Vec<SingleKeyEntry>,
        groups: Vec<MultisigEntry>,
    ) -> Result<OnboardingBatch, TidemarkError> {
        let max = self.config().max_multisig_keys;
        let offset = singles.len();
        for (i, group) in groups.iter().enumerate() {
            if group.pubkeys.len() > max {
                return Err(TidemarkError::InvalidEntry {
                    index: offset + i,
                    reason: TidemarkError::InvalidThreshold {
                        threshold: group.threshold,
                        keys: group.pubkeys.len(),
                        max,
                    }
                    .to_string(),
                });
            }
        }
        let entries: Vec<OnboardEntry> = singles
            .into_iter()
            .map(OnboardEntry::SingleKey)
            .chain(groups.into_iter().map(OnboardEntry::Multisig))
            .collect();

        let tweaker = self.tweaker()?;
        let records = KycRecordSet::from_entries(&tweaker, entries)?;
        let onboard = self.node.new_onboard_keypair()?;
        let file = KycFile::new(onboard.public_key, tweaker.onboarding_key().clone(), random_nonce(), records);
        debug!(entries = file.records.len(), onboard_key = %file.onboard_pubkey, "created batch");
        Ok(OnboardingBatch { state: BatchState::Created, file, text: None })
    }

    /// Encode the batch, sealed when configured.
    pub fn serialize(&self, batch: &mut OnboardingBatch) -> Result<String, TidemarkError> {
        if !matches!(batch.state, BatchState::Created | BatchState::Serialized) {
            return Err(batch.invalid("serialize"));
        }
        let text = if self.config().seal_kyc_files {
            let sealer = self
                .node
                .onboard_keypair(&batch.file.onboard_pubkey)?
                .ok_or_else(|| TidemarkError::MissingSecret(batch.file.onboard_pubkey.to_hex()))?;
            codec::encode_sealed(&batch.file, Utc::now(), &sealer)?
        } else {
            codec::encode_plain(&batch.file, Utc::now())
        };
        batch.text = Some(text.clone());
        batch.state = BatchState::Serialized;
        Ok(text)
    }

    /// Decode a batch from file text. Sealed bodies are opened with the
    /// onboarding secret if this node has it, else with the file's onboard key.
    pub fn load_batch(&self, text: &str) -> Result<OnboardingBatch, TidemarkError> {
        let tweaker = self.tweaker()?;
        let opener = match self.node.kyc_keypair()? {
            Some(kp) => Some(kp),
            None => match codec::read_key_line(text)? {
                Some(key) => self.node.onboard_keypair(&key.onboard_pubkey)?,
                None => None,
            },
        };
        let file = codec::decode(text, &tweaker, opener.as_ref())?;
        Ok(OnboardingBatch { state: BatchState::Serialized, file, text: Some(text.to_string()) })
    }

    /// Side-effect free; allowed in every state.
    pub fn validate(&self, batch: &mut OnboardingBatch) -> Result<ValidationReport, TidemarkError> {
        let report = self.adapter.validate(&batch.file.records)?;
        if batch.state == BatchState::Serialized {
            batch.state = BatchState::Validated;
        }
        Ok(report)
    }

    pub fn commit(&self, batch: &mut OnboardingBatch) -> Result<OnboardingReceipt, TidemarkError> {
        if !matches!(batch.state, BatchState::Serialized | BatchState::Validated) {
            return Err(batch.invalid("commit"));
        }
        let receipt = self.adapter.commit(&batch.file.records, &batch.file.onboard_pubkey)?;
        batch.state = BatchState::Committed { tx_id: receipt.tx_id };
        Ok(receipt)
    }

    /// True once the commit reached the configured depth.
    pub fn poll_confirmation(&self, batch: &mut OnboardingBatch) -> Result<bool, TidemarkError> {
        let tx_id = match batch.state {
            BatchState::Committed { tx_id } => tx_id,
            BatchState::Confirmed { .. } => return Ok(true),
            _ => return Err(batch.invalid("poll for confirmation")),
        };
        let depth = self.node.confirmations(&tx_id)?.unwrap_or(0);
        if depth >= self.config().min_confirmations.max(1) {
            batch.state = BatchState::Confirmed { tx_id };
            info!(tx_id = %tx_id, depth, "onboarding batch confirmed");
            return Ok(true);
        }
        Ok(false)
    }

    // ── Caller-facing operations ─────────────────────────────────────────────

    /// Create and serialize a batch; writes it to `path` unless `path` is `None`.
    pub fn create_kyc_file(
        &self,
        path: Option<&Path>,
        singles: Vec<SingleKeyEntry>,
        groups: Vec<MultisigEntry>,
    ) -> Result<CreatedKycFile, TidemarkError> {
        let mut batch = self.create_batch(singles, groups)?;
        let contents = self.serialize(&mut batch)?;
        if let Some(path) = path {
            write_text(path, &contents)?;
            info!(path = %path.display(), entries = batch.records().len(), "wrote KYC file");
        }
        Ok(CreatedKycFile { onboard_pubkey: batch.file.onboard_pubkey, contents })
    }

    pub fn validate_kyc_file(&self, path: &Path) -> Result<ValidationReport, TidemarkError> {
        let mut batch = self.load_batch(&read_text(path)?)?;
        batch.records().require_entries()?;
        self.validate(&mut batch)
    }

    pub fn onboard_user(&self, path: &Path) -> Result<OnboardingReceipt, TidemarkError> {
        let mut batch = self.load_batch(&read_text(path)?)?;
        let receipt = self.commit(&mut batch)?;
        info!(path = %path.display(), tx_id = %receipt.tx_id, "onboarded KYC file");
        Ok(receipt)
    }

    pub fn query_whitelist(&self, address: &Destination) -> Result<bool, TidemarkError> {
        self.adapter.query(address)
    }

    /// Open a (possibly sealed) KYC file and write its plain form.
    pub fn read_kyc_file(&self, input: &Path, output: &Path) -> Result<(), TidemarkError> {
        let batch = self.load_batch(&read_text(input)?)?;
        write_text(output, &codec::encode_plain(&batch.file, Utc::now()))
    }
}
