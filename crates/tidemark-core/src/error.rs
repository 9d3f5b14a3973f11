use thiserror::Error;

/// Coarse classification used by callers to decide whether to retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed local input. Never reaches the ledger; retrying is pointless.
    Structural,
    /// Double spend or already-onboarded. Safe to retry with fresh inputs.
    Conflict,
    /// Ledger refused the request for a non-conflict reason.
    LedgerRejection,
    /// Storage, serialization or I/O failure inside the node.
    Internal,
}

#[derive(Debug, Error)]
pub enum TidemarkError {
    // ── Keys, addresses, entries ─────────────────────────────────────────────
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),

    #[error("invalid entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("invalid multisig threshold: {threshold}-of-{keys} (max {max} keys)")]
    InvalidThreshold { threshold: usize, keys: usize, max: usize },

    #[error("address {address} is not derived from the supplied public key")]
    TweakMismatch { address: String },

    // ── KYC files ────────────────────────────────────────────────────────────
    #[error("no address data in file")]
    EmptyFile,

    #[error("malformed KYC file at line {line}: {reason}")]
    MalformedKycFile { line: usize, reason: String },

    #[error("KYC file is addressed to onboarding key {found}, expected {expected}")]
    WrongOnboardingKey { expected: String, found: String },

    #[error("failed to seal or open KYC data: {0}")]
    Seal(String),

    #[error("no secret key available for {0}")]
    MissingSecret(String),

    // ── Whitelist ────────────────────────────────────────────────────────────
    #[error("all {count} entries are already whitelisted or pending")]
    AlreadyOnboarded { count: usize },

    #[error("insufficient {asset} policy asset: need {need} spendable output(s), have {have}")]
    InsufficientPolicyAsset { asset: String, need: usize, have: usize },

    #[error("batch is {state}; cannot {action}")]
    InvalidBatchState { state: String, action: String },

    #[error("ledger rejected transaction: {reason}")]
    LedgerRejection { reason: String, conflict: bool },

    // ── Ledger validation ────────────────────────────────────────────────────
    #[error("transaction already known: {0}")]
    DuplicateTransaction(String),

    #[error("input {0} is already spent by a pending transaction")]
    DoubleSpend(String),

    #[error("unknown or spent input: {0}")]
    UnknownInput(String),

    #[error("invalid signature for input {0}")]
    InvalidSignature(String),

    #[error("asset {asset} does not balance: inputs {inputs}, outputs {outputs}, fee {fee}")]
    AssetImbalance { asset: String, inputs: u64, outputs: u64, fee: u64 },

    #[error("registration rejected: {0}")]
    InvalidRegistration(String),

    #[error("destination already whitelisted: {0}")]
    AlreadyWhitelisted(String),

    #[error("transaction id does not match body")]
    TxIdMismatch,

    #[error("transaction spends no inputs")]
    NoInputs,

    #[error("unknown asset label: {0}")]
    UnknownAsset(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    // ── Genesis ──────────────────────────────────────────────────────────────
    #[error("genesis already applied")]
    GenesisAlreadyApplied,

    #[error("chain has no genesis block")]
    GenesisMissing,

    #[error("genesis supply mismatch for {asset}: expected {expected}, got {got}")]
    GenesisSupplyMismatch { asset: String, expected: u64, got: u64 },

    #[error("{0}")]
    Other(String),
}

impl TidemarkError {
    pub fn class(&self) -> ErrorClass {
        use TidemarkError::*;
        match self {
            InvalidKey(_)
            | InvalidAddress(_)
            | InvalidTxId(_)
            | InvalidEntry { .. }
            | InvalidThreshold { .. }
            | TweakMismatch { .. }
            | EmptyFile
            | MalformedKycFile { .. }
            | WrongOnboardingKey { .. }
            | InvalidBatchState { .. } => ErrorClass::Structural,

            AlreadyOnboarded { .. }
            | DuplicateTransaction(_)
            | DoubleSpend(_)
            | AlreadyWhitelisted(_) => ErrorClass::Conflict,
            LedgerRejection { conflict: true, .. } => ErrorClass::Conflict,

            LedgerRejection { conflict: false, .. }
            | InsufficientPolicyAsset { .. }
            | UnknownInput(_)
            | InvalidSignature(_)
            | AssetImbalance { .. }
            | InvalidRegistration(_)
            | TxIdMismatch
            | NoInputs
            | UnknownAsset(_) => ErrorClass::LedgerRejection,

            Seal(_)
            | MissingSecret(_)
            | Serialization(_)
            | Storage(_)
            | Io(_)
            | GenesisAlreadyApplied
            | GenesisMissing
            | GenesisSupplyMismatch { .. }
            | Other(_) => ErrorClass::Internal,
        }
    }

    /// Wrap an error returned by the ledger's submit path.
    pub fn into_ledger_rejection(self) -> TidemarkError {
        match self {
            TidemarkError::LedgerRejection { .. } => self,
            other => {
                let conflict = other.class() == ErrorClass::Conflict;
                TidemarkError::LedgerRejection { reason: other.to_string(), conflict }
            }
        }
    }
}
