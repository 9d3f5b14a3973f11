//! tidemark-kyc
//!
//! KYC onboarding for the Tidemark whitelist: the KYC file codec, the
//! membership registry adapter and the per-batch coordinator.

pub mod bulk;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod kyc_file;
pub mod ledger;
pub mod record_set;
pub mod whitelist;

pub use config::WhitelistConfig;
pub use coordinator::{BatchState, CreatedKycFile, OnboardingBatch, OnboardingCoordinator};
pub use kyc_file::KycFile;
pub use ledger::{KeyStore, Ledger};
pub use record_set::{KycRecordSet, ResolvedEntry};
pub use whitelist::{OnboardingReceipt, ValidationReport, WhitelistLedgerAdapter};
