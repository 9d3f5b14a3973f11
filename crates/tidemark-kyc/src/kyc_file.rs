use std::path::Path;

use tidemark_core::constants::SEAL_NONCE_LEN;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::PubKey;

use crate::record_set::KycRecordSet;

/// A decoded KYC file: the key line plus the entries it carries.
///
/// `onboard_pubkey` is the user's per-file key, `kyc_pubkey` the chain's
/// onboarding key the file is addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KycFile {
    pub onboard_pubkey: PubKey,
    pub kyc_pubkey: PubKey,
    pub nonce: [u8; SEAL_NONCE_LEN],
    pub records: KycRecordSet,
}

impl KycFile {
    pub fn new(
        onboard_pubkey: PubKey,
        kyc_pubkey: PubKey,
        nonce: [u8; SEAL_NONCE_LEN],
        records: KycRecordSet,
    ) -> Self {
        Self { onboard_pubkey, kyc_pubkey, nonce, records }
    }
}

pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String, TidemarkError> {
    Ok(std::fs::read_to_string(path)?)
}

pub fn write_text<P: AsRef<Path>>(path: P, contents: &str) -> Result<(), TidemarkError> {
    Ok(std::fs::write(path, contents)?)
}
