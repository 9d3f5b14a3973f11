//! Administrative key dump and whitelist import, outside the per-batch flow.

use std::path::Path;

use chrono::Utc;
use tidemark_core::error::TidemarkError;
use tidemark_crypto::KeyTweaker;
use tracing::info;

use crate::codec;
use crate::kyc_file::{read_text, write_text};
use crate::ledger::{KeyStore, Ledger};
use crate::whitelist::{OnboardingReceipt, WhitelistLedgerAdapter};

/// Write every derived wallet address with its untweaked key. Returns the count.
pub fn dump_derived_keys<K: KeyStore>(keys: &K, path: &Path) -> Result<usize, TidemarkError> {
    let derived = keys.derived_keys()?;
    write_text(path, &codec::encode_key_dump(&derived, Utc::now()))?;
    info!(path = %path.display(), keys = derived.len(), "dumped derived keys");
    Ok(derived.len())
}

/// Register every address of a key dump.
pub fn read_whitelist<L: Ledger>(
    adapter: &WhitelistLedgerAdapter<L>,
    path: &Path,
) -> Result<OnboardingReceipt, TidemarkError> {
    let tweaker = KeyTweaker::new(adapter.ledger().onboarding_key()?)?;
    let records = codec::decode_key_dump(&read_text(path)?, &tweaker)?;
    adapter.bulk_import(&records)
}
