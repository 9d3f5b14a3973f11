use std::sync::Arc;

use tidemark_core::constants::WHITELIST_ASSET_LABEL;
use tidemark_core::error::TidemarkError;
use tidemark_core::transaction::{OutputKind, Registration, Transaction, TxOut};
use tidemark_core::types::{Amount, Destination, PubKey, TxId};
use tracing::{debug, info, warn};

use crate::config::WhitelistConfig;
use crate::ledger::Ledger;
use crate::record_set::KycRecordSet;

/// Result of a read-only validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    /// True only when every entry is a confirmed member.
    pub is_whitelisted: bool,
    pub addresses: Vec<Destination>,
}

impl ValidationReport {
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }
}

/// A submitted registration transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnboardingReceipt {
    pub tx_id: TxId,
    /// Destinations registered by this transaction.
    pub members: Vec<Destination>,
    /// Entries left out because they were already members or pending.
    pub skipped: usize,
    /// WHITELIST value spent and returned to the holder.
    pub whitelist_value: Amount,
}

/// Membership registry view over a ledger.
pub struct WhitelistLedgerAdapter<L> {
    ledger: Arc<L>,
    config: WhitelistConfig,
}

impl<L: Ledger> WhitelistLedgerAdapter<L> {
    pub fn new(ledger: Arc<L>, config: WhitelistConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &WhitelistConfig {
        &self.config
    }

    /// Confirmed membership at the configured depth. Pending registrations do not count.
    pub fn query(&self, address: &Destination) -> Result<bool, TidemarkError> {
        let Some(member) = self.ledger.member(address)? else {
            return Ok(false);
        };
        let depth = self.ledger.confirmations(&member.tx_id)?.unwrap_or(0);
        Ok(depth >= self.config.min_confirmations.max(1))
    }

    /// Read-only: report the batch's addresses and whether all are members.
    pub fn validate(&self, records: &KycRecordSet) -> Result<ValidationReport, TidemarkError> {
        let addresses = records.destinations();
        let mut is_whitelisted = !addresses.is_empty();
        for address in &addresses {
            if !self.query(address)? {
                is_whitelisted = false;
                break;
            }
        }
        debug!(addresses = addresses.len(), is_whitelisted, "validated record set");
        Ok(ValidationReport { is_whitelisted, addresses })
    }

    /// Register every not-yet-admitted entry in one zero-fee transaction.
    ///
    /// The transaction spends one WHITELIST output of the local wallet and
    /// pays its full value back to the same destination. Entries that are
    /// already members or pending are skipped; if none remain the call fails
    /// with `AlreadyOnboarded`. Submit errors surface as `LedgerRejection`.
    pub fn commit(
        &self,
        records: &KycRecordSet,
        onboard_pubkey: &PubKey,
    ) -> Result<OnboardingReceipt, TidemarkError> {
        records.require_entries()?;
        let kyc_pubkey = self.ledger.onboarding_key()?;

        let mut fresh = Vec::with_capacity(records.len());
        for r in records.entries() {
            if self.ledger.member(&r.destination)?.is_some()
                || self.ledger.is_registration_pending(&r.destination)?
            {
                debug!(address = %r.destination, "skipping already registered entry");
                continue;
            }
            fresh.push(r);
        }
        if fresh.is_empty() {
            return Err(TidemarkError::AlreadyOnboarded { count: records.len() });
        }

        // ── Policy asset input ───────────────────────────────────────────────
        let whitelist = self.ledger.asset_id(WHITELIST_ASSET_LABEL)?;
        let holdings = self.ledger.owned_unspent(&whitelist)?;
        let Some(input) = holdings.into_iter().next() else {
            return Err(TidemarkError::InsufficientPolicyAsset {
                asset: WHITELIST_ASSET_LABEL.to_string(),
                need: 1,
                have: 0,
            });
        };
        let holder = *input
            .output
            .destination()
            .ok_or_else(|| TidemarkError::Other("WHITELIST holding has no destination".into()))?;

        // ── Outputs: value back to the holder, one registration per entry ────
        let mut outputs = vec![TxOut::pay(whitelist, input.output.value, holder)];
        for r in &fresh {
            outputs.push(TxOut {
                asset: whitelist,
                value: 0,
                kind: OutputKind::Register(Registration {
                    kyc_pubkey: kyc_pubkey.clone(),
                    onboard_pubkey: onboard_pubkey.clone(),
                    entry: r.entry.clone(),
                }),
            });
        }

        let mut tx = Transaction::unsigned(vec![input.outpoint], outputs, 0);
        self.ledger.sign_transaction(&mut tx)?;
        let tx_id = self.ledger.submit_transaction(&tx).map_err(|e| {
            warn!(error = %e, "registration transaction rejected");
            e.into_ledger_rejection()
        })?;

        let members: Vec<Destination> = fresh.iter().map(|r| r.destination).collect();
        info!(
            tx_id = %tx_id,
            members = members.len(),
            skipped = records.len() - members.len(),
            "submitted whitelist registration"
        );
        Ok(OnboardingReceipt {
            tx_id,
            skipped: records.len() - members.len(),
            members,
            whitelist_value: input.output.value,
        })
    }

    /// Administrative seeding: register entries under the onboarding key
    /// itself, without a KYC file.
    pub fn bulk_import(&self, records: &KycRecordSet) -> Result<OnboardingReceipt, TidemarkError> {
        let kyc_pubkey = self.ledger.onboarding_key()?;
        info!(entries = records.len(), "bulk whitelist import");
        self.commit(records, &kyc_pubkey)
    }
}
