use tidemark_core::entry::OnboardEntry;
use tidemark_core::error::TidemarkError;
use tidemark_core::types::Destination;
use tidemark_crypto::KeyTweaker;

/// An entry together with the destination it admits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub entry: OnboardEntry,
    pub destination: Destination,
}

/// Ordered onboarding entries, unique by derived destination.
///
/// Construction validates every entry against the onboarding key, so a
/// record set never holds an entry the ledger would reject as malformed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KycRecordSet {
    entries: Vec<ResolvedEntry>,
}

impl KycRecordSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve and deduplicate `entries`, keeping the first of each destination.
    pub fn from_entries(tweaker: &KeyTweaker, entries: Vec<OnboardEntry>) -> Result<Self, TidemarkError> {
        let mut resolved: Vec<ResolvedEntry> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let destination = tweaker
                .entry_destination(&entry)
                .map_err(|e| TidemarkError::InvalidEntry { index, reason: e.to_string() })?;
            if resolved.iter().any(|r| r.destination == destination) {
                continue;
            }
            resolved.push(ResolvedEntry { entry, destination });
        }
        Ok(Self { entries: resolved })
    }

    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.entries.iter().map(|r| r.destination).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails with `EmptyFile` when there is nothing to onboard.
    pub fn require_entries(&self) -> Result<&Self, TidemarkError> {
        if self.entries.is_empty() {
            return Err(TidemarkError::EmptyFile);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidemark_core::entry::MultisigEntry;
    use tidemark_crypto::KeyPair;

    fn tweaker() -> KeyTweaker {
        KeyTweaker::new(KeyPair::generate().public_key).unwrap()
    }

    #[test]
    fn duplicates_keep_first() {
        let tw = tweaker();
        let a = KeyPair::generate().public_key;
        let b = KeyPair::generate().public_key;
        let single = OnboardEntry::single(tw.address_for(&a).unwrap(), a.clone());
        let group = OnboardEntry::Multisig(MultisigEntry::new(1, vec![a, b]).unwrap());
        let set = KycRecordSet::from_entries(&tw, vec![single.clone(), group.clone(), single.clone()]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries()[0].entry, single);
        assert_eq!(set.entries()[1].entry, group);
    }

    #[test]
    fn bad_entry_reports_index() {
        let tw = tweaker();
        let a = KeyPair::generate();
        let good = OnboardEntry::single(tw.address_for(&a.public_key).unwrap(), a.public_key.clone());
        let bad = OnboardEntry::single(a.destination(), a.public_key.clone());
        let err = KycRecordSet::from_entries(&tw, vec![good, bad]).unwrap_err();
        assert!(matches!(err, TidemarkError::InvalidEntry { index: 1, .. }));
    }

    #[test]
    fn empty_set_is_valid_but_not_onboardable() {
        let set = KycRecordSet::from_entries(&tweaker(), vec![]).unwrap();
        assert!(set.is_empty());
        assert!(matches!(set.require_entries(), Err(TidemarkError::EmptyFile)));
    }
}
