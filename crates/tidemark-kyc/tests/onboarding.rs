//! End-to-end onboarding between a user node and the policy node of one chain.

use std::path::PathBuf;
use std::sync::Arc;

use tidemark_core::constants::{META_ONBOARDING_KEY, WHITELIST_ASSET_LABEL};
use tidemark_core::entry::{MultisigEntry, SingleKeyEntry};
use tidemark_core::error::{ErrorClass, TidemarkError};
use tidemark_core::types::{Destination, PubKey};
use tidemark_crypto::{KeyPair, KeyTweaker};
use tidemark_genesis::{apply_genesis, GenesisParams};
use tidemark_kyc::codec::comparable_lines;
use tidemark_kyc::{bulk, BatchState, Ledger, OnboardingCoordinator, WhitelistConfig};
use tidemark_state::NodeHandle;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Network {
    policy: Arc<NodeHandle>,
    user: Arc<NodeHandle>,
    policy_kyc: OnboardingCoordinator<NodeHandle>,
    user_kyc: OnboardingCoordinator<NodeHandle>,
    dir: PathBuf,
}

impl Network {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn mint(&self) {
        self.policy.engine.mint_block(1).unwrap();
    }

    fn whitelist_balance(&self) -> u64 {
        let asset = self.policy.asset_id(WHITELIST_ASSET_LABEL).unwrap();
        Ledger::balance(self.policy.as_ref(), &asset).unwrap()
    }

    fn tweaker(&self) -> KeyTweaker {
        KeyTweaker::new(self.policy.db.onboarding_key().unwrap()).unwrap()
    }

    /// Fresh user address as `(address, untweaked pubkey)`.
    fn user_address(&self) -> (Destination, PubKey) {
        let info = self.user.wallet.get_new_address().unwrap();
        (info.address, info.derived_pubkey.unwrap())
    }

    fn single(&self) -> SingleKeyEntry {
        let (address, pubkey) = self.user_address();
        SingleKeyEntry { address, pubkey }
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn network(name: &str) -> Network {
    let dir = std::env::temp_dir().join(format!("tidemark_onboarding_test_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let kyc = KeyPair::generate();
    let holder = KeyPair::generate();
    let params = GenesisParams::regtest(holder.destination(), holder.destination(), &kyc.public_key);

    let policy = Arc::new(NodeHandle::open_temporary().unwrap());
    apply_genesis(&policy.db, &params).unwrap();
    policy.wallet.import_privkey(&hex::encode(kyc.secret_bytes().as_slice())).unwrap();
    policy.wallet.import_privkey(&hex::encode(holder.secret_bytes().as_slice())).unwrap();

    let user = Arc::new(NodeHandle::open_temporary().unwrap());
    apply_genesis(&user.db, &params).unwrap();

    Network {
        policy_kyc: OnboardingCoordinator::new(policy.clone(), WhitelistConfig::default()),
        user_kyc: OnboardingCoordinator::new(user.clone(), WhitelistConfig::default()),
        policy,
        user,
        dir,
    }
}

fn group(threshold: usize, keys: &[PubKey]) -> MultisigEntry {
    MultisigEntry::new(threshold, keys.to_vec()).unwrap()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn two_single_entries_onboard_and_confirm() {
    let net = network("two_singles");
    let path = net.path("kycfile_normal.dat");
    let (a, b) = (net.single(), net.single());
    net.user_kyc
        .create_kyc_file(Some(&path), vec![a.clone(), b.clone()], vec![])
        .unwrap();

    let report = net.policy_kyc.validate_kyc_file(&path).unwrap();
    assert!(!report.is_whitelisted);
    assert_eq!(report.address_count(), 2);
    assert_eq!(report.addresses, vec![a.address, b.address]);

    let before = net.whitelist_balance();
    let receipt = net.policy_kyc.onboard_user(&path).unwrap();
    assert_eq!(receipt.members.len(), 2);
    assert_eq!(net.whitelist_balance(), before);

    // Pending registrations are not membership.
    assert!(!net.policy_kyc.query_whitelist(&a.address).unwrap());
    net.mint();

    assert!(net.policy_kyc.validate_kyc_file(&path).unwrap().is_whitelisted);
    assert!(net.policy_kyc.query_whitelist(&a.address).unwrap());
    assert!(net.policy_kyc.query_whitelist(&b.address).unwrap());
    assert_eq!(net.whitelist_balance(), before);
}

#[test]
fn empty_file_reports_no_address_data() {
    let net = network("empty");
    let path = net.path("kycfile_empty.dat");
    net.user_kyc.create_kyc_file(Some(&path), vec![], vec![]).unwrap();

    let err = net.policy_kyc.validate_kyc_file(&path).unwrap_err();
    assert!(matches!(err, TidemarkError::EmptyFile));
    assert!(err.to_string().contains("no address data in file"));
    assert_eq!(err.class(), ErrorClass::Structural);

    std::fs::write(&path, "").unwrap();
    let err = net.policy_kyc.validate_kyc_file(&path).unwrap_err();
    assert!(err.to_string().contains("no address data in file"));
}

#[test]
fn multisig_groups_are_tracked_independently() {
    let net = network("multisig");
    let keys: Vec<PubKey> = (0..3).map(|_| net.user_address().1).collect();
    let path = net.path("kycfile_multisig.dat");
    net.user_kyc
        .create_kyc_file(Some(&path), vec![], vec![group(2, &keys)])
        .unwrap();

    let report = net.policy_kyc.validate_kyc_file(&path).unwrap();
    assert_eq!(report.address_count(), 1);
    assert!(!report.is_whitelisted);
    net.policy_kyc.onboard_user(&path).unwrap();
    net.mint();

    let tweaker = net.tweaker();
    let onboarded = tweaker.multisig_address(2, &keys).unwrap();
    assert_eq!(report.addresses, vec![onboarded]);
    assert!(net.policy_kyc.query_whitelist(&onboarded).unwrap());

    let reversed: Vec<PubKey> = keys.iter().rev().cloned().collect();
    let reordered = tweaker.multisig_address(2, &reversed).unwrap();
    let subset = tweaker.multisig_address(2, &keys[..2]).unwrap();
    assert!(!net.policy_kyc.query_whitelist(&reordered).unwrap());
    assert!(!net.policy_kyc.query_whitelist(&subset).unwrap());
    for key in &keys {
        assert!(!net.policy_kyc.query_whitelist(&tweaker.address_for(key).unwrap()).unwrap());
    }
}

#[test]
fn mixed_batch_file_and_string_agree() {
    let net = network("mixed");
    let singles = vec![net.single(), net.single()];
    let keys: Vec<PubKey> = (0..4).map(|_| net.user_address().1).collect();
    let groups = vec![
        group(2, &keys[0..3]),
        group(2, &keys[1..4]),
        group(2, &keys[2..4]),
    ];

    let path = net.path("kycfile.dat");
    let on_disk = net
        .user_kyc
        .create_kyc_file(Some(&path), singles.clone(), groups.clone())
        .unwrap();
    let as_string = net.user_kyc.create_kyc_file(None, singles, groups).unwrap();
    assert_ne!(on_disk.onboard_pubkey, as_string.onboard_pubkey);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk.contents);

    let report = net.policy_kyc.validate_kyc_file(&path).unwrap();
    assert_eq!(report.address_count(), 5);
    assert!(!report.is_whitelisted);

    let from_str = net.path("kycfile_fromstr.dat");
    std::fs::write(&from_str, &as_string.contents).unwrap();
    let (plain, plain_from_str) = (net.path("kycfile_plain.dat"), net.path("kycfile_fromstr_plain.dat"));
    net.policy_kyc.read_kyc_file(&path, &plain).unwrap();
    net.policy_kyc.read_kyc_file(&from_str, &plain_from_str).unwrap();

    let a = comparable_lines(&std::fs::read_to_string(&plain).unwrap(), &on_disk.onboard_pubkey);
    let b = comparable_lines(&std::fs::read_to_string(&plain_from_str).unwrap(), &as_string.onboard_pubkey);
    assert_eq!(a.len(), 5);
    assert_eq!(a, b);

    net.policy_kyc.onboard_user(&path).unwrap();
    net.mint();
    assert!(net.policy_kyc.validate_kyc_file(&path).unwrap().is_whitelisted);
    // The second file carries the same identities.
    assert!(net.policy_kyc.validate_kyc_file(&from_str).unwrap().is_whitelisted);
}

#[test]
fn reonboarding_is_rejected_and_balance_untouched() {
    let net = network("reonboard");
    let path = net.path("kycfile.dat");
    net.user_kyc.create_kyc_file(Some(&path), vec![net.single()], vec![]).unwrap();
    let before = net.whitelist_balance();

    net.policy_kyc.onboard_user(&path).unwrap();
    let pending = net.policy_kyc.onboard_user(&path).unwrap_err();
    assert!(matches!(pending, TidemarkError::AlreadyOnboarded { count: 1 }));

    net.mint();
    let err = net.policy_kyc.onboard_user(&path).unwrap_err();
    assert!(matches!(err, TidemarkError::AlreadyOnboarded { count: 1 }));
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(net.whitelist_balance(), before);
    assert_eq!(net.policy.db.member_count(), 1);
}

#[test]
fn partially_onboarded_file_registers_only_new_entries() {
    let net = network("partial");
    let first = net.single();
    let first_path = net.path("first.dat");
    net.user_kyc.create_kyc_file(Some(&first_path), vec![first.clone()], vec![]).unwrap();
    net.policy_kyc.onboard_user(&first_path).unwrap();
    net.mint();

    let second = net.single();
    let both = net.path("both.dat");
    net.user_kyc.create_kyc_file(Some(&both), vec![first, second.clone()], vec![]).unwrap();
    let receipt = net.policy_kyc.onboard_user(&both).unwrap();
    assert_eq!(receipt.members, vec![second.address]);
    assert_eq!(receipt.skipped, 1);
}

#[test]
fn corrupt_entry_fails_the_whole_batch() {
    let net = network("all_or_nothing");
    let path = net.path("kycfile.dat");
    let (a, b, c) = (net.single(), net.single(), net.single());
    let created = net
        .user_kyc
        .create_kyc_file(Some(&path), vec![a.clone(), b.clone(), c.clone()], vec![])
        .unwrap();

    // Rewrite the plain form with one address swapped for a foreign one.
    let plain = net.path("plain.dat");
    net.policy_kyc.read_kyc_file(&path, &plain).unwrap();
    let foreign = KeyPair::generate().destination();
    let text = std::fs::read_to_string(&plain).unwrap().replace(&b.address.to_address(), &foreign.to_address());
    std::fs::write(&plain, text).unwrap();

    let err = net.policy_kyc.onboard_user(&plain).unwrap_err();
    assert!(matches!(err, TidemarkError::MalformedKycFile { .. }));
    assert_eq!(err.class(), ErrorClass::Structural);
    net.mint();
    for entry in [&a, &b, &c] {
        assert!(!net.policy_kyc.query_whitelist(&entry.address).unwrap());
    }
    assert!(created.contents.contains("# Sealed entries"));
}

#[test]
fn untweaked_address_rejected_at_creation() {
    let net = network("untweaked");
    let kp = KeyPair::generate();
    let bad = SingleKeyEntry { address: kp.destination(), pubkey: kp.public_key.clone() };
    let err = net.user_kyc.create_kyc_file(None, vec![net.single(), bad], vec![]).unwrap_err();
    assert!(matches!(err, TidemarkError::InvalidEntry { index: 1, .. }));
}

#[test]
fn concurrent_commits_conflict_at_the_ledger() {
    let net = network("concurrent");
    let (first, second) = (net.path("first.dat"), net.path("second.dat"));
    net.user_kyc.create_kyc_file(Some(&first), vec![net.single()], vec![]).unwrap();
    net.user_kyc.create_kyc_file(Some(&second), vec![net.single()], vec![]).unwrap();

    let [a, b] = std::thread::scope(|s| {
        let a = s.spawn(|| net.policy_kyc.onboard_user(&first));
        let b = s.spawn(|| net.policy_kyc.onboard_user(&second));
        [a.join().unwrap(), b.join().unwrap()]
    });
    let (loser, err) = match (a, b) {
        (Ok(_), Err(e)) => (&second, e),
        (Err(e), Ok(_)) => (&first, e),
        other => panic!("expected exactly one winner: {other:?}"),
    };
    assert!(matches!(err, TidemarkError::LedgerRejection { conflict: true, .. }), "{err}");
    assert_eq!(err.class(), ErrorClass::Conflict);

    // After confirmation the loser retries against the fresh holding.
    net.mint();
    net.policy_kyc.onboard_user(loser).unwrap();
    net.mint();
    assert_eq!(net.policy.db.member_count(), 2);
}

#[test]
fn batch_state_machine() {
    let net = network("state_machine");
    let mut batch = net.user_kyc.create_batch(vec![net.single()], vec![]).unwrap();
    assert_eq!(batch.state(), BatchState::Created);
    assert!(matches!(net.user_kyc.commit(&mut batch), Err(TidemarkError::InvalidBatchState { .. })));
    assert!(matches!(
        net.user_kyc.poll_confirmation(&mut batch),
        Err(TidemarkError::InvalidBatchState { .. })
    ));

    let text = net.user_kyc.serialize(&mut batch).unwrap();
    assert_eq!(batch.state(), BatchState::Serialized);

    let mut loaded = net.policy_kyc.load_batch(&text).unwrap();
    assert_eq!(loaded.records(), batch.records());
    net.policy_kyc.validate(&mut loaded).unwrap();
    assert_eq!(loaded.state(), BatchState::Validated);

    let receipt = net.policy_kyc.commit(&mut loaded).unwrap();
    assert_eq!(loaded.state(), BatchState::Committed { tx_id: receipt.tx_id });
    assert!(matches!(net.policy_kyc.commit(&mut loaded), Err(TidemarkError::InvalidBatchState { .. })));
    assert!(!net.policy_kyc.poll_confirmation(&mut loaded).unwrap());

    net.mint();
    assert!(net.policy_kyc.poll_confirmation(&mut loaded).unwrap());
    assert_eq!(loaded.state(), BatchState::Confirmed { tx_id: receipt.tx_id });
    // Validation stays available after commit.
    assert!(net.policy_kyc.validate(&mut loaded).unwrap().is_whitelisted);
}

#[test]
fn membership_waits_for_configured_depth() {
    let net = network("depth_two");
    let config = WhitelistConfig { min_confirmations: 2, ..WhitelistConfig::default() };
    let deep_kyc = OnboardingCoordinator::new(net.policy.clone(), config);

    let entry = net.single();
    let mut batch = net.user_kyc.create_batch(vec![entry.clone()], vec![]).unwrap();
    let text = net.user_kyc.serialize(&mut batch).unwrap();
    let mut loaded = deep_kyc.load_batch(&text).unwrap();
    let receipt = deep_kyc.commit(&mut loaded).unwrap();

    net.mint();
    assert!(net.policy_kyc.query_whitelist(&entry.address).unwrap());
    assert!(!deep_kyc.query_whitelist(&entry.address).unwrap());
    assert!(!deep_kyc.poll_confirmation(&mut loaded).unwrap());
    assert!(!deep_kyc.validate(&mut loaded).unwrap().is_whitelisted);
    assert_eq!(loaded.state(), BatchState::Committed { tx_id: receipt.tx_id });

    net.mint();
    assert!(deep_kyc.query_whitelist(&entry.address).unwrap());
    assert!(deep_kyc.poll_confirmation(&mut loaded).unwrap());
    assert!(deep_kyc.validate(&mut loaded).unwrap().is_whitelisted);
    assert_eq!(loaded.state(), BatchState::Confirmed { tx_id: receipt.tx_id });
}

#[test]
fn user_node_reads_its_own_sealed_file() {
    let net = network("own_file");
    let created = net.user_kyc.create_kyc_file(None, vec![net.single()], vec![]).unwrap();
    let batch = net.user_kyc.load_batch(&created.contents).unwrap();
    assert_eq!(batch.file().onboard_pubkey, created.onboard_pubkey);
    assert_eq!(batch.records().len(), 1);
}

#[test]
fn file_for_another_chain_rejected() {
    let net = network("other_chain");
    let other = network("other_chain_2");
    let path = net.path("kycfile.dat");
    other.user_kyc.create_kyc_file(Some(&path), vec![other.single()], vec![]).unwrap();
    let err = net.policy_kyc.validate_kyc_file(&path).unwrap_err();
    assert!(matches!(err, TidemarkError::WrongOnboardingKey { .. }));
}

#[test]
fn insufficient_policy_asset_without_whitelist_holding() {
    let net = network("no_asset");
    let path = net.path("kycfile.dat");
    net.user_kyc.create_kyc_file(Some(&path), vec![net.single()], vec![]).unwrap();

    // A node with the onboarding secret but not the WHITELIST holder key.
    let bare = Arc::new(NodeHandle::open_temporary().unwrap());
    let kyc_key = net.policy.db.onboarding_key().unwrap();
    bare.db.put_meta(META_ONBOARDING_KEY, kyc_key.as_bytes()).unwrap();
    bare.db.put_block(&net.policy.db.get_block(0).unwrap().unwrap()).unwrap();
    let kyc = net.policy.wallet.kyc_keypair().unwrap().unwrap();
    bare.wallet.import_privkey(&hex::encode(kyc.secret_bytes().as_slice())).unwrap();

    let coordinator = OnboardingCoordinator::new(bare, WhitelistConfig::default());
    let err = coordinator.onboard_user(&path).unwrap_err();
    assert!(matches!(err, TidemarkError::InsufficientPolicyAsset { have: 0, .. }));
    assert_eq!(err.class(), ErrorClass::LedgerRejection);
}

#[test]
fn bulk_import_from_derived_key_dump() {
    let net = network("bulk");
    let addresses: Vec<Destination> = (0..3).map(|_| net.user_address().0).collect();
    let dump = net.path("derived_keys.txt");
    assert_eq!(bulk::dump_derived_keys(net.user.as_ref(), &dump).unwrap(), 3);

    let receipt = bulk::read_whitelist(net.policy_kyc.adapter(), &dump).unwrap();
    assert_eq!(receipt.members.len(), 3);
    net.mint();
    for address in &addresses {
        assert!(net.policy_kyc.query_whitelist(address).unwrap());
    }
    let record = net.policy.engine.member(&addresses[0]).unwrap().unwrap();
    assert_eq!(record.onboard_pubkey, net.policy.db.onboarding_key().unwrap());
}

#[test]
fn plain_files_when_sealing_disabled() {
    let net = network("plain_config");
    let config = WhitelistConfig { seal_kyc_files: false, ..WhitelistConfig::default() };
    let user_kyc = OnboardingCoordinator::new(net.user.clone(), config);
    let entry = net.single();
    let created = user_kyc.create_kyc_file(None, vec![entry.clone()], vec![]).unwrap();
    assert!(created.contents.contains(&entry.address.to_address()));
    let batch = net.policy_kyc.load_batch(&created.contents).unwrap();
    assert_eq!(batch.records().destinations(), vec![entry.address]);
}

#[test]
fn oversized_group_rejected_by_config() {
    let net = network("max_keys");
    let config = WhitelistConfig { max_multisig_keys: 2, ..WhitelistConfig::default() };
    let user_kyc = OnboardingCoordinator::new(net.user.clone(), config);
    let keys: Vec<PubKey> = (0..3).map(|_| net.user_address().1).collect();
    let err = user_kyc.create_kyc_file(None, vec![], vec![group(2, &keys)]).unwrap_err();
    assert!(matches!(err, TidemarkError::InvalidEntry { index: 0, .. }));
}
