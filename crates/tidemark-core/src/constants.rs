/// ─── Tidemark Protocol Constants ────────────────────────────────────────────
///
/// Permissioned UTXO ledger. Receiving and spending is gated by an on-chain
/// whitelist administered by the holder of the policy onboarding key.

// ── Assets ───────────────────────────────────────────────────────────────────

/// Domain prefix hashed in front of an asset label to form its `AssetId`.
pub const ASSET_ID_DOMAIN: &[u8] = b"tidemark-asset";

/// Label of the native fee-paying asset.
pub const NATIVE_ASSET_LABEL: &str = "TDM";

/// Label of the policy asset whose holder may extend the whitelist.
pub const WHITELIST_ASSET_LABEL: &str = "WHITELIST";

/// Base units per whole coin (display only).
pub const COIN: u64 = 100_000_000;

// ── Addresses ────────────────────────────────────────────────────────────────

/// Version byte of pay-to-key-hash addresses.
pub const PUBKEY_HASH_VERSION: u8 = 0x41;

/// Version byte of pay-to-script-hash (multisig) addresses.
pub const SCRIPT_HASH_VERSION: u8 = 0x7a;

/// Compressed secp256k1 public key length.
pub const PUBKEY_LEN: usize = 33;

// ── Key tweaking ─────────────────────────────────────────────────────────────

/// Domain tag for the onboard key tweak: t = SHA3-256(tag || K || P).
pub const TWEAK_DOMAIN: &[u8] = b"tidemark/tweak/v1";

/// blake3 `derive_key` context for sealing KYC file bodies.
pub const KYC_SEAL_CONTEXT: &str = "tidemark 2026-01 kyc file seal v1";

/// ChaCha20-Poly1305 nonce length used by sealed KYC bodies.
pub const SEAL_NONCE_LEN: usize = 12;

// ── Whitelist ────────────────────────────────────────────────────────────────

/// Upper bound on the number of keys in a multisig whitelist entry.
pub const MAX_MULTISIG_KEYS: usize = 15;

/// Default confirmation depth before a registration counts as membership.
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 1;

// ── KYC file format ──────────────────────────────────────────────────────────

/// Lines starting with this character are comments.
pub const KYC_COMMENT_PREFIX: char = '#';

/// Fixed first comment line of every KYC file.
pub const KYC_FILE_BANNER: &str = "# Tidemark KYC file";

/// Fixed last comment line of every KYC file.
pub const KYC_FILE_TRAILER: &str = "# End of KYC file";

// ── Meta keys ────────────────────────────────────────────────────────────────

pub const META_TIP_HEIGHT: &str = "tip_height";
pub const META_ONBOARDING_KEY: &str = "onboarding_key";
