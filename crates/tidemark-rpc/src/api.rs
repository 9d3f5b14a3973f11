use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcAddressInfo, RpcBlock, RpcCreatedKycFile, RpcMultisig, RpcMultisigEntry, RpcOnboardReceipt,
    RpcRawTransaction, RpcSingleKeyEntry, RpcValidation,
};

/// Tidemark JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "tidemark_" via `namespace = "tidemark"`.
#[rpc(server, client, namespace = "tidemark")]
pub trait TidemarkApi {
    // ── KYC onboarding ────────────────────────────────────────────────────────

    /// Build a KYC file from the given entries. An empty `path` returns the
    /// contents without writing a file.
    #[method(name = "createKycFile")]
    async fn create_kyc_file(
        &self,
        path: String,
        singles: Vec<RpcSingleKeyEntry>,
        multisig: Vec<RpcMultisigEntry>,
    ) -> RpcResult<RpcCreatedKycFile>;

    /// Report the file's addresses and whether every one is a member.
    #[method(name = "validateKycFile")]
    async fn validate_kyc_file(&self, path: String) -> RpcResult<RpcValidation>;

    /// Register the file's entries. Policy node only.
    #[method(name = "onboardUser")]
    async fn onboard_user(&self, path: String) -> RpcResult<RpcOnboardReceipt>;

    #[method(name = "queryWhitelist")]
    async fn query_whitelist(&self, address: String) -> RpcResult<bool>;

    /// Write the plain form of a (possibly sealed) KYC file to `output`.
    #[method(name = "readKycFile")]
    async fn read_kyc_file(&self, input: String, output: String) -> RpcResult<bool>;

    /// Dump every derived wallet address with its untweaked key. Returns the count.
    #[method(name = "dumpDerivedKeys")]
    async fn dump_derived_keys(&self, path: String) -> RpcResult<usize>;

    /// Register every address of a derived key dump.
    #[method(name = "readWhitelist")]
    async fn read_whitelist(&self, path: String) -> RpcResult<RpcOnboardReceipt>;

    // ── Wallet ────────────────────────────────────────────────────────────────

    /// Fresh address bound to the chain's onboarding key.
    #[method(name = "getNewAddress")]
    async fn get_new_address(&self) -> RpcResult<String>;

    #[method(name = "validateAddress")]
    async fn validate_address(&self, address: String) -> RpcResult<RpcAddressInfo>;

    /// N-of-M script address over the spending keys `keys`, as reported by
    /// `validateAddress`.
    #[method(name = "createMultisig")]
    async fn create_multisig(&self, n: usize, keys: Vec<String>) -> RpcResult<RpcMultisig>;

    #[method(name = "importPrivKey")]
    async fn import_priv_key(&self, secret_hex: String) -> RpcResult<RpcAddressInfo>;

    /// Confirmed wallet balance of the asset with `label`, in base units.
    #[method(name = "getBalance")]
    async fn get_balance(&self, label: String) -> RpcResult<u64>;

    // ── Chain ─────────────────────────────────────────────────────────────────

    /// Mint `n` blocks. Returns their heights.
    #[method(name = "generate")]
    async fn generate(&self, n: u32) -> RpcResult<Vec<u64>>;

    #[method(name = "getBlock")]
    async fn get_block(&self, height: u64) -> RpcResult<Option<RpcBlock>>;

    #[method(name = "getRawTransaction")]
    async fn get_raw_transaction(&self, txid: String) -> RpcResult<Option<RpcRawTransaction>>;
}
