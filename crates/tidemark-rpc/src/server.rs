use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tracing::{info, warn};

use tidemark_core::entry::{MultisigEntry, SingleKeyEntry};
use tidemark_core::error::{ErrorClass, TidemarkError};
use tidemark_core::types::{Destination, PubKey, TxId};
use tidemark_crypto::{multisig_destination, multisig_script};
use tidemark_kyc::{bulk, OnboardingCoordinator, WhitelistConfig};
use tidemark_state::NodeHandle;

use crate::api::TidemarkApiServer;
use crate::types::{
    RpcAddressInfo, RpcBlock, RpcCreatedKycFile, RpcMultisig, RpcMultisigEntry, RpcOnboardReceipt,
    RpcRawTransaction, RpcSingleKeyEntry, RpcValidation,
};

// ── Error codes ───────────────────────────────────────────────────────────────

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// Double spend or already onboarded; retry with fresh inputs.
pub const CONFLICT: i32 = -25;
/// Refused by the ledger for a non-conflict reason.
pub const LEDGER_REJECTED: i32 = -26;

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn tidemark_err(e: TidemarkError) -> ErrorObject<'static> {
    let code = match e.class() {
        ErrorClass::Structural => INVALID_PARAMS,
        ErrorClass::Conflict => CONFLICT,
        ErrorClass::LedgerRejection => LEDGER_REJECTED,
        ErrorClass::Internal => INTERNAL_ERROR,
    };
    if code == INTERNAL_ERROR {
        warn!(error = %e, "RPC call failed");
    }
    rpc_err(code, e.to_string())
}

fn parse_address(s: &str) -> RpcResult<Destination> {
    Destination::from_address(s).map_err(tidemark_err)
}

fn parse_pubkey(s: &str) -> RpcResult<PubKey> {
    PubKey::from_hex(s).map_err(tidemark_err)
}

fn parse_pubkeys(keys: &[String]) -> RpcResult<Vec<PubKey>> {
    keys.iter().map(|k| parse_pubkey(k)).collect()
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub node: Arc<NodeHandle>,
    pub kyc: OnboardingCoordinator<NodeHandle>,
}

impl RpcServerState {
    pub fn new(node: Arc<NodeHandle>, config: WhitelistConfig) -> Self {
        Self { kyc: OnboardingCoordinator::new(node.clone(), config), node }
    }
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr`. Returns the bound address and a
    /// handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, ServerHandle)> {
        let server = Server::builder().build(addr).await?;
        let bound = server.local_addr()?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(addr = %bound, "RPC server started");
        Ok((bound, handle))
    }
}

#[async_trait]
impl TidemarkApiServer for RpcServer {
    async fn create_kyc_file(
        &self,
        path: String,
        singles: Vec<RpcSingleKeyEntry>,
        multisig: Vec<RpcMultisigEntry>,
    ) -> RpcResult<RpcCreatedKycFile> {
        let singles = singles
            .iter()
            .map(|e| {
                Ok(SingleKeyEntry { address: parse_address(&e.address)?, pubkey: parse_pubkey(&e.pubkey)? })
            })
            .collect::<RpcResult<Vec<_>>>()?;
        let groups = multisig
            .iter()
            .map(|e| MultisigEntry::new(e.threshold, parse_pubkeys(&e.pubkeys)?).map_err(tidemark_err))
            .collect::<RpcResult<Vec<_>>>()?;

        let path = (!path.is_empty()).then(|| PathBuf::from(path));
        let created = self
            .state
            .kyc
            .create_kyc_file(path.as_deref(), singles, groups)
            .map_err(tidemark_err)?;
        Ok(RpcCreatedKycFile { onboard_pubkey: created.onboard_pubkey.to_hex(), kyc_file: created.contents })
    }

    async fn validate_kyc_file(&self, path: String) -> RpcResult<RpcValidation> {
        let report = self.state.kyc.validate_kyc_file(Path::new(&path)).map_err(tidemark_err)?;
        Ok(report.into())
    }

    async fn onboard_user(&self, path: String) -> RpcResult<RpcOnboardReceipt> {
        let receipt = self.state.kyc.onboard_user(Path::new(&path)).map_err(tidemark_err)?;
        Ok(receipt.into())
    }

    async fn query_whitelist(&self, address: String) -> RpcResult<bool> {
        let address = parse_address(&address)?;
        self.state.kyc.query_whitelist(&address).map_err(tidemark_err)
    }

    async fn read_kyc_file(&self, input: String, output: String) -> RpcResult<bool> {
        self.state
            .kyc
            .read_kyc_file(Path::new(&input), Path::new(&output))
            .map_err(tidemark_err)?;
        Ok(true)
    }

    async fn dump_derived_keys(&self, path: String) -> RpcResult<usize> {
        bulk::dump_derived_keys(self.state.node.as_ref(), Path::new(&path)).map_err(tidemark_err)
    }

    async fn read_whitelist(&self, path: String) -> RpcResult<RpcOnboardReceipt> {
        let receipt =
            bulk::read_whitelist(self.state.kyc.adapter(), Path::new(&path)).map_err(tidemark_err)?;
        Ok(receipt.into())
    }

    async fn get_new_address(&self) -> RpcResult<String> {
        let info = self.state.node.wallet.get_new_address().map_err(tidemark_err)?;
        Ok(info.address.to_address())
    }

    async fn validate_address(&self, address: String) -> RpcResult<RpcAddressInfo> {
        let address = parse_address(&address)?;
        let info = self.state.node.wallet.validate_address(&address).map_err(tidemark_err)?;
        Ok(info.into())
    }

    async fn create_multisig(&self, n: usize, keys: Vec<String>) -> RpcResult<RpcMultisig> {
        let keys = parse_pubkeys(&keys)?;
        MultisigEntry::new(n, keys.clone()).map_err(tidemark_err)?;
        let script = multisig_script(n, &keys).map_err(tidemark_err)?;
        let address = multisig_destination(n, &keys).map_err(tidemark_err)?;
        Ok(RpcMultisig { address: address.to_address(), redeem_script: hex::encode(script) })
    }

    async fn import_priv_key(&self, secret_hex: String) -> RpcResult<RpcAddressInfo> {
        let info = self.state.node.wallet.import_privkey(&secret_hex).map_err(tidemark_err)?;
        Ok(info.into())
    }

    async fn get_balance(&self, label: String) -> RpcResult<u64> {
        let asset = self.state.node.engine.asset_id(&label).map_err(tidemark_err)?;
        self.state.node.balance(&asset).map_err(tidemark_err)
    }

    async fn generate(&self, n: u32) -> RpcResult<Vec<u64>> {
        let mut heights = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let block = self
                .state
                .node
                .engine
                .mint_block(chrono::Utc::now().timestamp())
                .map_err(tidemark_err)?;
            heights.push(block.height);
        }
        Ok(heights)
    }

    async fn get_block(&self, height: u64) -> RpcResult<Option<RpcBlock>> {
        let block = self.state.node.db.get_block(height).map_err(tidemark_err)?;
        Ok(block.map(RpcBlock::from))
    }

    async fn get_raw_transaction(&self, txid: String) -> RpcResult<Option<RpcRawTransaction>> {
        let id = TxId::from_hex(&txid).map_err(tidemark_err)?;
        let engine = &self.state.node.engine;
        let Some((tx, height)) = engine.get_transaction(&id).map_err(tidemark_err)? else {
            return Ok(None);
        };
        let confirmations = engine.confirmations(&id).map_err(tidemark_err)?.unwrap_or(0);
        let bytes = bincode::serialize(&tx).map_err(|e| rpc_err(INTERNAL_ERROR, e.to_string()))?;
        Ok(Some(RpcRawTransaction { txid: id.to_hex(), hex: hex::encode(bytes), height, confirmations }))
    }
}
