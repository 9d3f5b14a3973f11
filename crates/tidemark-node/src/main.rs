//! tidemark-node — the Tidemark node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Apply genesis if the DB is fresh
//!   3. Start the JSON-RPC 2.0 server
//!   4. Optionally mint a block every `--block-interval-secs`
//!   5. On Ctrl-C: stop the server and flush state

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use tidemark_crypto::KeyPair;
use tidemark_genesis::{apply_genesis, GenesisParams};
use tidemark_kyc::WhitelistConfig;
use tidemark_rpc::{RpcServer, RpcServerState};
use tidemark_state::NodeHandle;

#[derive(Parser, Debug)]
#[command(
    name = "tidemark-node",
    version,
    about = "Tidemark node — permissioned UTXO ledger with KYC onboarding"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.tidemark/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Path to genesis params JSON (only read on first run).
    #[arg(long)]
    genesis_params: Option<PathBuf>,

    /// Path to a whitelist config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured membership depth.
    #[arg(long)]
    min_confirmations: Option<u64>,

    /// Mint a block at this interval. Zero disables block production;
    /// blocks are then only minted through `tidemark_generate`.
    #[arg(long, default_value_t = 0)]
    block_interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tidemark=debug")),
        )
        .init();

    let args = Args::parse();
    info!("Tidemark node starting");

    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => WhitelistConfig::from_json_file(path)
            .with_context(|| format!("reading whitelist config from {}", path.display()))?,
        None => WhitelistConfig::default(),
    };
    if let Some(depth) = args.min_confirmations {
        config.min_confirmations = depth;
    }
    debug!(?config, "whitelist config");

    // ── State ─────────────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let node = Arc::new(NodeHandle::open(&data_dir).context("opening state database")?);

    // ── Genesis if fresh ──────────────────────────────────────────────────────
    if node.db.tip_height().context("reading chain tip")?.is_none() {
        info!("fresh database — applying genesis");
        let params = load_or_generate_genesis_params(&node, args.genesis_params.as_deref())?;
        let genesis = apply_genesis(&node.db, &params).context("applying genesis")?;
        info!(tx_id = %genesis.tx_id, onboarding_key = %params.onboarding_pubkey, "genesis applied");
    } else {
        info!("existing database found — skipping genesis");
    }

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState::new(Arc::clone(&node), config));
    let (_, rpc_handle) = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Block production ──────────────────────────────────────────────────────
    if args.block_interval_secs > 0 {
        let node = Arc::clone(&node);
        let period = Duration::from_secs(args.block_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match node.engine.mint_block(chrono::Utc::now().timestamp()) {
                    Ok(block) => debug!(height = block.height, txs = block.tx_ids.len(), "minted block"),
                    Err(e) => warn!(error = %e, "block production failed"),
                }
            }
        });
    }

    info!("node ready");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutting down");
    rpc_handle.stop().context("stopping RPC server")?;
    rpc_handle.stopped().await;
    node.close().context("flushing state")?;
    Ok(())
}

/// Load genesis parameters from a JSON file, or generate an ephemeral chain.
///
/// Without `--genesis-params` the node creates a fresh onboarding key and
/// holder key and imports both into its own wallet, so it acts as the
/// policy node of a local chain nobody else can join.
fn load_or_generate_genesis_params(node: &NodeHandle, path: Option<&Path>) -> anyhow::Result<GenesisParams> {
    if let Some(p) = path {
        return GenesisParams::from_json_file(p)
            .with_context(|| format!("reading genesis params from {}", p.display()));
    }
    warn!("No --genesis-params provided. Generating ephemeral keys — DO NOT USE IN PRODUCTION.");
    let kyc = KeyPair::generate();
    let holder = KeyPair::generate();
    for kp in [&kyc, &holder] {
        node.wallet
            .import_privkey(&hex::encode(kp.secret_bytes().as_slice()))
            .context("importing ephemeral key")?;
    }
    Ok(GenesisParams::regtest(holder.destination(), holder.destination(), &kyc.public_key))
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
