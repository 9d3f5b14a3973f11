//! End-to-end smoke test for tidemark-node.
//!
//! Starts a real node process with a fixed genesis, onboards one of its own
//! addresses over JSON-RPC and checks membership after one block.
//!
//! Run with:
//!   cargo test -p tidemark-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tidemark_crypto::KeyPair;
use tidemark_genesis::params::DEFAULT_WHITELIST_SUPPLY;
use tidemark_genesis::GenesisParams;
use tidemark_rpc::{RpcSingleKeyEntry, TidemarkApiClient};

// ── Node lifecycle ────────────────────────────────────────────────────────────

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

/// Find a free TCP port on loopback.
fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Poll until the RPC server responds or the timeout elapses.
async fn wait_for_rpc(client: &HttpClient, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if client.get_block(0).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

#[tokio::test]
async fn node_onboards_own_address_over_rpc() {
    // ── 1. Genesis params ─────────────────────────────────────────────────────
    let data_dir = std::env::temp_dir().join(format!("tidemark_smoke_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let kyc = KeyPair::generate();
    let holder = KeyPair::generate();
    let params = GenesisParams::regtest(holder.destination(), holder.destination(), &kyc.public_key);
    let params_path = data_dir.join("genesis-params.json");
    std::fs::write(&params_path, serde_json::to_string(&params).unwrap()).unwrap();

    // ── 2. Start node ─────────────────────────────────────────────────────────
    let rpc_port = free_port();
    let node_bin = env!("CARGO_BIN_EXE_tidemark-node");
    let child = Command::new(node_bin)
        .args([
            "--data-dir",       data_dir.join("state").to_str().unwrap(),
            "--rpc-addr",       &format!("127.0.0.1:{rpc_port}"),
            "--genesis-params", params_path.to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn tidemark-node");
    let _guard = NodeGuard { child, data_dir: data_dir.clone() };

    let client = HttpClientBuilder::default()
        .build(format!("http://127.0.0.1:{rpc_port}"))
        .unwrap();
    assert!(
        wait_for_rpc(&client, Duration::from_secs(20)).await,
        "tidemark-node did not become ready within 20 seconds"
    );

    // ── 3. Become the policy node ─────────────────────────────────────────────
    for kp in [&kyc, &holder] {
        client.import_priv_key(hex::encode(kp.secret_bytes().as_slice())).await.unwrap();
    }
    assert_eq!(client.get_balance("WHITELIST".into()).await.unwrap(), DEFAULT_WHITELIST_SUPPLY);

    // ── 4. Onboard a fresh address ────────────────────────────────────────────
    let address = client.get_new_address().await.unwrap();
    let info = client.validate_address(address.clone()).await.unwrap();
    let entry = RpcSingleKeyEntry { address: address.clone(), pubkey: info.derived_pubkey.unwrap() };

    let kyc_path = data_dir.join("kycfile.dat");
    let kyc_path = kyc_path.to_str().unwrap().to_string();
    client.create_kyc_file(kyc_path.clone(), vec![entry], vec![]).await.unwrap();
    assert!(!client.validate_kyc_file(kyc_path.clone()).await.unwrap().is_whitelisted);

    client.onboard_user(kyc_path.clone()).await.unwrap();
    client.generate(1).await.unwrap();
    assert!(client.query_whitelist(address).await.unwrap());
    assert!(client.validate_kyc_file(kyc_path).await.unwrap().is_whitelisted);
    assert_eq!(client.get_balance("WHITELIST".into()).await.unwrap(), DEFAULT_WHITELIST_SUPPLY);
}
