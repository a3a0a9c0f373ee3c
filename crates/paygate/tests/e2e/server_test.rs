//! End-to-end tests for the JSON-RPC socket server.
//!
//! A server is started on a temporary socket and driven with newline-delimited
//! JSON-RPC requests, covering the full account and payment flow.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use paygate::fee::FeeClient;
use paygate::server::protocol::error_codes;
use paygate::server::{PaygateServer, ServerConfig, ServerError};
use paygate::Backend;
use paygate_chain::codec;
use paygate_core::network::RemoteEndpoint;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::common::{file_backend, memory_backend, temp_data_dir, unsigned_transaction};

// ============================================================================
// Harness
// ============================================================================

struct TestServer {
    socket_path: PathBuf,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    async fn start(dir: &Path, backend: Backend) -> Self {
        let socket_path = dir.join("paygate.sock");
        let config = ServerConfig {
            socket_path: socket_path.clone(),
            ..ServerConfig::default()
        };
        // Nothing listens here; the fee methods are covered in fee_test.
        let endpoint = RemoteEndpoint::new("127.0.0.1", 9)
            .with_tls(false)
            .with_max_attempts(1);
        let fee = FeeClient::new(endpoint).expect("fee client");

        let server = PaygateServer::new(config, backend, fee);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move { server.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            socket_path,
            shutdown,
            handle,
        }
    }

    async fn connect(&self) -> UnixStream {
        UnixStream::connect(&self.socket_path)
            .await
            .expect("should connect to server")
    }

    async fn stop(self) {
        self.shutdown.send(()).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop")
            .expect("join")
            .expect("server result");
    }
}

async fn call(stream: &mut UnixStream, method: &str, params: Value) -> Value {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let request = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 7});
    writer
        .write_all(format!("{request}\n").as_bytes())
        .await
        .expect("write");
    writer.flush().await.expect("flush");

    let mut response = String::new();
    reader.read_line(&mut response).await.expect("read");
    let response: Value = serde_json::from_str(&response).expect("parse response");
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 7);
    response
}

async fn create_account(stream: &mut UnixStream, name: &str, data: Value) -> String {
    let response = call(
        stream,
        "create",
        json!({"path": format!("accounts/{name}"), "data": data}),
    )
    .await;
    response["result"]["address"]
        .as_str()
        .unwrap_or_else(|| panic!("create {name} failed: {response}"))
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_payment_over_socket() {
    let dir = temp_data_dir();
    let server = TestServer::start(dir.path(), memory_backend()).await;
    let mut stream = server.connect().await;

    let alice = create_account(&mut stream, "alice", json!({"tx_spend_limit": 1000})).await;
    let bob = create_account(&mut stream, "bob", json!({})).await;
    let unsigned = codec::encode_hex(&unsigned_transaction(2, 35, &bob));

    let response = call(
        &mut stream,
        "create",
        json!({
            "path": "payments",
            "data": {
                "source": "alice",
                "destination": "bob",
                "amount": 35,
                "unsignedTx": unsigned,
            }
        }),
    )
    .await;

    let result = &response["result"];
    assert_eq!(result["source_address"], alice.as_str());
    assert_eq!(result["transaction_hash"].as_str().expect("hash").len(), 64);
    let signed = result["signed_transaction"].as_str().expect("signed").to_string();

    let decoded = call(&mut stream, "decodeTransaction", json!({"tx": signed})).await;
    let inputs = decoded["result"]["inputs"].as_array().expect("inputs");
    assert_eq!(inputs.len(), 2);
    assert!(inputs.iter().all(|input| input["signed"] == true));
    assert_eq!(decoded["result"]["txid"], result["transaction_hash"]);

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_policy_denial_over_socket() {
    let dir = temp_data_dir();
    let server = TestServer::start(dir.path(), memory_backend()).await;
    let mut stream = server.connect().await;

    let bob = create_account(&mut stream, "bob", json!({})).await;
    create_account(
        &mut stream,
        "alice",
        json!({"tx_spend_limit": "1000", "blacklist": [bob.clone()]}),
    )
    .await;
    let unsigned = codec::encode_hex(&unsigned_transaction(1, 35, &bob));

    let pay = |amount: u64| {
        json!({
            "path": "payments",
            "data": {"source": "alice", "destination": "bob", "amount": amount, "unsignedTx": unsigned}
        })
    };

    let response = call(&mut stream, "create", pay(1001)).await;
    assert_eq!(response["error"]["code"], error_codes::POLICY_DENIED);
    assert_eq!(
        response["error"]["message"],
        "transaction amount (1001) is larger than the transactional limit (1000)"
    );
    assert_eq!(response["error"]["data"]["status"], 400);

    let response = call(&mut stream, "create", pay(35)).await;
    assert_eq!(response["error"]["code"], error_codes::POLICY_DENIED);
    assert_eq!(response["error"]["message"], format!("{bob} is blacklisted"));

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_missing_payment_field_names_the_field() {
    let dir = temp_data_dir();
    let server = TestServer::start(dir.path(), memory_backend()).await;
    let mut stream = server.connect().await;

    let response = call(
        &mut stream,
        "create",
        json!({"path": "payments", "data": {"source": "alice", "destination": "bob", "amount": 1}}),
    )
    .await;

    assert!(response.get("result").is_none());
    assert_eq!(response["error"]["data"]["status"], 400);
    assert_eq!(
        response["error"]["message"],
        "missing required field: unsignedTx"
    );

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_accounts_persist_across_server_restarts() {
    let dir = temp_data_dir();
    let accounts = TempDir::new_in(dir.path()).expect("accounts dir");

    let server = TestServer::start(dir.path(), file_backend(accounts.path())).await;
    let mut stream = server.connect().await;
    let address = create_account(&mut stream, "alice", json!({"whitelist": ["a", "b"]})).await;
    drop(stream);
    server.stop().await;

    let server = TestServer::start(dir.path(), file_backend(accounts.path())).await;
    let mut stream = server.connect().await;
    let response = call(&mut stream, "read", json!({"path": "accounts/alice"})).await;

    assert_eq!(response["result"]["address"], address.as_str());
    assert_eq!(response["result"]["whitelist"], json!(["a", "b"]));
    assert!(response["result"].get("wif").is_none());

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_status_reports_network() {
    let dir = temp_data_dir();
    let server = TestServer::start(dir.path(), memory_backend()).await;
    let mut stream = server.connect().await;

    let response = call(&mut stream, "getStatus", json!({})).await;
    assert_eq!(response["result"]["initialized"], true);
    assert_eq!(response["result"]["network"], "testnet");
    assert_eq!(response["result"]["fee_endpoint"], "127.0.0.1:9");

    drop(stream);
    server.stop().await;
}

#[tokio::test]
async fn test_requests_on_one_connection_are_answered_in_order() {
    let dir = temp_data_dir();
    let server = TestServer::start(dir.path(), memory_backend()).await;
    let mut stream = server.connect().await;

    for name in ["a1", "a2", "a3"] {
        create_account(&mut stream, name, json!({})).await;
    }
    for name in ["a1", "a2", "a3"] {
        let response = call(&mut stream, "read", json!({"path": format!("accounts/{name}")})).await;
        assert!(response["result"]["address"].is_string(), "{name}: {response}");
    }

    drop(stream);
    server.stop().await;
}
