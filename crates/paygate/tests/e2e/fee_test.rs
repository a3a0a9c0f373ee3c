//! Integration tests for fee estimation.
//!
//! A stub Electrum-style server on a local TCP port answers
//! `blockchain.estimatefee`; the estimate is read through the configuration,
//! the CLI command and the socket server.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::float_cmp,
    dead_code
)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use paygate::cli::commands::FeeCommand;
use paygate::fee::FeeClient;
use paygate::server::protocol::error_codes;
use paygate::server::{PaygateServer, ServerConfig};
use paygate::RequestContext;
use paygate_core::config::Config;
use paygate_core::network::RemoteEndpoint;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, UnixStream};
use tokio::sync::oneshot;

use crate::common::{memory_backend, temp_data_dir};

/// Requests received by a [`StubElectrum`], one line per connection.
type Received = Arc<Mutex<Vec<String>>>;

/// Answers the n-th connection with the n-th result; the last one repeats.
struct StubElectrum {
    port: u16,
    received: Received,
}

impl StubElectrum {
    async fn start(results: Vec<Value>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let received: Received = Arc::default();
        let log = Arc::clone(&received);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (reader, mut writer) = stream.into_split();
                let mut line = String::new();
                if BufReader::new(reader).read_line(&mut line).await.is_err() {
                    continue;
                }

                let n = {
                    let mut log = log.lock().expect("lock");
                    log.push(line);
                    log.len() - 1
                };
                let result = &results[n.min(results.len() - 1)];
                let body = json!({"jsonrpc": "2.0", "id": 1, "result": result});
                let _ = writer.write_all(format!("{body}\n").as_bytes()).await;
            }
        });

        Self { port, received }
    }

    fn endpoint(&self) -> RemoteEndpoint {
        RemoteEndpoint::new("127.0.0.1", self.port)
            .with_tls(false)
            .with_timeout(Duration::from_secs(2))
    }

    fn requests(&self) -> Vec<Value> {
        self.received
            .lock()
            .expect("lock")
            .iter()
            .map(|line| serde_json::from_str(line).expect("request is JSON"))
            .collect()
    }
}

#[tokio::test]
async fn test_estimate_from_configured_endpoint() {
    let stub = StubElectrum::start(vec![json!(0.00051)]).await;
    let config = Config::builder()
        .fee_endpoint("127.0.0.1", stub.port, false)
        .build();

    let client = FeeClient::new(config.fee.endpoint()).expect("fee client");
    let rate = client
        .current_fee_rate(&RequestContext::default())
        .await
        .expect("rate");

    assert_eq!(rate, 51);

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["method"], "blockchain.estimatefee");
    assert_eq!(requests[0]["params"], json!([2]));
}

#[tokio::test]
async fn test_command_retries_non_positive_estimates() {
    let stub = StubElectrum::start(vec![json!(-1), json!(0), json!(0.0002)]).await;
    let client = FeeClient::new(stub.endpoint()).expect("fee client");

    let rate = FeeCommand::new()
        .execute(&client, &RequestContext::default())
        .await
        .expect("rate");

    assert_eq!(rate, 20);
    assert_eq!(stub.requests().len(), 3);
}

#[tokio::test]
async fn test_estimate_above_threshold_is_clamped() {
    let stub = StubElectrum::start(vec![json!(0.08)]).await;
    let client = FeeClient::new(stub.endpoint()).expect("fee client");

    let ctx = RequestContext::default();
    assert_eq!(client.current_fee(&ctx).await.expect("fee"), 0.1);
    assert_eq!(client.current_fee_rate(&ctx).await.expect("rate"), 10_000);
}

#[tokio::test]
async fn test_fee_rate_over_socket() {
    let ok = StubElectrum::start(vec![json!(0), json!(0.00012)]).await;
    let failing = StubElectrum::start(vec![json!(-1)]).await;

    for (stub, attempts) in [(&ok, 5), (&failing, 2)] {
        let dir = temp_data_dir();
        let config = ServerConfig {
            socket_path: dir.path().join("paygate.sock"),
            ..ServerConfig::default()
        };
        let fee = FeeClient::new(stub.endpoint().with_max_attempts(attempts)).expect("fee client");
        let server = PaygateServer::new(config.clone(), memory_backend(), fee);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move { server.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut stream = UnixStream::connect(&config.socket_path)
            .await
            .expect("connect");
        let (reader, mut writer) = stream.split();
        writer
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"getFeeRate\",\"id\":3}\n")
            .await
            .expect("write");
        let mut line = String::new();
        BufReader::new(reader)
            .read_line(&mut line)
            .await
            .expect("read");
        let response: Value = serde_json::from_str(&line).expect("response");

        if attempts == 5 {
            assert_eq!(response["result"]["fee"], 0.00012);
            assert_eq!(response["result"]["fee_rate"], 12);
        } else {
            assert_eq!(response["error"]["code"], error_codes::FEE_UNAVAILABLE);
            assert_eq!(response["error"]["data"]["status"], 500);
            assert_eq!(stub.requests().len(), 2);
        }

        drop(stream);
        shutdown.send(()).expect("shutdown");
        handle.await.expect("join").expect("server");
    }
}
