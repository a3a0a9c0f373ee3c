//! Fee-rate client.
//!
//! Queries an Electrum-protocol server for `blockchain.estimatefee` over a
//! line-delimited JSON-RPC connection (TLS by default). One connection is
//! opened per attempt.
//!
//! The estimate is in BTC per kilobyte. Unusable answers (zero, negative, or
//! no result) are retried up to the endpoint's attempt budget; anything above
//! [`FEE_SANITY_THRESHOLD`] is replaced by [`FEE_CEILING`].

use std::sync::Arc;

use paygate_core::error::FeeError;
use paygate_core::network::RemoteEndpoint;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, pki_types::ServerName, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::context::RequestContext;

/// Estimates above this many BTC/kB are treated as bogus.
pub const FEE_SANITY_THRESHOLD: f64 = 0.05;

/// Replacement for estimates above [`FEE_SANITY_THRESHOLD`].
pub const FEE_CEILING: f64 = 0.1;

/// Confirmation target, in blocks, sent with every estimate request.
pub const CONFIRMATION_TARGET: u32 = 2;

/// Largest response line accepted from the server.
const MAX_RESPONSE_SIZE: u64 = 64 * 1024;

#[derive(Debug, Serialize)]
struct EstimateFeeRequest {
    id: u32,
    method: &'static str,
    params: [u32; 1],
}

impl EstimateFeeRequest {
    const fn new() -> Self {
        Self {
            id: 1,
            method: "blockchain.estimatefee",
            params: [CONFIRMATION_TARGET],
        }
    }
}

/// `{"jsonrpc": "2.0", "id": 1, "result": 0.00012}`; only `result` is used.
#[derive(Debug, Deserialize)]
struct EstimateFeeResponse {
    #[serde(default)]
    result: Option<f64>,
}

/// Apply the sanity rule: above the threshold becomes the ceiling, negatives become zero.
///
/// ```
/// use paygate::fee::clamp_fee;
///
/// assert_eq!(clamp_fee(0.0002), 0.0002);
/// assert_eq!(clamp_fee(0.06), 0.1);
/// assert_eq!(clamp_fee(-3.0), 0.0);
/// ```
#[must_use]
pub fn clamp_fee(fee: f64) -> f64 {
    if fee > FEE_SANITY_THRESHOLD {
        FEE_CEILING
    } else if fee < 0.0 {
        0.0
    } else {
        fee
    }
}

/// Convert a BTC/kB estimate to an integer rate in satoshis per byte.
///
/// One BTC is 1e8 satoshis and one kB is 1000 bytes, so the factor is
/// 1e8 / 1000 = 1e5. The fractional part is dropped.
///
/// ```
/// use paygate::fee::fee_to_rate;
///
/// assert_eq!(fee_to_rate(0.1), 10_000);
/// assert_eq!(fee_to_rate(0.00012), 12);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fee_to_rate(fee: f64) -> u64 {
    (clamp_fee(fee) * 1e5) as u64
}

/// Client for the remote fee-estimation service.
#[derive(Clone)]
pub struct FeeClient {
    endpoint: RemoteEndpoint,
    tls: Option<TlsConnector>,
}

impl FeeClient {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::Tls`] if the TLS configuration cannot be built.
    pub fn new(endpoint: RemoteEndpoint) -> Result<Self, FeeError> {
        let tls = if endpoint.tls {
            Some(Self::tls_connector(&endpoint)?)
        } else {
            None
        };
        Ok(Self { endpoint, tls })
    }

    /// The configured endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    fn tls_connector(endpoint: &RemoteEndpoint) -> Result<TlsConnector, FeeError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()
                .map_err(|e| FeeError::Tls {
                    endpoint: endpoint.address(),
                    context: e.to_string(),
                })?
                .with_root_certificates(roots)
                .with_no_client_auth();

        Ok(TlsConnector::from(Arc::new(config)))
    }

    /// Current fee estimate in BTC/kB, after the sanity rule.
    ///
    /// # Errors
    ///
    /// - [`FeeError::Unavailable`] if no positive estimate is obtained
    /// - [`FeeError::Cancelled`] if `ctx` is cancelled
    /// - [`FeeError::Timeout`] if an attempt exceeds the endpoint timeout
    /// - a connection, TLS, I/O or protocol error from an attempt
    #[allow(clippy::float_cmp)]
    pub async fn current_fee(&self, ctx: &RequestContext) -> Result<f64, FeeError> {
        let max_attempts = self.endpoint.max_attempts.max(1);
        let mut fee = 0.0;

        for attempt in 1..=max_attempts {
            let result = self.attempt(ctx).await?;

            match result {
                None => {
                    tracing::debug!(attempt, "fee service returned no result");
                }
                Some(value) if value <= 0.0 => {
                    tracing::debug!(attempt, value, "expected fee estimate > 0");
                }
                Some(value) => {
                    fee = clamp_fee(value);
                    break;
                }
            }
        }

        if fee == 0.0 {
            tracing::warn!(endpoint = %self.endpoint, "could not get fees");
            return Err(FeeError::Unavailable {
                attempts: max_attempts,
            });
        }

        tracing::debug!(fee, "fee estimate");
        Ok(fee)
    }

    /// Current fee rate in satoshis per byte (`floor(fee * 1e5)`).
    ///
    /// # Errors
    ///
    /// Same as [`FeeClient::current_fee`].
    pub async fn current_fee_rate(&self, ctx: &RequestContext) -> Result<u64, FeeError> {
        self.current_fee(ctx).await.map(fee_to_rate)
    }

    async fn attempt(&self, ctx: &RequestContext) -> Result<Option<f64>, FeeError> {
        if ctx.is_cancelled() {
            return Err(FeeError::Cancelled);
        }

        tokio::select! {
            biased;

            () = ctx.cancellation().cancelled() => Err(FeeError::Cancelled),

            outcome = tokio::time::timeout(self.endpoint.timeout, self.request_once()) => {
                outcome.map_err(|_| FeeError::Timeout { endpoint: self.endpoint.address() })?
            }
        }
    }

    async fn request_once(&self) -> Result<Option<f64>, FeeError> {
        let address = self.endpoint.address();
        let tcp = TcpStream::connect(&address)
            .await
            .map_err(|source| FeeError::Connect {
                endpoint: address.clone(),
                source,
            })?;

        match &self.tls {
            Some(connector) => {
                let server_name = ServerName::try_from(self.endpoint.host.clone()).map_err(|e| {
                    FeeError::Tls {
                        endpoint: address.clone(),
                        context: e.to_string(),
                    }
                })?;
                let stream = connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(|e| FeeError::Tls {
                        endpoint: address.clone(),
                        context: e.to_string(),
                    })?;
                exchange(stream).await
            }
            None => exchange(tcp).await,
        }
    }
}

impl std::fmt::Debug for FeeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Send one estimate request and read one response line.
async fn exchange<S>(stream: S) -> Result<Option<f64>, FeeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);

    let mut line = serde_json::to_vec(&EstimateFeeRequest::new())
        .map_err(|e| FeeError::protocol(e.to_string()))?;
    line.push(b'\n');
    reader.get_mut().write_all(&line).await?;
    reader.get_mut().flush().await?;

    let mut response = String::new();
    let read = (&mut reader)
        .take(MAX_RESPONSE_SIZE)
        .read_line(&mut response)
        .await?;
    if read == 0 {
        return Err(FeeError::protocol("connection closed before a response"));
    }

    let parsed: EstimateFeeResponse = serde_json::from_str(response.trim())
        .map_err(|e| FeeError::protocol(e.to_string()))?;
    Ok(parsed.result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Serve one canned response per connection, in order; the last repeats.
    async fn stub_server(responses: Vec<&'static str>) -> (RemoteEndpoint, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let body = responses[n.min(responses.len() - 1)];

                let mut reader = BufReader::new(socket);
                let mut request = String::new();
                reader.read_line(&mut request).await.unwrap();
                let value: serde_json::Value = serde_json::from_str(&request).unwrap();
                assert_eq!(value["method"], "blockchain.estimatefee");
                assert_eq!(value["params"][0], 2);

                let mut socket = reader.into_inner();
                socket.write_all(body.as_bytes()).await.unwrap();
                socket.write_all(b"\n").await.unwrap();
            }
        });

        let endpoint = RemoteEndpoint::new("127.0.0.1", port)
            .with_tls(false)
            .with_timeout(Duration::from_secs(5));
        (endpoint, hits)
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_clamp_fee() {
            assert_eq!(clamp_fee(0.05), 0.05);
            assert_eq!(clamp_fee(0.050_001), 0.1);
            assert_eq!(clamp_fee(7.0), 0.1);
            assert_eq!(clamp_fee(-0.5), 0.0);
            assert_eq!(clamp_fee(0.0001), 0.0001);
        }

        #[test]
        fn test_fee_to_rate() {
            assert_eq!(fee_to_rate(0.0), 0);
            assert_eq!(fee_to_rate(0.05), 5000);
            assert_eq!(fee_to_rate(0.2), 10_000);
            assert_eq!(fee_to_rate(-1.0), 0);
        }

        #[test]
        fn test_rate_is_satoshis_per_byte() {
            // 0.00001 BTC/kB = 1000 sat per 1000 bytes
            assert_eq!(fee_to_rate(0.000_01), 1);
            // 0.0002 BTC/kB = 20_000 sat per 1000 bytes
            assert_eq!(fee_to_rate(0.0002), 20);
        }

        #[test]
        fn test_request_wire_format() {
            let json = serde_json::to_string(&EstimateFeeRequest::new()).unwrap();
            assert_eq!(
                json,
                r#"{"id":1,"method":"blockchain.estimatefee","params":[2]}"#
            );
        }
    }

    mod client_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_answer_used() {
            let (endpoint, hits) =
                stub_server(vec![r#"{"jsonrpc":"2.0","id":1,"result":0.00012}"#]).await;
            let client = FeeClient::new(endpoint).unwrap();
            let ctx = RequestContext::default();

            assert_eq!(client.current_fee(&ctx).await.unwrap(), 0.00012);
            assert_eq!(hits.load(Ordering::SeqCst), 1);
            assert_eq!(client.current_fee_rate(&ctx).await.unwrap(), 12);
        }

        #[tokio::test]
        async fn test_retries_until_positive() {
            let (endpoint, hits) = stub_server(vec![
                r#"{"id":1,"result":-1}"#,
                r#"{"id":1,"result":0}"#,
                r#"{"id":1}"#,
                r#"{"id":1,"result":0.0002}"#,
            ])
            .await;
            let client = FeeClient::new(endpoint).unwrap();

            let fee = client.current_fee(&RequestContext::default()).await.unwrap();
            assert_eq!(fee, 0.0002);
            assert_eq!(hits.load(Ordering::SeqCst), 4);
        }

        #[tokio::test]
        async fn test_gives_up_after_max_attempts() {
            let (endpoint, hits) = stub_server(vec![r#"{"id":1,"result":-1}"#]).await;
            let client = FeeClient::new(endpoint).unwrap();

            let err = client
                .current_fee(&RequestContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::Unavailable { attempts: 5 }));
            assert!(err.to_string().contains("could not get fees"));
            assert_eq!(hits.load(Ordering::SeqCst), 5);
        }

        #[tokio::test]
        async fn test_attempt_budget_is_configurable() {
            let (endpoint, hits) = stub_server(vec![r#"{"id":1,"result":0}"#]).await;
            let client = FeeClient::new(endpoint.with_max_attempts(2)).unwrap();

            let err = client
                .current_fee(&RequestContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::Unavailable { attempts: 2 }));
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_high_estimate_hits_ceiling() {
            let (endpoint, _) = stub_server(vec![r#"{"id":1,"result":0.9}"#]).await;
            let client = FeeClient::new(endpoint).unwrap();
            let ctx = RequestContext::default();

            assert_eq!(client.current_fee(&ctx).await.unwrap(), 0.1);
            assert_eq!(client.current_fee_rate(&ctx).await.unwrap(), 10_000);
        }

        #[tokio::test]
        async fn test_any_non_positive_is_retried() {
            let (endpoint, hits) = stub_server(vec![
                r#"{"id":1,"result":-0.5}"#,
                r#"{"id":1,"result":0.0003}"#,
            ])
            .await;
            let client = FeeClient::new(endpoint).unwrap();

            let fee = client.current_fee(&RequestContext::default()).await.unwrap();
            assert_eq!(fee, 0.0003);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_garbage_response_is_protocol_error() {
            let (endpoint, _) = stub_server(vec!["this is not json"]).await;
            let client = FeeClient::new(endpoint).unwrap();

            let err = client
                .current_fee(&RequestContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::Protocol { .. }));
        }

        #[tokio::test]
        async fn test_connection_refused() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            drop(listener);

            let client = FeeClient::new(RemoteEndpoint::new("127.0.0.1", port).with_tls(false))
                .unwrap();
            let err = client
                .current_fee(&RequestContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::Connect { .. }));
        }

        #[tokio::test]
        async fn test_silent_server_times_out() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let _ = socket.read_to_end(&mut buf).await;
            });

            let endpoint = RemoteEndpoint::new("127.0.0.1", port)
                .with_tls(false)
                .with_timeout(Duration::from_millis(100));
            let client = FeeClient::new(endpoint).unwrap();

            let err = client
                .current_fee(&RequestContext::default())
                .await
                .unwrap_err();
            assert!(matches!(err, FeeError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_cancelled_before_request() {
            let (endpoint, hits) = stub_server(vec![r#"{"id":1,"result":0.001}"#]).await;
            let client = FeeClient::new(endpoint).unwrap();
            let ctx = RequestContext::default();
            ctx.cancel();

            assert!(matches!(
                client.current_fee(&ctx).await,
                Err(FeeError::Cancelled)
            ));
            assert_eq!(hits.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_tls_client_builds() {
            let client = FeeClient::new(RemoteEndpoint::new("testnet.hsmiths.com", 53012)).unwrap();
            assert!(client.tls.is_some());
            assert!(format!("{client:?}").contains("FeeClient"));
        }
    }
}
