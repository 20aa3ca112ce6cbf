//! Wire-level behavior of the JSON-RPC server and client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use evolve_execution::conversion::from_unix_seconds;
use evolve_execution::{Executor, ExecutorError, ExecutorResult, Hash, ProxyConfig, Tx};
use evolve_execution_dummy::DummyExecutor;
use evolve_execution_jsonrpc::{
    codes, start_server, JsonRpcExecutorClient, JsonRpcServerConfig,
};
use jsonrpsee::server::ServerHandle;
use serde_json::{json, Value};

async fn serve<E: Executor + ?Sized + 'static>(
    executor: Arc<E>,
    proxy: ProxyConfig,
) -> (SocketAddr, ServerHandle) {
    let config = JsonRpcServerConfig {
        http_addr: "127.0.0.1:0".parse().expect("valid address"),
        proxy,
    };
    start_server(config, executor)
        .await
        .expect("server should start")
}

async fn post(addr: SocketAddr, body: impl Into<reqwest::Body>) -> (reqwest::StatusCode, String) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("request should be sent");
    let status = response.status();
    let text = response.text().await.expect("body should be readable");
    (status, text)
}

async fn rpc(addr: SocketAddr, method: &str, params: Value) -> Value {
    let body = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
    let (status, text) = post(addr, body.to_string()).await;
    assert!(status.is_success(), "HTTP {status}: {text}");
    serde_json::from_str(&text).expect("response should be JSON")
}

fn error_code(response: &Value) -> i64 {
    response["error"]["code"]
        .as_i64()
        .unwrap_or_else(|| panic!("expected an error response, got {response}"))
}

/// Records the timestamps it receives.
#[derive(Default)]
struct RecordingExecutor {
    times: Mutex<Vec<DateTime<Utc>>>,
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn init_chain(
        &self,
        genesis_time: DateTime<Utc>,
        _initial_height: u64,
        _chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        self.times.lock().unwrap().push(genesis_time);
        Ok((Hash::new(vec![9; 8]), 64))
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        Ok(vec![])
    }

    async fn execute_txs(
        &self,
        _txs: &[Tx],
        _block_height: u64,
        timestamp: DateTime<Utc>,
        _prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        self.times.lock().unwrap().push(timestamp);
        Ok((Hash::new(vec![8; 8]), 64))
    }

    async fn set_final(&self, _block_height: u64) -> ExecutorResult<()> {
        Ok(())
    }
}

/// Never answers within any reasonable timeout.
struct StuckExecutor;

#[async_trait]
impl Executor for StuckExecutor {
    async fn init_chain(
        &self,
        _genesis_time: DateTime<Utc>,
        _initial_height: u64,
        _chain_id: &str,
    ) -> ExecutorResult<(Hash, u64)> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok((Hash::new(vec![1]), 1))
    }

    async fn get_txs(&self) -> ExecutorResult<Vec<Tx>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec![])
    }

    async fn execute_txs(
        &self,
        _txs: &[Tx],
        _block_height: u64,
        _timestamp: DateTime<Utc>,
        _prev_state_root: &Hash,
    ) -> ExecutorResult<(Hash, u64)> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok((Hash::new(vec![2]), 1))
    }

    async fn set_final(&self, _block_height: u64) -> ExecutorResult<()> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_unknown_method() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;

    let response = rpc(addr, "unknown_method", json!({})).await;
    assert_eq!(error_code(&response), i64::from(codes::METHOD_NOT_FOUND));
}

#[tokio::test]
async fn test_malformed_json() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;

    let (_, text) = post(addr, "{\"jsonrpc\": \"2.0\", \"method\": ").await;
    let response: Value = serde_json::from_str(&text).expect("response should be JSON");
    assert_eq!(error_code(&response), i64::from(codes::PARSE_ERROR));
}

#[tokio::test]
async fn test_get_is_rejected() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}"))
        .send()
        .await
        .expect("request should be sent");
    assert!(!response.status().is_success());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let backend = Arc::new(DummyExecutor::new());
    let (addr, _handle) = serve(
        Arc::clone(&backend),
        ProxyConfig::default().with_max_request_size(1024),
    )
    .await;

    let big_tx = "A".repeat(4096);
    let body = json!({
        "jsonrpc": "2.0",
        "method": "execute_txs",
        "params": {
            "txs": [big_tx],
            "block_height": 1,
            "timestamp": Utc::now().timestamp(),
            "prev_state_root": "AQID",
        },
        "id": 1,
    });
    let (status, _) = post(addr, body.to_string()).await;

    assert!(!status.is_success(), "oversized body must be rejected");
    assert_eq!(backend.pending_root(1).await, None);
}

#[tokio::test]
async fn test_invalid_base64_is_invalid_params() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;

    let response = rpc(
        addr,
        "execute_txs",
        json!({
            "txs": ["not base64!"],
            "block_height": 1,
            "timestamp": Utc::now().timestamp(),
            "prev_state_root": "AQID",
        }),
    )
    .await;
    assert_eq!(error_code(&response), i64::from(codes::INVALID_PARAMS));
}

#[tokio::test]
async fn test_backend_error_is_internal_error_with_text() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;

    let response = rpc(addr, "set_final", json!({"block_height": 7})).await;
    assert_eq!(error_code(&response), i64::from(codes::INTERNAL_ERROR));
    assert_eq!(response["error"]["message"], "block not found at height 7");
}

#[tokio::test]
async fn test_named_and_positional_params() {
    let backend = Arc::new(DummyExecutor::new());
    let (addr, _handle) = serve(Arc::clone(&backend), ProxyConfig::default()).await;
    let now = Utc::now().timestamp();

    let named = rpc(
        addr,
        "init_chain",
        json!({"genesis_time": now, "initial_height": 1, "chain_id": "test-chain"}),
    )
    .await;
    let positional = rpc(addr, "init_chain", json!([now, 1, "test-chain"])).await;

    assert_eq!(named["result"], positional["result"]);
    assert_eq!(named["result"]["max_bytes"], 1_000_000);
    let state_root = named["result"]["state_root"]
        .as_str()
        .expect("state_root should be a string");
    assert!(!state_root.is_empty());

    let executed = rpc(
        addr,
        "execute_txs",
        json!([["dHgx"], 1, now, state_root]),
    )
    .await;
    assert!(executed["result"]["updated_state_root"].is_string());

    let finalized = rpc(addr, "set_final", json!([1])).await;
    assert_eq!(finalized["result"], json!({}));
    assert_eq!(finalized["id"], 1);
    assert_eq!(finalized["jsonrpc"], "2.0");
}

#[tokio::test]
async fn test_client_reports_rpc_errors() {
    let (addr, _handle) = serve(Arc::new(DummyExecutor::new()), ProxyConfig::default()).await;
    let client = JsonRpcExecutorClient::new(format!("http://{addr}"), &ProxyConfig::default())
        .expect("client should build");

    let err = client
        .set_final(7)
        .await
        .expect_err("unknown height must fail");
    assert_eq!(
        err,
        ExecutorError::Rpc {
            code: codes::INTERNAL_ERROR,
            message: "block not found at height 7".to_string(),
        }
    );
}

#[tokio::test]
async fn test_client_sees_oversized_tx_text() {
    let (addr, _handle) = serve(
        Arc::new(DummyExecutor::with_max_bytes(4)),
        ProxyConfig::default(),
    )
    .await;
    let client = JsonRpcExecutorClient::new(format!("http://{addr}"), &ProxyConfig::default())
        .expect("client should build");

    let err = client
        .execute_txs(&[Tx::from("too big")], 1, Utc::now(), &Hash::new(vec![1]))
        .await
        .expect_err("oversized tx must fail");
    assert_eq!(
        err,
        ExecutorError::Rpc {
            code: codes::INTERNAL_ERROR,
            message: ExecutorError::TxTooLarge.to_string(),
        }
    );
}

#[tokio::test]
async fn test_client_drops_sub_second_precision() {
    let backend = Arc::new(RecordingExecutor::default());
    let (addr, _handle) = serve(Arc::clone(&backend), ProxyConfig::default()).await;
    let client = JsonRpcExecutorClient::new(format!("http://{addr}"), &ProxyConfig::default())
        .expect("client should build");

    let base = from_unix_seconds(1_700_000_000).expect("valid timestamp");
    let precise = base + TimeDelta::milliseconds(999);

    let (root, max_bytes) = client
        .init_chain(precise, 1, "test-chain")
        .await
        .expect("init_chain should succeed");
    assert_eq!(root, Hash::new(vec![9; 8]));
    assert_eq!(max_bytes, 64);

    client
        .execute_txs(&[Tx::from("tx")], 1, precise, &root)
        .await
        .expect("execute_txs should succeed");

    assert_eq!(*backend.times.lock().unwrap(), vec![base, base]);
}

#[tokio::test]
async fn test_client_timeout() {
    let (addr, _handle) = serve(Arc::new(StuckExecutor), ProxyConfig::default()).await;
    let client = JsonRpcExecutorClient::new(
        format!("http://{addr}"),
        &ProxyConfig::default().with_timeout(Duration::from_millis(200)),
    )
    .expect("client should build");

    let err = client.get_txs().await.expect_err("call must time out");
    assert_eq!(err, ExecutorError::DeadlineExceeded);
}

#[tokio::test]
async fn test_client_against_missing_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    drop(listener);

    let client = JsonRpcExecutorClient::new(format!("http://{addr}"), &ProxyConfig::default())
        .expect("client should build");
    let err = client.get_txs().await.expect_err("nothing is listening");
    assert!(matches!(err, ExecutorError::Transport(_)), "got {err:?}");
}
