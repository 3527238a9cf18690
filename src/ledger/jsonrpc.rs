//! JSON-RPC 2.0 backend over HTTP(S).
//!
//! Speaks the node methods `getClientVersion`, `getBlockNumber` and `call`.
//! Contract creation needs a transaction signer, which lives in the full
//! ledger SDK, so `deploy_governance` is rejected here; attach to an address
//! deployed elsewhere instead.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ConfigOption, GroupId, LedgerError, SessionInfo};
use crate::address::Address;
use crate::config::Scheme;

/// Node error code for a group the node does not serve.
pub const ERR_GROUP_NOT_EXIST: i64 = -40001;

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    scheme: Scheme,
}

impl JsonRpcLedger {
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }

    /// Try each peer in configured order; the first one that serves `group` wins.
    pub(super) async fn open(
        &self,
        option: &ConfigOption,
        group: GroupId,
    ) -> Result<(RpcSession, SessionInfo), LedgerError> {
        let http = self.http_client(option)?;
        let mut last_err = None;

        for peer in &option.network.peers {
            let session = RpcSession {
                inner: Arc::new(RpcInner {
                    http: http.clone(),
                    endpoint: format!("{}://{peer}", self.scheme.as_str()),
                    group,
                    next_id: AtomicU64::new(1),
                }),
            };
            match session.handshake().await {
                Ok(info) => {
                    info!(%peer, %group, block_number = info.block_number, "ledger session opened");
                    return Ok((session, info));
                }
                Err(e) => {
                    warn!(%peer, %group, error = %e, "peer did not open a session");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LedgerError::InvalidConfig("network.peers is empty".into())))
    }

    fn http_client(&self, option: &ConfigOption) -> Result<reqwest::Client, LedgerError> {
        let mut builder = reqwest::Client::builder();

        if self.scheme == Scheme::Https {
            let material = &option.crypto_material;
            let read = |path: std::path::PathBuf| {
                fs::read(&path).map_err(|e| {
                    LedgerError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
                })
            };
            let root = reqwest::Certificate::from_pem(&read(material.ca_cert())?)
                .map_err(|e| LedgerError::InvalidConfig(format!("ca.crt: {e}")))?;
            let mut pem = read(material.sdk_cert())?;
            pem.extend(read(material.sdk_key())?);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| LedgerError::InvalidConfig(format!("sdk.crt/sdk.key: {e}")))?;
            builder = builder
                .use_rustls_tls()
                .add_root_certificate(root)
                .identity(identity);
        }

        builder
            .build()
            .map_err(|e| LedgerError::Transport(format!("cannot build http client: {e}")))
    }
}

#[derive(Debug)]
struct RpcInner {
    http: reqwest::Client,
    endpoint: String,
    group: GroupId,
    next_id: AtomicU64,
}

/// Session bound to one peer and one group.
#[derive(Debug, Clone)]
pub struct RpcSession {
    inner: Arc<RpcInner>,
}

impl RpcSession {
    async fn handshake(&self) -> Result<SessionInfo, LedgerError> {
        // Version is informational; older nodes may not answer it.
        let client_version = match self.request("getClientVersion", json!([])).await {
            Ok(v) => Some(describe_version(&v)),
            Err(e) => {
                debug!(endpoint = %self.inner.endpoint, error = %e, "getClientVersion failed");
                None
            }
        };

        let group = self.inner.group;
        let block = self
            .request("getBlockNumber", json!([group.get()]))
            .await
            .map_err(|e| match e {
                LedgerError::Rpc { code, .. } if code == ERR_GROUP_NOT_EXIST => {
                    LedgerError::UnknownGroup(group)
                }
                other => other,
            })?;

        Ok(SessionInfo {
            endpoint: self.inner.endpoint.clone(),
            block_number: parse_quantity(&block)?,
            client_version,
        })
    }

    pub(super) async fn deploy_governance(&self, _deployer: &Address, _mode: u8) -> Result<Address, LedgerError> {
        Err(LedgerError::Unsupported(
            "contract creation needs a transaction signer; configure an existing governance address".into(),
        ))
    }

    pub(super) async fn call(&self, from: &Address, to: &Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let params = json!([
            self.inner.group.get(),
            {
                "from": from.to_string(),
                "to": to.to_string(),
                "value": "0x0",
                "data": format!("0x{}", hex::encode(data)),
            }
        ]);
        let result = self.request("call", params).await?;

        let status = result
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Malformed("call result has no status".into()))?;
        if parse_hex_u64(status)? != 0 {
            return Err(LedgerError::Reverted(format!("status {status}")));
        }

        let output = result
            .get("output")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::Malformed("call result has no output".into()))?;
        let digits = output.strip_prefix("0x").unwrap_or(output);
        hex::decode(digits).map_err(|e| LedgerError::Malformed(format!("call output: {e}")))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": id });

        let resp = self
            .inner
            .http
            .post(&self.inner.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            return Err(LedgerError::Transport(format!("{method}: http status {}", resp.status())));
        }

        let parsed: RpcResponse = resp
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("{method}: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(LedgerError::Rpc { code: err.code, message: err.message });
        }
        parsed
            .result
            .ok_or_else(|| LedgerError::Malformed(format!("{method}: response has neither result nor error")))
    }
}

fn describe_version(v: &Value) -> String {
    v.get("FISCO-BCOS Version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| v.to_string())
}

fn parse_quantity(v: &Value) -> Result<u64, LedgerError> {
    match v {
        Value::String(s) => parse_hex_u64(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| LedgerError::Malformed(format!("quantity {n} is not a u64"))),
        other => Err(LedgerError::Malformed(format!("unexpected quantity {other}"))),
    }
}

fn parse_hex_u64(s: &str) -> Result<u64, LedgerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|_| LedgerError::Malformed(format!("bad hex quantity '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::abi;
    use crate::ledger::{CryptoMaterialConfig, NetworkConfig, PeerEndpoint};
    use std::path::PathBuf;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn group() -> GroupId {
        GroupId::new(1).unwrap()
    }

    fn option_for(servers: &[&MockServer]) -> ConfigOption {
        let peers = servers
            .iter()
            .map(|s| s.uri().trim_start_matches("http://").parse::<PeerEndpoint>().unwrap())
            .collect();
        ConfigOption::new(
            NetworkConfig { peers },
            CryptoMaterialConfig { cert_path: PathBuf::from("conf") },
        )
    }

    async fn mount_ok(server: &MockServer, rpc: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn quantities_parse() {
        assert_eq!(parse_quantity(&json!("0x1a")).unwrap(), 26);
        assert_eq!(parse_quantity(&json!(7)).unwrap(), 7);
        assert!(parse_quantity(&json!("zz")).is_err());
        assert!(parse_quantity(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn session_opens_on_first_serving_peer() {
        let server = MockServer::start().await;
        mount_ok(&server, "getClientVersion", json!({ "FISCO-BCOS Version": "2.9.1" })).await;
        mount_ok(&server, "getBlockNumber", json!("0x2a")).await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (_, info) = ledger.open(&option_for(&[&server]), group()).await.unwrap();
        assert_eq!(info.block_number, 42);
        assert_eq!(info.client_version.as_deref(), Some("2.9.1"));
        assert_eq!(info.endpoint, server.uri());
    }

    #[tokio::test]
    async fn unknown_group_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getBlockNumber" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2,
                "error": { "code": ERR_GROUP_NOT_EXIST, "message": "GroupID does not exist" }
            })))
            .mount(&server)
            .await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let err = ledger.open(&option_for(&[&server]), group()).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnknownGroup(g) if g == group()));
    }

    #[tokio::test]
    async fn falls_through_to_next_peer() {
        let broken = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&broken)
            .await;
        let healthy = MockServer::start().await;
        mount_ok(&healthy, "getBlockNumber", json!("0x1")).await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (_, info) = ledger
            .open(&option_for(&[&broken, &healthy]), group())
            .await
            .unwrap();
        assert_eq!(info.endpoint, healthy.uri());
        assert_eq!(info.client_version, None);
    }

    #[tokio::test]
    async fn call_decodes_output() {
        let server = MockServer::start().await;
        mount_ok(&server, "getBlockNumber", json!("0x1")).await;
        let am: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        let output = format!("0x{}", hex::encode(abi::encode_address(&am)));
        mount_ok(&server, "call", json!({ "currentBlockNumber": "0x1", "output": output, "status": "0x0" })).await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (session, _) = ledger.open(&option_for(&[&server]), group()).await.unwrap();
        let gov: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let out = session
            .call(&Address::ZERO, &gov, &abi::selector(abi::ACCOUNT_MANAGER_SIGNATURE))
            .await
            .unwrap();
        assert_eq!(abi::decode_address(&out).unwrap(), am);
    }

    #[tokio::test]
    async fn non_zero_status_is_a_revert() {
        let server = MockServer::start().await;
        mount_ok(&server, "getBlockNumber", json!("0x1")).await;
        mount_ok(&server, "call", json!({ "output": "0x", "status": "0x16" })).await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (session, _) = ledger.open(&option_for(&[&server]), group()).await.unwrap();
        let err = session.call(&Address::ZERO, &Address::ZERO, &[0, 0, 0, 0]).await.unwrap_err();
        assert!(matches!(err, LedgerError::Reverted(_)));
    }

    #[tokio::test]
    async fn call_without_status_is_malformed() {
        let server = MockServer::start().await;
        mount_ok(&server, "getBlockNumber", json!("0x1")).await;
        mount_ok(&server, "call", json!({ "output": "0x" })).await;

        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (session, _) = ledger.open(&option_for(&[&server]), group()).await.unwrap();
        let err = session.call(&Address::ZERO, &Address::ZERO, &[0, 0, 0, 0]).await.unwrap_err();
        assert!(matches!(err, LedgerError::Malformed(msg) if msg.contains("status")));
    }

    #[tokio::test]
    async fn deploy_is_unsupported() {
        let server = MockServer::start().await;
        mount_ok(&server, "getBlockNumber", json!("0x1")).await;
        let ledger = JsonRpcLedger::new(Scheme::Http);
        let (session, _) = ledger.open(&option_for(&[&server]), group()).await.unwrap();
        let err = session.deploy_governance(&Address::ZERO, 0).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unsupported(_)));
    }
}
