// SPDX-FileCopyrightText: 2026 Downpour Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-RPC client for the aria2 download engine.
//!
//! Transport failures (connection refused, timeouts, malformed responses)
//! are retried with jittered backoff. JSON-RPC faults are semantic answers
//! from a healthy engine and are never retried: repeating an `addUri` that
//! the engine rejected would duplicate the download on a flaky link.

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use serde_json::{json, Value};
use tracing::debug;

use downpour_config::model::Aria2Config;
use downpour_core::DownpourError;
use downpour_resilience::{retry, RetryPolicy};

/// Retry schedule for transport-level failures.
const TRANSPORT_POLICY: RetryPolicy = RetryPolicy::new(4, Duration::from_millis(400));

/// A JSON-RPC fault returned by a reachable engine.
type RpcReply = Result<Value, String>;

pub struct Aria2Client {
    http: reqwest::Client,
    endpoint: String,
    secret: Option<String>,
}

impl Aria2Client {
    pub fn new(config: &Aria2Config) -> Result<Self, DownpourError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DownpourError::Rpc {
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            secret: config.secret.clone(),
        })
    }

    /// One JSON-RPC round trip. The secret token, when configured, is always
    /// the first positional parameter.
    async fn round_trip(&self, method: &str, params: &[Value]) -> Result<RpcReply, DownpourError> {
        let mut full_params: Vec<Value> = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            full_params.push(json!(format!("token:{secret}")));
        }
        full_params.extend_from_slice(params);

        let body = json!({
            "jsonrpc": "2.0",
            "id": "downpour",
            "method": method,
            "params": full_params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| DownpourError::Rpc {
                message: format!("{method}: request failed"),
                source: Some(Box::new(e)),
            })?;

        let reply: Value = response.json().await.map_err(|e| DownpourError::Rpc {
            message: format!("{method}: invalid JSON-RPC response"),
            source: Some(Box::new(e)),
        })?;

        if let Some(error) = reply.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown fault")
                .to_string();
            return Ok(Err(message));
        }
        match reply.get("result") {
            Some(result) => Ok(Ok(result.clone())),
            None => Err(DownpourError::Rpc {
                message: format!("{method}: response has neither result nor error"),
                source: None,
            }),
        }
    }

    /// Call with transport retries. Faults pass through untouched.
    async fn call(&self, method: &str, params: &[Value]) -> Result<RpcReply, DownpourError> {
        retry(TRANSPORT_POLICY, method, || self.round_trip(method, params)).await
    }

    /// Call once, no retries. Used for submissions that must not duplicate.
    async fn call_once(&self, method: &str, params: &[Value]) -> Result<RpcReply, DownpourError> {
        self.round_trip(method, params).await
    }

    fn fault(method: &str, message: String) -> DownpourError {
        DownpourError::Rpc {
            message: format!("{method}: {message}"),
            source: None,
        }
    }

    /// Submit a URI download. Returns the engine GID.
    pub async fn add_uri(
        &self,
        uri: &str,
        dir: &Path,
        headers: &[(String, String)],
    ) -> Result<String, DownpourError> {
        let mut options = json!({ "dir": dir.to_string_lossy() });
        if !headers.is_empty() {
            let lines: Vec<String> =
                headers.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            options["header"] = json!(lines);
        }
        let reply = self
            .call_once("aria2.addUri", &[json!([uri]), options])
            .await?
            .map_err(|m| Self::fault("aria2.addUri", m))?;
        gid_from(reply, "aria2.addUri")
    }

    /// Submit an in-memory .torrent file. Returns the engine GID.
    pub async fn add_torrent(&self, torrent: &[u8], dir: &Path) -> Result<String, DownpourError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(torrent);
        let options = json!({ "dir": dir.to_string_lossy() });
        let reply = self
            .call_once("aria2.addTorrent", &[json!(encoded), json!([]), options])
            .await?
            .map_err(|m| Self::fault("aria2.addTorrent", m))?;
        gid_from(reply, "aria2.addTorrent")
    }

    /// Status snapshot of one transfer. Returns `None` when the engine no
    /// longer knows the GID.
    pub async fn tell_status(&self, gid: &str) -> Result<Option<StatusSnapshot>, DownpourError> {
        let keys = json!([
            "status",
            "totalLength",
            "completedLength",
            "files",
            "errorCode",
            "errorMessage"
        ]);
        let reply = self.call("aria2.tellStatus", &[json!(gid), keys]).await?;
        match reply {
            Ok(value) => Ok(Some(StatusSnapshot::from_value(&value))),
            // "GID xxx is not found" is a normal answer after removeDownloadResult.
            Err(message) if message.contains("not found") => Ok(None),
            Err(message) => Err(Self::fault("aria2.tellStatus", message)),
        }
    }

    pub async fn pause_all(&self) -> Result<(), DownpourError> {
        self.call("aria2.pauseAll", &[])
            .await?
            .map_err(|m| Self::fault("aria2.pauseAll", m))?;
        Ok(())
    }

    pub async fn unpause_all(&self) -> Result<(), DownpourError> {
        self.call("aria2.unpauseAll", &[])
            .await?
            .map_err(|m| Self::fault("aria2.unpauseAll", m))?;
        Ok(())
    }

    /// Remove a transfer and drop its result record. Returns whether the
    /// engine still knew the GID.
    pub async fn remove(&self, gid: &str) -> Result<bool, DownpourError> {
        let removed = match self.call("aria2.remove", &[json!(gid)]).await? {
            Ok(_) => true,
            Err(message) if message.contains("not found") => false,
            Err(message) => return Err(Self::fault("aria2.remove", message)),
        };
        // Best effort; the result record may already be gone.
        if let Ok(reply) = self.call("aria2.removeDownloadResult", &[json!(gid)]).await
            && let Err(message) = reply
        {
            debug!(gid, message, "removeDownloadResult declined");
        }
        Ok(removed)
    }

    /// Reachability probe.
    pub async fn get_version(&self) -> Result<String, DownpourError> {
        let reply = self
            .call("aria2.getVersion", &[])
            .await?
            .map_err(|m| Self::fault("aria2.getVersion", m))?;
        Ok(reply
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

fn gid_from(value: Value, method: &str) -> Result<String, DownpourError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DownpourError::Rpc {
            message: format!("{method}: result is not a GID string"),
            source: None,
        })
}

/// Decoded `aria2.tellStatus` answer.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: String,
    pub total_length: u64,
    pub completed_length: u64,
    pub file_paths: Vec<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    /// aria2 serializes numbers as decimal strings.
    fn from_value(value: &Value) -> Self {
        let str_field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let num_field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0)
        };
        let file_paths = value
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|f| f.get("path").and_then(Value::as_str))
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            status: str_field("status").unwrap_or_default(),
            total_length: num_field("totalLength"),
            completed_length: num_field("completedLength"),
            file_paths,
            error_code: str_field("errorCode"),
            error_message: str_field("errorMessage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, secret: Option<&str>) -> Aria2Client {
        let config = Aria2Config {
            endpoint: format!("{}/jsonrpc", server.uri()),
            secret: secret.map(str::to_string),
            timeout_secs: 2,
        };
        Aria2Client::new(&config).unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "downpour",
            "result": result,
        }))
    }

    fn rpc_fault(message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "downpour",
            "error": { "code": 1, "message": message },
        }))
    }

    #[tokio::test]
    async fn add_uri_sends_token_and_returns_gid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .and(body_partial_json(json!({
                "method": "aria2.addUri",
                "params": ["token:s3cret"],
            })))
            .respond_with(rpc_result(json!("2089b05ecca3d829")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("s3cret"));
        let gid = client
            .add_uri("https://example.com/a.iso", Path::new("/dl"), &[])
            .await
            .unwrap();
        assert_eq!(gid, "2089b05ecca3d829");
    }

    #[tokio::test]
    async fn add_uri_fault_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(rpc_fault("unsupported URI"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .add_uri("bogus://x", Path::new("/dl"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported URI"));
    }

    #[tokio::test]
    async fn tell_status_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(rpc_result(json!({
                "status": "active",
                "totalLength": "1000",
                "completedLength": "250",
                "files": [{ "path": "/dl/a.iso" }],
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let snap = client.tell_status("gid1").await.unwrap().unwrap();
        assert_eq!(snap.status, "active");
        assert_eq!(snap.total_length, 1000);
        assert_eq!(snap.completed_length, 250);
        assert_eq!(snap.file_paths, vec!["/dl/a.iso".to_string()]);
    }

    #[tokio::test]
    async fn tell_status_unknown_gid_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(rpc_fault("GID deadbeef is not found"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(client.tell_status("deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_unknown_gid_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(rpc_fault("GID deadbeef is not found"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(!client.remove("deadbeef").await.unwrap());
    }

    #[tokio::test]
    async fn transport_error_is_retried() {
        let server = MockServer::start().await;
        // First two round trips produce unparseable bodies, then success.
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/jsonrpc"))
            .respond_with(rpc_result(json!({ "version": "1.37.0" })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert_eq!(client.get_version().await.unwrap(), "1.37.0");
    }
}
