//! HTTP implementation of `HavenApi`.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::sse::decode_stream;
use super::{ApiError, EventStream, HavenApi, RelayListKind, StreamKind};
use crate::models::requests::{SaveEnvRequest, SaveRelaysRequest};
use crate::models::responses::{
    ApiResponse, Empty, EnvContent, ImportInfo, LogsPayload, RelayListPayload, RelayStatus,
    TorInfo, VersionInfo,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Upper bound for a whole request/response exchange (not applied to push streams).
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Clone)]
pub struct HttpHavenClient {
    base_url: String,
    client: reqwest::Client,
    /// Push streams stay open indefinitely, so this client only bounds the connect phase.
    stream_client: reqwest::Client,
}

impl HttpHavenClient {
    pub fn new(cfg: ClientConfig) -> Result<Self, ApiError> {
        if cfg.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build http client: {e}")))?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build stream client: {e}")))?;
        Ok(Self {
            base_url: cfg.base_url,
            client,
            stream_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn join(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    async fn get_json<T>(&self, op: &'static str, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.join(path);
        debug!("[PHASE: api] [STEP: {}] GET {}", op, url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::map_response(op, resp).await
    }

    async fn post_json<T, B>(&self, op: &'static str, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.join(path);
        debug!("[PHASE: api] [STEP: {}] POST {}", op, url);
        let mut builder = self.client.post(&url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(map_reqwest_error)?;
        Self::map_response(op, resp).await
    }

    async fn map_response<T>(op: &'static str, resp: reqwest::Response) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("{e}")))?;

        if !status.is_success() {
            warn!(
                "[PHASE: api] [STEP: {}] Non-success status {}",
                op,
                status.as_u16()
            );
            let message = serde_json::from_str::<ApiResponse<Empty>>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{e}")))?;
        if !parsed.success {
            let text = parsed.error_text();
            warn!("[PHASE: api] [STEP: {}] Server reported failure: {}", op, text);
            return Err(ApiError::Server(text));
        }
        debug!("[PHASE: api] [STEP: {}] Response decoded", op);
        Ok(parsed.data)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_body() || err.is_decode() {
        return ApiError::Decode(err.to_string());
    }
    ApiError::Transport(err.to_string())
}

fn relay_path(kind: RelayListKind) -> String {
    format!("/api/config/relays/{}", kind.as_str())
}

#[async_trait]
impl HavenApi for HttpHavenClient {
    async fn get_env(&self) -> Result<String, ApiError> {
        let env: EnvContent = self.get_json("env_load", "/api/config/env").await?;
        Ok(env.content)
    }

    async fn save_env(&self, content: &str) -> Result<(), ApiError> {
        let body = SaveEnvRequest {
            content: content.to_string(),
        };
        let _: Empty = self
            .post_json("env_save", "/api/config/env", Some(&body))
            .await?;
        Ok(())
    }

    async fn get_relays(&self, kind: RelayListKind) -> Result<Vec<String>, ApiError> {
        let payload: RelayListPayload = self.get_json("relays_load", &relay_path(kind)).await?;
        Ok(payload.relays)
    }

    async fn save_relays(&self, kind: RelayListKind, relays: &[String]) -> Result<(), ApiError> {
        let body = SaveRelaysRequest {
            relays: relays.to_vec(),
        };
        let _: Empty = self
            .post_json("relays_save", &relay_path(kind), Some(&body))
            .await?;
        Ok(())
    }

    async fn status(&self) -> Result<RelayStatus, ApiError> {
        self.get_json("status", "/api/status").await
    }

    async fn version(&self) -> Result<VersionInfo, ApiError> {
        self.get_json("version", "/api/version").await
    }

    async fn tor(&self) -> Result<TorInfo, ApiError> {
        self.get_json("tor", "/api/tor").await
    }

    async fn restart(&self) -> Result<(), ApiError> {
        let _: Empty = self
            .post_json::<_, Empty>("restart", "/api/restart", None)
            .await?;
        Ok(())
    }

    async fn run_import(&self) -> Result<(), ApiError> {
        let _: Empty = self
            .post_json::<_, Empty>("import_run", "/api/import/run", None)
            .await?;
        Ok(())
    }

    async fn cancel_import(&self) -> Result<(), ApiError> {
        let _: Empty = self
            .post_json::<_, Empty>("import_cancel", "/api/import/cancel", None)
            .await?;
        Ok(())
    }

    async fn import_info(&self) -> Result<ImportInfo, ApiError> {
        self.get_json("import_info", "/api/import/info").await
    }

    async fn logs(&self) -> Result<String, ApiError> {
        let payload: LogsPayload = self.get_json("logs", "/api/logs").await?;
        Ok(payload.logs)
    }

    async fn subscribe(&self, kind: StreamKind) -> Result<EventStream, ApiError> {
        let url = self.join(kind.path());
        debug!("[PHASE: stream] [STEP: open] GET {}", url);
        let resp = self
            .stream_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }
        Ok(decode_stream(resp.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::log::LogLevel;
    use crate::api::StreamEvent;
    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn content_length(headers: &str) -> usize {
        headers
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Accept one connection, reply with `response`, and hand back the raw request.
    async fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                if let Some(end) = find(&req, b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&req[..end]).to_string();
                    if req.len() >= end + 4 + content_length(&headers) {
                        break;
                    }
                }
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
            String::from_utf8_lossy(&req).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    fn client(base_url: String) -> HttpHavenClient {
        HttpHavenClient::new(ClientConfig {
            base_url,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = HttpHavenClient::new(ClientConfig {
            base_url: "  ".into(),
            request_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
        })
        .err();
        assert!(matches!(err, Some(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn get_env_returns_content() {
        let (url, server) = serve_once(http_response(
            "200 OK",
            "application/json",
            r#"{"success":true,"content":"OWNER_NPUB=\"npub1x\"\n"}"#,
        ))
        .await;
        let content = client(url).get_env().await.unwrap();
        assert_eq!(content, "OWNER_NPUB=\"npub1x\"\n");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/config/env HTTP/1.1"));
    }

    #[tokio::test]
    async fn save_env_posts_content_body() {
        let (url, server) = serve_once(http_response(
            "200 OK",
            "application/json",
            r#"{"success":true}"#,
        ))
        .await;
        client(url).save_env("TZ=\"UTC\"\n").await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/config/env HTTP/1.1"));
        assert!(request.contains(r#"{"content":"TZ=\"UTC\"\n"}"#));
    }

    #[tokio::test]
    async fn server_failure_is_surfaced() {
        let (url, _server) = serve_once(http_response(
            "200 OK",
            "application/json",
            r#"{"success":false,"error":"Permission denied"}"#,
        ))
        .await;
        let err = client(url).restart().await.unwrap_err();
        assert_eq!(err, ApiError::Server("Permission denied".into()));
    }

    #[tokio::test]
    async fn non_success_status_extracts_error_message() {
        let (url, _server) = serve_once(http_response(
            "500 Internal Server Error",
            "application/json",
            r#"{"success":false,"error":"disk full"}"#,
        ))
        .await;
        let err = client(url)
            .save_relays(RelayListKind::Blastr, &["nos.lol".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::HttpStatus {
                status: 500,
                message: "disk full".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let (url, _server) =
            serve_once(http_response("200 OK", "application/json", "<html>")).await;
        let err = client(url).status().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(format!("http://{}", addr)).version().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn subscribe_decodes_pushed_events() {
        let body = ": heartbeat\n\ndata: {\"type\":\"info\",\"message\":\"Fetching notes\"}\n\ndata: {\"type\":\"status\",\"status\":\"completed\"}\n\n";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
            body
        );
        let (url, server) = serve_once(response).await;
        let events: Vec<_> = client(url)
            .subscribe(StreamKind::Import)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::Log {
                    level: LogLevel::Info,
                    message: "Fetching notes".into()
                }),
                Ok(StreamEvent::Status("completed".into())),
            ]
        );
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/import/stream HTTP/1.1"));
    }
}
