use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::envelope::{RpcRequest, RpcResponse};
use super::error::GatewayError;
use super::traits::RpcTransport;

/// JSON-over-HTTP transport for the telematics endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(map_transport)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, request: &RpcRequest) -> Result<RpcResponse, GatewayError> {
        debug!("POST {} method={}", self.endpoint, request.method);

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport)?;

        // Servers may send an error envelope with a non-2xx status, so try
        // the body before giving up on the status
        match serde_json::from_str::<RpcResponse>(&body) {
            Ok(envelope) if envelope.result.is_some() || envelope.error.is_some() => Ok(envelope),
            _ if !status.is_success() => Err(GatewayError::Transport(format!(
                "server returned HTTP {}",
                status.as_u16()
            ))),
            Ok(_) => Err(GatewayError::Malformed(
                "response has neither result nor error".to_string(),
            )),
            Err(e) => Err(GatewayError::Malformed(e.to_string())),
        }
    }
}

fn map_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport(format!("request timed out: {}", err))
    } else {
        GatewayError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the request it received
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            // Read until the JSON body has closed
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(split) = text.find("\r\n\r\n") {
                    let headers = &text[..split];
                    let length = headers
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if received.len() >= split + 4 + length {
                        break;
                    }
                }
            }
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&received).to_string()
        });

        (format!("http://{}/apiv1", addr), handle)
    }

    #[tokio::test]
    async fn test_posts_envelope_and_decodes_result() {
        let (url, server) = serve_once("200 OK", r#"{"result":[{"id":"b1"}]}"#).await;
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .post(&RpcRequest::new("Get", json!({ "typeName": "Device" })))
            .await
            .unwrap();

        assert_eq!(response.result, Some(json!([{ "id": "b1" }])));
        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /apiv1"));
        assert!(raw.to_ascii_lowercase().contains("cache-control: no-cache"));
        assert!(raw.contains(r#""method":"Get""#));
    }

    #[tokio::test]
    async fn test_error_envelope_is_passed_through() {
        let (url, server) = serve_once("200 OK", r#"{"error":{"message":"Invalid group"}}"#).await;
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .post(&RpcRequest::new("Get", json!({})))
            .await
            .unwrap();

        assert_eq!(response.error.unwrap().message, "Invalid group");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_null_result_is_passed_through() {
        let (url, server) = serve_once("200 OK", r#"{"result":null}"#).await;
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let response = transport
            .post(&RpcRequest::new("Get", json!({})))
            .await
            .unwrap();

        assert_eq!(response.into_result().unwrap(), serde_json::Value::Null);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (url, server) = serve_once("200 OK", "<html>maintenance</html>").await;
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let err = transport
            .post(&RpcRequest::new("Get", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Malformed(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_failure_without_envelope_is_transport_error() {
        let (url, server) = serve_once("502 Bad Gateway", "upstream down").await;
        let transport = HttpTransport::new(url, Duration::from_secs(5)).unwrap();

        let err = transport
            .post(&RpcRequest::new("Get", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::Transport("server returned HTTP 502".into()));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port nothing is listening on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let transport =
            HttpTransport::new(format!("http://{}/apiv1", addr), Duration::from_secs(2)).unwrap();

        let err = transport
            .post(&RpcRequest::new("Get", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
