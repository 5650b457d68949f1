// ABOUTME: Webhook notification sink posting JSON over HTTP/1.1.
// ABOUTME: Uses a hyper client connection on a plain TCP stream per message.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Uri;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{NotificationSink, NotificationStatus, NotifyError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts `{status, summary, app, environment, text}` to an `http://` endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    uri: Uri,
    app: String,
    environment: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    status: NotificationStatus,
    summary: &'a str,
    app: &'a str,
    environment: &'a str,
    /// Chat-style integrations render this field.
    text: String,
}

impl WebhookSink {
    pub fn new(url: &str, app: &str, environment: &str) -> Result<Self, NotifyError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| NotifyError::InvalidUrl(format!("{url}: {e}")))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(NotifyError::InvalidUrl(format!(
                    "{url}: unsupported scheme '{other}' (only http is supported)"
                )));
            }
            None => return Err(NotifyError::InvalidUrl(format!("{url}: missing scheme"))),
        }
        if uri.host().is_none() {
            return Err(NotifyError::InvalidUrl(format!("{url}: missing host")));
        }

        Ok(Self {
            uri,
            app: app.to_string(),
            environment: environment.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Host to dial; IPv6 literals come back from the URI in brackets.
    fn connect_host(&self) -> &str {
        let host = self.uri.host().unwrap_or_default();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    async fn post(&self, body: Vec<u8>) -> Result<u16, NotifyError> {
        let host = self.connect_host();
        let port = self.uri.port_u16().unwrap_or(80);
        let authority = self
            .uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| host.to_string());
        let path = self
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/");

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| NotifyError::Delivery(format!("failed to connect to {authority}: {e}")))?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| NotifyError::Delivery(format!("HTTP handshake failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("webhook connection error: {}", e);
            }
        });

        let req = hyper::Request::builder()
            .method("POST")
            .uri(path)
            .header("Host", authority)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| NotifyError::Delivery(format!("failed to build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| NotifyError::Delivery(format!("request failed: {e}")))?;

        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, status: NotificationStatus, summary: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            status,
            summary,
            app: &self.app,
            environment: &self.environment,
            text: format!("[{}] {}: {}", status, self.app, summary),
        };
        let body = serde_json::to_vec(&payload)
            .map_err(|e| NotifyError::Delivery(format!("failed to encode payload: {e}")))?;

        let status_code = tokio::time::timeout(self.timeout, self.post(body))
            .await
            .map_err(|_| {
                NotifyError::Delivery(format!("timed out after {:?}", self.timeout))
            })??;

        if (200..300).contains(&status_code) {
            Ok(())
        } else {
            Err(NotifyError::Rejected(status_code))
        }
    }
}
