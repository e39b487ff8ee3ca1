//! Upstream HTTP client
//!
//! Features:
//! - HTTP/2 when negotiated, HTTP/1.1 otherwise
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - DNS caching + Happy Eyeballs (IPv4/IPv6 racing)
//! - Connection pooling with keep-alive
//!
//! Every call is a single attempt. Failures are translated into
//! [`MediaError`] here so platform handlers never see `reqwest` errors.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::{MediaError, Result};

const USER_AGENT: &str = concat!("medialink/", env!("CARGO_PKG_VERSION"));

/// Pooled HTTP client used for all platform API calls.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct MediaClient {
    client: Client,
    timeout: Duration,
}

impl MediaClient {
    /// Create a client whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION
            // ═══════════════════════════════════════════════════════════════
            // Don't assume HTTP/2 - let server negotiate
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            // ═══════════════════════════════════════════════════════════════
            // COMPRESSION (auto-negotiated via Accept-Encoding)
            // ═══════════════════════════════════════════════════════════════
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Per-request timeout applied to every upstream call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `query` and decode the JSON body.
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET upstream");
        self.send_json(self.client.get(url).query(query)).await
    }

    /// POST `form` as `application/x-www-form-urlencoded` and decode the JSON body.
    #[instrument(skip(self, form, referer), fields(url = %url))]
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
        referer: &str,
    ) -> Result<T> {
        debug!("POST upstream");
        let request = self
            .client
            .post(url)
            .header(reqwest::header::REFERER, referer)
            .form(form);
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(status = %status, version = ?response.version(), "Response received");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|e| {
                debug!(error = %e, "Failed to read upstream error body");
                String::new()
            });
            warn!(status = %status, "Upstream returned an error status");
            return Err(MediaError::Upstream {
                status: Some(status.as_u16()),
                message: format!("Request failed with status code {}", status.as_u16()),
                body: parse_body(text),
            });
        }

        let text = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&text).map_err(|e| MediaError::Upstream {
            status: Some(status.as_u16()),
            message: format!("Invalid upstream response: {e}"),
            body: parse_body(text),
        })
    }
}

/// Keep the upstream body as JSON when it parses, otherwise as a plain string.
fn parse_body(text: String) -> Option<serde_json::Value> {
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
}

fn transport_error(err: reqwest::Error) -> MediaError {
    let target = err
        .url()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "upstream".to_string());
    if err.is_timeout() {
        warn!(%target, "Upstream request timed out");
        return MediaError::Timeout(target);
    }
    warn!(%target, error = %err, "Upstream request failed");
    MediaError::Upstream {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
        body: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_body_keeps_json() {
        let body = parse_body(r#"{"code":-460}"#.to_string()).unwrap();
        assert_eq!(body["code"], -460);
    }

    #[test]
    fn parse_body_falls_back_to_text() {
        let body = parse_body("Bad Gateway".to_string()).unwrap();
        assert_eq!(body, serde_json::Value::String("Bad Gateway".into()));
    }

    #[test]
    fn parse_body_empty_is_none() {
        assert!(parse_body(String::new()).is_none());
    }

    #[tokio::test]
    async fn client_keeps_configured_timeout() {
        let client = MediaClient::new(Duration::from_millis(2048)).unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(2048));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_upstream_error() {
        let client = MediaClient::new(Duration::from_millis(500)).unwrap();
        // Port 9 on localhost is discard; nothing listens there in CI.
        let err = client
            .get_json::<serde_json::Value>("http://127.0.0.1:9/", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::Upstream { status: None, .. } | MediaError::Timeout(_)
        ));
    }
}
