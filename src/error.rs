//! Error types shared by the dispatcher, the platform handlers and the HTTP layer.

use http::StatusCode;
use thiserror::Error;

/// Failures surfaced to callers of the media endpoints.
///
/// Nothing is retried or recovered locally: every variant maps to exactly one
/// HTTP status via [`MediaError::status_code`].
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Not supported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    Upstream {
        /// Status code returned by the platform API, `None` for transport failures.
        status: Option<u16>,
        message: String,
        /// Response body, parsed as JSON when possible.
        body: Option<serde_json::Value>,
    },

    #[error("Upstream timed out: {0}")]
    Timeout(String),

    #[error("Not Found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;

impl MediaError {
    /// Build an upstream error without a status or body.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// HTTP status used when this error crosses the service boundary.
    ///
    /// Upstream error statuses are passed through; anything else coming from
    /// the upstream (no status, or a non-error status) becomes `502`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedPlatform(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Upstream response body, if one was captured.
    pub fn upstream_body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Upstream { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            MediaError::UnsupportedPlatform("https://example.com".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MediaError::InvalidInput("missing id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let err = MediaError::Upstream {
            status: Some(500),
            message: "boom".into(),
            body: None,
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = MediaError::Upstream {
            status: Some(403),
            message: "forbidden".into(),
            body: Some(serde_json::json!({"error": {"code": 1001}})),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.upstream_body().unwrap()["error"]["code"], 1001);
    }

    #[test]
    fn upstream_without_error_status_is_bad_gateway() {
        assert_eq!(
            MediaError::upstream("connection reset").status_code(),
            StatusCode::BAD_GATEWAY
        );
        let err = MediaError::Upstream {
            status: Some(200),
            message: "empty songs".into(),
            body: None,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn timeout_is_gateway_timeout() {
        assert_eq!(
            MediaError::Timeout("api.youku.com".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn unsupported_platform_message() {
        let err = MediaError::UnsupportedPlatform("https://example.com/x".into());
        assert_eq!(err.to_string(), "Not supported platform: https://example.com/x");
    }
}
