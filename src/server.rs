//! HTTP surface: `/media/info` and `/media/embed`.
//!
//! Handlers resolve the source URL through the shared [`PlatformRouter`],
//! then either fetch normalized metadata or render the embed snippet.
//! Every [`MediaError`] becomes a JSON body with a matching status code.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Environment;
use crate::error::MediaError;
use crate::http_client::MediaClient;
use crate::platform::{MediaInfo, PlatformRouter};

/// Shared, read-only state for request handlers.
pub struct AppState {
    pub router: PlatformRouter,
    pub client: MediaClient,
    pub environment: Environment,
}

impl AppState {
    pub fn new(router: PlatformRouter, client: MediaClient, environment: Environment) -> Self {
        Self {
            router,
            client,
            environment,
        }
    }

    /// Resolve and fetch normalized metadata for a raw source URL.
    pub async fn media_info(&self, raw: &str) -> Result<MediaInfo, MediaError> {
        let (url, handler) = self.router.resolve_url(raw)?;
        handler.fetch_info(&url, &self.client).await
    }

    /// Resolve a raw source URL and render its embed snippet without
    /// contacting the platform.
    pub fn media_embed(&self, raw: &str) -> Result<String, MediaError> {
        let (url, handler) = self.router.resolve_url(raw)?;
        let id = handler.extract_id(&url)?;
        Ok(handler.render_embed(id.as_str().into()))
    }
}

/// Response flavor for `/media/embed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedFormat {
    #[default]
    Html,
    Json,
}

impl std::str::FromStr for EmbedFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(MediaError::InvalidInput(format!(
                "Unsupported format \"{other}\", expected html or json"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaQuery {
    url: Option<String>,
    format: Option<String>,
}

impl MediaQuery {
    fn url(&self) -> Result<&str, MediaError> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| MediaError::InvalidInput("Missing url query parameter".to_string()))
    }
}

/// Error body returned for every failure.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// A [`MediaError`] paired with whether upstream details may be exposed.
pub struct ApiError {
    error: MediaError,
    expose_upstream: bool,
}

impl ApiError {
    fn new(error: MediaError, environment: Environment) -> Self {
        Self {
            error,
            expose_upstream: environment == Environment::Development,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), "{}", self.error);
        }
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.error.to_string(),
            data: if self.expose_upstream {
                self.error.upstream_body().cloned()
            } else {
                None
            },
        };
        (status, Json(body)).into_response()
    }
}

async fn media_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<MediaInfo>, ApiError> {
    let fail = |e| ApiError::new(e, state.environment);
    let raw = query.url().map_err(fail)?;
    state.media_info(raw).await.map(Json).map_err(fail)
}

async fn media_embed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaQuery>,
) -> Result<Response, ApiError> {
    let fail = |e| ApiError::new(e, state.environment);
    let raw = query.url().map_err(fail)?;
    let format: EmbedFormat = query.format.as_deref().unwrap_or_default().parse().map_err(fail)?;

    match format {
        EmbedFormat::Html => Ok(Html(state.media_embed(raw).map_err(fail)?).into_response()),
        EmbedFormat::Json => Ok(Json(state.media_info(raw).await.map_err(fail)?).into_response()),
    }
}

async fn not_found(State(state): State<Arc<AppState>>, uri: axum::http::Uri) -> ApiError {
    ApiError::new(MediaError::NotFound(uri.path().to_string()), state.environment)
}

/// Build the application router with CORS, compression and request tracing.
pub fn app(state: Arc<AppState>) -> Router {
    let media = Router::new()
        .route("/info", get(media_info))
        .route("/embed", get(media_embed));

    Router::new()
        .nest("/media", media)
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {addr}: {e}"))?;
    info!("Listening at http://{}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
