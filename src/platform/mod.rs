//! Platform-specific media handlers.
//!
//! Each supported platform knows how to pull its native media id out of a
//! page URL, fetch metadata from its API, and render the official embed
//! player for an id.
//!
//! # Architecture
//!
//! - [`MediaHandler`]: Async trait for platform-specific extraction
//! - [`PlatformRouter`]: Dispatches hostnames to the appropriate handler
//! - [`MediaInfo`]: Normalized metadata returned for every platform
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use medialink::platform::{PlatformConfig, PlatformRouter};
//! use medialink::MediaClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = MediaClient::new(Duration::from_millis(2048))?;
//! let router = PlatformRouter::new(&PlatformConfig::default());
//!
//! let (url, handler) = router.resolve_url("https://music.163.com/#/song?id=33599431")?;
//! let info = handler.fetch_info(&url, &client).await?;
//! println!("{}", info.title);
//! # Ok(())
//! # }
//! ```

pub mod music163;
pub mod weapi;
pub mod youku;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MediaError, Result};
use crate::http_client::MediaClient;

/// Kind of media a platform serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Video,
    Audio,
}

/// Platform-agnostic media metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Canonical platform key.
    pub platform: String,
    pub format: MediaFormat,
    /// Platform-native id, always the one extracted from the source URL.
    pub id: String,
    pub title: String,
    /// Containing album or show, empty if none.
    pub collection: String,
    pub description: String,
    /// Canonical link back to the source page.
    pub link: String,
    /// Thumbnail URL, empty if unavailable.
    pub thumbnail: String,
    /// URL for an iframe `src` attribute.
    pub src: String,
    /// Duration as reported by the platform, rendered as text.
    pub duration: String,
}

/// What an embed snippet is rendered from. Only the id is used.
#[derive(Debug, Clone, Copy)]
pub enum EmbedSource<'a> {
    Info(&'a MediaInfo),
    Id(&'a str),
}

impl EmbedSource<'_> {
    pub fn id(&self) -> &str {
        match self {
            Self::Info(info) => &info.id,
            Self::Id(id) => id,
        }
    }
}

impl<'a> From<&'a MediaInfo> for EmbedSource<'a> {
    fn from(info: &'a MediaInfo) -> Self {
        Self::Info(info)
    }
}

impl<'a> From<&'a str> for EmbedSource<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

/// Handler for one media platform.
#[async_trait]
pub trait MediaHandler: Send + Sync {
    /// Handler name (e.g., "music163", "youku").
    fn name(&self) -> &'static str;

    /// Value written to [`MediaInfo::platform`].
    fn platform(&self) -> &'static str;

    /// Value written to [`MediaInfo::format`].
    fn format(&self) -> MediaFormat;

    /// Extract the platform-native media id from a page URL.
    fn extract_id(&self, url: &Url) -> Result<String>;

    /// Fetch and normalize metadata for the media behind `url`.
    async fn fetch_info(&self, url: &Url, client: &MediaClient) -> Result<MediaInfo>;

    /// Render the official player `<iframe>` for a record or a bare id.
    fn render_embed(&self, source: EmbedSource<'_>) -> String;
}

/// Render a loosely typed upstream field as text: strings verbatim, numbers
/// in decimal, anything else (including absence) as empty.
pub(crate) fn value_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub(crate) fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Upstream endpoints and credentials the handlers are built with.
#[derive(Debug, Clone, Default)]
pub struct PlatformConfig {
    /// Overrides the NetEase song detail endpoint.
    pub music163_api_url: Option<String>,
    /// Overrides the Youku video info endpoint.
    pub youku_api_url: Option<String>,
    pub youku_client_id: Option<String>,
}

/// Routes hostnames to platform handlers.
///
/// Entries are checked in registration order and the first suffix that the
/// hostname literally ends with wins. No sorting by specificity is done, so
/// more specific suffixes must be registered first.
pub struct PlatformRouter {
    handlers: Vec<(String, Arc<dyn MediaHandler>)>,
}

impl PlatformRouter {
    /// Create a router with all supported platforms.
    #[must_use]
    pub fn new(config: &PlatformConfig) -> Self {
        let music163: Arc<dyn MediaHandler> = Arc::new(music163::Music163Handler::new(
            config.music163_api_url.clone(),
        ));
        let youku: Arc<dyn MediaHandler> = Arc::new(youku::YoukuHandler::new(
            config.youku_api_url.clone(),
            config.youku_client_id.clone(),
        ));

        Self::with_handlers(vec![
            ("music.163.com".to_string(), music163),
            ("youku.com".to_string(), Arc::clone(&youku)),
            ("tudou.com".to_string(), youku),
        ])
    }

    /// Create a router from an explicit ordered table.
    #[must_use]
    pub fn with_handlers(handlers: Vec<(String, Arc<dyn MediaHandler>)>) -> Self {
        Self { handlers }
    }

    /// Registered hostname suffixes, in match order.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(suffix, _)| suffix.as_str())
    }

    /// Find the handler for `hostname`.
    pub fn resolve(&self, hostname: &str) -> Result<&dyn MediaHandler> {
        self.handlers
            .iter()
            .find(|(suffix, _)| hostname.ends_with(suffix.as_str()))
            .map(|(_, handler)| {
                tracing::debug!("Matched media handler: {}", handler.name());
                handler.as_ref()
            })
            .ok_or_else(|| MediaError::UnsupportedPlatform(hostname.to_string()))
    }

    /// Parse a raw source URL and find its handler.
    pub fn resolve_url(&self, raw: &str) -> Result<(Url, &dyn MediaHandler)> {
        if raw.trim().is_empty() {
            return Err(MediaError::InvalidInput("URL is empty".to_string()));
        }
        let url = Url::parse(raw)
            .map_err(|e| MediaError::InvalidInput(format!("Invalid URL \"{raw}\": {e}")))?;
        let handler = match url.host_str() {
            Some(host) => self
                .resolve(host)
                .map_err(|_| MediaError::UnsupportedPlatform(raw.to_string()))?,
            None => return Err(MediaError::UnsupportedPlatform(raw.to_string())),
        };
        Ok((url, handler))
    }
}

impl Default for PlatformRouter {
    fn default() -> Self {
        Self::new(&PlatformConfig::default())
    }
}
