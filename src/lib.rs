//! `medialink` - Media metadata proxy
//!
//! # Features
//!
//! - **Dispatch**: hostname-suffix routing to per-platform handlers
//! - **NetEase Cloud Music**: `weapi` encrypted song detail lookups
//! - **Youku / Tudou**: open API video lookups
//! - **Embeds**: official player `<iframe>` snippets from a bare id
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use medialink::{MediaClient, PlatformConfig, PlatformRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MediaClient::new(Duration::from_millis(2048))?;
//!     let router = PlatformRouter::new(&PlatformConfig::default());
//!     let (url, handler) = router.resolve_url("https://v.youku.com/v_show/id_XAbc12==.html")?;
//!     println!("{}", handler.render_embed(handler.extract_id(&url)?.as_str().into()));
//!     let info = handler.fetch_info(&url, &client).await?;
//!     println!("{}", info.title);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http_client;
pub mod platform;
pub mod server;

pub use config::{Config, Environment, LogFormat};
pub use error::MediaError;
pub use http_client::MediaClient;
pub use platform::{EmbedSource, MediaFormat, MediaHandler, MediaInfo, PlatformConfig, PlatformRouter};
pub use server::{app, AppState, EmbedFormat};

/// Version of medialink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
