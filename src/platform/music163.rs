//! NetEase Cloud Music (`music.163.com`) songs.
//!
//! Song pages come in two shapes: the desktop single-page app routes through
//! the URL fragment (`/#/song?id=...`) while the mobile site uses a real path
//! (`/m/song?id=...`). Both are normalized to the mobile form before the
//! `id` query parameter is read.
//!
//! Metadata comes from the private `weapi` song detail endpoint, which only
//! accepts an encrypted payload (see [`super::weapi`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{escape_attr, value_text, weapi, EmbedSource, MediaFormat, MediaHandler, MediaInfo};
use crate::error::{MediaError, Result};
use crate::http_client::MediaClient;

pub const SONG_DETAIL_API_URL: &str = "https://music.163.com/weapi/song/detail";
const REFERER: &str = "http://music.163.com/";
const BITRATE: u32 = 128_000;

/// NetEase Cloud Music handler.
pub struct Music163Handler {
    api_url: String,
}

impl Music163Handler {
    /// Create a handler, optionally pointing at a different song detail endpoint.
    pub fn new(api_url: Option<String>) -> Self {
        Self {
            api_url: api_url.unwrap_or_else(|| SONG_DETAIL_API_URL.to_string()),
        }
    }

    /// Read the song id from a raw page URL.
    ///
    /// Song ids are decimal; anything else is rejected before it can reach
    /// the weapi `ids` list or the player markup.
    pub fn song_id(raw: &str) -> Result<String> {
        if raw.is_empty() {
            return Err(MediaError::InvalidInput("URL is empty".to_string()));
        }
        let corrected = raw.replacen("/#/", "/m/", 1);
        let url = Url::parse(&corrected)
            .map_err(|e| MediaError::InvalidInput(format!("Invalid URL \"{raw}\": {e}")))?;

        url.query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MediaError::InvalidInput(format!("ID no found: \"{raw}\"")))
            .and_then(|id| {
                if id.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(id)
                } else {
                    Err(MediaError::InvalidInput(format!("Invalid song id: \"{raw}\"")))
                }
            })
    }
}

impl Default for Music163Handler {
    fn default() -> Self {
        Self::new(None)
    }
}

fn song_link(id: &str) -> String {
    format!("https://music.163.com/m/song?id={id}")
}

fn player_src(id: &str) -> String {
    format!("https://music.163.com/outchain/player?type=2&id={id}&auto=0&height=66")
}

#[async_trait]
impl MediaHandler for Music163Handler {
    fn name(&self) -> &'static str {
        "music163"
    }

    fn platform(&self) -> &'static str {
        "music.163.com"
    }

    fn format(&self) -> MediaFormat {
        MediaFormat::Audio
    }

    fn extract_id(&self, url: &Url) -> Result<String> {
        Self::song_id(url.as_str())
    }

    async fn fetch_info(&self, url: &Url, client: &MediaClient) -> Result<MediaInfo> {
        let id = self.extract_id(url)?;
        let request = SongDetailRequest {
            br: BITRATE,
            csrf_token: "",
            ids: format!("[{id}]"),
        };
        let payload = weapi::encrypt(&request)
            .map_err(|e| MediaError::upstream(format!("Failed to encode weapi request: {e}")))?;

        let detail: SongDetailResponse = client
            .post_form_json(&self.api_url, &payload.form(), REFERER)
            .await?;

        if let Some(code) = detail.code.filter(|code| *code != 200) {
            let msg = detail.msg.unwrap_or_default();
            return Err(MediaError::Upstream {
                status: None,
                message: format!("NetEase API error {code}: {msg}"),
                body: Some(serde_json::json!({ "code": code, "msg": msg })),
            });
        }

        let song = detail
            .songs
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::upstream(format!("No song returned for id {id}")))?;
        let album = song.album.unwrap_or_default();

        Ok(MediaInfo {
            platform: self.platform().to_string(),
            format: self.format(),
            title: song.name.unwrap_or_default(),
            collection: album.name.unwrap_or_default(),
            description: String::new(),
            link: song_link(&id),
            thumbnail: album.pic_url.unwrap_or_default(),
            src: player_src(&id),
            duration: value_text(song.duration.as_ref()),
            id,
        })
    }

    fn render_embed(&self, source: EmbedSource<'_>) -> String {
        format!(
            r#"<iframe frameborder="no" border="0" marginwidth="0" marginheight="0" width="330" height="86" src="{}"></iframe>"#,
            player_src(&escape_attr(source.id()))
        )
    }
}

// ============================================================================
// weapi song detail types
// ============================================================================

#[derive(Debug, Serialize)]
struct SongDetailRequest {
    br: u32,
    csrf_token: &'static str,
    ids: String,
}

#[derive(Debug, Deserialize)]
struct SongDetailResponse {
    songs: Option<Vec<Song>>,
    code: Option<i64>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Song {
    name: Option<String>,
    album: Option<Album>,
    duration: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Album {
    name: Option<String>,
    pic_url: Option<String>,
}
