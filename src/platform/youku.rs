//! Youku video extraction via the public open API.
//!
//! Video ids live in the page path as `id_<base64>==` (optionally followed by
//! `.html`), e.g. `https://v.youku.com/v_show/id_XMzg2NzY5MjQ0MA==.html`.
//! Tudou pages share the same ids and player.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{escape_attr, value_text, EmbedSource, MediaFormat, MediaHandler, MediaInfo};
use crate::error::{MediaError, Result};
use crate::http_client::MediaClient;

pub const VIDEO_API_URL: &str = "https://api.youku.com/videos/show.json";

/// Youku video handler.
pub struct YoukuHandler {
    api_url: String,
    client_id: Option<String>,
}

impl YoukuHandler {
    pub fn new(api_url: Option<String>, client_id: Option<String>) -> Self {
        Self {
            api_url: api_url.unwrap_or_else(|| VIDEO_API_URL.to_string()),
            client_id,
        }
    }

    /// Query for `videos/show.json`; `client_id` is omitted when unset.
    fn video_query<'a>(&'a self, id: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut query = Vec::with_capacity(3);
        if let Some(client_id) = self.client_id.as_deref() {
            query.push(("client_id", client_id));
        }
        query.push(("video_id", id));
        query.push(("ext", "show"));
        query
    }
}

fn video_link(id: &str) -> String {
    format!("https://v.youku.com/v_show/id_{id}.html")
}

fn player_src(id: &str) -> String {
    format!("https://player.youku.com/embed/{id}")
}

#[async_trait]
impl MediaHandler for YoukuHandler {
    fn name(&self) -> &'static str {
        "youku"
    }

    fn platform(&self) -> &'static str {
        "youku"
    }

    fn format(&self) -> MediaFormat {
        MediaFormat::Video
    }

    fn extract_id(&self, url: &Url) -> Result<String> {
        url.path()
            .split('/')
            .find(|segment| {
                segment.starts_with("id_")
                    && (segment.ends_with("==") || segment.ends_with("==.html"))
            })
            .map(|segment| {
                let id = segment.strip_prefix("id_").unwrap_or(segment);
                id.strip_suffix(".html").unwrap_or(id).to_string()
            })
            .ok_or_else(|| MediaError::InvalidInput(format!("ID no found: \"{url}\"")))
    }

    async fn fetch_info(&self, url: &Url, client: &MediaClient) -> Result<MediaInfo> {
        let id = self.extract_id(url)?;
        if self.client_id.is_none() {
            tracing::debug!("YOUKU_CLIENT_ID not set, upstream will reject the call");
        }

        let video: YoukuVideo = client
            .get_json(&self.api_url, &self.video_query(&id))
            .await?;

        let title = video.title.unwrap_or_default();
        let show_name = video
            .show
            .and_then(|show| show.name)
            .filter(|name| !name.is_empty());
        let title = match &show_name {
            Some(show) => format!("{title} - {show}"),
            None => title,
        };
        let thumbnail = video
            .big_thumbnail
            .filter(|t| !t.is_empty())
            .or(video.thumbnail)
            .unwrap_or_default();

        Ok(MediaInfo {
            platform: self.platform().to_string(),
            format: self.format(),
            title,
            collection: show_name.unwrap_or_default(),
            description: video.description.unwrap_or_default(),
            link: video_link(&id),
            thumbnail,
            src: player_src(&id),
            duration: value_text(video.duration.as_ref()),
            id,
        })
    }

    fn render_embed(&self, source: EmbedSource<'_>) -> String {
        format!(
            r#"<iframe height="498" width="510" src="{}" frameborder="0" allowfullscreen></iframe>"#,
            player_src(&escape_attr(source.id()))
        )
    }
}

// ============================================================================
// Youku API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoukuVideo {
    title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    big_thumbnail: Option<String>,
    /// Documented as a string of seconds, occasionally a number.
    duration: Option<serde_json::Value>,
    /// Only present with `ext=show`.
    show: Option<YoukuShow>,
}

#[derive(Debug, Deserialize)]
struct YoukuShow {
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of(raw: &str) -> Result<String> {
        YoukuHandler::new(None, None).extract_id(&Url::parse(raw).unwrap())
    }

    #[test]
    fn extracts_id_with_html_suffix() {
        assert_eq!(id_of("https://v.example/v_show/id_XAbc12==.html").unwrap(), "XAbc12==");
        assert_eq!(
            id_of("https://v.youku.com/v_show/id_XMzg2NzY5MjQ0MA==.html?spm=a2h0k").unwrap(),
            "XMzg2NzY5MjQ0MA=="
        );
    }

    #[test]
    fn extracts_id_without_suffix() {
        assert_eq!(id_of("https://v.youku.com/v_show/id_XAbc12==").unwrap(), "XAbc12==");
    }

    #[test]
    fn first_matching_segment_wins() {
        assert_eq!(
            id_of("https://v.youku.com/id_first==/id_second==.html").unwrap(),
            "first=="
        );
    }

    #[test]
    fn missing_id_segment_is_invalid_input() {
        for raw in [
            "https://v.youku.com/",
            "https://v.youku.com/v_show/XAbc12==.html",
            "https://v.youku.com/v_show/id_XAbc12.html",
        ] {
            assert!(
                matches!(id_of(raw), Err(MediaError::InvalidInput(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn query_omits_unset_client_id() {
        let handler = YoukuHandler::new(None, None);
        assert_eq!(
            handler.video_query("XAbc12=="),
            vec![("video_id", "XAbc12=="), ("ext", "show")]
        );

        let handler = YoukuHandler::new(None, Some("abc".into()));
        assert_eq!(handler.video_query("XAbc12==")[0], ("client_id", "abc"));
    }

    #[test]
    fn embed_escapes_id_markup() {
        let html = YoukuHandler::new(None, None).render_embed(r#"x"><b>"#.into());
        assert!(html.contains(r#"src="https://player.youku.com/embed/x&quot;&gt;&lt;b&gt;""#));
    }

    #[test]
    fn parses_video_with_show() {
        let video: YoukuVideo = serde_json::from_str(
            r#"{"id":"XAbc12==","title":"Ep 1","thumbnail":"http://t","bigThumbnail":"http://big",
                "duration":"1425.00","description":"desc","show":{"id":"s1","name":"Show"}}"#,
        )
        .unwrap();
        assert_eq!(video.big_thumbnail.as_deref(), Some("http://big"));
        assert_eq!(video.show.unwrap().name.as_deref(), Some("Show"));
        assert_eq!(value_text(video.duration.as_ref()), "1425.00");
    }

    #[test]
    fn embed_is_same_for_id_and_record() {
        let handler = YoukuHandler::new(None, None);
        let info = MediaInfo {
            platform: "youku".into(),
            format: MediaFormat::Video,
            id: "XAbc12==".into(),
            title: "Ep 1".into(),
            collection: String::new(),
            description: String::new(),
            link: video_link("XAbc12=="),
            thumbnail: String::new(),
            src: player_src("XAbc12=="),
            duration: String::new(),
        };
        let by_id = handler.render_embed("XAbc12==".into());
        assert_eq!(by_id, handler.render_embed((&info).into()));
        assert_eq!(
            by_id,
            r#"<iframe height="498" width="510" src="https://player.youku.com/embed/XAbc12==" frameborder="0" allowfullscreen></iframe>"#
        );
    }
}
