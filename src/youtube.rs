use crate::config::PLACEHOLDER_API_KEY;
use crate::errors::UpstreamError;
use crate::format::format_iso_duration;
use crate::models::{ChannelStats, DataSource, Thumbnail, Thumbnails, VideoData};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub channel_id: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key != PLACEHOLDER_API_KEY
            && self.api_key.len() > 10
            && !self.channel_id.trim().is_empty()
    }
}

/// A result tagged with whether it came from the API or the built-in placeholder data.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            source: DataSource::Live,
        }
    }

    fn fallback(value: T) -> Self {
        Self {
            value,
            source: DataSource::Fallback,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(default)]
    statistics: Option<Statistics>,
    #[serde(default)]
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
    like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin client over the YouTube Data API v3.
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Channel counters and snippet. `None` when the API knows no such channel.
    pub async fn channel_stats(&self, creds: &Credentials) -> Fetched<Option<ChannelStats>> {
        if !creds.is_configured() {
            debug!("youtube api key not configured, using fallback channel stats");
            return Fetched::fallback(Some(fallback_channel_stats()));
        }

        match self.fetch_channel_stats(creds).await {
            Ok(stats) => Fetched::live(stats),
            Err(err) => {
                warn!(channel_id = %creds.channel_id, "failed to fetch channel stats: {err}");
                Fetched::fallback(Some(fallback_channel_stats()))
            }
        }
    }

    /// Most recent uploads, newest first as the uploads playlist orders them.
    pub async fn channel_videos(&self, creds: &Credentials, max_results: u32) -> Fetched<Vec<VideoData>> {
        if !creds.is_configured() {
            debug!("youtube api key not configured, using fallback videos");
            return Fetched::fallback(fallback_videos(max_results));
        }

        match self.fetch_channel_videos(creds, max_results).await {
            Ok(videos) => Fetched::live(videos),
            Err(err) => {
                warn!(channel_id = %creds.channel_id, "failed to fetch channel videos: {err}");
                Fetched::fallback(fallback_videos(max_results))
            }
        }
    }

    /// Resolves a handle such as `@somebody` to a channel id.
    pub async fn search_channel_by_handle(
        &self,
        api_key: &str,
        handle: &str,
    ) -> Result<Option<String>, UpstreamError> {
        let query = handle.trim().trim_start_matches('@');
        let response: ListResponse<SearchItem> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("q", query),
                    ("maxResults", "1"),
                    ("key", api_key),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .find_map(|item| item.id.channel_id))
    }

    async fn fetch_channel_stats(&self, creds: &Credentials) -> Result<Option<ChannelStats>, UpstreamError> {
        let response: ListResponse<ChannelItem> = self
            .get_json(
                "channels",
                &[
                    ("part", "snippet,statistics"),
                    ("id", creds.channel_id.as_str()),
                    ("key", creds.api_key.as_str()),
                ],
            )
            .await?;

        let Some(channel) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let snippet = channel.snippet.unwrap_or_default();
        let statistics = channel.statistics.unwrap_or_default();

        Ok(Some(ChannelStats {
            subscriber_count: statistics.subscriber_count.unwrap_or_else(zero),
            view_count: statistics.view_count.unwrap_or_else(zero),
            video_count: statistics.video_count.unwrap_or_else(zero),
            title: snippet.title,
            description: snippet.description,
            thumbnails: snippet.thumbnails,
        }))
    }

    async fn fetch_channel_videos(
        &self,
        creds: &Credentials,
        max_results: u32,
    ) -> Result<Vec<VideoData>, UpstreamError> {
        let channels: ListResponse<ChannelItem> = self
            .get_json(
                "channels",
                &[
                    ("part", "contentDetails"),
                    ("id", creds.channel_id.as_str()),
                    ("key", creds.api_key.as_str()),
                ],
            )
            .await?;

        let Some(uploads) = channels
            .items
            .into_iter()
            .next()
            .and_then(|channel| channel.content_details)
            .and_then(|details| details.related_playlists.uploads)
        else {
            return Ok(Vec::new());
        };

        let max = max_results.to_string();
        let playlist: ListResponse<PlaylistItem> = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "snippet"),
                    ("playlistId", uploads.as_str()),
                    ("maxResults", max.as_str()),
                    ("key", creds.api_key.as_str()),
                ],
            )
            .await?;

        let ids: Vec<String> = playlist
            .items
            .into_iter()
            .filter_map(|item| item.snippet.resource_id.and_then(|r| r.video_id))
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let videos: ListResponse<VideoItem> = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", joined.as_str()),
                    ("key", creds.api_key.as_str()),
                ],
            )
            .await?;

        Ok(videos.items.into_iter().map(video_from_item).collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<T, UpstreamError> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self.http.get(&url).query(params).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| UpstreamError::Decode(format!("{resource}: {err}")))
    }
}

fn video_from_item(item: VideoItem) -> VideoData {
    VideoData {
        id: item.id,
        title: item.snippet.title,
        description: item.snippet.description,
        thumbnails: item.snippet.thumbnails,
        published_at: item.snippet.published_at,
        view_count: item.statistics.view_count.unwrap_or_else(zero),
        like_count: item.statistics.like_count.unwrap_or_else(zero),
        duration: item
            .content_details
            .map(|details| format_iso_duration(&details.duration))
            .unwrap_or_else(|| "0:00".to_string()),
    }
}

fn zero() -> String {
    "0".to_string()
}

fn pexels(photo: &str, file: &str, sizes: [(u32, u32); 3]) -> Thumbnails {
    let url = |(w, h): (u32, u32)| Thumbnail {
        url: format!(
            "https://images.pexels.com/photos/{photo}/{file}?auto=compress&cs=tinysrgb&w={w}&h={h}&fit=crop"
        ),
    };
    Thumbnails {
        default: url(sizes[0]),
        medium: url(sizes[1]),
        high: url(sizes[2]),
    }
}

const VIDEO_THUMB_SIZES: [(u32, u32); 3] = [(120, 90), (320, 180), (480, 360)];

pub fn fallback_channel_stats() -> ChannelStats {
    ChannelStats {
        subscriber_count: "1500".to_string(),
        view_count: "25200".to_string(),
        video_count: "45".to_string(),
        title: "Your YouTube Channel".to_string(),
        description: "Welcome to my YouTube channel! Configure your API key to see real stats."
            .to_string(),
        thumbnails: pexels(
            "1591056",
            "pexels-photo-1591056.jpeg",
            [(88, 88), (240, 240), (800, 800)],
        ),
    }
}

/// (id, title, description, photo id, photo file, published, views, likes, duration)
const DEMO_VIDEOS: [(&str, &str, &str, &str, &str, &str, &str, &str, &str); 3] = [
    (
        "demo1",
        "Getting Started with React Native",
        "Learn the basics of React Native development",
        "11035380",
        "pexels-photo-11035380.jpeg",
        "2024-01-15T10:00:00Z",
        "1250",
        "89",
        "12:34",
    ),
    (
        "demo2",
        "Advanced JavaScript Tips",
        "Pro tips for JavaScript developers",
        "4164418",
        "pexels-photo-4164418.jpeg",
        "2024-01-10T14:30:00Z",
        "2100",
        "156",
        "8:45",
    ),
    (
        "demo3",
        "Building Mobile Apps with Expo",
        "Complete guide to Expo development",
        "147413",
        "twitter-facebook-together-exchange-of-information-147413.jpeg",
        "2024-01-05T09:15:00Z",
        "3400",
        "234",
        "15:22",
    ),
];

pub fn fallback_videos(max_results: u32) -> Vec<VideoData> {
    DEMO_VIDEOS
        .iter()
        .take(max_results as usize)
        .map(
            |&(id, title, description, photo, file, published_at, views, likes, duration)| VideoData {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                thumbnails: pexels(photo, file, VIDEO_THUMB_SIZES),
                published_at: published_at.to_string(),
                view_count: views.to_string(),
                like_count: likes.to_string(),
                duration: duration.to_string(),
            },
        )
        .collect()
}
