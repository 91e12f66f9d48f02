use crate::session::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Thumbnail,
    #[serde(default)]
    pub medium: Thumbnail,
    #[serde(default)]
    pub high: Thumbnail,
}

/// Counters stay as the decimal strings the Data API returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelStats {
    pub subscriber_count: String,
    pub view_count: String,
    pub video_count: String,
    pub title: String,
    pub description: String,
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnails: Thumbnails,
    pub published_at: String,
    pub view_count: String,
    pub like_count: String,
    /// Clock form, e.g. `12:34`.
    pub duration: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Growth,
    Content,
    Engagement,
    Optimization,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub priority: Priority,
    pub impact_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentSuggestion {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub estimated_views: u64,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopVideo {
    pub id: String,
    pub title: String,
    pub views: String,
    pub view_count: u64,
    pub like_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_views: u64,
    pub subscribers: u64,
    pub total_likes: u64,
    pub engagement_rate: Option<f64>,
    pub avg_views_per_video: Option<f64>,
    pub top_videos: Vec<TopVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub youtube_channel_id: Option<String>,
    #[serde(default)]
    pub youtube_api_key: Option<String>,
}

/// A signed-in user, keyed in `AppData::sessions` by the opaque token handed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    /// Exchanged for a new `access_token` once the backend rejects the current one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    pub created_at: String,
}

impl Session {
    /// The user's own Data API credentials, when both halves are set.
    pub fn personal_credentials(&self) -> Option<(&str, &str)> {
        let key = self.profile.youtube_api_key.as_deref()?.trim();
        let channel = self.profile.youtube_channel_id.as_deref()?.trim();
        if key.is_empty() || channel.is_empty() {
            return None;
        }
        Some((key, channel))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub channel_title: String,
    pub insights: Vec<Insight>,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
    /// Last analysis per user id.
    #[serde(default)]
    pub reports: BTreeMap<String, InsightReport>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub youtube_api_key: Option<String>,
    #[serde(default)]
    pub youtube_channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetupForm {
    pub api_key: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_handle: String,
}

#[derive(Debug, Deserialize)]
pub struct ThemeChoice {
    #[serde(default)]
    pub theme: Option<Theme>,
}

/// Query the auth backend appends when it sends the browser back after a provider sign-in.
#[derive(Debug, Deserialize, Default)]
pub struct OAuthCallback {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideosQuery {
    pub max: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub handle: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub source: DataSource,
    pub channel: Option<ChannelStats>,
    pub subscribers: String,
    pub views: String,
    pub videos: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideosResponse {
    pub source: DataSource,
    pub videos: Vec<VideoData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub source: DataSource,
    pub insights: Vec<Insight>,
    pub suggestions: Vec<ContentSuggestion>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub channel_id: Option<String>,
}

/// Profile as returned to clients; the API key itself never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: String,
    pub email: String,
    pub youtube_channel_id: Option<String>,
    pub has_api_key: bool,
}

impl ProfileView {
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.user_id.clone(),
            email: session.email.clone(),
            youtube_channel_id: session.profile.youtube_channel_id.clone(),
            has_api_key: session
                .profile
                .youtube_api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub auth_enabled: bool,
    pub youtube_configured: bool,
}
