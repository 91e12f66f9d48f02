use std::{env, path::PathBuf, time::Duration};
use tracing::info;

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const PLACEHOLDER_API_KEY: &str = "YOUR_YOUTUBE_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Externally visible origin, used for provider sign-in callbacks.
    pub public_url: String,
    pub data_path: PathBuf,
    pub youtube_base_url: String,
    /// Server-wide credentials used for guests and users without their own setup.
    pub default_api_key: String,
    pub default_channel_id: String,
    pub supabase: Option<SupabaseConfig>,
    pub http_timeout: Duration,
    pub video_fetch_limit: u32,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        let supabase = match (non_empty_var("SUPABASE_URL"), non_empty_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        let port: u16 = parsed_var("PORT").unwrap_or(8080);
        let config = Self {
            port,
            public_url: non_empty_var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            data_path: resolve_data_path(),
            youtube_base_url: non_empty_var("YOUTUBE_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            default_api_key: non_empty_var("YOUTUBE_API_KEY")
                .unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string()),
            default_channel_id: non_empty_var("YOUTUBE_CHANNEL_ID").unwrap_or_default(),
            supabase,
            http_timeout: Duration::from_secs(parsed_var("HTTP_TIMEOUT_SECS").unwrap_or(15)),
            video_fetch_limit: parsed_var::<u32>("VIDEO_FETCH_LIMIT").unwrap_or(50).clamp(1, 50),
        };

        info!(
            port = config.port,
            public_url = %config.public_url,
            data_path = %config.data_path.display(),
            youtube_base_url = %config.youtube_base_url,
            auth_enabled = config.supabase.is_some(),
            "configuration loaded"
        );
        config
    }
}

pub fn resolve_data_path() -> PathBuf {
    non_empty_var("APP_DATA_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/state.json"))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|value| value.parse().ok())
}
