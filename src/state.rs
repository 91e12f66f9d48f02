use crate::auth::SupabaseClient;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::AppData;
use crate::youtube::YouTubeClient;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub youtube: YouTubeClient,
    pub supabase: Option<SupabaseClient>,
}

impl AppState {
    pub fn new(config: Config, data: AppData) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let youtube = YouTubeClient::new(http.clone(), config.youtube_base_url.clone());
        let supabase = config
            .supabase
            .as_ref()
            .map(|supabase| SupabaseClient::new(http, supabase));

        Ok(Self {
            data_path: config.data_path.clone(),
            config: Arc::new(config),
            data: Arc::new(Mutex::new(data)),
            youtube,
            supabase,
        })
    }

    pub fn auth(&self) -> Result<&SupabaseClient, AppError> {
        self.supabase
            .as_ref()
            .ok_or_else(|| AppError::unavailable("authentication backend is not configured"))
    }
}
