use crate::insights::analyze_channel_performance;
use crate::models::{ChannelStats, DataSource, Insight, InsightReport, Session, VideoData};
use crate::session::with_fresh_token;
use crate::state::AppState;
use crate::storage::persist_data;
use crate::youtube::Credentials;
use chrono::Utc;
use tracing::{info, warn};

/// Everything one screen needs from the Data API.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub channel: Option<ChannelStats>,
    pub videos: Vec<VideoData>,
    pub source: DataSource,
}

impl Snapshot {
    pub fn featured_video(&self) -> Option<&VideoData> {
        self.videos.first()
    }
}

/// Personal credentials when the user set both halves, server defaults otherwise.
pub fn resolve_credentials(state: &AppState, session: Option<&Session>) -> Credentials {
    match session.and_then(Session::personal_credentials) {
        Some((api_key, channel_id)) => Credentials::new(api_key, channel_id),
        None => Credentials::new(
            state.config.default_api_key.clone(),
            state.config.default_channel_id.clone(),
        ),
    }
}

pub async fn load_snapshot(state: &AppState, session: Option<&Session>) -> Snapshot {
    let creds = resolve_credentials(state, session);
    let (stats, videos) = tokio::join!(
        state.youtube.channel_stats(&creds),
        state.youtube.channel_videos(&creds, state.config.video_fetch_limit),
    );

    let source = if stats.source == DataSource::Live && videos.source == DataSource::Live {
        DataSource::Live
    } else {
        DataSource::Fallback
    };

    Snapshot {
        channel: stats.value,
        videos: videos.value,
        source,
    }
}

/// Channel statistics only, for screens that never list uploads.
pub async fn load_channel(state: &AppState, session: Option<&Session>) -> Snapshot {
    let creds = resolve_credentials(state, session);
    let stats = state.youtube.channel_stats(&creds).await;
    Snapshot {
        channel: stats.value,
        videos: Vec::new(),
        source: stats.source,
    }
}

/// Runs the heuristics and, for a signed-in user (session token and session), records
/// the report locally and upstream.
pub async fn analyze(state: &AppState, signed_in: Option<(&str, &Session)>, snapshot: &Snapshot) -> Vec<Insight> {
    let Some(channel) = snapshot.channel.as_ref() else {
        return Vec::new();
    };
    let insights = analyze_channel_performance(channel, &snapshot.videos);

    let Some((token, session)) = signed_in else {
        return insights;
    };

    info!(user_id = %session.user_id, count = insights.len(), "channel analyzed");
    {
        let mut data = state.data.lock().await;
        data.reports.insert(
            session.user_id.clone(),
            InsightReport {
                channel_title: channel.title.clone(),
                insights: insights.clone(),
                analyzed_at: Utc::now().to_rfc3339(),
            },
        );
        if let Err(err) = persist_data(&state.data_path, &data).await {
            warn!(user_id = %session.user_id, "failed to persist report: {}", err.message);
        }
    }

    if let Some(supabase) = state.supabase.as_ref() {
        let channel_id = resolve_credentials(state, Some(session)).channel_id;
        let channel_key = if channel_id.is_empty() { channel.title.clone() } else { channel_id };
        let (key, report) = (channel_key.as_str(), insights.as_slice());
        let saved = with_fresh_token(state, token, session.clone(), |session| async move {
            supabase.save_analytics(&session, key, report).await
        })
        .await;
        if let Err(err) = saved {
            warn!(user_id = %session.user_id, channel_id = %channel_key, "failed to save analytics: {}", err.message);
        }
    }

    insights
}
