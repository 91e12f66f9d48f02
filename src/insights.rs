use crate::format::{format_count, parse_clock_duration, parse_count};
use crate::models::{
    AnalyticsOverview, ChannelStats, ContentSuggestion, Insight, InsightKind, Priority, TopVideo,
    VideoData,
};
use chrono::{DateTime, Utc};

const LOW_CONVERSION_RATIO: f64 = 0.01;
const LOW_REACH_AVG_VIEWS: f64 = 100.0;
const TOP_PERFORMER_SHARE: f64 = 0.2;
const SHORT_VIDEO_SECS: u64 = 300;
const LONG_VIDEO_SECS: u64 = 600;
const LOW_ENGAGEMENT_PCT: f64 = 2.0;
const HIGH_ENGAGEMENT_PCT: f64 = 5.0;
const CONSISTENCY_MIN_VIDEOS: usize = 5;
const INCONSISTENT_DEVIATION_DAYS: f64 = 7.0;

pub fn analyze_channel_performance(stats: &ChannelStats, videos: &[VideoData]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(insight) = analyze_growth(stats) {
        insights.push(insight);
    }
    insights.extend(analyze_content(videos));
    if let Some(insight) = analyze_engagement(videos) {
        insights.push(insight);
    }
    if let Some(insight) = analyze_upload_consistency(videos) {
        insights.push(insight);
    }

    insights
}

fn analyze_growth(stats: &ChannelStats) -> Option<Insight> {
    let total_views = parse_count(&stats.view_count) as f64;
    let subscribers = parse_count(&stats.subscriber_count) as f64;
    let video_count = parse_count(&stats.video_count) as f64;

    if total_views > 0.0 && subscribers / total_views < LOW_CONVERSION_RATIO {
        return Some(insight(
            "growth-1",
            InsightKind::Growth,
            "Low Subscriber Conversion",
            "Your subscriber-to-view ratio is below average".to_string(),
            "Add clear call-to-actions in your videos asking viewers to subscribe. Create engaging content that encourages repeat viewing.",
            Priority::High,
            85,
        ));
    }

    if video_count > 0.0 && total_views / video_count < LOW_REACH_AVG_VIEWS {
        return Some(insight(
            "growth-2",
            InsightKind::Growth,
            "Improve Video Reach",
            "Your average views per video could be improved".to_string(),
            "Focus on SEO optimization, better thumbnails, and more engaging titles to increase video discoverability.",
            Priority::Medium,
            70,
        ));
    }

    None
}

fn analyze_content(videos: &[VideoData]) -> Vec<Insight> {
    let mut insights = Vec::new();
    if videos.is_empty() {
        return insights;
    }

    let mut views: Vec<u64> = videos.iter().map(|v| parse_count(&v.view_count)).collect();
    views.sort_unstable_by(|a, b| b.cmp(a));
    let top_count = ((views.len() as f64) * TOP_PERFORMER_SHARE).ceil().max(1.0) as usize;
    let avg_views = mean(&views);
    let top_avg = mean(&views[..top_count]);

    if top_avg > avg_views * 2.0 {
        insights.push(insight(
            "content-1",
            InsightKind::Content,
            "Replicate Top Content",
            "Your top 20% of videos perform significantly better than average".to_string(),
            "Analyze your top-performing videos and create similar content. Common themes in your best videos should guide future content strategy.",
            Priority::High,
            90,
        ));
    }

    let mut short_views = Vec::new();
    let mut long_views = Vec::new();
    for video in videos {
        let secs = parse_clock_duration(&video.duration);
        if secs < SHORT_VIDEO_SECS {
            short_views.push(parse_count(&video.view_count));
        } else if secs > LONG_VIDEO_SECS {
            long_views.push(parse_count(&video.view_count));
        }
    }

    if !short_views.is_empty() && !long_views.is_empty() {
        let short_avg = mean(&short_views);
        let long_avg = mean(&long_views);

        if short_avg > long_avg * 1.5 {
            insights.push(insight(
                "content-2",
                InsightKind::Content,
                "Shorter Content Performs Better",
                "Your shorter videos get more views on average".to_string(),
                "Consider creating more concise, focused content. Shorter videos often have better retention rates.",
                Priority::Medium,
                65,
            ));
        } else if long_avg > short_avg * 1.5 {
            insights.push(insight(
                "content-3",
                InsightKind::Content,
                "Long-form Content Success",
                "Your longer videos perform better".to_string(),
                "Your audience prefers in-depth content. Continue creating comprehensive, detailed videos.",
                Priority::Medium,
                65,
            ));
        }
    }

    insights
}

fn analyze_engagement(videos: &[VideoData]) -> Option<Insight> {
    let rate = engagement_rate(videos)?;

    if rate < LOW_ENGAGEMENT_PCT {
        return Some(insight(
            "engagement-1",
            InsightKind::Engagement,
            "Low Engagement Rate",
            format!("Your engagement rate is {rate:.2}%, which is below the 2-4% benchmark"),
            "Encourage more interaction by asking questions, creating polls, and responding to comments. End videos with clear calls-to-action.",
            Priority::High,
            80,
        ));
    }

    if rate > HIGH_ENGAGEMENT_PCT {
        return Some(insight(
            "engagement-2",
            InsightKind::Engagement,
            "Excellent Engagement",
            format!("Your {rate:.2}% engagement rate is excellent!"),
            "Keep doing what you're doing! Your audience is highly engaged. Consider leveraging this engagement for community building.",
            Priority::Low,
            95,
        ));
    }

    None
}

fn analyze_upload_consistency(videos: &[VideoData]) -> Option<Insight> {
    let mut uploads: Vec<DateTime<Utc>> = videos
        .iter()
        .filter_map(|v| DateTime::parse_from_rfc3339(&v.published_at).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .collect();
    if uploads.len() < CONSISTENCY_MIN_VIDEOS {
        return None;
    }

    uploads.sort_unstable_by(|a, b| b.cmp(a));
    let intervals: Vec<f64> = uploads
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).num_seconds() as f64 / 86_400.0)
        .collect();

    let avg_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let deviation = intervals
        .iter()
        .map(|interval| (interval - avg_interval).abs())
        .sum::<f64>()
        / intervals.len() as f64;

    if deviation > INCONSISTENT_DEVIATION_DAYS {
        return Some(insight(
            "consistency-1",
            InsightKind::Optimization,
            "Inconsistent Upload Schedule",
            "Your upload schedule varies significantly".to_string(),
            "Establish a consistent upload schedule. Regular uploads help build audience expectations and improve algorithm performance.",
            Priority::Medium,
            70,
        ));
    }

    None
}

pub fn generate_content_suggestions(stats: &ChannelStats, videos: &[VideoData]) -> Vec<ContentSuggestion> {
    let mut suggestions = Vec::new();

    if let Some(top_views) = videos.iter().map(|v| parse_count(&v.view_count)).max() {
        suggestions.push(suggestion(
            "Tutorial Series Based on Top Content",
            "Create a multi-part series expanding on your most successful video topics",
            &["tutorial", "series", "educational"],
            estimate(top_views as f64, 0.7),
            85,
        ));
        suggestions.push(suggestion(
            "Behind the Scenes Content",
            "Show your creative process and setup to build stronger audience connection",
            &["behind-the-scenes", "personal", "vlog"],
            estimate(top_views as f64, 0.4),
            70,
        ));
    }

    let channel_avg = average_views_per_video(stats).unwrap_or(0.0);
    suggestions.push(suggestion(
        "Current Trends Analysis",
        "Create content around trending topics in your niche",
        &["trending", "analysis", "current"],
        estimate(channel_avg, 1.2),
        60,
    ));
    suggestions.push(suggestion(
        "Q&A with Your Audience",
        "Answer common questions from your comments and community",
        &["qa", "community", "interactive"],
        estimate(channel_avg, 0.8),
        75,
    ));

    suggestions
}

/// Figures for the analytics screen.
pub fn summarize(stats: &ChannelStats, videos: &[VideoData]) -> AnalyticsOverview {
    let mut top_videos: Vec<TopVideo> = videos
        .iter()
        .map(|video| {
            let view_count = parse_count(&video.view_count);
            TopVideo {
                id: video.id.clone(),
                title: video.title.clone(),
                views: format_count(view_count),
                view_count,
                like_count: parse_count(&video.like_count),
            }
        })
        .collect();
    top_videos.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    top_videos.truncate(5);

    AnalyticsOverview {
        total_views: parse_count(&stats.view_count),
        subscribers: parse_count(&stats.subscriber_count),
        total_likes: videos.iter().map(|v| parse_count(&v.like_count)).sum(),
        engagement_rate: engagement_rate(videos),
        avg_views_per_video: average_views_per_video(stats),
        top_videos,
    }
}

/// Likes per hundred views across `videos`; `None` without any views.
pub fn engagement_rate(videos: &[VideoData]) -> Option<f64> {
    let (likes, views) = videos.iter().fold((0u64, 0u64), |(likes, views), video| {
        (
            likes.saturating_add(parse_count(&video.like_count)),
            views.saturating_add(parse_count(&video.view_count)),
        )
    });
    if views == 0 {
        return None;
    }
    Some(likes as f64 / views as f64 * 100.0)
}

fn average_views_per_video(stats: &ChannelStats) -> Option<f64> {
    let video_count = parse_count(&stats.video_count);
    if video_count == 0 {
        return None;
    }
    Some(parse_count(&stats.view_count) as f64 / video_count as f64)
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

fn estimate(base: f64, factor: f64) -> u64 {
    (base * factor).floor() as u64
}

fn insight(
    id: &str,
    kind: InsightKind,
    title: &str,
    description: String,
    recommendation: &str,
    priority: Priority,
    impact_score: u8,
) -> Insight {
    Insight {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        description,
        recommendation: recommendation.to_string(),
        priority,
        impact_score,
    }
}

fn suggestion(
    title: &str,
    description: &str,
    tags: &[&str],
    estimated_views: u64,
    confidence: u8,
) -> ContentSuggestion {
    ContentSuggestion {
        title: title.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        estimated_views,
        confidence,
    }
}
