use crate::dashboard::Snapshot;
use crate::format::{escape_html, format_count, format_number};
use crate::models::{
    AnalyticsOverview, ChannelStats, ContentSuggestion, DataSource, Insight, InsightKind, Priority,
    VideoData,
};
use crate::session::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Videos,
    Analytics,
    About,
    Account,
}

pub struct PageContext {
    /// `None` follows the browser's colour scheme.
    pub theme: Option<Theme>,
    pub email: Option<String>,
    pub auth_enabled: bool,
    pub screen: Screen,
}

pub fn render_home(ctx: &PageContext, snapshot: &Snapshot, insights: &[Insight]) -> String {
    let mut body = String::new();
    body.push_str(&source_notice(snapshot.source));

    match snapshot.channel.as_ref() {
        Some(channel) => {
            body.push_str(&channel_header(channel));
            body.push_str(&stat_cards(channel));
        }
        None => body.push_str(
            r#"<section class="card"><p class="hint">No channel found for the configured channel id.</p></section>"#,
        ),
    }

    if let Some(video) = snapshot.featured_video() {
        body.push_str(&format!(
            r#"<section class="card featured">
  <h2>Latest upload</h2>
  <a href="https://www.youtube.com/watch?v={id}" target="_blank" rel="noopener">
    <img src="{thumb}" alt="" loading="lazy" />
    <span class="title">{title}</span>
  </a>
  <p class="meta">{views} views · {likes} likes · {duration}</p>
</section>"#,
            id = escape_html(&video.id),
            thumb = escape_html(&video.thumbnails.high.url),
            title = escape_html(&video.title),
            views = format_number(&video.view_count),
            likes = format_number(&video.like_count),
            duration = escape_html(&video.duration),
        ));
    }

    body.push_str(r#"<section class="card"><h2>AI insights</h2>"#);
    if insights.is_empty() {
        body.push_str(r#"<p class="hint">Nothing stands out right now. Keep uploading!</p>"#);
    } else {
        body.push_str(r#"<div class="insights">"#);
        for insight in insights {
            body.push_str(&insight_card(insight));
        }
        body.push_str("</div>");
    }
    body.push_str("</section>");

    render_page(ctx, "Home", &body)
}

pub fn render_videos(ctx: &PageContext, snapshot: &Snapshot) -> String {
    let mut body = String::new();
    body.push_str(&source_notice(snapshot.source));
    body.push_str(&format!(
        r#"<section class="card"><h2>Videos</h2><p class="hint">{} recent uploads</p><ul class="videos">"#,
        snapshot.videos.len()
    ));
    for video in &snapshot.videos {
        body.push_str(&video_row(video));
    }
    body.push_str("</ul></section>");

    render_page(ctx, "Videos", &body)
}

pub fn render_analytics(
    ctx: &PageContext,
    snapshot: &Snapshot,
    overview: &AnalyticsOverview,
    suggestions: &[ContentSuggestion],
) -> String {
    let engagement = overview
        .engagement_rate
        .map(|rate| format!("{rate:.2}%"))
        .unwrap_or_else(|| "--".to_string());
    let avg_views = overview
        .avg_views_per_video
        .map(|avg| format_count(avg.floor() as u64))
        .unwrap_or_else(|| "--".to_string());

    let mut body = String::new();
    body.push_str(&source_notice(snapshot.source));
    body.push_str(&format!(
        r#"<section class="panel">
  {views}
  {subs}
  {likes}
  {engagement}
  {avg}
</section>"#,
        views = stat("Total views", &format_count(overview.total_views), false),
        subs = stat("Subscribers", &format_count(overview.subscribers), false),
        likes = stat("Likes", &format_count(overview.total_likes), false),
        engagement = stat("Engagement", &engagement, true),
        avg = stat("Avg views / video", &avg_views, false),
    ));

    body.push_str(r#"<section class="card"><h2>Top videos</h2><ol class="ranking">"#);
    for video in &overview.top_videos {
        body.push_str(&format!(
            r#"<li><span class="title">{}</span><span class="meta">{} views · {} likes</span></li>"#,
            escape_html(&video.title),
            video.views,
            format_count(video.like_count),
        ));
    }
    body.push_str("</ol></section>");

    body.push_str(r#"<section class="card"><h2>Content ideas</h2><div class="insights">"#);
    for suggestion in suggestions {
        let tags: Vec<String> = suggestion
            .tags
            .iter()
            .map(|tag| format!(r#"<span class="tag">#{}</span>"#, escape_html(tag)))
            .collect();
        body.push_str(&format!(
            r#"<article class="insight">
  <header><h3>{title}</h3><span class="badge">{confidence}% confidence</span></header>
  <p>{description}</p>
  <p class="meta">~{views} estimated views</p>
  <p>{tags}</p>
</article>"#,
            title = escape_html(&suggestion.title),
            confidence = suggestion.confidence,
            description = escape_html(&suggestion.description),
            views = format_count(suggestion.estimated_views),
            tags = tags.join(" "),
        ));
    }
    body.push_str("</div></section>");

    render_page(ctx, "Analytics", &body)
}

pub fn render_about(ctx: &PageContext, snapshot: &Snapshot) -> String {
    let mut body = String::new();
    body.push_str(&source_notice(snapshot.source));

    if let Some(channel) = snapshot.channel.as_ref() {
        body.push_str(&channel_header(channel));
        body.push_str(&format!(
            r#"<section class="card">
  <h2>About</h2>
  <p class="description">{description}</p>
</section>
<section class="card">
  <h2>Milestones</h2>
  <ul class="milestones">
    <li><strong>{subs} Subscribers</strong><span class="meta">Community growing every week</span></li>
    <li><strong>{views} Views</strong><span class="meta">Across {videos} videos</span></li>
  </ul>
</section>"#,
            description = escape_html(&channel.description),
            subs = format_number(&channel.subscriber_count),
            views = format_number(&channel.view_count),
            videos = format_number(&channel.video_count),
        ));
    }

    render_page(ctx, "About", &body)
}

pub fn render_login(ctx: &PageContext, message: Option<&str>) -> String {
    let body = if !ctx.auth_enabled {
        r#"<section class="card"><h2>Sign in</h2><p class="hint">Accounts are not enabled on this server.</p></section>"#.to_string()
    } else {
        format!(
            r#"<section class="card narrow">
  <h2>Welcome back</h2>
  {message}
  <form method="post" action="/login" class="stack">
    <label>Email <input type="email" name="email" required /></label>
    <label>Password <input type="password" name="password" required minlength="6" /></label>
    <div class="actions">
      <button class="btn-primary" type="submit">Sign in</button>
      <button class="btn-secondary" type="submit" formaction="/signup">Create account</button>
    </div>
  </form>
  <p class="divider">or</p>
  <a class="btn-secondary oauth" href="/auth/google">Continue with Google &amp; YouTube</a>
</section>"#,
            message = flash(message),
        )
    };

    render_page(ctx, "Sign in", &body)
}

pub fn render_setup(ctx: &PageContext, message: Option<&str>, channel_id: Option<&str>) -> String {
    let body = format!(
        r#"<section class="card narrow">
  <h2>Connect your channel</h2>
  {message}
  <p class="hint">Create an API key in Google Cloud Console with the YouTube Data API v3 enabled, then enter your channel id or @handle.</p>
  <form method="post" action="/setup" class="stack">
    <label>API key <input type="password" name="api_key" required /></label>
    <label>Channel id <input type="text" name="channel_id" value="{channel_id}" placeholder="UC..." /></label>
    <label>or handle <input type="text" name="channel_handle" placeholder="@yourchannel" /></label>
    <div class="actions">
      <button class="btn-primary" type="submit">Save</button>
    </div>
  </form>
</section>"#,
        message = flash(message),
        channel_id = escape_html(channel_id.unwrap_or_default()),
    );

    render_page(ctx, "Channel setup", &body)
}

fn render_page(ctx: &PageContext, title: &str, body: &str) -> String {
    let nav_link = |screen: Screen, href: &str, label: &str| {
        let class = if ctx.screen == screen { "active" } else { "" };
        format!(r#"<a class="{class}" href="{href}">{label}</a>"#)
    };
    let nav = [
        nav_link(Screen::Home, "/", "Home"),
        nav_link(Screen::Videos, "/videos", "Videos"),
        nav_link(Screen::Analytics, "/analytics", "Analytics"),
        nav_link(Screen::About, "/about", "About"),
    ]
    .join("");

    let account = match (&ctx.email, ctx.auth_enabled) {
        (Some(email), _) => format!(
            r#"<span class="who">{}</span><a href="/setup">Setup</a><form method="post" action="/logout"><button class="tab" type="submit">Sign out</button></form>"#,
            escape_html(email)
        ),
        (None, true) => nav_link(Screen::Account, "/login", "Sign in"),
        (None, false) => String::new(),
    };

    LAYOUT_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace(
            "{{THEME_ATTR}}",
            &ctx.theme
                .map(|theme| format!(r#" data-theme="{}""#, theme.as_str()))
                .unwrap_or_default(),
        )
        .replace("{{NAV}}", &nav)
        .replace("{{ACCOUNT}}", &account)
        .replace("{{BODY}}", body)
}

fn channel_header(channel: &ChannelStats) -> String {
    format!(
        r#"<section class="channel">
  <img class="avatar" src="{avatar}" alt="" />
  <div>
    <h1>{title}</h1>
    <p class="subtitle">{subs} subscribers</p>
  </div>
</section>"#,
        avatar = escape_html(&channel.thumbnails.medium.url),
        title = escape_html(&channel.title),
        subs = format_number(&channel.subscriber_count),
    )
}

fn stat_cards(channel: &ChannelStats) -> String {
    format!(
        r#"<section class="panel">{}{}{}</section>"#,
        stat("Subscribers", &format_number(&channel.subscriber_count), true),
        stat("Views", &format_number(&channel.view_count), false),
        stat("Videos", &format_number(&channel.video_count), false),
    )
}

fn stat(label: &str, value: &str, accent: bool) -> String {
    let class = if accent { "value accent" } else { "value" };
    format!(
        r#"<div class="stat"><span class="label">{}</span><span class="{class}">{}</span></div>"#,
        escape_html(label),
        escape_html(value),
    )
}

fn video_row(video: &VideoData) -> String {
    let published = video.published_at.get(..10).unwrap_or(&video.published_at);
    format!(
        r#"<li>
  <img src="{thumb}" alt="" loading="lazy" />
  <div>
    <a class="title" href="https://www.youtube.com/watch?v={id}" target="_blank" rel="noopener">{title}</a>
    <span class="meta">{views} views · {likes} likes · {duration} · {published}</span>
  </div>
</li>"#,
        thumb = escape_html(&video.thumbnails.medium.url),
        id = escape_html(&video.id),
        title = escape_html(&video.title),
        views = format_number(&video.view_count),
        likes = format_number(&video.like_count),
        duration = escape_html(&video.duration),
        published = escape_html(published),
    )
}

fn insight_card(insight: &Insight) -> String {
    let kind = match insight.kind {
        InsightKind::Growth => "growth",
        InsightKind::Content => "content",
        InsightKind::Engagement => "engagement",
        InsightKind::Optimization => "optimization",
    };
    let priority = match insight.priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    };
    format!(
        r#"<article class="insight {kind}">
  <header><h3>{title}</h3><span class="badge {priority}">{priority}</span></header>
  <p>{description}</p>
  <p class="recommendation">{recommendation}</p>
  <p class="meta">Impact {impact}/100</p>
</article>"#,
        title = escape_html(&insight.title),
        description = escape_html(&insight.description),
        recommendation = escape_html(&insight.recommendation),
        impact = insight.impact_score,
    )
}

fn source_notice(source: DataSource) -> String {
    match source {
        DataSource::Live => String::new(),
        DataSource::Fallback => r#"<div class="status" data-type="info">Showing sample data. Connect your channel under Setup to see real numbers.</div>"#.to_string(),
    }
}

fn flash(message: Option<&str>) -> String {
    message
        .map(|msg| format!(r#"<div class="status" data-type="error">{}</div>"#, escape_html(msg)))
        .unwrap_or_default()
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en"{{THEME_ATTR}}>
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · Channel Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --muted: #6b645d;
      --accent: #ff4a4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --surface: white;
      --border: rgba(47, 72, 88, 0.08);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    [data-theme="dark"] {
      --bg-1: #11151c;
      --bg-2: #2a1f33;
      --ink: #eceae6;
      --muted: #a39d96;
      --accent: #ff6b6b;
      --accent-2: #9cc3d9;
      --card: rgba(24, 28, 36, 0.9);
      --surface: #1d222b;
      --border: rgba(255, 255, 255, 0.08);
      --shadow: 0 24px 60px rgba(0, 0, 0, 0.45);
    }

    @media (prefers-color-scheme: dark) {
      :root:not([data-theme]) {
        --bg-1: #11151c;
        --bg-2: #2a1f33;
        --ink: #eceae6;
        --muted: #a39d96;
        --accent: #ff6b6b;
        --accent-2: #9cc3d9;
        --card: rgba(24, 28, 36, 0.9);
        --surface: #1d222b;
        --border: rgba(255, 255, 255, 0.08);
        --shadow: 0 24px 60px rgba(0, 0, 0, 0.45);
      }
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), var(--bg-1) 60%, var(--bg-2) 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      justify-items: center;
      padding: 24px 18px 48px;
    }

    nav.top {
      width: min(960px, 100%);
      display: flex;
      flex-wrap: wrap;
      align-items: center;
      justify-content: space-between;
      gap: 12px;
      margin-bottom: 18px;
    }

    nav.top .links, nav.top .account {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: var(--border);
      border-radius: 999px;
      align-items: center;
    }

    nav.top a, .tab {
      border: none;
      background: transparent;
      border-radius: 999px;
      padding: 8px 14px;
      font: inherit;
      font-size: 0.9rem;
      font-weight: 600;
      color: var(--muted);
      text-decoration: none;
      cursor: pointer;
    }

    nav.top a.active {
      background: var(--surface);
      color: var(--accent-2);
    }

    nav.top form {
      margin: 0;
    }

    .tab.to-light,
    [data-theme="dark"] .tab.to-dark {
      display: none;
    }

    [data-theme="dark"] .tab.to-light {
      display: inline-block;
    }

    @media (prefers-color-scheme: dark) {
      :root:not([data-theme]) .tab.to-dark {
        display: none;
      }
      :root:not([data-theme]) .tab.to-light {
        display: inline-block;
      }
    }

    .who {
      font-size: 0.85rem;
      color: var(--muted);
      padding: 0 8px;
    }

    .app {
      width: min(960px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 24px;
      animation: rise 600ms ease;
    }

    h1, h2 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      margin: 0 0 8px;
    }

    h1 {
      font-size: clamp(1.8rem, 4vw, 2.6rem);
    }

    h3 {
      margin: 0;
      font-size: 1.05rem;
    }

    .subtitle, .hint, .meta {
      margin: 0;
      color: var(--muted);
      font-size: 0.95rem;
    }

    .channel {
      display: flex;
      gap: 18px;
      align-items: center;
    }

    .avatar {
      width: 88px;
      height: 88px;
      border-radius: 50%;
      object-fit: cover;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 16px;
    }

    .stat, .card, .insight {
      background: var(--surface);
      border-radius: 18px;
      padding: 18px;
      border: 1px solid var(--border);
    }

    .stat {
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .stat .value.accent {
      color: var(--accent);
    }

    .card.narrow {
      max-width: 480px;
      justify-self: center;
      width: 100%;
    }

    .featured a {
      display: grid;
      gap: 10px;
      color: inherit;
      text-decoration: none;
    }

    .featured img {
      width: 100%;
      border-radius: 14px;
    }

    .featured .title, .videos .title, .ranking .title {
      font-weight: 600;
      color: inherit;
      text-decoration: none;
    }

    .insights {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(260px, 1fr));
      gap: 14px;
    }

    .insight {
      border-left: 4px solid var(--accent-2);
    }

    .insight.growth { border-left-color: #2d7a4b; }
    .insight.content { border-left-color: #7a4bd1; }
    .insight.engagement { border-left-color: var(--accent); }
    .insight.optimization { border-left-color: #d18b2d; }

    .insight header {
      display: flex;
      justify-content: space-between;
      gap: 10px;
      align-items: baseline;
    }

    .recommendation {
      font-size: 0.95rem;
    }

    .badge, .tag {
      font-size: 0.75rem;
      font-weight: 600;
      text-transform: uppercase;
      letter-spacing: 0.08em;
      padding: 4px 10px;
      border-radius: 999px;
      background: var(--border);
      color: var(--muted);
    }

    .badge.high { background: rgba(198, 59, 43, 0.14); color: #c63b2b; }
    .badge.medium { background: rgba(209, 139, 45, 0.16); color: #b0701a; }
    .badge.low { background: rgba(45, 122, 75, 0.14); color: #2d7a4b; }

    .videos, .ranking, .milestones {
      list-style: none;
      padding: 0;
      margin: 12px 0 0;
      display: grid;
      gap: 12px;
    }

    .videos li {
      display: grid;
      grid-template-columns: 160px 1fr;
      gap: 14px;
      align-items: center;
    }

    .videos img {
      width: 160px;
      border-radius: 10px;
    }

    .videos li div, .ranking li, .milestones li {
      display: grid;
      gap: 4px;
    }

    .ranking {
      list-style: decimal inside;
    }

    .stack {
      display: grid;
      gap: 14px;
    }

    label {
      display: grid;
      gap: 6px;
      font-size: 0.9rem;
      color: var(--muted);
    }

    input {
      font: inherit;
      padding: 12px 14px;
      border-radius: 12px;
      border: 1px solid var(--border);
      background: var(--bg-1);
      color: var(--ink);
    }

    .actions {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 12px;
    }

    .btn-primary, .btn-secondary {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 14px 20px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      color: white;
      transition: transform 150ms ease;
    }

    .btn-primary {
      background: var(--accent);
      box-shadow: 0 10px 24px rgba(255, 74, 74, 0.3);
    }

    .btn-secondary {
      background: var(--accent-2);
    }

    a.oauth {
      display: block;
      text-align: center;
      text-decoration: none;
    }

    .divider {
      text-align: center;
      color: var(--muted);
      margin: 16px 0;
    }

    button:active {
      transform: scale(0.98);
    }

    .status {
      font-size: 0.95rem;
      color: var(--muted);
      padding: 10px 14px;
      border-radius: 12px;
      background: var(--border);
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 24px 18px;
      }
      .videos li {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  <nav class="top">
    <div class="links">{{NAV}}</div>
    <div class="account">
      {{ACCOUNT}}
      <form method="post" action="/theme">
        <button class="tab to-dark" type="submit" name="theme" value="dark">Dark mode</button>
        <button class="tab to-light" type="submit" name="theme" value="light">Light mode</button>
      </form>
    </div>
  </nav>
  <main class="app">
{{BODY}}
  </main>
</body>
</html>
"#;
