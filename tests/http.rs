use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use once_cell::sync::Lazy;
use reqwest::{Client, Url, redirect::Policy};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    source: String,
    channel: Option<Value>,
    subscribers: String,
    views: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    source: String,
    videos: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    source: String,
    insights: Vec<Value>,
    suggestions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ProfileView {
    youtube_channel_id: Option<String>,
    has_api_key: bool,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static ANALYTICS_SAVES: AtomicUsize = AtomicUsize::new(0);
static TOKEN_REFRESHES: AtomicUsize = AtomicUsize::new(0);

/// Stand-in for the Data API and the auth backend, served from its own thread so it
/// outlives the per-test runtimes.
static UPSTREAM: Lazy<String> = Lazy::new(|| {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock upstream");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("mock runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            axum::serve(listener, upstream_router()).await.expect("mock upstream");
        });
    });

    format!("http://{addr}")
});

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

// Mock upstream

const MOCK_VIDEOS: [(&str, &str, &str, &str, &str); 5] = [
    ("v1", "10000", "100", "PT3M", "2024-03-01T00:00:00Z"),
    ("v2", "500", "5", "PT15M", "2024-02-29T00:00:00Z"),
    ("v3", "400", "4", "PT15M", "2024-02-28T00:00:00Z"),
    ("v4", "300", "3", "PT15M", "2024-01-01T00:00:00Z"),
    ("v5", "200", "2", "PT15M", "2023-12-31T00:00:00Z"),
];

type Params = Query<HashMap<String, String>>;

fn upstream_router() -> Router {
    Router::new()
        .route("/youtube/v3/channels", get(mock_channels))
        .route("/youtube/v3/playlistItems", get(mock_playlist_items))
        .route("/youtube/v3/videos", get(mock_videos))
        .route("/youtube/v3/search", get(mock_search))
        .route("/auth/v1/signup", post(mock_signup))
        .route("/auth/v1/token", post(mock_token))
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }))
        .route("/rest/v1/profiles", get(|| async { Json(json!([])) }).post(mock_upsert_profile))
        .route("/rest/v1/channel_analytics", post(mock_save_analytics))
}

fn missing_key(params: &HashMap<String, String>) -> Option<(StatusCode, Json<Value>)> {
    if params.get("key").is_some_and(|key| !key.is_empty()) {
        return None;
    }
    Some((
        StatusCode::FORBIDDEN,
        Json(json!({ "error": { "code": 403, "message": "API key missing" } })),
    ))
}

async fn mock_channels(Query(params): Params) -> impl IntoResponse {
    if let Some(err) = missing_key(&params) {
        return err;
    }
    let part = params.get("part").cloned().unwrap_or_default();
    let item = if part.contains("contentDetails") {
        json!({ "contentDetails": { "relatedPlaylists": { "uploads": "UUmock" } } })
    } else {
        json!({
            "snippet": {
                "title": "Mock Channel",
                "description": "A channel served by the test upstream",
                "thumbnails": { "medium": { "url": "http://img/m.jpg" } }
            },
            "statistics": { "subscriberCount": "50", "viewCount": "20000", "videoCount": "5" }
        })
    };
    (StatusCode::OK, Json(json!({ "items": [item] })))
}

async fn mock_playlist_items(Query(params): Params) -> impl IntoResponse {
    if let Some(err) = missing_key(&params) {
        return err;
    }
    let max: usize = params
        .get("maxResults")
        .and_then(|value| value.parse().ok())
        .unwrap_or(5);
    let items: Vec<Value> = MOCK_VIDEOS
        .iter()
        .take(max)
        .map(|(id, ..)| json!({ "snippet": { "resourceId": { "videoId": id } } }))
        .collect();
    (StatusCode::OK, Json(json!({ "items": items })))
}

async fn mock_videos(Query(params): Params) -> impl IntoResponse {
    if let Some(err) = missing_key(&params) {
        return err;
    }
    let ids = params.get("id").cloned().unwrap_or_default();
    let wanted: Vec<&str> = ids.split(',').collect();
    let items: Vec<Value> = MOCK_VIDEOS
        .iter()
        .filter(|(id, ..)| wanted.contains(id))
        .map(|(id, views, likes, duration, published)| {
            json!({
                "id": id,
                "snippet": { "title": format!("Mock {id}"), "description": "", "publishedAt": published },
                "statistics": { "viewCount": views, "likeCount": likes },
                "contentDetails": { "duration": duration }
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "items": items })))
}

async fn mock_search(Query(params): Params) -> impl IntoResponse {
    if let Some(err) = missing_key(&params) {
        return err;
    }
    let items = if params.get("q").map(String::as_str) == Some("mockchannel") {
        json!([{ "id": { "kind": "youtube#channel", "channelId": "UCfound" } }])
    } else {
        json!([])
    };
    (StatusCode::OK, Json(json!({ "items": items })))
}

async fn mock_signup(Json(body): Json<Value>) -> Json<Value> {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email.starts_with("pending") {
        return Json(json!({ "id": "user-pending", "email": email }));
    }
    Json(json!({
        "access_token": "jwt-new",
        "token_type": "bearer",
        "user": { "id": "user-new", "email": email }
    }))
}

fn invalid_grant(description: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": description })),
    )
}

fn grant(access: &str, refresh: &str, user_id: &str, email: &Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "user": { "id": user_id, "email": email }
        })),
    )
}

/// Password, refresh and PKCE grants. Accounts named `expiring..`/`revoked..` get an
/// access token the profile table already rejects.
async fn mock_token(Query(params): Params, Json(body): Json<Value>) -> impl IntoResponse {
    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            if body["password"] != "correct-horse" {
                return invalid_grant("Invalid login credentials");
            }
            let email = body["email"].as_str().unwrap_or_default();
            if email.starts_with("expiring") {
                grant("jwt-expired", "refresh-expiring", "user-expiring", &body["email"])
            } else if email.starts_with("revoked") {
                grant("jwt-expired", "refresh-revoked", "user-revoked", &body["email"])
            } else {
                grant("jwt-1", "refresh-1", "user-1", &body["email"])
            }
        }
        Some("refresh_token") => match body["refresh_token"].as_str() {
            Some("refresh-expiring" | "refresh-rotated") => {
                TOKEN_REFRESHES.fetch_add(1, Ordering::SeqCst);
                grant("jwt-fresh", "refresh-rotated", "user-expiring", &json!("expiring@example.com"))
            }
            _ => invalid_grant("Invalid Refresh Token: Refresh Token Not Found"),
        },
        Some("pkce") => {
            let verifier = body["code_verifier"].as_str().unwrap_or_default();
            if body["auth_code"] != "google-code" || verifier.len() < 43 {
                return invalid_grant("invalid flow state, no valid flow state found");
            }
            grant("jwt-google", "refresh-google", "user-google", &json!("viewer@gmail.com"))
        }
        _ => invalid_grant("unsupported_grant_type"),
    }
}

async fn mock_upsert_profile(headers: HeaderMap, Json(rows): Json<Value>) -> impl IntoResponse {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if bearer == "Bearer jwt-expired" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "code": "PGRST301", "message": "JWT expired" })),
        );
    }
    (StatusCode::CREATED, Json(rows))
}

async fn mock_save_analytics(Json(rows): Json<Value>) -> StatusCode {
    if rows[0]["insights"].is_string() {
        ANALYTICS_SAVES.fetch_add(1, Ordering::SeqCst);
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    }
}

// Harness

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("channel_dashboard_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let upstream = UPSTREAM.as_str();
    let base_url = format!("http://127.0.0.1:{port}");
    let child = Command::new(env!("CARGO_BIN_EXE_channel_dashboard"))
        .env("PORT", port.to_string())
        .env("PUBLIC_URL", &base_url)
        .env("APP_DATA_PATH", unique_data_path())
        .env("YOUTUBE_API_BASE_URL", format!("{upstream}/youtube/v3"))
        .env("YOUTUBE_API_KEY", "AIzaMockServerKey")
        .env("YOUTUBE_CHANNEL_ID", "UCmock")
        .env("SUPABASE_URL", upstream)
        .env("SUPABASE_ANON_KEY", "anon-key")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn sign_in(client: &Client, base_url: &str) -> SessionResponse {
    sign_in_as(client, base_url, "creator@example.com").await
}

async fn sign_in_as(client: &Client, base_url: &str, email: &str) -> SessionResponse {
    let response = client
        .post(format!("{base_url}/api/auth/signin"))
        .json(&json!({ "email": email, "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    response.json().await.unwrap()
}

fn no_redirects() -> Client {
    Client::builder().redirect(Policy::none()).build().unwrap()
}

/// `name=value` pairs from every `Set-Cookie` header.
fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::to_string)
        .collect()
}

fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies
        .iter()
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn insight_ids(response: &InsightsResponse) -> Vec<&str> {
    response
        .insights
        .iter()
        .filter_map(|insight| insight["id"].as_str())
        .collect()
}

// Tests

#[tokio::test]
async fn http_channel_reports_live_stats() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let channel: ChannelResponse = client
        .get(format!("{}/api/channel", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(channel.source, "live");
    assert_eq!(channel.subscribers, "50");
    assert_eq!(channel.views, "20.0K");
    assert_eq!(channel.channel.unwrap()["title"], "Mock Channel");
}

#[tokio::test]
async fn http_videos_honour_max_results() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let videos: VideosResponse = client
        .get(format!("{}/api/videos?max=3", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(videos.source, "live");
    assert_eq!(videos.videos.len(), 3);
    assert_eq!(videos.videos[0]["duration"], "3:00");

    let response = client
        .get(format!("{}/api/videos?max=0", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_insights_cover_every_heuristic() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let insights: InsightsResponse = client
        .get(format!("{}/api/insights", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(insights.source, "live");
    assert_eq!(
        insight_ids(&insights),
        vec!["growth-1", "content-1", "content-2", "engagement-1", "consistency-1"]
    );
    assert_eq!(insights.insights[3]["type"], "engagement");
    assert_eq!(insights.suggestions.len(), 4);
    assert_eq!(insights.suggestions[0]["estimated_views"], 7000);
}

#[tokio::test]
async fn http_home_page_renders_channel_and_insights() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client.get(format!("{}/", server.base_url)).send().await.unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Mock Channel"));
    assert!(html.contains("Low Subscriber Conversion"));
    assert!(!html.contains("Showing sample data"));
}

#[tokio::test]
async fn http_signin_rejects_wrong_password() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/auth/signin", server.base_url))
        .json(&json!({ "email": "creator@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Invalid login credentials");
}

#[tokio::test]
async fn http_signup_awaiting_confirmation_is_accepted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&json!({ "email": "pending@example.com", "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let response = client
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&json!({ "email": "fresh@example.com", "password": "secret-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let session: SessionResponse = response.json().await.unwrap();
    assert_eq!(session.user_id, "user-new");
}

#[tokio::test]
async fn http_session_profile_and_signout() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let session = sign_in(&client, base).await;
    assert_eq!(session.user_id, "user-1");

    let profile: ProfileView = client
        .get(format!("{base}/api/profile"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!profile.has_api_key);

    let profile: ProfileView = client
        .put(format!("{base}/api/profile"))
        .bearer_auth(&session.token)
        .json(&json!({ "youtube_api_key": "AIzaPersonalKey1", "youtube_channel_id": "UCpersonal" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(profile.has_api_key);
    assert_eq!(profile.youtube_channel_id.as_deref(), Some("UCpersonal"));

    let before = ANALYTICS_SAVES.load(Ordering::SeqCst);
    let insights: InsightsResponse = client
        .get(format!("{base}/api/insights"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(insights.source, "live");
    assert!(ANALYTICS_SAVES.load(Ordering::SeqCst) > before);

    let response = client
        .post(format!("{base}/api/auth/signout"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{base}/api/profile"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_channel_search_by_handle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let found: Value = client
        .get(format!("{}/api/channels/search?handle=@mockchannel", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["channel_id"], "UCfound");

    let missing: Value = client
        .get(format!("{}/api/channels/search?handle=nobody", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(missing["channel_id"].is_null());
}

#[tokio::test]
async fn http_theme_toggle_sets_cookie() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();

    let response = client
        .post(format!("{}/theme", server.base_url))
        .header("referer", format!("{}/videos", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/videos");
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("theme=dark"));

    let html = client
        .get(format!("{}/about", server.base_url))
        .header("cookie", "theme=dark")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"data-theme="dark""#));

    let response = client
        .post(format!("{}/theme", server.base_url))
        .form(&[("theme", "light")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(cookie_value(&set_cookies(&response), "theme").as_deref(), Some("light"));

    let html = client
        .get(format!("{}/about", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(r#"<html lang="en">"#));
    assert!(html.contains("prefers-color-scheme: dark"));
}

#[tokio::test]
async fn http_login_form_then_channel_setup_by_handle() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();
    let base = &server.base_url;

    let response = client
        .post(format!("{base}/login"))
        .form(&[("email", "creator@example.com"), ("password", "correct-horse")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
    let token = cookie_value(&set_cookies(&response), "session").expect("session cookie");
    let cookie = format!("session={token}");

    let home = client
        .get(format!("{base}/"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(home.contains("creator@example.com"));
    assert!(home.contains(r#"action="/logout""#));

    let setup = client
        .get(format!("{base}/setup"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert!(setup.status().is_success());
    assert!(setup.text().await.unwrap().contains("Connect your channel"));

    let response = client
        .post(format!("{base}/setup"))
        .header("cookie", &cookie)
        .form(&[
            ("api_key", "AIzaPersonalKey1"),
            ("channel_id", ""),
            ("channel_handle", "@mockchannel"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");

    let profile: ProfileView = client
        .get(format!("{base}/api/profile"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(profile.has_api_key);
    assert_eq!(profile.youtube_channel_id.as_deref(), Some("UCfound"));

    let response = client
        .post(format!("{base}/setup"))
        .header("cookie", &cookie)
        .form(&[
            ("api_key", "AIzaPersonalKey1"),
            ("channel_id", ""),
            ("channel_handle", "nobody"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("Could not find a channel"));

    let response = client
        .get(format!("{base}/setup"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn http_signup_form_pending_and_signed_in() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();

    let response = client
        .post(format!("{}/signup", server.base_url))
        .form(&[("email", "pending-form@example.com"), ("password", "secret-pass")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert!(response.text().await.unwrap().contains("Check your email"));

    let response = client
        .post(format!("{}/signup", server.base_url))
        .form(&[("email", "form-user@example.com"), ("password", "secret-pass")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert!(cookie_value(&set_cookies(&response), "session").is_some());
}

#[tokio::test]
async fn http_analytics_page_lists_suggestions() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/analytics", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let html = response.text().await.unwrap();
    assert!(html.contains("Top videos"));
    assert!(html.contains("Mock v1"));
    assert!(html.contains("Tutorial Series Based on Top Content"));
    assert!(html.contains("~7.0K estimated views"));
    assert!(html.contains("Q&amp;A with Your Audience"));
}

#[tokio::test]
async fn http_expired_access_token_is_refreshed_once() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let session = sign_in_as(&client, base, "expiring@example.com").await;
    let before = TOKEN_REFRESHES.load(Ordering::SeqCst);

    for channel in ["UCfirst", "UCsecond"] {
        let response = client
            .put(format!("{base}/api/profile"))
            .bearer_auth(&session.token)
            .json(&json!({ "youtube_channel_id": channel }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let profile: ProfileView = response.json().await.unwrap();
        assert_eq!(profile.youtube_channel_id.as_deref(), Some(channel));
    }

    assert_eq!(TOKEN_REFRESHES.load(Ordering::SeqCst), before + 1);
}

#[tokio::test]
async fn http_refused_refresh_drops_the_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = &server.base_url;

    let session = sign_in_as(&client, base, "revoked@example.com").await;

    let response = client
        .put(format!("{base}/api/profile"))
        .bearer_auth(&session.token)
        .json(&json!({ "youtube_channel_id": "UCany" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{base}/api/profile"))
        .bearer_auth(&session.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_google_sign_in_round_trip() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();
    let base = &server.base_url;

    let response = client.get(format!("{base}/auth/google")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    let location = Url::parse(response.headers()["location"].to_str().unwrap()).unwrap();
    assert_eq!(location.path(), "/auth/v1/authorize");
    assert!(location.as_str().starts_with(UPSTREAM.as_str()));
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(params["provider"], "google");
    assert_eq!(params["redirect_to"], format!("{base}/auth/callback"));

    let verifier = cookie_value(&set_cookies(&response), "oauth_verifier").expect("verifier cookie");
    assert_eq!(params["code_challenge"], verifier);

    let response = client
        .get(format!("{base}/auth/callback?code=google-code"))
        .header("cookie", format!("oauth_verifier={verifier}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|pair| pair == "oauth_verifier="));
    let token = cookie_value(&cookies, "session").expect("session cookie");

    let profile: Value = client
        .get(format!("{base}/api/profile"))
        .header("cookie", format!("session={token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["email"], "viewer@gmail.com");

    let response = client
        .get(format!("{base}/auth/callback?code=google-code"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("Google sign-in expired"));
}
