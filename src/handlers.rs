use crate::auth::SignUpOutcome;
use crate::dashboard::{self, load_channel, load_snapshot, resolve_credentials};
use crate::errors::AppError;
use crate::format::format_number;
use crate::insights::{generate_content_suggestions, summarize};
use crate::models::{
    ChannelResponse, HealthResponse, InsightsResponse, OAuthCallback, ProfileUpdate, ProfileView,
    SearchQuery, SearchResponse, Session, SessionResponse, SetupForm, SignInRequest, ThemeChoice,
    VideosQuery, VideosResponse,
};
use crate::session::{
    self, Theme, clear_session_cookie, clear_verifier_cookie, current_session, require_session,
    session_cookie, theme_cookie, verifier_cookie, with_fresh_token,
};
use crate::state::AppState;
use crate::ui::{self, PageContext, Screen};
use crate::youtube::fallback_channel_stats;
use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use uuid::Uuid;
use tracing::{info, warn};

// Screens

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let current = current_session(&state, &headers).await;
    let session = current.as_ref().map(|(_, s)| s.clone());
    let snapshot = load_snapshot(&state, session.as_ref()).await;
    let signed_in = current.as_ref().map(|(token, s)| (token.as_str(), s));
    let insights = dashboard::analyze(&state, signed_in, &snapshot).await;
    let ctx = page_context(&state, &headers, session.as_ref(), Screen::Home);
    Html(ui::render_home(&ctx, &snapshot, &insights))
}

pub async fn videos_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let snapshot = load_snapshot(&state, session.as_ref()).await;
    let ctx = page_context(&state, &headers, session.as_ref(), Screen::Videos);
    Html(ui::render_videos(&ctx, &snapshot))
}

pub async fn analytics_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let snapshot = load_snapshot(&state, session.as_ref()).await;
    let channel = snapshot.channel.clone().unwrap_or_else(fallback_channel_stats);
    let overview = summarize(&channel, &snapshot.videos);
    let suggestions = generate_content_suggestions(&channel, &snapshot.videos);
    let ctx = page_context(&state, &headers, session.as_ref(), Screen::Analytics);
    Html(ui::render_analytics(&ctx, &snapshot, &overview, &suggestions))
}

pub async fn about_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let snapshot = load_channel(&state, session.as_ref()).await;
    let ctx = page_context(&state, &headers, session.as_ref(), Screen::About);
    Html(ui::render_about(&ctx, &snapshot))
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_session(&state, &headers).await.is_some() {
        return Redirect::to("/").into_response();
    }
    let ctx = page_context(&state, &headers, None, Screen::Account);
    Html(ui::render_login(&ctx, None)).into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignInRequest>,
) -> Response {
    match sign_in(&state, &form).await {
        Ok((token, _)) => signed_in_redirect(&token),
        Err(err) => login_error(&state, &headers, err),
    }
}

pub async fn signup_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignInRequest>,
) -> Response {
    match sign_up(&state, &form).await {
        Ok(Some((token, _))) => signed_in_redirect(&token),
        Ok(None) => {
            let ctx = page_context(&state, &headers, None, Screen::Account);
            Html(ui::render_login(
                &ctx,
                Some("Account created. Check your email to confirm it, then sign in."),
            ))
            .into_response()
        }
        Err(err) => login_error(&state, &headers, err),
    }
}

pub async fn logout_submit(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    sign_out(&state, &headers).await?;
    Ok(([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response())
}

pub async fn setup_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some((_, session)) = current_session(&state, &headers).await else {
        return Redirect::to("/login").into_response();
    };
    let ctx = page_context(&state, &headers, Some(&session), Screen::Account);
    Html(ui::render_setup(
        &ctx,
        None,
        session.profile.youtube_channel_id.as_deref(),
    ))
    .into_response()
}

pub async fn setup_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SetupForm>,
) -> Response {
    let Some((token, session)) = current_session(&state, &headers).await else {
        return Redirect::to("/login").into_response();
    };

    match apply_setup(&state, &token, &session, &form).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => {
            let ctx = page_context(&state, &headers, Some(&session), Screen::Account);
            let channel_id = Some(form.channel_id.as_str()).filter(|id| !id.is_empty());
            (
                err.status,
                Html(ui::render_setup(&ctx, Some(&err.message), channel_id)),
            )
                .into_response()
        }
    }
}

/// Sets the theme the form asked for, or flips the current cookie.
pub async fn toggle_theme(headers: HeaderMap, choice: Option<Form<ThemeChoice>>) -> Response {
    let theme = choice
        .and_then(|Form(choice)| choice.theme)
        .or_else(|| Theme::from_headers(&headers).map(Theme::toggled))
        .unwrap_or(Theme::Dark);
    let back = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(local_path)
        .unwrap_or("/")
        .to_string();
    ([(header::SET_COOKIE, theme_cookie(theme))], Redirect::to(&back)).into_response()
}

/// Starts a Google sign-in through the auth backend (PKCE, verifier kept in a cookie).
pub async fn google_sign_in(State(state): State<AppState>) -> Result<Response, AppError> {
    let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let redirect_to = format!("{}/auth/callback", state.config.public_url);
    let url = state.auth()?.authorize_url("google", &redirect_to, &verifier)?;
    Ok(([(header::SET_COOKIE, verifier_cookie(&verifier))], Redirect::to(&url)).into_response())
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(callback): Query<OAuthCallback>,
) -> Response {
    match provider_session(&state, &headers, callback).await {
        Ok((token, _)) => (
            AppendHeaders([
                (header::SET_COOKIE, session_cookie(&token)),
                (header::SET_COOKIE, clear_verifier_cookie()),
            ]),
            Redirect::to("/"),
        )
            .into_response(),
        Err(err) => login_error(&state, &headers, err),
    }
}

// JSON API

pub async fn api_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let creds = resolve_credentials(&state, None);
    Json(HealthResponse {
        status: "ok".to_string(),
        auth_enabled: state.supabase.is_some(),
        youtube_configured: creds.is_configured(),
    })
}

pub async fn api_channel(State(state): State<AppState>, headers: HeaderMap) -> Json<ChannelResponse> {
    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let creds = resolve_credentials(&state, session.as_ref());
    let stats = state.youtube.channel_stats(&creds).await;

    let (subscribers, views, videos) = match stats.value.as_ref() {
        Some(channel) => (
            format_number(&channel.subscriber_count),
            format_number(&channel.view_count),
            format_number(&channel.video_count),
        ),
        None => ("0".to_string(), "0".to_string(), "0".to_string()),
    };

    Json(ChannelResponse {
        source: stats.source,
        channel: stats.value,
        subscribers,
        views,
        videos,
    })
}

pub async fn api_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<VideosQuery>,
) -> Result<Json<VideosResponse>, AppError> {
    let max = query.max.unwrap_or(state.config.video_fetch_limit);
    if !(1..=50).contains(&max) {
        return Err(AppError::bad_request("max must be between 1 and 50"));
    }

    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let creds = resolve_credentials(&state, session.as_ref());
    let videos = state.youtube.channel_videos(&creds, max).await;

    Ok(Json(VideosResponse {
        source: videos.source,
        videos: videos.value,
    }))
}

pub async fn api_insights(State(state): State<AppState>, headers: HeaderMap) -> Json<InsightsResponse> {
    let current = current_session(&state, &headers).await;
    let session = current.as_ref().map(|(_, s)| s.clone());
    let snapshot = load_snapshot(&state, session.as_ref()).await;
    let signed_in = current.as_ref().map(|(token, s)| (token.as_str(), s));
    let insights = dashboard::analyze(&state, signed_in, &snapshot).await;
    let suggestions = snapshot
        .channel
        .as_ref()
        .map(|channel| generate_content_suggestions(channel, &snapshot.videos))
        .unwrap_or_default();

    Json(InsightsResponse {
        source: snapshot.source,
        insights,
        suggestions,
    })
}

pub async fn api_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<crate::models::AnalyticsOverview> {
    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let snapshot = load_snapshot(&state, session.as_ref()).await;
    let channel = snapshot.channel.clone().unwrap_or_else(fallback_channel_stats);
    Json(summarize(&channel, &snapshot.videos))
}

pub async fn api_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Response, AppError> {
    match sign_up(&state, &payload).await? {
        Some((token, session)) => Ok((StatusCode::CREATED, Json(session_response(token, &session))).into_response()),
        None => Ok((
            StatusCode::ACCEPTED,
            "account created; confirm the email address before signing in",
        )
            .into_response()),
    }
}

pub async fn api_signin(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let (token, session) = sign_in(&state, &payload).await?;
    Ok(Json(session_response(token, &session)))
}

pub async fn api_signout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    sign_out(&state, &headers).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileView>, AppError> {
    let (_, session) = require_session(&state, &headers).await?;
    Ok(Json(ProfileView::from_session(&session)))
}

pub async fn api_update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileView>, AppError> {
    let (token, session) = require_session(&state, &headers).await?;
    if update.youtube_api_key.is_none() && update.youtube_channel_id.is_none() {
        return Err(AppError::bad_request(
            "provide youtube_api_key and/or youtube_channel_id",
        ));
    }

    let session = save_profile(&state, &token, session, &update).await?;
    Ok(Json(ProfileView::from_session(&session)))
}

pub async fn api_search_channel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    if query.handle.trim().trim_start_matches('@').is_empty() {
        return Err(AppError::bad_request("handle must not be empty"));
    }

    let session = current_session(&state, &headers).await.map(|(_, s)| s);
    let api_key = session
        .as_ref()
        .and_then(|s| s.profile.youtube_api_key.clone())
        .filter(|key| !key.trim().is_empty())
        .unwrap_or_else(|| state.config.default_api_key.clone());
    if api_key == crate::config::PLACEHOLDER_API_KEY {
        return Err(AppError::bad_request("no YouTube API key configured"));
    }

    let channel_id = state
        .youtube
        .search_channel_by_handle(&api_key, &query.handle)
        .await?;
    Ok(Json(SearchResponse { channel_id }))
}

// Shared flows

async fn sign_in(state: &AppState, request: &SignInRequest) -> Result<(String, Session), AppError> {
    let email = validate_credentials(request)?;
    let grant = state.auth()?.sign_in(email, &request.password).await?;
    session::open_session(state, grant, email).await
}

/// `None` when the backend wants the address confirmed first.
async fn sign_up(state: &AppState, request: &SignInRequest) -> Result<Option<(String, Session)>, AppError> {
    let email = validate_credentials(request)?;
    match state.auth()?.sign_up(email, &request.password).await? {
        SignUpOutcome::SignedIn(grant) => Ok(Some(session::open_session(state, grant, email).await?)),
        SignUpOutcome::ConfirmationRequired(user) => {
            info!(user_id = %user.id, "sign-up awaiting email confirmation");
            Ok(None)
        }
    }
}

async fn provider_session(
    state: &AppState,
    headers: &HeaderMap,
    callback: OAuthCallback,
) -> Result<(String, Session), AppError> {
    if let Some(reason) = callback.error_description.or(callback.error) {
        return Err(AppError::bad_request(format!("Google sign-in failed: {reason}")));
    }
    let code = callback
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::bad_request("Google sign-in returned no code"))?;
    let verifier = session::oauth_verifier(headers)
        .ok_or_else(|| AppError::bad_request("Google sign-in expired, please try again"))?;

    let grant = state.auth()?.exchange_code(&code, &verifier).await?;
    session::open_session(state, grant, "").await
}

async fn sign_out(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(token) = session::session_token(headers) else {
        return Ok(());
    };
    let Some(session) = session::close_session(state, &token).await? else {
        return Ok(());
    };

    // Local session is already removed; upstream failure is only logged.
    if let Some(supabase) = state.supabase.as_ref() {
        if let Err(err) = supabase.sign_out(&session.access_token).await {
            warn!(user_id = %session.user_id, "upstream sign-out failed: {err}");
        }
    }
    info!(user_id = %session.user_id, "signed out");
    Ok(())
}

async fn apply_setup(state: &AppState, token: &str, session: &Session, form: &SetupForm) -> Result<(), AppError> {
    let api_key = form.api_key.trim();
    if api_key.is_empty() {
        return Err(AppError::bad_request("Please enter your YouTube API key"));
    }

    let channel_id = match (form.channel_id.trim(), form.channel_handle.trim()) {
        (id, _) if !id.is_empty() => id.to_string(),
        (_, handle) if !handle.is_empty() => state
            .youtube
            .search_channel_by_handle(api_key, handle)
            .await?
            .ok_or_else(|| {
                AppError::bad_request("Could not find a channel with that handle. Please try a different search term.")
            })?,
        _ => return Err(AppError::bad_request("Please enter a channel id or handle")),
    };

    let update = ProfileUpdate {
        youtube_api_key: Some(api_key.to_string()),
        youtube_channel_id: Some(channel_id),
    };
    save_profile(state, token, session.clone(), &update).await?;
    Ok(())
}

async fn save_profile(
    state: &AppState,
    token: &str,
    session: Session,
    update: &ProfileUpdate,
) -> Result<Session, AppError> {
    let supabase = state.auth()?;
    let (profile, mut session) = with_fresh_token(state, token, session, |session| async move {
        supabase.update_profile(&session, update).await
    })
    .await?;
    info!(
        user_id = %session.user_id,
        channel_id = profile.youtube_channel_id.as_deref().unwrap_or(""),
        "profile updated"
    );
    session::store_profile(state, token, profile.clone()).await?;
    session.profile = profile;
    Ok(session)
}

fn validate_credentials(request: &SignInRequest) -> Result<&str, AppError> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    if request.password.len() < 6 {
        return Err(AppError::bad_request("password must be at least 6 characters"));
    }
    Ok(email)
}

fn session_response(token: String, session: &Session) -> SessionResponse {
    SessionResponse {
        token,
        user_id: session.user_id.clone(),
        email: session.email.clone(),
    }
}

fn signed_in_redirect(token: &str) -> Response {
    ([(header::SET_COOKIE, session_cookie(token))], Redirect::to("/")).into_response()
}

fn login_error(state: &AppState, headers: &HeaderMap, err: AppError) -> Response {
    let ctx = page_context(state, headers, None, Screen::Account);
    (err.status, Html(ui::render_login(&ctx, Some(&err.message)))).into_response()
}

fn page_context(state: &AppState, headers: &HeaderMap, session: Option<&Session>, screen: Screen) -> PageContext {
    PageContext {
        theme: Theme::from_headers(headers),
        email: session.map(|s| s.email.clone()),
        auth_enabled: state.supabase.is_some(),
        screen,
    }
}

/// Path component of a same-site referer, so the theme toggle never redirects off-site.
fn local_path(referer: &str) -> Option<&str> {
    let after_scheme = referer.split_once("://").map(|(_, rest)| rest)?;
    let path = &after_scheme[after_scheme.find('/')?..];
    if path.starts_with("//") {
        return None;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referer_path_is_kept_local() {
        assert_eq!(local_path("http://localhost:8080/videos"), Some("/videos"));
        assert_eq!(local_path("http://localhost:8080"), None);
        assert_eq!(local_path("/relative"), None);
    }

    #[test]
    fn credentials_are_validated() {
        let ok = SignInRequest {
            email: " user@example.com ".to_string(),
            password: "secret1".to_string(),
        };
        assert_eq!(validate_credentials(&ok).unwrap(), "user@example.com");

        let short = SignInRequest {
            email: "user@example.com".to_string(),
            password: "123".to_string(),
        };
        assert_eq!(validate_credentials(&short).unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
