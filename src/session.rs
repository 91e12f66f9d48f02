use crate::auth::AuthGrant;
use crate::errors::{AppError, UpstreamError};
use crate::models::{Profile, Session};
use crate::state::AppState;
use crate::storage::persist_data;
use axum::http::{HeaderMap, header};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

pub const SESSION_COOKIE: &str = "session";
pub const THEME_COOKIE: &str = "theme";
pub const VERIFIER_COOKIE: &str = "oauth_verifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// The theme picked explicitly; `None` leaves it to the browser's colour scheme.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        match cookie(headers, THEME_COOKIE).as_deref() {
            Some("dark") => Some(Theme::Dark),
            Some("light") => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Session token from `Authorization: Bearer ..` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| cookie(headers, SESSION_COOKIE))
}

pub async fn current_session(state: &AppState, headers: &HeaderMap) -> Option<(String, Session)> {
    let token = session_token(headers)?;
    let data = state.data.lock().await;
    data.sessions
        .get(&token)
        .cloned()
        .map(|session| (token, session))
}

pub async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<(String, Session), AppError> {
    current_session(state, headers)
        .await
        .ok_or_else(|| AppError::unauthorized("sign in required"))
}

/// Stores a new session for `grant` and returns its token.
pub async fn open_session(state: &AppState, grant: AuthGrant, fallback_email: &str) -> Result<(String, Session), AppError> {
    let mut session = Session {
        email: grant
            .user
            .email
            .clone()
            .unwrap_or_else(|| fallback_email.to_string()),
        user_id: grant.user.id.clone(),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        profile: Profile {
            id: grant.user.id,
            ..Profile::default()
        },
        created_at: Utc::now().to_rfc3339(),
    };

    // A missing profile row is normal for a fresh account.
    if let Ok(Some(profile)) = state.auth()?.fetch_profile(&session).await {
        session.profile = profile;
    }

    let token = uuid::Uuid::new_v4().to_string();
    let mut data = state.data.lock().await;
    data.sessions.insert(token.clone(), session.clone());
    persist_data(&state.data_path, &data).await?;

    Ok((token, session))
}

/// Runs a backend call with the session's access token. A 401 triggers one refresh and
/// a retry; when the refresh is refused the local session is dropped.
pub async fn with_fresh_token<T, F, Fut>(
    state: &AppState,
    token: &str,
    session: Session,
    call: F,
) -> Result<(T, Session), AppError>
where
    F: Fn(Session) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    match call(session.clone()).await {
        Err(UpstreamError::Status { status: 401, .. }) => {
            let session = refresh_session(state, token, session).await?;
            let value = call(session.clone()).await?;
            Ok((value, session))
        }
        result => Ok((result?, session)),
    }
}

async fn refresh_session(state: &AppState, token: &str, mut session: Session) -> Result<Session, AppError> {
    let refreshed = match session.refresh_token.as_deref() {
        Some(refresh_token) => state.auth()?.refresh(refresh_token).await,
        None => Err(UpstreamError::Status {
            status: 401,
            message: "no refresh token".to_string(),
        }),
    };

    let grant = match refreshed {
        Ok(grant) => grant,
        Err(err) => {
            warn!(user_id = %session.user_id, "token refresh failed, dropping session: {err}");
            close_session(state, token).await?;
            return Err(AppError::unauthorized("session expired, sign in again"));
        }
    };

    session.access_token = grant.access_token;
    if grant.refresh_token.is_some() {
        session.refresh_token = grant.refresh_token;
    }

    let mut data = state.data.lock().await;
    if let Some(stored) = data.sessions.get_mut(token) {
        stored.access_token = session.access_token.clone();
        stored.refresh_token = session.refresh_token.clone();
        persist_data(&state.data_path, &data).await?;
    }
    info!(user_id = %session.user_id, "session refreshed");
    Ok(session)
}

pub async fn close_session(state: &AppState, token: &str) -> Result<Option<Session>, AppError> {
    let mut data = state.data.lock().await;
    let removed = data.sessions.remove(token);
    if removed.is_some() {
        persist_data(&state.data_path, &data).await?;
    }
    Ok(removed)
}

pub async fn store_profile(state: &AppState, token: &str, profile: Profile) -> Result<(), AppError> {
    let mut data = state.data.lock().await;
    if let Some(session) = data.sessions.get_mut(token) {
        session.profile = profile;
        persist_data(&state.data_path, &data).await?;
    }
    Ok(())
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn theme_cookie(theme: Theme) -> String {
    format!("{THEME_COOKIE}={}; Path=/; SameSite=Lax; Max-Age=31536000", theme.as_str())
}

/// Holds the PKCE verifier between the provider redirect and the callback.
pub fn verifier_cookie(verifier: &str) -> String {
    format!("{VERIFIER_COOKIE}={verifier}; Path=/auth; HttpOnly; SameSite=Lax; Max-Age=600")
}

pub fn clear_verifier_cookie() -> String {
    format!("{VERIFIER_COOKIE}=; Path=/auth; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn oauth_verifier(headers: &HeaderMap) -> Option<String> {
    cookie(headers, VERIFIER_COOKIE)
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=def"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=def"));
        assert_eq!(session_token(&headers).as_deref(), Some("def"));
        assert_eq!(Theme::from_headers(&headers), Some(Theme::Dark));
    }

    #[test]
    fn cleared_cookie_is_no_session() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert!(session_token(&headers).is_none());
        assert_eq!(Theme::from_headers(&headers), None);
    }

    #[test]
    fn verifier_cookie_reads_back() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("oauth_verifier=abc123; theme=light"));
        assert_eq!(oauth_verifier(&headers).as_deref(), Some("abc123"));
        assert_eq!(Theme::from_headers(&headers), Some(Theme::Light));
        assert!(verifier_cookie("abc123").contains("HttpOnly"));
    }
}
