//! Client for the hosted auth and table storage backend (Supabase: GoTrue + PostgREST).

use crate::config::SupabaseConfig;
use crate::errors::UpstreamError;
use crate::models::{Insight, Profile, ProfileUpdate, Session};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::info;

const GOOGLE_SCOPES: &str = "https://www.googleapis.com/auth/youtube.readonly";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token grant returned by sign-in and (when confirmation is off) sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Grant(AuthGrant),
    Pending(AuthUser),
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct PasswordBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct PkceBody<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
struct ProfileRow<'a> {
    id: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_api_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_channel_id: Option<&'a str>,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct AnalyticsRow<'a> {
    user_id: &'a str,
    channel_id: &'a str,
    insights: String,
    analyzed_at: String,
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    url: String,
    anon_key: String,
}

/// Outcome of a sign-up: either signed in straight away or waiting on email confirmation.
#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(AuthGrant),
    ConfirmationRequired(AuthUser),
}

impl SupabaseClient {
    pub fn new(http: Client, config: &SupabaseConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, UpstreamError> {
        let request = self
            .http
            .post(format!("{}/auth/v1/signup", self.url))
            .json(&PasswordBody { email, password });
        let response: SignUpResponse = self.send_json(self.public(request)).await?;

        info!(email, "account created");
        Ok(match response {
            SignUpResponse::Grant(grant) => SignUpOutcome::SignedIn(grant),
            SignUpResponse::Pending(user) => SignUpOutcome::ConfirmationRequired(user),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthGrant, UpstreamError> {
        let request = self
            .http
            .post(format!("{}/auth/v1/token", self.url))
            .query(&[("grant_type", "password")])
            .json(&PasswordBody { email, password });
        let grant: AuthGrant = self.send_json(self.public(request)).await?;

        info!(user_id = %grant.user.id, "signed in");
        Ok(grant)
    }

    /// Trades a refresh token for a new grant. The backend rotates the refresh token too.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthGrant, UpstreamError> {
        let request = self
            .http
            .post(format!("{}/auth/v1/token", self.url))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshBody { refresh_token });
        let grant: AuthGrant = self.send_json(self.public(request)).await?;

        info!(user_id = %grant.user.id, "access token refreshed");
        Ok(grant)
    }

    /// Where to send the browser for a provider sign-in. The backend comes back to
    /// `redirect_to` with `?code=..`, redeemed by [`SupabaseClient::exchange_code`].
    pub fn authorize_url(&self, provider: &str, redirect_to: &str, verifier: &str) -> Result<String, UpstreamError> {
        let mut params = vec![
            ("provider", provider),
            ("redirect_to", redirect_to),
            ("code_challenge", verifier),
            ("code_challenge_method", "plain"),
        ];
        if provider == "google" {
            params.push(("scopes", GOOGLE_SCOPES));
        }
        let url = Url::parse_with_params(&format!("{}/auth/v1/authorize", self.url), &params)
            .map_err(|err| UpstreamError::Decode(err.to_string()))?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<AuthGrant, UpstreamError> {
        let request = self
            .http
            .post(format!("{}/auth/v1/token", self.url))
            .query(&[("grant_type", "pkce")])
            .json(&PkceBody { auth_code, code_verifier });
        let grant: AuthGrant = self.send_json(self.public(request)).await?;

        info!(user_id = %grant.user.id, "signed in with provider");
        Ok(grant)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), UpstreamError> {
        let request = self.http.post(format!("{}/auth/v1/logout", self.url));
        check(self.authorized(request, access_token).send().await?).await?;
        Ok(())
    }

    /// The user's profile row, if one has been created.
    pub async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, UpstreamError> {
        let request = self
            .http
            .get(format!("{}/rest/v1/profiles", self.url))
            .query(&[("id", format!("eq.{}", session.user_id)), ("select", "*".to_string())]);
        let rows: Vec<Profile> = self
            .send_json(self.authorized(request, &session.access_token))
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn update_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<Profile, UpstreamError> {
        let row = ProfileRow {
            id: &session.user_id,
            email: &session.email,
            youtube_api_key: update.youtube_api_key.as_deref(),
            youtube_channel_id: update.youtube_channel_id.as_deref(),
            updated_at: Utc::now().to_rfc3339(),
        };
        let request = self
            .http
            .post(format!("{}/rest/v1/profiles", self.url))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row]);
        let rows: Vec<Profile> = self
            .send_json(self.authorized(request, &session.access_token))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Decode("profile upsert returned no rows".to_string()))
    }

    /// Records an analysis run in `channel_analytics`.
    pub async fn save_analytics(
        &self,
        session: &Session,
        channel_id: &str,
        insights: &[Insight],
    ) -> Result<(), UpstreamError> {
        let row = AnalyticsRow {
            user_id: &session.user_id,
            channel_id,
            insights: serde_json::to_string(insights)
                .map_err(|err| UpstreamError::Decode(err.to_string()))?,
            analyzed_at: Utc::now().to_rfc3339(),
        };
        let request = self
            .http
            .post(format!("{}/rest/v1/channel_analytics", self.url))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row]);
        check(self.authorized(request, &session.access_token).send().await?).await?;
        Ok(())
    }

    fn public(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        self.public(request).bearer_auth(access_token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, UpstreamError> {
        let response = check(request.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| UpstreamError::Decode(err.to_string()))
    }
}

async fn check(response: Response) -> Result<Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AuthErrorBody>(&body)
        .ok()
        .and_then(|err| err.error_description.or(err.msg).or(err.message))
        .unwrap_or(body);
    Err(UpstreamError::Status {
        status: status.as_u16(),
        message,
    })
}
