use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/videos", get(handlers::videos_page))
        .route("/analytics", get(handlers::analytics_page))
        .route("/about", get(handlers::about_page))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/signup", post(handlers::signup_submit))
        .route("/logout", post(handlers::logout_submit))
        .route("/setup", get(handlers::setup_page).post(handlers::setup_submit))
        .route("/theme", post(handlers::toggle_theme))
        .route("/auth/google", get(handlers::google_sign_in))
        .route("/auth/callback", get(handlers::oauth_callback))
        .route("/api/health", get(handlers::api_health))
        .route("/api/channel", get(handlers::api_channel))
        .route("/api/videos", get(handlers::api_videos))
        .route("/api/insights", get(handlers::api_insights))
        .route("/api/analytics", get(handlers::api_analytics))
        .route("/api/auth/signup", post(handlers::api_signup))
        .route("/api/auth/signin", post(handlers::api_signin))
        .route("/api/auth/signout", post(handlers::api_signout))
        .route("/api/profile", get(handlers::api_get_profile).put(handlers::api_update_profile))
        .route("/api/channels/search", get(handlers::api_search_channel))
        .with_state(state)
}
