pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod format;
pub mod handlers;
pub mod insights;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod ui;
pub mod youtube;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_data;
