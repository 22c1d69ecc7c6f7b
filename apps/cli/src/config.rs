use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
/// Missing required variables fail startup with a named error.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the resume backend, e.g. http://localhost:8000
    pub api_base_url: String,
    /// Base URL of the identity provider's auth REST surface.
    pub auth_url: String,
    /// Public (anon) API key sent to the identity provider.
    pub auth_anon_key: String,
    /// OAuth redirect handled by the auth callback page.
    pub oauth_redirect_url: String,
    /// Where the persisted session (token set + user) lives on disk.
    pub session_file: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            auth_url: require_env("AUTH_URL")?,
            auth_anon_key: require_env("AUTH_ANON_KEY")?,
            oauth_redirect_url: std::env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
            session_file: std::env::var("SESSION_FILE")
                .unwrap_or_else(|_| ".cvwriter-session.json".to_string()),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
