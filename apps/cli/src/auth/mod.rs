//! Session store — single source of truth for "is there an authenticated
//! user", refreshed reactively from the identity provider's event stream.
//!
//! Lifecycle: `initialize()` on startup loads any persisted session and
//! spawns the event listener; `shutdown()` tears the listener down. Provider
//! failures during initialization degrade to an anonymous session, never a
//! crash.

pub mod provider;
pub mod token;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiError, TokenProvider};
use provider::{AuthError, AuthEvent, AuthProviderClient, AuthUser};
use token::TokenSet;

/// Refresh the access token when it is within this many seconds of expiry.
const REFRESH_THRESHOLD_SECONDS: i64 = 60;

#[derive(Debug, Default)]
struct SessionInner {
    user: Option<AuthUser>,
    tokens: Option<TokenSet>,
    initialized: bool,
    needs_profile_upload: bool,
}

/// On-disk shape of a persisted session.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    user: AuthUser,
    tokens: TokenSet,
}

pub struct SessionStore {
    provider: AuthProviderClient,
    inner: Arc<RwLock<SessionInner>>,
    session_file: PathBuf,
    api_base_url: String,
    http: reqwest::Client,
    listener: StdMutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(provider: AuthProviderClient, api_base_url: String, session_file: PathBuf) -> Self {
        Self {
            provider,
            inner: Arc::new(RwLock::new(SessionInner::default())),
            session_file,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            listener: StdMutex::new(None),
        }
    }

    /// Loads any persisted session, then subscribes to provider state-change
    /// events. Errors here are logged and leave the store anonymous.
    pub async fn initialize(&self) {
        match self.restore_persisted_session().await {
            Ok(Some(user)) => info!("Session restored for {}", user.greeting_name()),
            Ok(None) => debug!("No persisted session; starting anonymous"),
            Err(e) => warn!("Error initializing session, continuing anonymous: {e}"),
        }

        // If a user came back from disk, run the profile existence check the
        // same way a fresh sign-in would.
        let signed_in = {
            let inner = self.inner.read().await;
            inner.user.is_some().then(|| inner.tokens.clone()).flatten()
        };
        if let Some(tokens) = signed_in {
            let needs =
                profile_upload_needed(&self.http, &self.api_base_url, &tokens.access_token).await;
            self.inner.write().await.needs_profile_upload = needs;
        }

        self.spawn_listener();
        self.inner.write().await.initialized = true;
    }

    /// Provider sign-out, then reset to anonymous. The persisted session is
    /// removed regardless of whether the provider call succeeded.
    pub async fn sign_out(&self) {
        let token = self.inner.read().await.tokens.clone();
        if let Some(tokens) = token {
            self.provider.sign_out(&tokens.access_token).await;
        }
        self.clear_session().await;
    }

    /// Stops the event listener. Call on app teardown.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().ok().and_then(|mut l| l.take()) {
            handle.abort();
        }
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.inner.read().await.user.clone()
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.read().await.initialized
    }

    pub async fn needs_profile_upload(&self) -> bool {
        self.inner.read().await.needs_profile_upload
    }

    /// Flips the needs-upload flag after a successful upload or skip.
    pub async fn set_needs_profile_upload(&self, needs: bool) {
        self.inner.write().await.needs_profile_upload = needs;
    }

    /// Installs a session directly (sign-in page, tests). Persists it and
    /// runs the profile existence check.
    pub async fn accept_session(&self, user: AuthUser, tokens: TokenSet) {
        {
            let mut inner = self.inner.write().await;
            inner.user = Some(user.clone());
            inner.tokens = Some(tokens.clone());
        }
        self.persist(&user, &tokens);
        let needs =
            profile_upload_needed(&self.http, &self.api_base_url, &tokens.access_token).await;
        self.inner.write().await.needs_profile_upload = needs;
    }

    pub fn provider(&self) -> &AuthProviderClient {
        &self.provider
    }

    async fn restore_persisted_session(&self) -> Result<Option<AuthUser>, AuthError> {
        let raw = match std::fs::read_to_string(&self.session_file) {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        };
        let persisted: PersistedSession = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("Persisted session unreadable, discarding: {e}");
                let _ = std::fs::remove_file(&self.session_file);
                return Ok(None);
            }
        };

        let mut tokens = persisted.tokens;
        if tokens.is_expired(REFRESH_THRESHOLD_SECONDS) {
            let Some(refresh_token) = tokens.refresh_token.clone() else {
                let _ = std::fs::remove_file(&self.session_file);
                return Ok(None);
            };
            tokens = self.provider.refresh(&refresh_token).await?;
            self.persist(&persisted.user, &tokens);
        }

        let mut inner = self.inner.write().await;
        inner.user = Some(persisted.user.clone());
        inner.tokens = Some(tokens);
        Ok(Some(persisted.user))
    }

    fn spawn_listener(&self) {
        let mut events = self.provider.subscribe();
        let inner = Arc::clone(&self.inner);
        let session_file = self.session_file.clone();
        let api_base_url = self.api_base_url.clone();
        let http = self.http.clone();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn { user, tokens }) => {
                        debug!("Auth event: signed in as {}", user.greeting_name());
                        let needs =
                            profile_upload_needed(&http, &api_base_url, &tokens.access_token).await;
                        let mut guard = inner.write().await;
                        guard.user = Some(user.clone());
                        guard.tokens = Some(tokens.clone());
                        guard.needs_profile_upload = needs;
                        drop(guard);
                        write_session_file(&session_file, &user, &tokens);
                    }
                    Ok(AuthEvent::TokenRefreshed { tokens }) => {
                        let mut guard = inner.write().await;
                        guard.tokens = Some(tokens.clone());
                        let user = guard.user.clone();
                        drop(guard);
                        if let Some(user) = user {
                            write_session_file(&session_file, &user, &tokens);
                        }
                    }
                    Ok(AuthEvent::SignedOut) => {
                        debug!("Auth event: signed out");
                        let mut guard = inner.write().await;
                        guard.user = None;
                        guard.tokens = None;
                        guard.needs_profile_upload = false;
                        drop(guard);
                        let _ = std::fs::remove_file(&session_file);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Auth event listener lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut listener) = self.listener.lock() {
            *listener = Some(handle);
        }
    }

    async fn clear_session(&self) {
        let mut inner = self.inner.write().await;
        inner.user = None;
        inner.tokens = None;
        inner.needs_profile_upload = false;
        drop(inner);
        let _ = std::fs::remove_file(&self.session_file);
    }

    fn persist(&self, user: &AuthUser, tokens: &TokenSet) {
        write_session_file(&self.session_file, user, tokens);
    }
}

#[async_trait]
impl TokenProvider for SessionStore {
    /// Re-reads the current token on every call, never cached by callers,
    /// refreshing through the provider when near expiry.
    async fn access_token(&self) -> Result<String, ApiError> {
        let tokens = self
            .inner
            .read()
            .await
            .tokens
            .clone()
            .ok_or(ApiError::NotAuthenticated)?;

        if !tokens.is_expired(REFRESH_THRESHOLD_SECONDS) {
            return Ok(tokens.access_token);
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(ApiError::NotAuthenticated);
        };
        match self.provider.refresh(&refresh_token).await {
            Ok(fresh) => {
                let access = fresh.access_token.clone();
                self.inner.write().await.tokens = Some(fresh);
                Ok(access)
            }
            Err(e) => {
                warn!("Token refresh failed: {e}");
                Err(ApiError::NotAuthenticated)
            }
        }
    }
}

/// The derived needs-profile-upload check: 404 means a signed-in user with no
/// stored profile yet; any failure is treated the same way (fail-safe toward
/// asking for an upload).
async fn profile_upload_needed(http: &reqwest::Client, api_base_url: &str, token: &str) -> bool {
    let result = http
        .get(format!("{api_base_url}/profile"))
        .bearer_auth(token)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
            debug!("No profile found; upload needed");
            true
        }
        Ok(resp) if resp.status().is_success() => false,
        Ok(resp) => {
            warn!("Profile check returned {}, assuming upload needed", resp.status());
            true
        }
        Err(e) => {
            warn!("Profile check failed, assuming upload needed: {e}");
            true
        }
    }
}

fn write_session_file(path: &PathBuf, user: &AuthUser, tokens: &TokenSet) {
    let persisted = PersistedSession {
        user: user.clone(),
        tokens: tokens.clone(),
    };
    match serde_json::to_string_pretty(&persisted) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                warn!("Failed to persist session: {e}");
            }
        }
        Err(e) => warn!("Failed to serialize session: {e}"),
    }
}
