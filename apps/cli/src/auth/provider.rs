//! Identity provider client — the single point of entry for all auth calls.
//!
//! The provider is an external OAuth/OIDC service reached over REST. This
//! client covers exactly what the rest of the app consumes: session fetch,
//! the three token grants, sign-out, and a broadcast stream of auth state
//! changes that the session store subscribes to.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use super::token::TokenSet;

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid auth URL: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("No session")]
    NoSession,
}

/// The identity the rest of the app sees. Display name comes from the
/// provider's user metadata when present, otherwise the email local part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl AuthUser {
    /// Name to greet the user with, falling back through metadata and email.
    pub fn greeting_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or("user")
            .to_string()
    }
}

/// Discrete auth state change notifications, mirroring the provider's event
/// stream. Subscribers react; they never poll.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn { user: AuthUser, tokens: TokenSet },
    SignedOut,
    TokenRefreshed { tokens: TokenSet },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    user: Option<ProviderUser>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<ProviderUser> for AuthUser {
    fn from(u: ProviderUser) -> Self {
        let display_name = u
            .user_metadata
            .get("full_name")
            .and_then(Value::as_str)
            .map(str::to_string);
        AuthUser {
            id: u.id,
            email: u.email,
            display_name,
        }
    }
}

/// REST client for the identity provider.
#[derive(Clone)]
pub struct AuthProviderClient {
    client: Client,
    auth_url: String,
    anon_key: String,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthProviderClient {
    pub fn new(auth_url: String, anon_key: String) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            client: Client::new(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            anon_key,
            events,
        }
    }

    /// Subscribe to auth state changes. Each subscriber gets every event
    /// emitted after the call; drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Builds the hosted OAuth sign-in URL the user opens in a browser.
    pub fn authorize_url(&self, provider: &str, redirect_to: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_url))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }

    /// Exchanges the code delivered to the OAuth callback for a session.
    pub async fn exchange_code(&self, code: &str) -> Result<(AuthUser, TokenSet), AuthError> {
        let body = json!({ "auth_code": code });
        let (user, tokens) = self.token_grant("pkce", &body).await?;
        let user = user.ok_or(AuthError::NoSession)?;
        let _ = self.events.send(AuthEvent::SignedIn {
            user: user.clone(),
            tokens: tokens.clone(),
        });
        Ok((user, tokens))
    }

    /// Direct email/password grant, used by the sign-in page and tests.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(AuthUser, TokenSet), AuthError> {
        let body = json!({ "email": email, "password": password });
        let (user, tokens) = self.token_grant("password", &body).await?;
        let user = user.ok_or(AuthError::NoSession)?;
        let _ = self.events.send(AuthEvent::SignedIn {
            user: user.clone(),
            tokens: tokens.clone(),
        });
        Ok((user, tokens))
    }

    /// Trades a refresh token for a fresh token set.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let body = json!({ "refresh_token": refresh_token });
        let (_, tokens) = self.token_grant("refresh_token", &body).await?;
        let _ = self.events.send(AuthEvent::TokenRefreshed {
            tokens: tokens.clone(),
        });
        Ok(tokens)
    }

    /// Fetches the user behind an access token. Used to revalidate a
    /// persisted session at startup.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        let user: ProviderUser = response.json().await?;
        Ok(user.into())
    }

    /// Revokes the session server-side and notifies subscribers. A provider
    /// failure here is logged, not surfaced: local sign-out always proceeds.
    pub async fn sign_out(&self, access_token: &str) {
        let result = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await;

        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!("Provider sign-out returned {}", resp.status());
            }
            Err(e) => warn!("Provider sign-out failed: {e}"),
            _ => debug!("Provider session revoked"),
        }

        let _ = self.events.send(AuthEvent::SignedOut);
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: &Value,
    ) -> Result<(Option<AuthUser>, TokenSet), AuthError> {
        let response = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        let token_response: TokenResponse = response.json().await?;
        let tokens = TokenSet::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
        );
        Ok((token_response.user.map(AuthUser::from), tokens))
    }
}

/// Pulls the human-readable message out of a provider error body. The
/// provider is inconsistent about the field name, so try each in turn.
fn provider_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "error", "message"]
                .iter()
                .find_map(|k| v.get(k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string());
    AuthError::Provider { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_provider_and_redirect() {
        let client = AuthProviderClient::new("https://id.example.com/auth/v1".into(), "anon".into());
        let url = client
            .authorize_url("google", "http://localhost:3000/auth/callback")
            .unwrap();
        assert_eq!(url.path(), "/auth/v1/authorize");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("provider".into(), "google".into())));
        assert!(query.contains(&(
            "redirect_to".into(),
            "http://localhost:3000/auth/callback".into()
        )));
    }

    #[test]
    fn test_provider_error_prefers_error_description() {
        let err = provider_error(400, r#"{"error":"invalid_grant","error_description":"bad code"}"#);
        match err {
            AuthError::Provider { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad code");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_provider_error_falls_back_to_raw_body() {
        let err = provider_error(502, "upstream exploded");
        match err {
            AuthError::Provider { message, .. } => assert_eq!(message, "upstream exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_greeting_name_prefers_display_name() {
        let user = AuthUser {
            id: "u1".into(),
            email: Some("ada@example.com".into()),
            display_name: Some("Ada Lovelace".into()),
        };
        assert_eq!(user.greeting_name(), "Ada Lovelace");
    }

    #[test]
    fn test_greeting_name_falls_back_to_email_local_part() {
        let user = AuthUser {
            id: "u1".into(),
            email: Some("ada@example.com".into()),
            display_name: None,
        };
        assert_eq!(user.greeting_name(), "ada");
    }

    #[test]
    fn test_provider_user_maps_metadata_full_name() {
        let raw = r#"{"id":"u1","email":"ada@example.com","user_metadata":{"full_name":"Ada"}}"#;
        let user: ProviderUser = serde_json::from_str(raw).unwrap();
        let user: AuthUser = user.into();
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
    }

    mod http {
        use serde_json::json;
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::super::*;

        fn token_body() -> serde_json::Value {
            json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {
                    "id": "u1",
                    "email": "ada@example.com",
                    "user_metadata": {"full_name": "Ada Lovelace"}
                }
            })
        }

        #[tokio::test]
        async fn test_password_grant_returns_session_and_emits_signed_in() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(query_param("grant_type", "password"))
                .and(header("apikey", "anon"))
                .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
                .expect(1)
                .mount(&server)
                .await;

            let client = AuthProviderClient::new(server.uri(), "anon".into());
            let mut events = client.subscribe();

            let (user, tokens) = client
                .sign_in_with_password("ada@example.com", "pw")
                .await
                .unwrap();
            assert_eq!(user.display_name.as_deref(), Some("Ada Lovelace"));
            assert_eq!(tokens.access_token, "at-1");
            assert!(!tokens.is_expired(60));

            match events.recv().await.unwrap() {
                AuthEvent::SignedIn { user, .. } => assert_eq!(user.id, "u1"),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_refresh_emits_token_refreshed() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(query_param("grant_type", "refresh_token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
                .mount(&server)
                .await;

            let client = AuthProviderClient::new(server.uri(), "anon".into());
            let mut events = client.subscribe();

            let tokens = client.refresh("rt-0").await.unwrap();
            assert_eq!(tokens.access_token, "at-1");

            match events.recv().await.unwrap() {
                AuthEvent::TokenRefreshed { tokens } => assert_eq!(tokens.access_token, "at-1"),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_bad_credentials_surface_provider_message() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })))
                .mount(&server)
                .await;

            let client = AuthProviderClient::new(server.uri(), "anon".into());
            match client.sign_in_with_password("ada@example.com", "wrong").await {
                Err(AuthError::Provider { status, message }) => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "Invalid login credentials");
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_sign_out_emits_signed_out_even_on_provider_failure() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/logout"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let client = AuthProviderClient::new(server.uri(), "anon".into());
            let mut events = client.subscribe();
            client.sign_out("at-1").await;

            assert!(matches!(events.recv().await.unwrap(), AuthEvent::SignedOut));
        }
    }
}
