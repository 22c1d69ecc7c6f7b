//! Backend API client.
//!
//! Thin wrapper over reqwest: attaches a bearer token obtained fresh per
//! call from the session store, and surfaces non-2xx responses as typed
//! failures carrying the backend's `detail` message. No retry or backoff;
//! every caller owns its own pending/error/success handling.

pub mod completion;
pub mod profile;
pub mod resumes;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart::Form, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error (status {status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error("Malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Message shown to the user. Backend 4xx surface the server's `detail`
    /// verbatim; 5xx and transport failures collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotAuthenticated => "Not authenticated".to_string(),
            ApiError::Backend { status, detail } if *status < 500 => detail.clone(),
            ApiError::Backend { .. } => "The server encountered an error. Please try again.".to_string(),
            ApiError::Http(_) => "Network error. Please check your connection and try again.".to_string(),
            ApiError::Decode(_) => "The server returned an unexpected response.".to_string(),
        }
    }
}

/// Seam through which the client fetches a bearer token for each request.
/// Implemented by the session store; tests substitute a fixed token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// A provider handing out one fixed token, for one-off clients and tests.
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth: Option<Arc<dyn TokenProvider>>,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: Some(auth),
        }
    }

    /// Client for the no-auth generator path: no Authorization header at all.
    pub fn anonymous(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: None,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.authed(self.http.get(self.url(path))).await?;
        decode_json(request.send().await?).await
    }

    /// GET where 404 is a valid "not there" answer rather than an error.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let request = self.authed(self.http.get(self.url(path))).await?;
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_json(response).await.map(Some)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authed(self.http.post(self.url(path))).await?;
        decode_json(request.json(body).send().await?).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let request = self.authed(self.http.post(self.url(path))).await?;
        decode_json(request.multipart(form).send().await?).await
    }

    /// Multipart POST returning a raw binary body (the PDF endpoints).
    pub async fn post_multipart_bytes(&self, path: &str, form: Form) -> Result<Bytes, ApiError> {
        let request = self.authed(self.http.post(self.url(path))).await?;
        let response = request.multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &body));
        }
        Ok(response.bytes().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Token fetched here, per request, so a refresh between calls is always
    // picked up.
    async fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match &self.auth {
            Some(provider) => {
                let token = provider.access_token().await?;
                Ok(request.bearer_auth(token))
            }
            None => Ok(request),
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(backend_error(status, &body));
    }
    debug!("Backend responded {status}");
    Ok(response.json().await?)
}

/// Maps a non-2xx response to `ApiError::Backend`, pulling the FastAPI-style
/// `{detail}` message out of the body when present.
fn backend_error(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.to_string()
            }
        });
    ApiError::Backend {
        status: status.as_u16(),
        detail,
    }
}

/// Writes a downloaded blob to disk, the terminal analogue of handing the
/// browser a transient download link.
pub fn save_download(bytes: &Bytes, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_extracts_detail() {
        let err = backend_error(StatusCode::TOO_MANY_REQUESTS, r#"{"detail":"quota exceeded"}"#);
        match err {
            ApiError::Backend { status, detail } => {
                assert_eq!(status, 429);
                assert_eq!(detail, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_backend_error_falls_back_to_body_then_reason() {
        match backend_error(StatusCode::BAD_GATEWAY, "upstream down") {
            ApiError::Backend { detail, .. } => assert_eq!(detail, "upstream down"),
            other => panic!("unexpected error: {other:?}"),
        }
        match backend_error(StatusCode::BAD_GATEWAY, "") {
            ApiError::Backend { detail, .. } => assert_eq!(detail, "Bad Gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_user_message_4xx_is_verbatim_5xx_is_generic() {
        let quota = ApiError::Backend {
            status: 429,
            detail: "quota exceeded".into(),
        };
        assert_eq!(quota.user_message(), "quota exceeded");

        let boom = ApiError::Backend {
            status: 500,
            detail: "stack trace".into(),
        };
        assert!(!boom.user_message().contains("stack trace"));
    }

    #[tokio::test]
    async fn test_static_token_provider_returns_token() {
        let provider = StaticTokenProvider("tok-123".into());
        assert_eq!(provider.access_token().await.unwrap(), "tok-123");
    }

    mod http {
        use serde_json::{json, Value};
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::super::*;

        fn authed_client(server: &MockServer, token: &str) -> ApiClient {
            ApiClient::new(&server.uri(), Arc::new(StaticTokenProvider(token.into())))
        }

        #[tokio::test]
        async fn test_bearer_token_attached_to_every_request() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/user-resumes/"))
                .and(header("authorization", "Bearer tok-123"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resumes": []})))
                .expect(1)
                .mount(&server)
                .await;

            let api = authed_client(&server, "tok-123");
            let _: Value = api.get_json("/user-resumes/").await.unwrap();
        }

        #[tokio::test]
        async fn test_anonymous_client_sends_no_auth_header() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/user-resumes/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resumes": []})))
                .mount(&server)
                .await;

            let api = ApiClient::anonymous(&server.uri());
            let _: Value = api.get_json("/user-resumes/").await.unwrap();

            let requests = server.received_requests().await.unwrap();
            assert!(requests[0].headers.get("authorization").is_none());
        }

        #[tokio::test]
        async fn test_404_is_none_for_optional_get() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/profile"))
                .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "No profile found"})))
                .mount(&server)
                .await;

            let api = authed_client(&server, "tok");
            let result: Option<Value> = api.get_optional_json("/profile").await.unwrap();
            assert!(result.is_none());
        }

        #[tokio::test]
        async fn test_non_404_failure_is_an_error_not_absence() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/profile"))
                .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
                .mount(&server)
                .await;

            let api = authed_client(&server, "tok");
            let result: Result<Option<Value>, ApiError> = api.get_optional_json("/profile").await;
            match result {
                Err(ApiError::Backend { status, detail }) => {
                    assert_eq!(status, 500);
                    assert_eq!(detail, "db down");
                }
                other => panic!("expected backend error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_backend_detail_is_carried_through_post() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/generate-resume-agent/"))
                .respond_with(
                    ResponseTemplate::new(429).set_body_json(json!({"detail": "quota exceeded"})),
                )
                .mount(&server)
                .await;

            let api = authed_client(&server, "tok");
            let result: Result<Value, ApiError> =
                api.post_json("/generate-resume-agent/", &json!({})).await;
            match result {
                Err(e @ ApiError::Backend { .. }) => {
                    assert_eq!(e.user_message(), "quota exceeded");
                }
                other => panic!("expected backend error, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_multipart_bytes_returns_raw_body() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/generate-html-pdf/"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7 fake".to_vec(), "application/pdf"),
                )
                .mount(&server)
                .await;

            let api = authed_client(&server, "tok");
            let form = Form::new().text("resume_content", "# CV");
            let bytes = api.post_multipart_bytes("/generate-html-pdf/", form).await.unwrap();
            assert!(bytes.starts_with(b"%PDF"));
        }

        #[tokio::test]
        async fn test_save_download_writes_the_blob() {
            let dir = tempfile::tempdir().unwrap();
            let target = dir.path().join("resume.pdf");
            save_download(&Bytes::from_static(b"%PDF-1.7"), &target).unwrap();
            assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.7");
        }
    }
}
