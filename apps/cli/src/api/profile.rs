//! Profile storage endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::models::profile::Profile;

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    profile: Profile,
}

#[derive(Debug, Serialize)]
struct ProfileBody<'a> {
    profile: &'a Profile,
}

/// Backend verdict on a profile's readiness for generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileValidation {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub missing_fields: Vec<String>,
}

/// `GET /profile`. A 404 is a valid "no profile yet" answer and comes back
/// as `None`; any other failure is an error the caller must handle.
pub async fn load(api: &ApiClient) -> Result<Option<Profile>, ApiError> {
    let envelope: Option<ProfileEnvelope> = api.get_optional_json("/profile").await?;
    Ok(envelope.map(|e| e.profile))
}

/// `POST /profile` — overwrites the server copy wholesale. Last write wins;
/// there is no merge.
pub async fn save(api: &ApiClient, profile: &Profile) -> Result<(), ApiError> {
    let _: Value = api.post_json("/profile", profile).await?;
    Ok(())
}

/// `POST /upsert-profile/` — the upload path (create-or-replace).
pub async fn upsert(api: &ApiClient, profile: &Profile) -> Result<(), ApiError> {
    let _: Value = api
        .post_json("/upsert-profile/", &ProfileBody { profile })
        .await?;
    Ok(())
}

/// `POST /validate-profile/`.
pub async fn validate(api: &ApiClient, profile: &Profile) -> Result<ProfileValidation, ApiError> {
    api.post_json("/validate-profile/", &ProfileBody { profile })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_tolerates_sparse_body() {
        let v: ProfileValidation = serde_json::from_str(r#"{"valid": true}"#).unwrap();
        assert!(v.valid);
        assert!(v.message.is_empty());
        assert!(v.missing_fields.is_empty());
    }

    #[test]
    fn test_validation_decodes_missing_fields() {
        let v: ProfileValidation = serde_json::from_str(
            r#"{"valid": false, "message": "incomplete", "missing_fields": ["personal_info.email"]}"#,
        )
        .unwrap();
        assert!(!v.valid);
        assert_eq!(v.missing_fields, vec!["personal_info.email"]);
    }

    mod http {
        use std::sync::Arc;

        use serde_json::json;
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::super::*;
        use crate::api::{ApiClient, StaticTokenProvider};

        fn client(server: &MockServer) -> ApiClient {
            ApiClient::new(&server.uri(), Arc::new(StaticTokenProvider("tok".into())))
        }

        fn sample_profile() -> Profile {
            let mut p = Profile::minimal();
            p.personal_info.full_name = "Ada Lovelace".into();
            p.personal_info.email = "ada@example.com".into();
            p.skills.technical_skills = vec!["Rust".into(), "Analysis".into()];
            p
        }

        #[tokio::test]
        async fn test_load_absent_profile_is_none() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/profile"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            assert!(load(&client(&server)).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_save_then_load_is_structurally_equal() {
            let server = MockServer::start().await;
            let profile = sample_profile();

            // The mock echoes back exactly what save sends, the way the
            // backend's storage round-trips it.
            Mock::given(method("POST"))
                .and(path("/profile"))
                .and(body_json(&profile))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "saved"})))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/profile"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "profile": &profile })),
                )
                .mount(&server)
                .await;

            let api = client(&server);
            save(&api, &profile).await.unwrap();
            let reloaded = load(&api).await.unwrap().unwrap();
            assert_eq!(reloaded, profile);
        }

        #[tokio::test]
        async fn test_upsert_wraps_profile_in_envelope() {
            let server = MockServer::start().await;
            let profile = sample_profile();
            Mock::given(method("POST"))
                .and(path("/upsert-profile/"))
                .and(body_json(json!({ "profile": &profile })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
                .expect(1)
                .mount(&server)
                .await;

            upsert(&client(&server), &profile).await.unwrap();
        }

        #[tokio::test]
        async fn test_validate_reports_backend_verdict() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/validate-profile/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "valid": false,
                    "message": "Profile incomplete",
                    "missing_fields": ["personal_summary"]
                })))
                .mount(&server)
                .await;

            let verdict = validate(&client(&server), &sample_profile()).await.unwrap();
            assert!(!verdict.valid);
            assert_eq!(verdict.missing_fields, vec!["personal_summary"]);
        }
    }
}
