//! Generation and PDF endpoints.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiClient, ApiError};
use crate::models::profile::Profile;
use crate::models::resume::{GeneratedResume, ResumeRecord};

/// Backend pipeline selectors for the agent endpoint. There is exactly one
/// production pipeline today.
const DEFAULT_AGENT: &str = "flexible";
const DEFAULT_PROCESSOR: &str = "markdown";

#[derive(Debug, Serialize)]
struct GenerateAgentBody<'a> {
    profile: &'a Profile,
    job_description: &'a str,
    agent: &'a str,
    processor: &'a str,
}

/// Storage confirmation from `POST /generate-and-store-html-pdf/`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredPdf {
    #[serde(default)]
    pub storage_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResumesEnvelope {
    resumes: Vec<ResumeRecord>,
}

/// `POST /generate-resume-agent/` — profile + pasted job description in,
/// generated markdown out.
pub async fn generate_with_agent(
    api: &ApiClient,
    profile: &Profile,
    job_description: &str,
) -> Result<GeneratedResume, ApiError> {
    api.post_json(
        "/generate-resume-agent/",
        &GenerateAgentBody {
            profile,
            job_description,
            agent: DEFAULT_AGENT,
            processor: DEFAULT_PROCESSOR,
        },
    )
    .await
}

/// `POST /generate-ai-flexible-cv/` — multipart variant taking a job offer
/// URL and the profile as an uploaded JSON file. Used by the no-auth page.
pub async fn generate_flexible(
    api: &ApiClient,
    job_offer_url: &str,
    profile_json: Vec<u8>,
    file_name: &str,
) -> Result<GeneratedResume, ApiError> {
    let file_part = Part::bytes(profile_json)
        .file_name(file_name.to_string())
        .mime_str("application/json")?;
    let form = Form::new()
        .text("job_offer_url", job_offer_url.to_string())
        .part("profile_json", file_part);
    api.post_multipart("/generate-ai-flexible-cv/", form).await
}

/// `POST /generate-html-pdf/` — renders markdown to a PDF and returns the
/// raw bytes for download.
pub async fn render_pdf(api: &ApiClient, resume_content: &str) -> Result<Bytes, ApiError> {
    let form = Form::new().text("resume_content", resume_content.to_string());
    api.post_multipart_bytes("/generate-html-pdf/", form).await
}

/// `POST /generate-and-store-html-pdf/` — renders and stores the PDF
/// server-side against an existing resume id.
pub async fn render_and_store_pdf(
    api: &ApiClient,
    resume_content: &str,
    resume_id: Uuid,
) -> Result<StoredPdf, ApiError> {
    let form = Form::new()
        .text("resume_content", resume_content.to_string())
        .text("resume_id", resume_id.to_string());
    api.post_multipart("/generate-and-store-html-pdf/", form)
        .await
}

/// `GET /user-resumes/`.
pub async fn list(api: &ApiClient) -> Result<Vec<ResumeRecord>, ApiError> {
    let envelope: ResumesEnvelope = api.get_json("/user-resumes/").await?;
    Ok(envelope.resumes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_body_carries_pipeline_selectors() {
        let profile = Profile::minimal();
        let body = GenerateAgentBody {
            profile: &profile,
            job_description: "jd",
            agent: DEFAULT_AGENT,
            processor: DEFAULT_PROCESSOR,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["agent"], "flexible");
        assert_eq!(json["processor"], "markdown");
        assert_eq!(json["job_description"], "jd");
        assert!(json["profile"].is_object());
    }

    #[test]
    fn test_stored_pdf_tolerates_arbitrary_storage_info() {
        let s: StoredPdf =
            serde_json::from_str(r#"{"storage_url": "https://s/cv.pdf", "extra": 1}"#).unwrap();
        assert_eq!(s.storage_url.as_deref(), Some("https://s/cv.pdf"));
        assert!(s.message.is_none());
    }

    mod http {
        use std::sync::Arc;

        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::super::*;
        use crate::api::{ApiClient, StaticTokenProvider};

        fn client(server: &MockServer) -> ApiClient {
            ApiClient::new(&server.uri(), Arc::new(StaticTokenProvider("tok".into())))
        }

        #[tokio::test]
        async fn test_flexible_generation_decodes_resume_content_variant() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/generate-ai-flexible-cv/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "resume_content": "# Ada",
                    "resume_id": "8f8c2e9a-3f1d-4a4e-9a6a-111213141516",
                    "storage_url": "https://s/cv.pdf"
                })))
                .mount(&server)
                .await;

            let api = ApiClient::anonymous(&server.uri());
            let generated = generate_flexible(
                &api,
                "https://example.com/job",
                br#"{"personal_info": {}}"#.to_vec(),
                "profile.json",
            )
            .await
            .unwrap();
            assert_eq!(generated.markdown, "# Ada");
            assert_eq!(generated.storage_url.as_deref(), Some("https://s/cv.pdf"));
        }

        #[tokio::test]
        async fn test_list_unwraps_resumes_envelope() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/user-resumes/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "resumes": [
                        {
                            "resume_id": "8f8c2e9a-3f1d-4a4e-9a6a-111213141516",
                            "created_at": "2024-05-01T12:00:00Z",
                            "job_url": "https://example.com/job"
                        }
                    ]
                })))
                .mount(&server)
                .await;

            let records = list(&client(&server)).await.unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].job_url.as_deref(), Some("https://example.com/job"));
        }

        #[tokio::test]
        async fn test_render_and_store_sends_resume_id() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/generate-and-store-html-pdf/"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"storage_url": "https://s/cv.pdf"})),
                )
                .expect(1)
                .mount(&server)
                .await;

            let id = Uuid::new_v4();
            let stored = render_and_store_pdf(&client(&server), "# CV", id).await.unwrap();
            assert_eq!(stored.storage_url.as_deref(), Some("https://s/cv.pdf"));

            let requests = server.received_requests().await.unwrap();
            let body = String::from_utf8_lossy(&requests[0].body);
            assert!(body.contains(&id.to_string()));
        }
    }
}
