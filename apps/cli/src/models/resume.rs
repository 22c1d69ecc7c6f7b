use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the saved-resume listing returned by `GET /user-resumes/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub resume_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub storage_url: Option<String>,
}

/// Canonical shape of every generation response.
///
/// The backend's endpoints disagree on the field name for the generated
/// content (`markdown`, `resume`, `resume_content` depending on the variant);
/// they are all folded into `markdown` here and no other name leaks past the
/// API module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedResume {
    #[serde(alias = "resume", alias = "resume_content")]
    pub markdown: String,
    pub resume_id: Uuid,
    #[serde(default)]
    pub storage_url: Option<String>,
}
