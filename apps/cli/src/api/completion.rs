//! Profile completion — the backend-driven question/answer loop that fills
//! in missing profile fields before generation.
//!
//! Protocol: `start` submits the profile; while the backend answers with
//! `{status: "question"}` the client collects a response (or an explicit
//! skip, sent as an empty response) for the named field and `process`es it
//! together with the backend's carried `analysis` blob; a
//! `{status: "complete"}` answer ends the loop with the merged profile.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::models::profile::Profile;

/// One follow-up question about a missing field.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionQuestion {
    pub question: String,
    pub field: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub context: String,
}

/// Backend state of the completion dialog. The tag makes a question-status
/// body without a question fail at decode time instead of mid-loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CompletionState {
    Question {
        question: CompletionQuestion,
        profile: Profile,
        #[serde(default)]
        analysis: Option<Value>,
    },
    Complete {
        profile: Profile,
        #[serde(default)]
        message: Option<String>,
    },
}

/// The user's reaction to a question.
#[derive(Debug, Clone)]
pub enum CompletionAnswer {
    Response(String),
    Skip,
}

#[derive(Debug, Serialize)]
struct StartBody<'a> {
    profile: &'a Profile,
}

#[derive(Debug, Serialize)]
struct ProcessBody<'a> {
    profile: &'a Profile,
    field: &'a str,
    response: &'a str,
    analysis: &'a Value,
}

/// `POST /start-profile-completion/`.
pub async fn start(api: &ApiClient, profile: &Profile) -> Result<CompletionState, ApiError> {
    api.post_json("/start-profile-completion/", &StartBody { profile })
        .await
}

/// `POST /process-profile-response/`.
pub async fn process(
    api: &ApiClient,
    profile: &Profile,
    field: &str,
    response: &str,
    analysis: &Value,
) -> Result<CompletionState, ApiError> {
    api.post_json(
        "/process-profile-response/",
        &ProcessBody {
            profile,
            field,
            response,
            analysis,
        },
    )
    .await
}

/// Drives the full dialog with answers supplied by `prompt`, returning the
/// completed profile. `prompt` is synchronous so pages can read stdin and
/// tests can script answers.
pub async fn run<F>(
    api: &ApiClient,
    profile: &Profile,
    mut prompt: F,
) -> Result<(Profile, Option<String>), ApiError>
where
    F: FnMut(&CompletionQuestion) -> CompletionAnswer,
{
    let mut state = start(api, profile).await?;
    loop {
        match state {
            CompletionState::Complete { profile, message } => return Ok((profile, message)),
            CompletionState::Question {
                question,
                profile,
                analysis,
            } => {
                let response = match prompt(&question) {
                    CompletionAnswer::Response(text) => text,
                    CompletionAnswer::Skip => String::new(),
                };
                let analysis = analysis.unwrap_or(Value::Null);
                state = process(api, &profile, &question.field, &response, &analysis).await?;
            }
        }
    }
}
