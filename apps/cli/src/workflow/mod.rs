//! Generation workflow — the wizard's client-side state machine.
//!
//! Stages: input → generating → preview → complete, with the failure path
//! generating → input, and a transient validating stage while the backend
//! checks the profile. All transitions are guarded; a call whose guard fails
//! is a no-op that leaves the session untouched. Only one generation can be
//! outstanding per session: `begin_generation` moves the stage out of
//! `Input` before any request is made, so a second start is rejected by the
//! guard with no locking.

pub mod validation;

use thiserror::Error;
use uuid::Uuid;

use crate::api::{resumes, ApiClient, ApiError};
use crate::models::profile::Profile;
use crate::models::resume::GeneratedResume;
use validation::{job_description_valid, profile_messages, JOB_DESCRIPTION_MESSAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Validating,
    Generating,
    Preview,
    Complete,
}

/// Why `begin_generation` refused to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardRejection {
    #[error("A generation is already in progress or the wizard is past input")]
    NotInInputStage,

    #[error("Job description is too short")]
    JobDescriptionInvalid,

    #[error("Profile is incomplete")]
    ProfileInvalid,

    #[error("No profile loaded")]
    ProfileMissing,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationFlags {
    pub job_description_valid: bool,
    pub profile_valid: bool,
    pub messages: Vec<String>,
}

/// One wizard instance. Created when the page mounts, discarded on
/// navigation away or explicit reset.
#[derive(Debug)]
pub struct WorkflowSession {
    stage: Stage,
    job_description: String,
    profile: Option<Profile>,
    validation: ValidationFlags,
    generated_markdown: Option<String>,
    generated_resume_id: Option<Uuid>,
    pdf_url: Option<String>,
    last_error: Option<String>,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::Input,
            job_description: String::new(),
            profile: None,
            validation: ValidationFlags::default(),
            generated_markdown: None,
            generated_resume_id: None,
            pdf_url: None,
            last_error: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn validation(&self) -> &ValidationFlags {
        &self.validation
    }

    pub fn generated_markdown(&self) -> Option<&str> {
        self.generated_markdown.as_deref()
    }

    pub fn generated_resume_id(&self) -> Option<Uuid> {
        self.generated_resume_id
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records an edit to the job description and revalidates it. Only
    /// meaningful while collecting input; ignored elsewhere.
    pub fn set_job_description(&mut self, text: &str) -> bool {
        if self.stage != Stage::Input {
            return self.validation.job_description_valid;
        }
        self.job_description = text.to_string();
        self.validation.job_description_valid = job_description_valid(text);
        self.rebuild_messages();
        self.validation.job_description_valid
    }

    /// Records a loaded or edited profile and revalidates it structurally.
    pub fn set_profile(&mut self, profile: Option<Profile>) -> bool {
        if self.stage != Stage::Input {
            return self.validation.profile_valid;
        }
        self.profile = profile;
        self.validation.profile_valid = self
            .profile
            .as_ref()
            .map(Profile::is_valid)
            .unwrap_or(false);
        self.rebuild_messages();
        self.validation.profile_valid
    }

    /// True when the completion dialog should run: a profile is present but
    /// structurally incomplete.
    pub fn needs_completion(&self) -> bool {
        self.profile.is_some() && !self.validation.profile_valid
    }

    pub fn can_generate(&self) -> bool {
        self.stage == Stage::Input
            && self.validation.job_description_valid
            && self.validation.profile_valid
            && self.profile.is_some()
    }

    /// Asks the backend for its verdict on the current profile, merging the
    /// result into the validation flags. Enters the transient validating
    /// stage for the duration of the call; any failure restores input with
    /// all user data intact.
    pub async fn validate_with_backend(&mut self, api: &ApiClient) -> Result<bool, ApiError> {
        if self.stage != Stage::Input {
            return Ok(self.validation.profile_valid);
        }
        let Some(profile) = self.profile.clone() else {
            return Ok(false);
        };

        self.stage = Stage::Validating;
        let result = crate::api::profile::validate(api, &profile).await;
        self.stage = Stage::Input;

        let verdict = result?;
        self.validation.profile_valid = self.validation.profile_valid && verdict.valid;
        self.rebuild_messages();
        if !verdict.valid {
            if !verdict.message.is_empty() {
                self.validation.messages.push(verdict.message.clone());
            }
            for field in &verdict.missing_fields {
                self.validation
                    .messages
                    .push(format!("Backend reports missing field {field}"));
            }
        }
        Ok(self.validation.profile_valid)
    }

    /// Guard for starting a generation. On success the stage moves to
    /// `Generating` before any request is made; on failure nothing changes.
    pub fn begin_generation(&mut self) -> Result<(), GuardRejection> {
        if self.stage != Stage::Input {
            return Err(GuardRejection::NotInInputStage);
        }
        if !self.validation.job_description_valid {
            return Err(GuardRejection::JobDescriptionInvalid);
        }
        if self.profile.is_none() {
            return Err(GuardRejection::ProfileMissing);
        }
        if !self.validation.profile_valid {
            return Err(GuardRejection::ProfileInvalid);
        }
        self.stage = Stage::Generating;
        self.last_error = None;
        Ok(())
    }

    /// Applies the backend's answer to a pending generation. A success moves
    /// to preview and stores the artifacts; an error returns to input with
    /// the job description and profile untouched. Late responses arriving
    /// after the session moved on (reset, navigation) are discarded.
    pub fn finish_generation(&mut self, result: Result<GeneratedResume, ApiError>) {
        if self.stage != Stage::Generating {
            return;
        }
        match result {
            Ok(generated) => {
                self.generated_markdown = Some(generated.markdown);
                self.generated_resume_id = Some(generated.resume_id);
                self.pdf_url = generated.storage_url;
                self.stage = Stage::Preview;
            }
            Err(e) => {
                self.last_error = Some(e.user_message());
                self.stage = Stage::Input;
            }
        }
    }

    /// Full generation round-trip: guard, backend call, transition.
    /// Backend failures are absorbed into the state machine (stage returns
    /// to input, `last_error` is set); only a guard rejection is an `Err`.
    pub async fn run_generation(&mut self, api: &ApiClient) -> Result<(), GuardRejection> {
        self.begin_generation()?;

        // begin_generation only succeeds with a profile present.
        let job_description = self.job_description.clone();
        let profile = match self.profile.clone() {
            Some(p) => p,
            None => {
                self.stage = Stage::Input;
                return Err(GuardRejection::ProfileMissing);
            }
        };

        let result = resumes::generate_with_agent(api, &profile, &job_description).await;
        self.finish_generation(result);
        Ok(())
    }

    /// Local edit of the generated markdown. Preview only; never re-submits.
    pub fn edit_markdown(&mut self, text: &str) -> bool {
        if self.stage != Stage::Preview {
            return false;
        }
        self.generated_markdown = Some(text.to_string());
        true
    }

    /// The user asked for the PDF. The file was already produced
    /// server-side during generation, so this is a pure stage transition.
    pub fn request_pdf(&mut self) -> bool {
        if self.stage != Stage::Preview {
            return false;
        }
        self.stage = Stage::Complete;
        true
    }

    /// Back to a blank input stage; every workflow field is cleared.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn rebuild_messages(&mut self) {
        let mut messages = Vec::new();
        if !self.validation.job_description_valid && !self.job_description.is_empty() {
            messages.push(JOB_DESCRIPTION_MESSAGE.to_string());
        }
        if !self.validation.profile_valid {
            messages.extend(profile_messages(self.profile.as_ref()));
        }
        self.validation.messages = messages;
    }
}
