//! Local validation policy for the wizard.
//!
//! Job-description validation is a pure length heuristic, with no semantic
//! check. Profile validation combines the structural required-field check
//! with the backend-driven completion dialog (see `api::completion`).

use crate::models::profile::Profile;

/// Minimum trimmed length for a usable job description.
pub const MIN_JOB_DESCRIPTION_CHARS: usize = 50;

pub const JOB_DESCRIPTION_MESSAGE: &str =
    "Job description must be at least 50 characters. Paste the full posting.";

/// True iff the trimmed text is at least `MIN_JOB_DESCRIPTION_CHARS` long.
pub fn job_description_valid(text: &str) -> bool {
    text.trim().chars().count() >= MIN_JOB_DESCRIPTION_CHARS
}

/// Structural profile check: present, and carrying the required
/// personal-info fields. Returns the human-readable problems.
pub fn profile_messages(profile: Option<&Profile>) -> Vec<String> {
    match profile {
        None => vec!["No profile loaded. Upload or create a profile first.".to_string()],
        Some(p) => p
            .missing_required_fields()
            .into_iter()
            .map(|f| format!("Profile is missing required field {f}"))
            .collect(),
    }
}
