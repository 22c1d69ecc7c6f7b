//! Candidate profile — the structured record the backend generates resumes
//! from. Loaded from backend storage, locally mutated by the editor, and
//! persisted only on explicit save.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileParseError {
    #[error("Could not read profile file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid profile format: expected a JSON object with profile information")]
    NotAProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalInfo {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linkedin_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkExperience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub start_date: String,
    /// None for a current position.
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Skills {
    #[serde(default)]
    pub technical_skills: Vec<String>,
    #[serde(default, alias = "process_project_skills")]
    pub process_skills: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Which skills list an editor operation targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkillCategory {
    Technical,
    Process,
    Language,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub personal_summary: String,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl Profile {
    /// The empty-but-well-formed profile written when a user skips the
    /// upload step.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Parses an uploaded profile file. Malformed JSON, or JSON that carries
    /// no profile structure at all, is rejected here; the caller's held
    /// profile is never touched.
    pub fn from_json_str(raw: &str) -> Result<Self, ProfileParseError> {
        let value: Value = serde_json::from_str(raw)?;
        let looks_like_profile = value
            .as_object()
            .map(|o| o.contains_key("personal_info") || o.contains_key("name"))
            .unwrap_or(false);
        if !looks_like_profile {
            return Err(ProfileParseError::NotAProfile);
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ProfileParseError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// The minimum the backend requires before a profile is usable for
    /// generation: a full name and an email.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.personal_info.full_name.trim().is_empty() {
            missing.push("personal_info.full_name");
        }
        if self.personal_info.email.trim().is_empty() {
            missing.push("personal_info.email");
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_required_fields().is_empty()
    }

    // ── Editor draft operations ──────────────────────────────────────────
    // All of these mutate the in-memory draft only; nothing reaches the
    // backend until an explicit save.

    pub fn add_experience(&mut self, entry: WorkExperience) {
        self.work_experience.push(entry);
    }

    pub fn update_experience(&mut self, index: usize, entry: WorkExperience) -> bool {
        match self.work_experience.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    pub fn remove_experience(&mut self, index: usize) -> Option<WorkExperience> {
        (index < self.work_experience.len()).then(|| self.work_experience.remove(index))
    }

    pub fn add_education(&mut self, entry: Education) {
        self.education.push(entry);
    }

    pub fn update_education(&mut self, index: usize, entry: Education) -> bool {
        match self.education.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    pub fn remove_education(&mut self, index: usize) -> Option<Education> {
        (index < self.education.len()).then(|| self.education.remove(index))
    }

    pub fn add_skill(&mut self, category: SkillCategory, skill: String) {
        self.skill_list_mut(category).push(skill);
    }

    pub fn remove_skill(&mut self, category: SkillCategory, index: usize) -> Option<String> {
        let list = self.skill_list_mut(category);
        (index < list.len()).then(|| list.remove(index))
    }

    fn skill_list_mut(&mut self, category: SkillCategory) -> &mut Vec<String> {
        match category {
            SkillCategory::Technical => &mut self.skills.technical_skills,
            SkillCategory::Process => &mut self.skills.process_skills,
            SkillCategory::Language => &mut self.skills.languages,
        }
    }
}
