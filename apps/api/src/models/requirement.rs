use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single (skill, proficiency) pair. Order inside a requirement is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub name: String,
    pub level: String,
}

/// Job criteria a resume is scored against.
///
/// This is also the immutable snapshot embedded in every analysis record:
/// `id` is set when the snapshot was taken from a stored requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub job_title: String,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub skills: Vec<SkillRequirement>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Requirement {
    /// Returns the requirement's own spelling of `name`, matched case-insensitively.
    pub fn canonical_skill(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.skills
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
            .map(|s| s.name.as_str())
    }
}

/// A stored requirement owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_title: String,
    pub experience_years: Option<u32>,
    pub education: Option<String>,
    pub skills: Vec<SkillRequirement>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequirementRecord {
    pub fn snapshot(&self) -> Requirement {
        Requirement {
            id: Some(self.id),
            job_title: self.job_title.clone(),
            experience_years: self.experience_years,
            education: self.education.clone(),
            skills: self.skills.clone(),
            description: self.description.clone(),
        }
    }

    pub fn apply(&mut self, patch: &RequirementPatch, now: DateTime<Utc>) {
        if let Some(job_title) = &patch.job_title {
            self.job_title = job_title.clone();
        }
        if let Some(years) = patch.experience_years {
            self.experience_years = Some(years);
        }
        if let Some(education) = &patch.education {
            self.education = Some(education.clone());
        }
        if let Some(skills) = &patch.skills {
            self.skills = skills.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        self.updated_at = now;
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequirementPatch {
    pub job_title: Option<String>,
    pub experience_years: Option<u32>,
    pub education: Option<String>,
    pub skills: Option<Vec<SkillRequirement>>,
    pub description: Option<String>,
}

impl RequirementPatch {
    pub fn is_empty(&self) -> bool {
        self.job_title.is_none()
            && self.experience_years.is_none()
            && self.education.is_none()
            && self.skills.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequirementFilter {
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring match on the job title.
    pub job_title: Option<String>,
    pub page: super::Page,
}
