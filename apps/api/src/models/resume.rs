use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser::DocumentFormat;

/// Resume lifecycle. Never returns to `Pending` once analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStatus {
    Pending,
    Analyzed,
    Matched,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Pending => "pending",
            ResumeStatus::Analyzed => "analyzed",
            ResumeStatus::Matched => "matched",
        }
    }
}

impl fmt::Display for ResumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResumeStatus::Pending),
            "analyzed" => Ok(ResumeStatus::Analyzed),
            "matched" => Ok(ResumeStatus::Matched),
            other => Err(format!("unknown resume status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    pub candidate_name: String,
    pub position: String,
    /// Server-side location; never sent to clients.
    #[serde(skip_serializing, default)]
    pub file_path: String,
    pub file_name: String,
    pub file_type: DocumentFormat,
    pub content: String,
    pub status: ResumeStatus,
    pub match_score: Option<f64>,
    pub matches_requirements: Option<bool>,
    pub uploaded_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

impl Resume {
    pub fn summary(&self) -> ResumeSummary {
        ResumeSummary {
            id: self.id,
            candidate_name: self.candidate_name.clone(),
            position: self.position.clone(),
        }
    }
}

/// Fields supplied at upload time; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub candidate_name: String,
    pub position: String,
    pub file_path: String,
    pub file_name: String,
    pub file_type: DocumentFormat,
    pub content: String,
}

/// Cached analysis fields written back onto the resume after `record()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeOutcome {
    pub status: ResumeStatus,
    pub matches_requirements: bool,
    pub match_score: f64,
    pub analyzed_at: DateTime<Utc>,
}

/// Identification carried into notifications and analysis listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSummary {
    pub id: Uuid,
    pub candidate_name: String,
    pub position: String,
}

#[derive(Debug, Clone, Default)]
pub struct ResumeFilter {
    pub status: Option<ResumeStatus>,
    pub page: super::Page,
}
