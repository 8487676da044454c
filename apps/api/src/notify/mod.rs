//! Best-effort delivery of match events over the push channel and email.

pub mod handlers;
mod mailer;
mod notifier;
mod registry;
mod relay;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::AnalysisResult;
use crate::models::resume::ResumeSummary;

pub use mailer::{match_email_html, match_email_subject, MailError, Mailer, SesMailer};
pub use notifier::{NotifyReport, Notifier};
pub use registry::ConnectionRegistry;
pub use relay::{spawn_push_relay, RedisPushPublisher, PUSH_CHANNEL};

#[derive(Debug, Error)]
pub enum PushError {
    #[error("failed to encode push event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("push relay error: {0}")]
    Relay(#[from] redis::RedisError),
}

/// JSON envelope sent to clients: `{type, message, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PushEvent {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn resume_match(
        resume: &ResumeSummary,
        result: &AnalysisResult,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            "resume_match",
            format!(
                "Resume from {} matches {} ({:.1}%)",
                resume.candidate_name, resume.position, result.match_score
            ),
        )
        .with("resume_id", resume.id.to_string())
        .with("candidate_name", resume.candidate_name.clone())
        .with("position", resume.position.clone())
        .with("match_score", result.match_score)
        .with("analysis_summary", result.summary.clone())
        .with("timestamp", timestamp.to_rfc3339())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Who a push event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Audience {
    User { user_id: Uuid },
    Everyone,
}

/// Fan-out of push events. Returns the number of receivers reached.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn push(&self, audience: Audience, event: &PushEvent) -> Result<usize, PushError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_result;

    #[test]
    fn test_resume_match_event_fields() {
        let resume = ResumeSummary {
            id: Uuid::nil(),
            candidate_name: "Jane Doe".to_string(),
            position: "Backend Engineer".to_string(),
        };
        let event = PushEvent::resume_match(&resume, &sample_result(85.0), Utc::now());
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "resume_match");
        assert_eq!(json["resume_id"], Uuid::nil().to_string());
        assert_eq!(json["candidate_name"], "Jane Doe");
        assert_eq!(json["position"], "Backend Engineer");
        assert_eq!(json["match_score"], 85.0);
        assert!(json["analysis_summary"].is_string());
        assert!(json["timestamp"].is_string());
        assert!(json["message"].as_str().unwrap().contains("85.0%"));
    }

    #[test]
    fn test_audience_tagging() {
        let json = serde_json::to_value(Audience::Everyone).unwrap();
        assert_eq!(json["scope"], "everyone");
        let parsed: Audience =
            serde_json::from_str(r#"{"scope":"user","user_id":"00000000-0000-0000-0000-000000000000"}"#)
                .unwrap();
        assert_eq!(parsed, Audience::User { user_id: Uuid::nil() });
    }
}
