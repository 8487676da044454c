use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::analysis::AnalysisResult;
use crate::models::resume::ResumeSummary;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to build email: {0}")]
    Build(String),

    #[error("email delivery failed: {0}")]
    Send(String),
}

/// Single-recipient HTML mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Amazon SES v2 transport.
pub struct SesMailer {
    client: aws_sdk_sesv2::Client,
    from: String,
}

impl SesMailer {
    /// Returns `None` when `MAIL_FROM` is not configured.
    pub async fn from_config(config: &Config) -> Option<Self> {
        let from = config.mail_from.clone()?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.ses_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Some(Self {
            client: aws_sdk_sesv2::Client::new(&sdk_config),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let destination = Destination::builder().to_addresses(to).build();

        let subject = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::Build(format!("subject: {e}")))?;
        let body = Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| MailError::Build(format!("body: {e}")))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().html(body).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        info!(to, message_id = ?result.message_id(), "Email sent via SES");
        Ok(())
    }
}

pub fn match_email_subject(candidate_name: &str, match_score: f64) -> String {
    format!("Resume match: {candidate_name} - {match_score:.1}% match")
}

pub fn match_email_html(resume: &ResumeSummary, result: &AnalysisResult) -> String {
    format!(
        r#"<html>
  <body>
    <h2>Resume match notification</h2>
    <p>A resume matching your requirements has been found:</p>
    <ul>
      <li><strong>Candidate</strong>: {candidate}</li>
      <li><strong>Position</strong>: {position}</li>
      <li><strong>Match score</strong>: {score:.1}%</li>
    </ul>
    <p><strong>Summary</strong>:</p>
    <p>{summary}</p>
    <p>Sign in to review the full analysis.</p>
  </body>
</html>
"#,
        candidate = escape_html(&resume.candidate_name),
        position = escape_html(&resume.position),
        score = result.match_score,
        summary = escape_html(&result.summary),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
