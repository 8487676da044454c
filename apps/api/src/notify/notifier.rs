use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::mailer::{match_email_html, match_email_subject, Mailer};
use super::{Audience, PushChannel, PushEvent};
use crate::models::analysis::AnalysisResult;
use crate::models::resume::ResumeSummary;

/// What happened during one `notify_match` call. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub push_receivers: usize,
    pub push_failed: bool,
    pub email_attempted: bool,
    pub email_sent: bool,
}

#[derive(Clone)]
pub struct Notifier {
    push: Arc<dyn PushChannel>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl Notifier {
    pub fn new(push: Arc<dyn PushChannel>, mailer: Option<Arc<dyn Mailer>>) -> Self {
        Self { push, mailer }
    }

    /// Pushes a `resume_match` event to every live session of `user_id`, then
    /// emails `user_email` when one is given. Neither channel's failure is
    /// returned to the caller.
    pub async fn notify_match(
        &self,
        user_id: Uuid,
        user_email: Option<&str>,
        resume: &ResumeSummary,
        result: &AnalysisResult,
    ) -> NotifyReport {
        let mut report = NotifyReport::default();

        let event = PushEvent::resume_match(resume, result, Utc::now());
        match self.push.push(Audience::User { user_id }, &event).await {
            Ok(0) => info!(%user_id, resume_id = %resume.id, "No live push sessions for user"),
            Ok(n) => {
                report.push_receivers = n;
                info!(%user_id, resume_id = %resume.id, receivers = n, "Match notification pushed");
            }
            Err(e) => {
                report.push_failed = true;
                warn!(%user_id, resume_id = %resume.id, "Push notification failed: {e}");
            }
        }

        if let (Some(to), Some(mailer)) = (user_email, &self.mailer) {
            report.email_attempted = true;
            let subject = match_email_subject(&resume.candidate_name, result.match_score);
            let html = match_email_html(resume, result);
            match mailer.send_html(to, &subject, &html).await {
                Ok(()) => report.email_sent = true,
                Err(e) => warn!(%user_id, resume_id = %resume.id, "Match email failed: {e}"),
            }
        }

        report
    }
}
