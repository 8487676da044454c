use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::state::{TaskState, TaskTracker, TransitionError};
use crate::analyses::{self, MATCH_THRESHOLD};
use crate::evaluation::MatchEvaluator;
use crate::models::analysis::AnalysisRecord;
use crate::models::requirement::Requirement;
use crate::models::resume::ResumeSummary;
use crate::notify::{Notifier, NotifyReport};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("resume {0} not found")]
    ResumeNotFound(Uuid),

    #[error("requirement {0} not found")]
    RequirementNotFound(Uuid),

    #[error("requirement {0} belongs to another user")]
    RequirementNotOwned(Uuid),

    #[error("no requirement supplied")]
    MissingRequirement,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// One analysis of one resume against one requirement snapshot.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub task_id: Uuid,
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub requirement: Requirement,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub resume: ResumeSummary,
    pub record: AnalysisRecord,
    /// Present only when the score cleared the match threshold.
    pub notification: Option<NotifyReport>,
    pub states: Vec<TaskState>,
}

/// Evaluate → store → notify, shared by the inline and queued paths.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn Store>,
    evaluator: MatchEvaluator,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(store: Arc<dyn Store>, evaluator: MatchEvaluator, notifier: Notifier) -> Self {
        Self {
            store,
            evaluator,
            notifier,
        }
    }

    /// Picks the requirement snapshot for an analysis: an inline requirement
    /// wins; otherwise the stored one, which must belong to `user_id`.
    pub async fn resolve_requirement(
        &self,
        user_id: Uuid,
        inline: Option<Requirement>,
        requirement_id: Option<Uuid>,
    ) -> Result<Requirement, PipelineError> {
        if let Some(requirement) = inline {
            return Ok(requirement);
        }
        let id = requirement_id.ok_or(PipelineError::MissingRequirement)?;
        let record = self
            .store
            .get_requirement(id)
            .await?
            .ok_or(PipelineError::RequirementNotFound(id))?;
        if record.user_id != user_id {
            return Err(PipelineError::RequirementNotOwned(id));
        }
        Ok(record.snapshot())
    }

    pub async fn run_analysis(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let mut tracker = TaskTracker::new(request.task_id);
        match self.execute(&mut tracker, &request).await {
            Ok((resume, record, notification)) => Ok(AnalysisOutcome {
                resume,
                record,
                notification,
                states: tracker.into_history(),
            }),
            Err(e) => {
                let from = tracker.state();
                tracker.fail();
                warn!(
                    task_id = %request.task_id,
                    resume_id = %request.resume_id,
                    %from,
                    "Analysis task failed: {e}"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        tracker: &mut TaskTracker,
        request: &AnalysisRequest,
    ) -> Result<(ResumeSummary, AnalysisRecord, Option<NotifyReport>), PipelineError> {
        let resume = self
            .store
            .get_resume(request.resume_id)
            .await?
            .ok_or(PipelineError::ResumeNotFound(request.resume_id))?;
        let summary = resume.summary();

        tracker.advance(TaskState::Evaluating)?;
        let result = self
            .evaluator
            .evaluate(&resume.content, &request.requirement)
            .await;

        tracker.advance(TaskState::Storing)?;
        let record = analyses::record(
            self.store.as_ref(),
            resume.id,
            &request.requirement,
            &result,
            request.user_id,
        )
        .await?;

        let notification = if result.match_score >= MATCH_THRESHOLD {
            tracker.advance(TaskState::Notifying)?;
            let email = match self.store.user_email(request.user_id).await {
                Ok(email) => email,
                Err(e) => {
                    warn!(user_id = %request.user_id, "Email lookup failed, push only: {e}");
                    None
                }
            };
            Some(
                self.notifier
                    .notify_match(request.user_id, email.as_deref(), &summary, &result)
                    .await,
            )
        } else {
            None
        };

        tracker.advance(TaskState::Done)?;
        info!(
            task_id = %request.task_id,
            resume_id = %resume.id,
            analysis_id = %record.id,
            score = result.match_score,
            "Analysis task done"
        );
        Ok((summary, record, notification))
    }
}
