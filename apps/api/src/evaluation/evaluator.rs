use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::prompts::{evaluation_prompt, EVALUATION_SYSTEM};
use super::render::render_requirement;
use super::reply::{degraded_result, parse_reply, ParseFailure};
use crate::llm_client::{LlmProvider, ProviderError};
use crate::models::analysis::AnalysisResult;
use crate::models::requirement::Requirement;

#[derive(Debug, Error)]
pub enum EvaluationFailure {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("could not parse provider reply: {0}")]
    Reply(#[from] ParseFailure),
}

/// One provider call and one parse per evaluation.
#[derive(Clone)]
pub struct MatchEvaluator {
    provider: Arc<dyn LlmProvider>,
}

impl MatchEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Always returns a usable result; failures degrade to a negative one.
    pub async fn evaluate(&self, resume_text: &str, requirement: &Requirement) -> AnalysisResult {
        match self.try_evaluate(resume_text, requirement).await {
            Ok(result) => {
                info!(
                    provider = self.provider.name(),
                    score = result.match_score,
                    "Evaluation completed"
                );
                result
            }
            Err(e) => {
                warn!(provider = self.provider.name(), "Evaluation degraded: {e}");
                degraded_result(&e.to_string())
            }
        }
    }

    pub async fn try_evaluate(
        &self,
        resume_text: &str,
        requirement: &Requirement,
    ) -> Result<AnalysisResult, EvaluationFailure> {
        let prompt = evaluation_prompt(&render_requirement(requirement), resume_text);
        let reply = self.provider.complete(EVALUATION_SYSTEM, &prompt).await?;
        Ok(parse_reply(&reply, requirement)?)
    }
}
