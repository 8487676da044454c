use tracing::info;
use uuid::Uuid;

use crate::models::analysis::{AnalysisRecord, AnalysisResult, NewAnalysis};
use crate::models::requirement::Requirement;
use crate::models::resume::{ResumeOutcome, ResumeStatus};
use crate::store::{Store, StoreError};

/// Score at or above which a resume counts as matched.
pub const MATCH_THRESHOLD: f64 = 70.0;

pub fn status_for_score(score: f64) -> ResumeStatus {
    if score >= MATCH_THRESHOLD {
        ResumeStatus::Matched
    } else {
        ResumeStatus::Analyzed
    }
}

/// Appends a new analysis record, then writes the outcome back onto the resume.
///
/// The two writes are separate statements with no transaction: if the second
/// one fails the analysis row stays and the resume keeps its previous status.
pub async fn record(
    store: &dyn Store,
    resume_id: Uuid,
    requirement: &Requirement,
    result: &AnalysisResult,
    user_id: Uuid,
) -> Result<AnalysisRecord, StoreError> {
    let analysis = store
        .insert_analysis(NewAnalysis {
            resume_id,
            user_id,
            requirement: requirement.clone(),
            result: result.clone(),
        })
        .await?;

    let outcome = ResumeOutcome {
        status: status_for_score(result.match_score),
        matches_requirements: result.matches_requirements,
        match_score: result.match_score,
        analyzed_at: analysis.created_at,
    };
    store.apply_analysis_outcome(resume_id, &outcome).await?;

    info!(
        %resume_id,
        analysis_id = %analysis.id,
        status = %outcome.status,
        score = result.match_score,
        "Analysis recorded"
    );
    Ok(analysis)
}
