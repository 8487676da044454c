use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::{AnalysisFilter, AnalysisRecord, AnalysisSummary, DateRange};
use crate::models::Page;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListAnalysesQuery {
    pub user_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub requirement_id: Option<Uuid>,
    pub min_score: Option<f64>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub user_id: Uuid,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// GET /api/v1/analyses
/// Always scoped to the acting user.
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    Query(params): Query<ListAnalysesQuery>,
) -> Result<Json<Vec<AnalysisRecord>>, AppError> {
    let filter = AnalysisFilter {
        user_id: params.user_id,
        resume_id: params.resume_id,
        requirement_id: params.requirement_id,
        min_score: params.min_score,
        page: Page::new(params.limit, params.skip),
    };
    Ok(Json(state.store.list_analyses(&filter).await?))
}

/// GET /api/v1/analyses/:id?user_id=
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<AnalysisRecord>, AppError> {
    let analysis = state
        .store
        .get_analysis(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("analysis {id}")))?;

    if analysis.user_id != params.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(Json(analysis))
}

/// GET /api/v1/analyses/statistics/summary
pub async fn handle_analysis_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<AnalysisSummary>, AppError> {
    if let (Some(start), Some(end)) = (params.start_date, params.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }
    let range = DateRange {
        start: params.start_date,
        end: params.end_date,
    };
    Ok(Json(
        state.store.analysis_summary(params.user_id, range).await?,
    ))
}
