use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::JobStatus;
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/jobs/:id
pub async fn handle_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatus>, AppError> {
    let status = state
        .queue
        .status(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))?;
    Ok(Json(status))
}
