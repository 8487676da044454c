use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{validate_patch, validate_requirement};
use crate::errors::AppError;
use crate::models::requirement::{
    Requirement, RequirementFilter, RequirementPatch, RequirementRecord,
};
use crate::models::Page;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateRequirementRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub requirement: Requirement,
}

#[derive(Deserialize)]
pub struct ListRequirementsQuery {
    pub user_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

async fn owned_requirement(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<RequirementRecord, AppError> {
    let record = state
        .store
        .get_requirement(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("requirement {id}")))?;
    if record.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

/// POST /api/v1/requirements
pub async fn handle_create_requirement(
    State(state): State<AppState>,
    Json(req): Json<CreateRequirementRequest>,
) -> Result<(StatusCode, Json<RequirementRecord>), AppError> {
    validate_requirement(&req.requirement).map_err(AppError::Validation)?;
    let record = state
        .store
        .insert_requirement(req.user_id, &req.requirement)
        .await?;
    tracing::info!(requirement_id = %record.id, user_id = %record.user_id, "Requirement created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/requirements
pub async fn handle_list_requirements(
    State(state): State<AppState>,
    Query(params): Query<ListRequirementsQuery>,
) -> Result<Json<Vec<RequirementRecord>>, AppError> {
    let filter = RequirementFilter {
        user_id: params.user_id,
        job_title: params.job_title.filter(|t| !t.trim().is_empty()),
        page: Page::new(params.limit, params.skip),
    };
    Ok(Json(state.store.list_requirements(&filter).await?))
}

/// GET /api/v1/requirements/:id?user_id=
pub async fn handle_get_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<RequirementRecord>, AppError> {
    Ok(Json(owned_requirement(&state, id, owner.user_id).await?))
}

/// PUT /api/v1/requirements/:id?user_id=
/// Absent fields keep their stored values.
pub async fn handle_update_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
    Json(patch): Json<RequirementPatch>,
) -> Result<Json<RequirementRecord>, AppError> {
    validate_patch(&patch).map_err(AppError::Validation)?;
    owned_requirement(&state, id, owner.user_id).await?;

    let updated = state
        .store
        .update_requirement(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("requirement {id}")))?;
    Ok(Json(updated))
}

/// DELETE /api/v1/requirements/:id?user_id=
/// Past analyses keep their embedded snapshot.
pub async fn handle_delete_requirement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    owned_requirement(&state, id, owner.user_id).await?;
    if !state.store.delete_requirement(id).await? {
        return Err(AppError::NotFound(format!("requirement {id}")));
    }
    tracing::info!(requirement_id = %id, "Requirement deleted");
    Ok(StatusCode::NO_CONTENT)
}
