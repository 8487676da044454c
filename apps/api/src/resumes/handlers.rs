use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::upload::{check_extension, ingest_upload, UploadError, UploadForm};
use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::models::requirement::Requirement;
use crate::models::resume::{Resume, ResumeFilter, ResumeStatus};
use crate::models::Page;
use crate::parser::DocumentFormat;
use crate::pipeline::AnalysisRequest;
use crate::queue::{AnalysisJob, JobState};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub candidate_name: String,
    pub position: String,
    pub file_name: String,
    pub file_type: DocumentFormat,
    pub status: ResumeStatus,
    pub uploaded_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ListResumesQuery {
    pub status: Option<ResumeStatus>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

/// Listing view without the extracted text.
#[derive(Serialize)]
pub struct ResumeListItem {
    pub id: Uuid,
    pub candidate_name: String,
    pub position: String,
    pub file_name: String,
    pub file_type: DocumentFormat,
    pub status: ResumeStatus,
    pub match_score: Option<f64>,
    pub matches_requirements: Option<bool>,
    pub uploaded_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
}

impl From<Resume> for ResumeListItem {
    fn from(r: Resume) -> Self {
        Self {
            id: r.id,
            candidate_name: r.candidate_name,
            position: r.position,
            file_name: r.file_name,
            file_type: r.file_type,
            status: r.status,
            match_score: r.match_score,
            matches_requirements: r.matches_requirements,
            uploaded_at: r.uploaded_at,
            last_analyzed_at: r.last_analyzed_at,
        }
    }
}

#[derive(Serialize)]
pub struct ResumeDetail {
    #[serde(flatten)]
    pub resume: Resume,
    pub analysis_result: Option<AnalysisResult>,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub user_id: Uuid,
    pub requirements: Option<Requirement>,
    pub requirement_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub resume_id: Uuid,
    pub candidate_name: String,
    pub analysis_id: Uuid,
    pub analysis_result: AnalysisResult,
    pub message: String,
}

#[derive(Serialize)]
pub struct EnqueueResponse {
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub status: JobState,
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge { limit }.into();
    }
    AppError::Validation(format!("malformed multipart body: {}", err.body_text()))
}

/// POST /api/v1/resumes/upload
/// Multipart fields: `file`, `candidate_name`, `position`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = state.config.max_upload_size;
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut candidate_name = None;
    let mut position = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                // Reject before the body is buffered.
                check_extension(&file_name)?;
                let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                file = Some((file_name, data));
            }
            "candidate_name" => {
                candidate_name = Some(field.text().await.map_err(|e| multipart_error(e, limit))?)
            }
            "position" => {
                position = Some(field.text().await.map_err(|e| multipart_error(e, limit))?)
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or(UploadError::MissingField("file"))?;
    let candidate_name = candidate_name
        .filter(|s| !s.trim().is_empty())
        .ok_or(UploadError::MissingField("candidate_name"))?;
    let position = position
        .filter(|s| !s.trim().is_empty())
        .ok_or(UploadError::MissingField("position"))?;

    let resume = ingest_upload(
        state.store.as_ref(),
        &state.config.upload_dir,
        limit,
        UploadForm {
            file_name,
            bytes,
            candidate_name,
            position,
        },
    )
    .await?;

    Ok(Json(UploadResponse {
        id: resume.id,
        candidate_name: resume.candidate_name,
        position: resume.position,
        file_name: resume.file_name,
        file_type: resume.file_type,
        status: resume.status,
        uploaded_at: resume.uploaded_at,
        message: "Resume uploaded successfully, pending analysis".to_string(),
    }))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<ListResumesQuery>,
) -> Result<Json<Vec<ResumeListItem>>, AppError> {
    let filter = ResumeFilter {
        status: params.status,
        page: Page::new(params.limit, params.skip),
    };
    let resumes = state.store.list_resumes(&filter).await?;
    Ok(Json(resumes.into_iter().map(ResumeListItem::from).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDetail>, AppError> {
    let resume = state
        .store
        .get_resume(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("resume {id}")))?;
    let analysis_result = state
        .store
        .latest_analysis_for_resume(id)
        .await?
        .map(|record| record.result);
    Ok(Json(ResumeDetail {
        resume,
        analysis_result,
    }))
}

/// POST /api/v1/resumes/:id/analyze
/// Runs the pipeline inline and answers with the stored result.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let requirement = state
        .pipeline
        .resolve_requirement(req.user_id, req.requirements, req.requirement_id)
        .await?;

    let outcome = state
        .pipeline
        .run_analysis(AnalysisRequest {
            task_id: Uuid::new_v4(),
            resume_id,
            user_id: req.user_id,
            requirement,
        })
        .await?;

    Ok(Json(AnalyzeResponse {
        resume_id,
        candidate_name: outcome.resume.candidate_name,
        analysis_id: outcome.record.id,
        analysis_result: outcome.record.result,
        message: "Resume analysis completed".to_string(),
    }))
}

/// POST /api/v1/resumes/:id/analyze/async
/// Queues the analysis; progress is readable at /api/v1/jobs/:job_id.
pub async fn handle_analyze_async(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    let requirement = state
        .pipeline
        .resolve_requirement(req.user_id, req.requirements, req.requirement_id)
        .await?;

    if state.store.get_resume(resume_id).await?.is_none() {
        return Err(AppError::NotFound(format!("resume {resume_id}")));
    }

    let job = AnalysisJob::new(resume_id, req.user_id, requirement);
    state.queue.enqueue(&job).await?;
    tracing::info!(job_id = %job.job_id, %resume_id, "Analysis job queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id: job.job_id,
            resume_id,
            status: JobState::Queued,
        }),
    ))
}
