use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::analyses::MATCH_THRESHOLD;
use crate::models::analysis::{
    AnalysisFilter, AnalysisRecord, AnalysisResult, AnalysisSummary, DateRange, NewAnalysis,
    PositionStatistics,
};
use crate::models::requirement::{
    Requirement, RequirementFilter, RequirementPatch, RequirementRecord, SkillRequirement,
};
use crate::models::resume::{NewResume, Resume, ResumeFilter, ResumeOutcome, ResumeStatus};
use crate::models::user::User;
use crate::parser::DocumentFormat;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct RequirementRow {
    id: Uuid,
    user_id: Uuid,
    job_title: String,
    experience_years: Option<i32>,
    education: Option<String>,
    skills: Json<Vec<SkillRequirement>>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequirementRow> for RequirementRecord {
    type Error = StoreError;

    fn try_from(row: RequirementRow) -> Result<Self, Self::Error> {
        Ok(RequirementRecord {
            id: row.id,
            user_id: row.user_id,
            job_title: row.job_title,
            experience_years: years_from_db(row.experience_years)?,
            education: row.education,
            skills: row.skills.0,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ResumeRow {
    id: Uuid,
    candidate_name: String,
    position: String,
    file_path: String,
    file_name: String,
    file_type: String,
    content: String,
    status: String,
    match_score: Option<f64>,
    matches_requirements: Option<bool>,
    uploaded_at: DateTime<Utc>,
    last_analyzed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ResumeRow> for Resume {
    type Error = StoreError;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let file_type = DocumentFormat::from_extension(&row.file_type).ok_or_else(|| {
            StoreError::Corrupt(format!("resume {} has file_type '{}'", row.id, row.file_type))
        })?;
        let status = row.status.parse::<ResumeStatus>().map_err(StoreError::Corrupt)?;
        Ok(Resume {
            id: row.id,
            candidate_name: row.candidate_name,
            position: row.position,
            file_path: row.file_path,
            file_name: row.file_name,
            file_type,
            content: row.content,
            status,
            match_score: row.match_score,
            matches_requirements: row.matches_requirements,
            uploaded_at: row.uploaded_at,
            last_analyzed_at: row.last_analyzed_at,
        })
    }
}

#[derive(FromRow)]
struct AnalysisRow {
    id: Uuid,
    resume_id: Uuid,
    user_id: Uuid,
    requirement: Json<Requirement>,
    result: Json<AnalysisResult>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        AnalysisRecord {
            id: row.id,
            resume_id: row.resume_id,
            user_id: row.user_id,
            requirement: row.requirement.0,
            result: row.result.0,
            created_at: row.created_at,
        }
    }
}

fn years_from_db(years: Option<i32>) -> Result<Option<u32>, StoreError> {
    years
        .map(|y| {
            u32::try_from(y)
                .map_err(|_| StoreError::Corrupt(format!("negative experience_years {y}")))
        })
        .transpose()
}

fn years_to_db(years: Option<u32>) -> Result<Option<i32>, StoreError> {
    years
        .map(|y| {
            i32::try_from(y)
                .map_err(|_| StoreError::OutOfRange(format!("experience_years {y}")))
        })
        .transpose()
}

const REQUIREMENT_COLUMNS: &str = "id, user_id, job_title, experience_years, education, skills, \
     description, created_at, updated_at";
const RESUME_COLUMNS: &str = "id, candidate_name, position, file_path, file_name, file_type, \
     content, status, match_score, matches_requirements, uploaded_at, last_analyzed_at";
const ANALYSIS_COLUMNS: &str = "id, resume_id, user_id, requirement, result, created_at";

// ────────────────────────────────────────────────────────────────────────────
// Store implementation
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Store for PgStore {
    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            "SELECT id, email, username, full_name, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(|u| u.email))
    }

    async fn insert_requirement(
        &self,
        user_id: Uuid,
        requirement: &Requirement,
    ) -> Result<RequirementRecord, StoreError> {
        let row: RequirementRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO requirements
                (id, user_id, job_title, experience_years, education, skills, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {REQUIREMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&requirement.job_title)
        .bind(years_to_db(requirement.experience_years)?)
        .bind(&requirement.education)
        .bind(Json(&requirement.skills))
        .bind(&requirement.description)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_requirement(&self, id: Uuid) -> Result<Option<RequirementRecord>, StoreError> {
        let row: Option<RequirementRow> = sqlx::query_as(&format!(
            "SELECT {REQUIREMENT_COLUMNS} FROM requirements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
    ) -> Result<Vec<RequirementRecord>, StoreError> {
        let rows: Vec<RequirementRow> = sqlx::query_as(&format!(
            r#"
            SELECT {REQUIREMENT_COLUMNS} FROM requirements
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR job_title ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.job_title.as_deref())
        .bind(filter.page.limit)
        .bind(filter.page.skip)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_requirement(
        &self,
        id: Uuid,
        patch: &RequirementPatch,
    ) -> Result<Option<RequirementRecord>, StoreError> {
        let row: Option<RequirementRow> = sqlx::query_as(&format!(
            r#"
            UPDATE requirements SET
                job_title        = COALESCE($2, job_title),
                experience_years = COALESCE($3, experience_years),
                education        = COALESCE($4, education),
                skills           = COALESCE($5, skills),
                description      = COALESCE($6, description),
                updated_at       = NOW()
            WHERE id = $1
            RETURNING {REQUIREMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.job_title.as_deref())
        .bind(years_to_db(patch.experience_years)?)
        .bind(patch.education.as_deref())
        .bind(patch.skills.as_ref().map(Json))
        .bind(patch.description.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn delete_requirement(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM requirements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_resume(&self, resume: NewResume) -> Result<Resume, StoreError> {
        let row: ResumeRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO resumes
                (id, candidate_name, position, file_path, file_name, file_type, content, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESUME_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&resume.candidate_name)
        .bind(&resume.position)
        .bind(&resume.file_path)
        .bind(&resume.file_name)
        .bind(resume.file_type.as_str())
        .bind(&resume.content)
        .bind(ResumeStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        let row: Option<ResumeRow> =
            sqlx::query_as(&format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_resumes(&self, filter: &ResumeFilter) -> Result<Vec<Resume>, StoreError> {
        let rows: Vec<ResumeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESUME_COLUMNS} FROM resumes
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY uploaded_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.page.limit)
        .bind(filter.page.skip)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn apply_analysis_outcome(
        &self,
        resume_id: Uuid,
        outcome: &ResumeOutcome,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE resumes SET
                status = $2,
                matches_requirements = $3,
                match_score = $4,
                last_analyzed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(resume_id)
        .bind(outcome.status.as_str())
        .bind(outcome.matches_requirements)
        .bind(outcome.match_score)
        .bind(outcome.analyzed_at)
        .execute(&self.pool)
        .await?;
        debug!(%resume_id, status = %outcome.status, "Resume outcome updated");
        Ok(())
    }

    async fn insert_analysis(&self, analysis: NewAnalysis) -> Result<AnalysisRecord, StoreError> {
        // Append-only: analysis rows are never updated.
        let row: AnalysisRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO analyses
                (id, resume_id, user_id, requirement_id, requirement, result, match_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(analysis.resume_id)
        .bind(analysis.user_id)
        .bind(analysis.requirement.id)
        .bind(Json(&analysis.requirement))
        .bind(Json(&analysis.result))
        .bind(analysis.result.match_score)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_analysis(&self, id: Uuid) -> Result<Option<AnalysisRecord>, StoreError> {
        let row: Option<AnalysisRow> =
            sqlx::query_as(&format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn latest_analysis_for_resume(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<AnalysisRecord>, StoreError> {
        let row: Option<AnalysisRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ANALYSIS_COLUMNS} FROM analyses
            WHERE resume_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_analyses(
        &self,
        filter: &AnalysisFilter,
    ) -> Result<Vec<AnalysisRecord>, StoreError> {
        let rows: Vec<AnalysisRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ANALYSIS_COLUMNS} FROM analyses
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR resume_id = $2)
              AND ($3::uuid IS NULL OR requirement_id = $3)
              AND ($4::float8 IS NULL OR match_score >= $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.resume_id)
        .bind(filter.requirement_id)
        .bind(filter.min_score)
        .bind(filter.page.limit)
        .bind(filter.page.skip)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn analysis_summary(
        &self,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<AnalysisSummary, StoreError> {
        let (total, matched): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE match_score >= $2)
            FROM analyses
            WHERE user_id = $1
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at <= $4)
            "#,
        )
        .bind(user_id)
        .bind(MATCH_THRESHOLD)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let positions: Vec<(String, i64, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT r.position, COUNT(*), AVG(a.match_score)
            FROM analyses a
            JOIN resumes r ON r.id = a.resume_id
            WHERE a.user_id = $1
              AND ($2::timestamptz IS NULL OR a.created_at >= $2)
              AND ($3::timestamptz IS NULL OR a.created_at <= $3)
            GROUP BY r.position
            ORDER BY COUNT(*) DESC, r.position
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let position_statistics = positions
            .into_iter()
            .map(|(position, count, avg)| PositionStatistics {
                position,
                count,
                avg_score: avg.unwrap_or(0.0),
            })
            .collect();

        Ok(AnalysisSummary::new(total, matched, position_statistics))
    }
}
