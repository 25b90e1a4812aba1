//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobCategory, JobCategoryInfo, JobDescription, NewJobDescription};
use crate::models::resume::ResumeStatusView;
use crate::shortlist::{JobStats, ShortlistReport};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub job_id: Uuid,
    pub count: usize,
    pub candidates: Vec<ResumeStatusView>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

async fn load_job(state: &AppState, id: Uuid) -> Result<JobDescription, AppError> {
    state
        .jobs
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job description {id} not found")))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<NewJobDescription>,
) -> Result<(StatusCode, Json<JobDescription>), AppError> {
    req.validate().map_err(AppError::Validation)?;

    let job = req.into_job(Uuid::new_v4());
    state.jobs.insert_job(&job).await?;
    tracing::info!(job_id = %job.id, "Created job description '{}'", job.title);

    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs?category=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobDescription>>, AppError> {
    let category = params
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<JobCategory>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(Json(state.jobs.list_jobs(category).await?))
}

/// GET /api/v1/job-categories
pub async fn handle_list_categories() -> Json<Vec<JobCategoryInfo>> {
    Json(JobCategory::ALL.iter().map(JobCategory::info).collect())
}

/// GET /api/v1/job-categories/:id
pub async fn handle_get_category(Path(id): Path<String>) -> Result<Json<JobCategoryInfo>, AppError> {
    let category: JobCategory = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("Job category {id} not found")))?;
    Ok(Json(category.info()))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDescription>, AppError> {
    Ok(Json(load_job(&state, id).await?))
}

/// GET /api/v1/jobs/:id/shortlist
pub async fn handle_get_shortlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShortlistResponse>, AppError> {
    load_job(&state, id).await?;

    let candidates: Vec<ResumeStatusView> = state
        .shortlist
        .shortlist(id)
        .await?
        .into_iter()
        .map(ResumeStatusView::from)
        .collect();

    Ok(Json(ShortlistResponse {
        job_id: id,
        count: candidates.len(),
        candidates,
    }))
}

/// POST /api/v1/jobs/:id/shortlist
/// Recomputes the shortlist now and notifies anyone newly on it.
pub async fn handle_recompute_shortlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShortlistReport>, AppError> {
    load_job(&state, id).await?;
    Ok(Json(state.shortlist.recompute_and_notify(id).await?))
}

/// GET /api/v1/jobs/:id/stats
pub async fn handle_job_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStats>, AppError> {
    load_job(&state, id).await?;
    Ok(Json(state.shortlist.stats(id).await?))
}
