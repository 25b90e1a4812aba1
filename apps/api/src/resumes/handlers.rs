//! Axum route handlers for the Resumes API.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeStatusView;
use crate::pipeline::{SubmissionReceipt, UploadedFile};
use crate::resumes::{resolve_mime_type, ALLOWED_MIME_TYPES};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListResumesQuery {
    pub job_id: Option<Uuid>,
}

/// The parts of an upload form we care about.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Option<String>, Bytes)>,
    job_id: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                form.file = Some((file_name, content_type, data));
            }
            Some("job_id") | Some("jobId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read job_id: {e}")))?;
                form.job_id = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes
/// Multipart: `resume` (PDF or DOCX) and `job_id`. Returns 202 once the document has
/// been handed off; processing continues in the background.
pub async fn handle_submit_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    let form = read_upload_form(multipart).await?;

    let (file_name, content_type, data) = form
        .file
        .ok_or_else(|| AppError::Validation("No file uploaded (expected field 'resume')".to_string()))?;
    let job_id: Uuid = form
        .job_id
        .ok_or_else(|| AppError::Validation("Job ID is required".to_string()))?
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("job_id must be a UUID".to_string()))?;

    let mime_type = resolve_mime_type(content_type.as_deref(), &file_name).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!(
            "Only PDF and DOCX files are allowed (accepted: {})",
            ALLOWED_MIME_TYPES.join(", ")
        ))
    })?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if data.len() > state.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {} byte limit",
            state.max_upload_bytes
        )));
    }

    let job = state
        .jobs
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job description {job_id} not found")))?;

    let receipt = state
        .orchestrator
        .submit_resume(
            UploadedFile {
                original_filename: file_name,
                mime_type: mime_type.to_string(),
                bytes: data,
            },
            &job,
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/v1/resumes?job_id=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<ListResumesQuery>,
) -> Result<Json<Vec<ResumeStatusView>>, AppError> {
    let records = state.resumes.list(params.job_id).await?;
    Ok(Json(records.into_iter().map(ResumeStatusView::from).collect()))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeStatusView>, AppError> {
    let record = state
        .resumes
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    Ok(Json(record.into()))
}

/// POST /api/v1/resumes/:id/reprocess
pub async fn handle_reprocess_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    let receipt = state.orchestrator.force_reprocess(id).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /api/v1/tasks/:task_id
pub async fn handle_get_by_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ResumeStatusView>, AppError> {
    let record = state
        .resumes
        .find_by_task_id(&task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No resume for task {task_id}")))?;
    Ok(Json(record.into()))
}
