use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Contact details pulled out of a resume. Every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

impl ContactInfo {
    /// The email address, if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: Option<String>,
    pub position: Option<String>,
    /// Free-form, e.g. "Jan 2020 - Present". Not parsed.
    pub duration: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Vec<String>,
    pub duration: Option<String>,
}

/// The `result.data` payload of a successful NLP task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractedProfile {
    pub candidate_name: Option<String>,
    pub contact_info: ContactInfo,
    pub skills: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
    pub match_score: f64,
}

impl ExtractedProfile {
    /// Upstream scores are floats of varying precision; records hold an integer 0–100.
    pub fn normalized_score(&self) -> i32 {
        if self.match_score.is_finite() {
            self.match_score.round().clamp(0.0, 100.0) as i32
        } else {
            0
        }
    }

    /// Skills deduplicated case-insensitively, first spelling wins, order preserved.
    pub fn distinct_skills(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

/// Where a record sits in the processing pipeline, derived from its lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Submitting,
    Polling,
    Completed,
    Failed,
    /// Lifecycle flags are all false with no error: never observed in a healthy store.
    Idle,
}

/// A resume and everything the pipeline knows about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    /// Key in the document store.
    pub storage_path: String,
    pub job_id: Uuid,

    pub processing: bool,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub task_id: Option<String>,
    /// Bumped by every forced reprocess. Submission-phase writes carry the attempt they
    /// belong to, since there is no task id yet to tell runs apart.
    pub submission_attempt: i32,

    pub candidate_name: Option<String>,
    pub contact_info: ContactInfo,
    pub skills: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,

    pub match_score: i32,
    pub shortlisted: bool,

    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeRecord {
    /// A freshly accepted upload: `processing=true`, no task yet.
    pub fn new_upload(
        id: Uuid,
        job_id: Uuid,
        original_filename: &str,
        stored_filename: &str,
        file_size: i64,
        mime_type: &str,
        storage_path: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            original_filename: original_filename.to_string(),
            stored_filename: stored_filename.to_string(),
            file_size,
            mime_type: mime_type.to_string(),
            storage_path: storage_path.to_string(),
            job_id,
            processing: true,
            processed: false,
            processing_error: None,
            task_id: None,
            submission_attempt: 0,
            candidate_name: None,
            contact_info: ContactInfo::default(),
            skills: Vec::new(),
            education: Vec::new(),
            experience: Vec::new(),
            projects: Vec::new(),
            match_score: 0,
            shortlisted: false,
            uploaded_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match (self.processing, self.processed, &self.processing_error, &self.task_id) {
            (_, _, Some(_), _) => PipelineStage::Failed,
            (_, true, None, _) => PipelineStage::Completed,
            (true, false, None, None) => PipelineStage::Submitting,
            (true, false, None, Some(_)) => PipelineStage::Polling,
            (false, false, None, _) => PipelineStage::Idle,
        }
    }
}

/// Snapshot returned to callers: the record plus its derived stage.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeStatusView {
    #[serde(flatten)]
    pub record: ResumeRecord,
    pub stage: PipelineStage,
}

impl From<ResumeRecord> for ResumeStatusView {
    fn from(record: ResumeRecord) -> Self {
        let stage = record.stage();
        Self { record, stage }
    }
}

/// Row shape of the `resumes` table.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub storage_path: String,
    pub job_id: Uuid,
    pub processing: bool,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub task_id: Option<String>,
    pub submission_attempt: i32,
    pub candidate_name: Option<String>,
    pub contact_info: Json<ContactInfo>,
    pub skills: Vec<String>,
    pub education: Json<Vec<EducationEntry>>,
    pub experience: Json<Vec<ExperienceEntry>>,
    pub projects: Json<Vec<ProjectEntry>>,
    pub match_score: i32,
    pub shortlisted: bool,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        Self {
            id: row.id,
            original_filename: row.original_filename,
            stored_filename: row.stored_filename,
            file_size: row.file_size,
            mime_type: row.mime_type,
            storage_path: row.storage_path,
            job_id: row.job_id,
            processing: row.processing,
            processed: row.processed,
            processing_error: row.processing_error,
            task_id: row.task_id,
            submission_attempt: row.submission_attempt,
            candidate_name: row.candidate_name,
            contact_info: row.contact_info.0,
            skills: row.skills,
            education: row.education.0,
            experience: row.experience.0,
            projects: row.projects.0,
            match_score: row.match_score,
            shortlisted: row.shortlisted,
            uploaded_at: row.uploaded_at,
            updated_at: row.updated_at,
        }
    }
}
