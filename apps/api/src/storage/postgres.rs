use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::job::{JobCategory, JobDescription, JobDescriptionRow};
use crate::models::resume::{ExtractedProfile, ResumeRecord, ResumeRow};
use crate::storage::{JobStore, ResumeStore, RunRef, StoreError};

const RESUME_COLUMNS: &str = "id, original_filename, stored_filename, file_size, mime_type, \
    storage_path, job_id, processing, processed, processing_error, task_id, submission_attempt, \
    candidate_name, contact_info, skills, education, experience, projects, match_score, \
    shortlisted, uploaded_at, updated_at";

/// PostgreSQL-backed resume and job store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_resumes(
        &self,
        where_clause: &str,
        order_by: &str,
        job_id: Option<Uuid>,
    ) -> Result<Vec<ResumeRecord>, StoreError> {
        let sql = format!("SELECT {RESUME_COLUMNS} FROM resumes {where_clause} ORDER BY {order_by}");
        let mut query = sqlx::query_as::<_, ResumeRow>(&sql);
        if let Some(job_id) = job_id {
            query = query.bind(job_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ResumeRecord::from).collect())
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, original_filename, stored_filename, file_size, mime_type, storage_path,
                 job_id, processing, processed, processing_error, task_id, submission_attempt,
                 candidate_name, contact_info, skills, education, experience, projects,
                 match_score, shortlisted, uploaded_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(record.id)
        .bind(&record.original_filename)
        .bind(&record.stored_filename)
        .bind(record.file_size)
        .bind(&record.mime_type)
        .bind(&record.storage_path)
        .bind(record.job_id)
        .bind(record.processing)
        .bind(record.processed)
        .bind(&record.processing_error)
        .bind(&record.task_id)
        .bind(record.submission_attempt)
        .bind(&record.candidate_name)
        .bind(Json(&record.contact_info))
        .bind(&record.skills)
        .bind(Json(&record.education))
        .bind(Json(&record.experience))
        .bind(Json(&record.projects))
        .bind(record.match_score)
        .bind(record.shortlisted)
        .bind(record.uploaded_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(resume_id = %record.id, "Inserted resume record");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError> {
        let sql = format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1");
        let row = sqlx::query_as::<_, ResumeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ResumeRecord::from))
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        let sql = format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE task_id = $1 LIMIT 1");
        let row = sqlx::query_as::<_, ResumeRow>(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ResumeRecord::from))
    }

    async fn list(&self, job_id: Option<Uuid>) -> Result<Vec<ResumeRecord>, StoreError> {
        let where_clause = if job_id.is_some() { "WHERE job_id = $1" } else { "" };
        self.fetch_resumes(where_clause, "match_score DESC, uploaded_at DESC", job_id)
            .await
    }

    async fn list_in_flight(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        self.fetch_resumes("WHERE processing", "uploaded_at ASC, id ASC", None)
            .await
    }

    async fn list_processed_for_job(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError> {
        self.fetch_resumes(
            "WHERE job_id = $1 AND processed",
            "uploaded_at ASC, id ASC",
            Some(job_id),
        )
        .await
    }

    async fn list_shortlisted(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError> {
        self.fetch_resumes(
            "WHERE job_id = $1 AND processed AND shortlisted",
            "match_score DESC, uploaded_at ASC, id ASC",
            Some(job_id),
        )
        .await
    }

    async fn reset_for_submission(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        let attempt: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE resumes
            SET processing = TRUE, processed = FALSE, processing_error = NULL,
                task_id = NULL, submission_attempt = submission_attempt + 1,
                candidate_name = NULL, contact_info = '{}', skills = '{}',
                education = '[]', experience = '[]', projects = '[]',
                match_score = 0, shortlisted = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING submission_attempt
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn record_task_id(
        &self,
        id: Uuid,
        attempt: i32,
        task_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET task_id = $3, updated_at = NOW()
            WHERE id = $1 AND submission_attempt = $2 AND processing AND task_id IS NULL
            "#,
        )
        .bind(id)
        .bind(attempt)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete(
        &self,
        id: Uuid,
        task_id: &str,
        profile: &ExtractedProfile,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET candidate_name = $3, contact_info = $4, skills = $5, education = $6,
                experience = $7, projects = $8, match_score = $9,
                processing = FALSE, processed = TRUE, processing_error = NULL,
                updated_at = NOW()
            WHERE id = $1 AND task_id = $2 AND processing
            "#,
        )
        .bind(id)
        .bind(task_id)
        .bind(&profile.candidate_name)
        .bind(Json(&profile.contact_info))
        .bind(profile.distinct_skills())
        .bind(Json(&profile.education))
        .bind(Json(&profile.experience))
        .bind(Json(&profile.projects))
        .bind(profile.normalized_score())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, id: Uuid, run: RunRef<'_>, error: &str) -> Result<bool, StoreError> {
        let query = match run {
            RunRef::Submission(attempt) => sqlx::query(
                r#"
                UPDATE resumes
                SET processing = FALSE, processed = FALSE, processing_error = $3,
                    updated_at = NOW()
                WHERE id = $1 AND submission_attempt = $2 AND processing AND task_id IS NULL
                "#,
            )
            .bind(id)
            .bind(attempt),
            RunRef::Task(task_id) => sqlx::query(
                r#"
                UPDATE resumes
                SET processing = FALSE, processed = FALSE, processing_error = $3,
                    updated_at = NOW()
                WHERE id = $1 AND task_id = $2 AND processing
                "#,
            )
            .bind(id)
            .bind(task_id),
        };
        let result = query.bind(error).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn apply_shortlist(&self, job_id: Uuid, shortlisted: &[Uuid]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE resumes SET shortlisted = FALSE, updated_at = NOW() \
             WHERE job_id = $1 AND processed AND shortlisted",
        )
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if !shortlisted.is_empty() {
            sqlx::query(
                "UPDATE resumes SET shortlisted = TRUE, updated_at = NOW() \
                 WHERE job_id = $1 AND processed AND id = ANY($2)",
            )
            .bind(job_id)
            .bind(shortlisted)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_job(&self, job: &JobDescription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_descriptions
                (id, title, category, description, required_skills, preferred_skills,
                 required_experience, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id)
        .bind(&job.title)
        .bind(job.category.as_str())
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(&job.preferred_skills)
        .bind(job.required_experience)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>, StoreError> {
        let row = sqlx::query_as::<_, JobDescriptionRow>(
            "SELECT * FROM job_descriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobDescription::try_from)
            .transpose()
            .map_err(StoreError::Corrupt)
    }

    async fn list_jobs(
        &self,
        category: Option<JobCategory>,
    ) -> Result<Vec<JobDescription>, StoreError> {
        let rows = sqlx::query_as::<_, JobDescriptionRow>(
            "SELECT * FROM job_descriptions \
             WHERE $1::TEXT IS NULL OR category = $1 \
             ORDER BY created_at DESC",
        )
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| JobDescription::try_from(row).map_err(StoreError::Corrupt))
            .collect()
    }
}
