//! In-memory stores for tests. Same conditional-update semantics as `PgStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::models::job::{JobCategory, JobDescription};
use crate::models::resume::{ContactInfo, ExtractedProfile, ResumeRecord};
use crate::storage::{DocumentStore, JobStore, ResumeStore, RunRef, StoreError};

#[derive(Default)]
pub struct InMemoryStore {
    /// Insertion order is upload order.
    resumes: Mutex<Vec<ResumeRecord>>,
    jobs: Mutex<Vec<JobDescription>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, bypassing the pipeline.
    pub fn seed(&self, record: ResumeRecord) {
        self.resumes.lock().unwrap().push(record);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<ResumeRecord> {
        self.resumes.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn all(&self) -> Vec<ResumeRecord> {
        self.resumes.lock().unwrap().clone()
    }

    fn update<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut ResumeRecord) -> bool,
    {
        let mut resumes = self.resumes.lock().unwrap();
        match resumes.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                let applied = apply(record);
                if applied {
                    record.updated_at = Utc::now();
                }
                applied
            }
            None => false,
        }
    }
}

#[async_trait]
impl ResumeStore for InMemoryStore {
    async fn insert(&self, record: &ResumeRecord) -> Result<(), StoreError> {
        self.resumes.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ResumeRecord>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<ResumeRecord>, StoreError> {
        Ok(self
            .resumes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.task_id.as_deref() == Some(task_id))
            .cloned())
    }

    async fn list(&self, job_id: Option<Uuid>) -> Result<Vec<ResumeRecord>, StoreError> {
        let mut records: Vec<ResumeRecord> = self
            .all()
            .into_iter()
            .filter(|r| job_id.map_or(true, |j| r.job_id == j))
            .collect();
        records.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then(b.uploaded_at.cmp(&a.uploaded_at))
        });
        Ok(records)
    }

    async fn list_in_flight(&self) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self.all().into_iter().filter(|r| r.processing).collect())
    }

    async fn list_processed_for_job(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|r| r.job_id == job_id && r.processed)
            .collect())
    }

    async fn list_shortlisted(&self, job_id: Uuid) -> Result<Vec<ResumeRecord>, StoreError> {
        let mut records: Vec<ResumeRecord> = self
            .all()
            .into_iter()
            .filter(|r| r.job_id == job_id && r.processed && r.shortlisted)
            .collect();
        records.sort_by(|a, b| b.match_score.cmp(&a.match_score));
        Ok(records)
    }

    async fn reset_for_submission(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        let mut attempt = None;
        self.update(id, |r| {
            r.processing = true;
            r.processed = false;
            r.processing_error = None;
            r.task_id = None;
            r.submission_attempt += 1;
            r.candidate_name = None;
            r.contact_info = ContactInfo::default();
            r.skills.clear();
            r.education.clear();
            r.experience.clear();
            r.projects.clear();
            r.match_score = 0;
            r.shortlisted = false;
            attempt = Some(r.submission_attempt);
            true
        });
        Ok(attempt)
    }

    async fn record_task_id(
        &self,
        id: Uuid,
        attempt: i32,
        task_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.update(id, |r| {
            if !r.processing || r.task_id.is_some() || r.submission_attempt != attempt {
                return false;
            }
            r.task_id = Some(task_id.to_string());
            true
        }))
    }

    async fn complete(
        &self,
        id: Uuid,
        task_id: &str,
        profile: &ExtractedProfile,
    ) -> Result<bool, StoreError> {
        Ok(self.update(id, |r| {
            if !r.processing || r.task_id.as_deref() != Some(task_id) {
                return false;
            }
            r.candidate_name = profile.candidate_name.clone();
            r.contact_info = profile.contact_info.clone();
            r.skills = profile.distinct_skills();
            r.education = profile.education.clone();
            r.experience = profile.experience.clone();
            r.projects = profile.projects.clone();
            r.match_score = profile.normalized_score();
            r.processing = false;
            r.processed = true;
            r.processing_error = None;
            true
        }))
    }

    async fn fail(&self, id: Uuid, run: RunRef<'_>, error: &str) -> Result<bool, StoreError> {
        Ok(self.update(id, |r| {
            let current = match run {
                RunRef::Submission(attempt) => r.task_id.is_none() && r.submission_attempt == attempt,
                RunRef::Task(task_id) => r.task_id.as_deref() == Some(task_id),
            };
            if !r.processing || !current {
                return false;
            }
            r.processing = false;
            r.processed = false;
            r.processing_error = Some(error.to_string());
            true
        }))
    }

    async fn apply_shortlist(&self, job_id: Uuid, shortlisted: &[Uuid]) -> Result<(), StoreError> {
        let mut resumes = self.resumes.lock().unwrap();
        for record in resumes
            .iter_mut()
            .filter(|r| r.job_id == job_id && r.processed)
        {
            record.shortlisted = shortlisted.contains(&record.id);
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn insert_job(&self, job: &JobDescription) -> Result<(), StoreError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDescription>, StoreError> {
        Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(
        &self,
        category: Option<JobCategory>,
    ) -> Result<Vec<JobDescription>, StoreError> {
        let mut jobs: Vec<JobDescription> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| category.map_or(true, |c| j.category == c))
            .cloned()
            .collect();
        jobs.reverse();
        Ok(jobs)
    }
}

#[derive(Default)]
pub struct InMemoryDocuments {
    documents: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocuments {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), StoreError> {
        self.documents.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Bytes, StoreError> {
        self.documents
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::DocumentMissing(key.to_string()))
    }
}
