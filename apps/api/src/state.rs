use std::sync::Arc;

use crate::pipeline::Orchestrator;
use crate::shortlist::ShortlistEngine;
use crate::storage::{JobStore, ResumeStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub resumes: Arc<dyn ResumeStore>,
    pub jobs: Arc<dyn JobStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub shortlist: Arc<ShortlistEngine>,
    /// Upload size limit, from `Config::max_upload_bytes`.
    pub max_upload_bytes: usize,
}
