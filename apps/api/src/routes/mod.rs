pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Room for multipart boundaries and the text fields next to the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            post(jobs::handle_create_job).get(jobs::handle_list_jobs),
        )
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        .route(
            "/api/v1/jobs/:id/shortlist",
            get(jobs::handle_get_shortlist).post(jobs::handle_recompute_shortlist),
        )
        .route("/api/v1/jobs/:id/stats", get(jobs::handle_job_stats))
        .route("/api/v1/job-categories", get(jobs::handle_list_categories))
        .route("/api/v1/job-categories/:id", get(jobs::handle_get_category))
        // Resumes API
        .route(
            "/api/v1/resumes",
            post(resumes::handle_submit_resume).get(resumes::handle_list_resumes),
        )
        .route("/api/v1/resumes/:id", get(resumes::handle_get_resume))
        .route(
            "/api/v1/resumes/:id/reprocess",
            post(resumes::handle_reprocess_resume),
        )
        .route("/api/v1/tasks/:task_id", get(resumes::handle_get_by_task))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::PollPolicy;
    use crate::models::job::{JobCategory, JobDescription, NewJobDescription};
    use crate::models::resume::ResumeRecord;
    use crate::nlp_client::{JobContext, NlpError, ResumeDocument, TaskClient, TaskStatusView};
    use crate::notifier::DisabledNotifier;
    use crate::pipeline::Orchestrator;
    use crate::shortlist::ShortlistEngine;
    use crate::storage::memory::{InMemoryDocuments, InMemoryStore};
    use crate::storage::JobStore;

    /// Accepts every document and fails every task, so background pipelines end fast.
    struct RejectingNlp;

    #[async_trait]
    impl TaskClient for RejectingNlp {
        async fn submit(&self, _: &ResumeDocument, _: &JobContext) -> Result<String, NlpError> {
            Ok("task-http".to_string())
        }

        async fn get_status(&self, _: &str) -> Result<TaskStatusView, NlpError> {
            Ok(TaskStatusView::Failed("unreadable document".to_string()))
        }
    }

    const BOUNDARY: &str = "screener-test-boundary";

    fn app(store: Arc<InMemoryStore>) -> Router {
        let documents = Arc::new(InMemoryDocuments::new());
        let shortlist = Arc::new(ShortlistEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(DisabledNotifier),
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            store.clone(),
            documents,
            Arc::new(RejectingNlp),
            shortlist.clone(),
            PollPolicy {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                backoff_factor: 1.0,
                max_delay: Duration::from_millis(1),
            },
        ));

        build_router(AppState {
            resumes: store.clone(),
            jobs: store,
            orchestrator,
            shortlist,
            max_upload_bytes: 1024,
        })
    }

    async fn seed_job(store: &InMemoryStore) -> JobDescription {
        let job = NewJobDescription {
            title: "Frontend Developer".to_string(),
            category: JobCategory::WebDeveloper,
            description: "React and TypeScript".to_string(),
            required_skills: vec!["React".to_string()],
            preferred_skills: vec![],
            required_experience: 1,
        }
        .into_job(Uuid::new_v4());
        store.insert_job(&job).await.unwrap();
        job
    }

    fn processed(job_id: Uuid, score: i32, task: &str) -> ResumeRecord {
        let mut r = ResumeRecord::new_upload(
            Uuid::new_v4(),
            job_id,
            "cv.pdf",
            "1-cv.pdf",
            10,
            "application/pdf",
            "resumes/x/1-cv.pdf",
        );
        r.processing = false;
        r.processed = true;
        r.task_id = Some(task.to_string());
        r.match_score = score;
        r
    }

    fn multipart_body(job_id: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_id\"\r\n\r\n{job_id}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/resumes")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(InMemoryStore::new()))
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "screener");
    }

    #[tokio::test]
    async fn test_create_and_fetch_job() {
        let store = Arc::new(InMemoryStore::new());
        let app = app(store);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/jobs",
                json!({
                    "title": "Pentester",
                    "category": "Cybersecurity",
                    "description": "Break things politely",
                    "required_skills": ["Burp Suite", " "],
                    "required_experience": 3
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["required_skills"], json!(["Burp Suite"]));

        let id = created["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/jobs/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["category"], "Cybersecurity");

        let response = app.oneshot(get("/api/v1/jobs")).await.unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_job_rejects_blank_title() {
        let response = app(Arc::new(InMemoryStore::new()))
            .oneshot(post_json(
                "/api/v1/jobs",
                json!({ "title": " ", "category": "Web Developer", "description": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let response = app(Arc::new(InMemoryStore::new()))
            .oneshot(get(&format!("/api/v1/jobs/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_jobs_filters_by_category() {
        let store = Arc::new(InMemoryStore::new());
        let web = seed_job(&store).await;
        let security = NewJobDescription {
            title: "SOC Analyst".to_string(),
            category: JobCategory::Cybersecurity,
            description: "Triage alerts".to_string(),
            required_skills: vec![],
            preferred_skills: vec![],
            required_experience: 0,
        }
        .into_job(Uuid::new_v4());
        store.insert_job(&security).await.unwrap();
        let app = app(store);

        let response = app
            .clone()
            .oneshot(get("/api/v1/jobs?category=Web%20Developer"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let jobs = body_json(response).await;
        assert_eq!(jobs.as_array().unwrap().len(), 1);
        assert_eq!(jobs[0]["id"], web.id.to_string());

        let response = app.clone().oneshot(get("/api/v1/jobs")).await.unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = app
            .oneshot(get("/api/v1/jobs?category=Astronaut"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_job_category_catalogue() {
        let app = app(Arc::new(InMemoryStore::new()));

        let response = app.clone().oneshot(get("/api/v1/job-categories")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let categories = body_json(response).await;
        let ids: Vec<&str> = categories
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            vec![
                "Cybersecurity",
                "Web Developer",
                "UET Peshawar",
                "Python Developer",
                "Software Engineer"
            ]
        );
        assert_eq!(categories[2]["name"], "Lecturer at UET Peshawar");

        let response = app
            .clone()
            .oneshot(get("/api/v1/job-categories/UET%20Peshawar"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "UET Peshawar");

        let response = app
            .oneshot(get("/api/v1/job-categories/Astronaut"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_is_accepted_and_tracked() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;

        let response = app(store.clone())
            .oneshot(upload_request(multipart_body(
                &job.id.to_string(),
                "jane.pdf",
                "application/pdf",
                b"%PDF-1.4 tiny",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let receipt = body_json(response).await;
        assert_eq!(receipt["task_id"], "task-http");

        let id: Uuid = receipt["resume_id"].as_str().unwrap().parse().unwrap();
        let record = store.snapshot(id).unwrap();
        assert_eq!(record.original_filename, "jane.pdf");
        assert_eq!(record.job_id, job.id);
        assert_eq!(record.file_size, 13);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;

        let response = app(store.clone())
            .oneshot(upload_request(multipart_body(
                &job.id.to_string(),
                "photo.png",
                "image/png",
                b"\x89PNG",
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_and_oversized_files() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;
        let app = app(store.clone());

        let response = app
            .clone()
            .oneshot(upload_request(multipart_body(
                &job.id.to_string(),
                "cv.pdf",
                "application/pdf",
                b"",
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(upload_request(multipart_body(
                &job.id.to_string(),
                "cv.pdf",
                "application/pdf",
                &[b'x'; 2048],
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn test_upload_for_unknown_job_is_404() {
        let response = app(Arc::new(InMemoryStore::new()))
            .oneshot(upload_request(multipart_body(
                &Uuid::new_v4().to_string(),
                "cv.pdf",
                "application/pdf",
                b"%PDF",
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resume_status_and_task_lookup() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;
        let record = processed(job.id, 82, "task-lookup");
        let id = record.id;
        store.seed(record);
        let app = app(store);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/resumes/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["stage"], "completed");
        assert_eq!(body["match_score"], 82);

        let response = app
            .clone()
            .oneshot(get("/api/v1/tasks/task-lookup"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["id"], id.to_string());

        let response = app.oneshot(get("/api/v1/tasks/unknown")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_resumes_filters_by_job() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;
        store.seed(processed(job.id, 60, "a"));
        store.seed(processed(job.id, 90, "b"));
        store.seed(processed(Uuid::new_v4(), 70, "c"));

        let response = app(store)
            .oneshot(get(&format!("/api/v1/resumes?job_id={}", job.id)))
            .await
            .unwrap();
        let body = body_json(response).await;
        let scores: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["match_score"].as_i64().unwrap())
            .collect();
        assert_eq!(scores, vec![90, 60]);
    }

    #[tokio::test]
    async fn test_shortlist_recompute_listing_and_stats() {
        let store = Arc::new(InMemoryStore::new());
        let job = seed_job(&store).await;
        for (i, score) in [95, 80, 74, 50].into_iter().enumerate() {
            store.seed(processed(job.id, score, &format!("t{i}")));
        }
        let app = app(store);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/jobs/{}/shortlist", job.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;
        assert_eq!(report["shortlisted_count"], 2);
        assert_eq!(report["notifications"].as_array().unwrap().len(), 2);
        assert_eq!(report["notifications"][0]["delivered"], false);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/jobs/{}/shortlist", job.id)))
            .await
            .unwrap();
        let shortlist = body_json(response).await;
        assert_eq!(shortlist["count"], 2);
        assert_eq!(shortlist["candidates"][0]["match_score"], 95);

        let response = app
            .oneshot(get(&format!("/api/v1/jobs/{}/stats", job.id)))
            .await
            .unwrap();
        let stats = body_json(response).await;
        assert_eq!(stats["total_applications"], 4);
        assert_eq!(stats["shortlisted"], 2);
        assert_eq!(stats["average_score"], 75);
        assert_eq!(stats["score_distribution"]["90-100"], 1);
        assert_eq!(stats["score_distribution"]["below60"], 1);
    }

    #[tokio::test]
    async fn test_reprocess_unknown_resume_is_404() {
        let response = app(Arc::new(InMemoryStore::new()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/resumes/{}/reprocess", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
