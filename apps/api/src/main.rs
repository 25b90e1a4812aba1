mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod nlp_client;
mod notifier;
mod pipeline;
mod resumes;
mod routes;
mod shortlist;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::nlp_client::NlpClient;
use crate::notifier::{DisabledNotifier, EmailNotifier, Notifier};
use crate::pipeline::Orchestrator;
use crate::routes::build_router;
use crate::shortlist::ShortlistEngine;
use crate::state::AppState;
use crate::storage::postgres::PgStore;
use crate::storage::s3::S3DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let documents = Arc::new(S3DocumentStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize NLP task client
    let nlp = Arc::new(NlpClient::new(config.nlp.clone())?);
    info!("NLP client initialized ({})", config.nlp.base_url);

    // Initialize notifier (email only when SMTP is configured)
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => match EmailNotifier::from_config(smtp) {
            Ok(email) => Arc::new(email),
            Err(e) => {
                error!("Email notifier misconfigured, notifications disabled: {e}");
                Arc::new(DisabledNotifier)
            }
        },
        None => {
            warn!("SMTP_HOST not set, shortlist notifications disabled");
            Arc::new(DisabledNotifier)
        }
    };

    let shortlist = Arc::new(ShortlistEngine::new(store.clone(), store.clone(), notifier));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        store.clone(),
        documents,
        nlp,
        shortlist.clone(),
        config.poll.clone(),
    ));

    // Pick up pipelines interrupted by the previous shutdown
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.resume_in_flight().await {
                error!("Failed to resume in-flight pipelines: {e}");
            }
        });
    }

    // Build app state
    let state = AppState {
        resumes: store.clone(),
        jobs: store,
        orchestrator,
        shortlist,
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "screener-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
