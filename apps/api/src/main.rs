mod applicants;
mod assessment;
mod config;
mod db;
mod documents;
mod errors;
mod events;
mod goals;
mod llm_client;
mod locks;
mod matching;
mod models;
mod routes;
mod scoring;
mod skills;
mod state;
mod storage;
mod store;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::applicants::github::GitHubClient;
use crate::config::Config;
use crate::db::connect_store;
use crate::documents::PdfTextExtractor;
use crate::events::dispatcher::NotificationDispatcher;
use crate::llm_client::LlmClient;
use crate::locks::CredentialLocks;
use crate::routes::build_router;
use crate::scoring::ScoringPolicy;
use crate::skills::DerivationPipeline;
use crate::state::AppState;
use crate::storage::ResumeArchive;
use crate::store::{MemoryStore, SkillStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillMatch API v{}", env!("CARGO_PKG_VERSION"));

    let policy = Arc::new(ScoringPolicy::load(config.scoring_policy_path.as_deref())?);
    info!(
        job_match_threshold = policy.job_match_threshold,
        battery = policy.assessment.battery.total(),
        "Scoring policy loaded"
    );

    // Persistence: PostgreSQL when configured, in-memory otherwise
    let store: Arc<dyn SkillStore> = match &config.database_url {
        Some(url) => Arc::new(connect_store(url).await?),
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // Notifications are persisted by a background worker
    let (dispatcher, _dispatcher_task) = NotificationDispatcher::spawn(store.clone());
    let events = Arc::new(dispatcher);

    // Credential locks: Redis lease across replicas, or in-process
    let locks = match &config.redis_url {
        Some(url) => {
            info!("Redis credential locks enabled");
            CredentialLocks::redis(redis::Client::open(url.as_str())?)
        }
        None => CredentialLocks::local(),
    };

    // Resume archive (optional)
    let archive = match &config.s3 {
        Some(s3) => {
            info!(bucket = %s3.bucket, "Resume archive enabled");
            Some(ResumeArchive::connect(s3).await)
        }
        None => None,
    };

    // Oracle cascades
    let llm = LlmClient::new(
        config.openrouter_api_key.clone(),
        vec![config.primary_model.clone(), config.fallback_model.clone()],
    )?;
    let goal_llm = llm.with_models(config.goal_models.clone());
    info!(
        models = ?llm.models(),
        goal_models = goal_llm.models().len(),
        "LLM client initialized"
    );
    let oracle = Arc::new(llm);

    let pipeline = DerivationPipeline::new(
        store.clone(),
        oracle.clone(),
        events.clone(),
        policy.clone(),
        config.resync_delay,
    );

    let state = AppState {
        store,
        oracle,
        goal_oracle: Arc::new(goal_llm),
        events,
        pipeline,
        extractor: Arc::new(PdfTextExtractor),
        archive,
        locks,
        repositories: Arc::new(GitHubClient::new()?),
        policy,
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
