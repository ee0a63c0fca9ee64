use axum::{
    Router,
    routing::{delete, get, post},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chartgen_core::config::Config;
use chartgen_core::handlers;
use chartgen_core::models;
use chartgen_core::services::{
    ArtifactSynthesizer, CatalogIntrospector, DescriptiveIndex, ErrorHandler,
    GroqLLMClient, HashingEmbeddingProvider, InputParser, JobRegistry, JobRegistrySweep,
    LLMService, PipelineOrchestrator, QueryEngine,
};
use chartgen_core::utils::ScheduledExecutor;
use chartgen_core::AppState;

const EMBEDDING_DIMS: usize = 256;
const JOB_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::generate_chart::generate_chart,
        handlers::jobs::job_status,
        handlers::jobs::list_jobs,
        handlers::jobs::delete_job,
        handlers::database_status::database_status,
        handlers::health::health,
    ),
    components(schemas(
        handlers::generate_chart::GenerateChartRequest,
        handlers::generate_chart::GenerateChartResponse,
        handlers::jobs::JobStatusResponse,
        handlers::database_status::TableStatus,
        handlers::database_status::DatabaseStatusResponse,
        handlers::health::HealthResponse,
        models::JobStatus,
    )),
    tags(
        (name = "Pipeline", description = "Chart generation job submission and polling"),
        (name = "Catalog", description = "Schema and ingestion introspection"),
        (name = "Health", description = "Liveness"),
    )
)]
struct ApiDoc;

async fn create_pool(database_path: &str) -> Result<sqlx::SqlitePool, anyhow::Error> {
    if let Some(parent) = std::path::Path::new(database_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{database_path}"))?.create_if_missing(true);

    let pool = SqlitePoolOptions::new().max_connections(10).connect_with(options).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS file_metadata (
            file_name TEXT PRIMARY KEY,
            file_path TEXT NOT NULL,
            table_name TEXT NOT NULL,
            loaded_at TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            column_count INTEGER NOT NULL,
            description TEXT
        )",
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("chartgen.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        registry.with(tracing_subscriber::fmt::layer().with_writer(non_blocking)).with(tracing_subscriber::fmt::layer()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("chartgen starting up");

    let pool = create_pool(&config.pipeline.database_path).await?;
    tracing::info!(path = %config.pipeline.database_path, "database pool created");

    let catalog = Arc::new(CatalogIntrospector::new(pool.clone(), config.pipeline.catalog_ttl_secs));
    let descriptive_index = Arc::new(DescriptiveIndex::new(
        Box::new(HashingEmbeddingProvider::new(EMBEDDING_DIMS)),
        config.pipeline.descriptive_threshold,
    ));
    let llm: Arc<dyn LLMService> = Arc::new(GroqLLMClient::new(config.llm.groq_api_key.clone(), config.llm.model.clone()));
    let query_engine = Arc::new(QueryEngine::new(pool.clone(), config.pipeline.cache_ttl_secs));
    let input_parser = Arc::new(InputParser::new(config.pipeline.validation_threshold));
    let error_handler = Arc::new(ErrorHandler::new(None));
    let artifact_synthesizer = Arc::new(ArtifactSynthesizer::new());
    let job_registry = Arc::new(JobRegistry::new(config.pipeline.job_ttl_secs));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::clone(&catalog),
        Arc::clone(&input_parser),
        Arc::clone(&query_engine),
        Arc::clone(&artifact_synthesizer),
        Arc::clone(&llm),
        Arc::clone(&error_handler),
        Arc::clone(&job_registry),
    ));

    let sweep = JobRegistrySweep::new(Arc::clone(&job_registry));
    let sweep_executor = ScheduledExecutor::new("job-registry-sweep", Duration::from_secs(JOB_SWEEP_INTERVAL_SECS));
    tokio::spawn(async move {
        sweep_executor.start(sweep).await;
    });

    let app_state = Arc::new(AppState {
        db: pool,
        config: Arc::new(config.clone()),
        catalog,
        descriptive_index,
        llm,
        query_engine,
        input_parser,
        error_handler,
        artifact_synthesizer,
        registry: job_registry,
        orchestrator,
    });

    let routes = Router::new()
        .route("/generate-chart", post(handlers::generate_chart))
        .route("/job-status/:job_id", get(handlers::job_status))
        .route("/database-status", get(handlers::database_status))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/:job_id", delete(handlers::delete_job))
        .route("/health", get(handlers::health))
        .with_state(app_state);

    let app = Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server listening on http://{}", addr);
    tracing::info!("API documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
