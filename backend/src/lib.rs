//! Chart generation pipeline library.
//!
//! Exposes the nine pipeline components (C1-C9, `services`), their shared
//! data model (`models`), HTTP handlers, configuration, and ambient
//! utilities as a single crate so the binary and integration tests share
//! one source of truth.

use sqlx::SqlitePool;
use std::sync::Arc;

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::{
    ArtifactSynthesizer, CatalogIntrospector, DescriptiveIndex, ErrorHandler, InputParser,
    JobRegistry, LLMService, PipelineOrchestrator, QueryEngine,
};

/// Application shared state.
///
/// Design Philosophy: Rust's type system is the DI container here — every
/// service is wrapped in `Arc` for cheap cloning and thread safety, and
/// handlers reach them through `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,

    pub catalog: Arc<CatalogIntrospector>,
    pub descriptive_index: Arc<DescriptiveIndex>,
    pub llm: Arc<dyn LLMService>,
    pub query_engine: Arc<QueryEngine>,
    pub input_parser: Arc<InputParser>,
    pub error_handler: Arc<ErrorHandler>,
    pub artifact_synthesizer: Arc<ArtifactSynthesizer>,
    pub registry: Arc<JobRegistry>,
    pub orchestrator: Arc<PipelineOrchestrator>,
}
