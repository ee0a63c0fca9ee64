pub mod artifact_synthesizer;
pub mod catalog;
pub mod descriptive_index;
pub mod error_handler;
pub mod input_parser;
pub mod job_registry;
pub mod llm_gateway;
pub mod orchestrator;
pub mod query_engine;

pub use artifact_synthesizer::ArtifactSynthesizer;
pub use catalog::CatalogIntrospector;
pub use descriptive_index::{DescriptiveIndex, EmbeddingProvider, HashingEmbeddingProvider, RecordType};
pub use error_handler::{ErrorHandler, ErrorHandlerError, FeedbackRouter, IdempotencyChecker, SynonymMapper};
pub use input_parser::{InputParser, ParseOutcome};
pub use job_registry::{CancelFlag, JobRegistry, JobRegistrySweep, JobSummary, RegistryError};
pub use llm_gateway::{GroqLLMClient, LLMError, LLMRequest, LLMResponse, LLMService};
pub use orchestrator::PipelineOrchestrator;
pub use query_engine::{QueryCache, QueryEngine, QueryEngineError};
