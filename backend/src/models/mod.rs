pub mod artifact;
pub mod error_record;
pub mod execution_result;
pub mod field_mapping;
pub mod job;
pub mod normalized_dataset;
pub mod prompt;
pub mod resolved_intent;
pub mod schema;
pub mod sql_plan;

pub use artifact::Artifact;
pub use error_record::{ErrorKind, ErrorPayload, ErrorRecord, NextAction, RecoveryStrategy, Severity};
pub use execution_result::ExecutionResult;
pub use field_mapping::{FieldMapping, MappingKind, MappingResult};
pub use job::{Job, JobResult, JobStatus};
pub use normalized_dataset::{CategoricalStats, ChartConfig, DatasetSummary, NormalizedDataset, NumericStats};
pub use prompt::{CleanedPrompt, PrimaryIntent, Prompt};
pub use resolved_intent::{FilterPredicate, IntentType, ResolvedIntent};
pub use schema::{Catalog, ColumnSchema, FileMetadata, ForeignKeyEdge, TableSchema};
pub use sql_plan::{FromGraph, JoinEdge, SQLPlan};
