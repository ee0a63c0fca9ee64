use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Self-contained visualization artifact produced by C7. Invariant: if
/// `ok` is true, `artifact_code` satisfies the artifact validation rules
/// (§4.7). A fallback Artifact is always producible from a
/// [`NormalizedDataset`](crate::models::NormalizedDataset) and an error
/// message, and that fallback always passes validation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Artifact {
    pub artifact_code: String,
    pub artifact_name: String,
    pub chart_type: String,
    pub ok: bool,
}
