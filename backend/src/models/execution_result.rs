use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use utoipa::ToSchema;

/// Raw result of executing one SQL statement against the relational store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionResult {
    pub rows: Vec<HashMap<String, Value>>,
    pub column_order: Vec<String>,
    #[serde(with = "duration_millis")]
    #[schema(value_type = u64)]
    pub elapsed: Duration,
    pub row_count: usize,
    pub ok: bool,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            column_order: Vec::new(),
            elapsed: Duration::default(),
            row_count: 0,
            ok: false,
            error: Some(error.into()),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
