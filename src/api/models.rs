use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_models::{SchemaOutput, StageError};

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub query: String,
    pub result: Option<SchemaOutput>,
    pub report_link: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub stage_errors: Vec<StageError>,
    pub processing_time_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
