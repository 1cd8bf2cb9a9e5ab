use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key used for the raw-text fallback when a model answer is not usable JSON.
pub const RAW_KEY: &str = "raw";

/// Key holding the list of result items inside a structured result.
pub const RESULTS_KEY: &str = "results";

/// A JSON object produced by the model. Field names are chosen by the model, only
/// `results` has a meaning to us: an ordered list of flat key/value items.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct StructuredResult(Map<String, Value>);

impl StructuredResult {
    pub fn new(fields: Map<String, Value>) -> StructuredResult {
        StructuredResult(fields)
    }

    /// Wraps a bare list of items as `{"results": items}`.
    pub fn from_items(items: Vec<Value>) -> StructuredResult {
        let mut fields = Map::new();
        fields.insert(RESULTS_KEY.to_string(), Value::Array(items));
        StructuredResult(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn has_results(&self) -> bool {
        self.0.contains_key(RESULTS_KEY)
    }

    /// Result items in model order. `None` when the key is missing or not a list.
    pub fn results(&self) -> Option<&Vec<Value>> {
        self.0.get(RESULTS_KEY).and_then(Value::as_array)
    }

    /// True when there is nothing to report: no `results` list, or an empty one.
    pub fn is_empty(&self) -> bool {
        self.results().is_none_or(|items| items.is_empty())
    }
}

/// Outcome of a model call that was asked to answer with JSON only.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOutput {
    Structured(StructuredResult),
    /// The model answered with something that is not a JSON object or list.
    Raw(String),
}

impl SchemaOutput {
    pub fn as_structured(&self) -> Option<&StructuredResult> {
        match self {
            SchemaOutput::Structured(result) => Some(result),
            SchemaOutput::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, SchemaOutput::Raw(_))
    }
}

// Callers see the object itself, or `{"raw": "..."}` for the fallback.
impl Serialize for SchemaOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SchemaOutput::Structured(result) => result.serialize(serializer),
            SchemaOutput::Raw(text) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(RAW_KEY, text)?;
                map.end()
            }
        }
    }
}

/// A model-call failure that a stage absorbed instead of aborting the run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StageError {
    pub stage: String,
    pub message: String,
}

/// State threaded through the pipeline. Each optional field stays `None` until the
/// stage producing it has run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PipelineState {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_texts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_results: Option<Vec<SchemaOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_result: Option<SchemaOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stage_errors: Vec<StageError>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>) -> PipelineState {
        PipelineState {
            query: query.into(),
            urls: None,
            scraped_texts: None,
            summaries: None,
            mapped_results: None,
            filtered_result: None,
            stage_errors: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// The filtered result when the filter stage ran, the mapped result otherwise.
    pub fn final_result(&self) -> Option<&SchemaOutput> {
        self.filtered_result
            .as_ref()
            .or_else(|| self.mapped_results.as_ref().and_then(|m| m.first()))
    }

    pub fn record_error(&mut self, stage: &str, err: impl std::fmt::Display) {
        self.stage_errors.push(StageError {
            stage: stage.to_string(),
            message: err.to_string(),
        });
    }
}

/// What a research run hands back to its caller.
#[derive(Serialize, Debug, Clone)]
pub struct ResearchOutcome {
    pub state: PipelineState,
    pub data: Option<SchemaOutput>,
    #[serde(skip)]
    pub report_path: Option<PathBuf>,
    pub report_link: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ResearchOutcome {
    /// The "nothing came out of the chain" outcome: null data, no report.
    pub fn empty(state: PipelineState) -> ResearchOutcome {
        ResearchOutcome {
            state,
            data: None,
            report_path: None,
            report_link: None,
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }
}
