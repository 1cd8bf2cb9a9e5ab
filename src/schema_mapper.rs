use serde_json::Value;
use tracing::{debug, warn};

use crate::data_models::{SchemaOutput, StructuredResult};
use crate::llm::{LanguageModel, LlmError};

pub const SCHEMA_TEMPERATURE: f32 = 0.2;

pub fn schema_prompt(summary: &str, user_query: &str) -> String {
    format!(
        "You are a business research assistant. Analyze and extract structured info \
         from the text below based on the user query.\n\
         User Query:\n{user_query}\n\n\
         Text:\n{summary}\n\n\
         Return a JSON object with the possible fields. Put the extracted entries in a \
         \"results\" list of flat objects.\n\
         <Instruction>\n\
         1. Respond only with JSON.\n\
         2. Keep the fields required by the user.\n"
    )
}

/// Removes a markdown code fence around a model answer, if there is one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (`json`, `JSON`, ...) up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Interprets a model answer that was supposed to be JSON.
///
/// Objects are kept as they are, bare lists become `{"results": [...]}`, and anything
/// else comes back as [`SchemaOutput::Raw`] holding the untouched answer.
pub fn parse_model_json(response: &str) -> SchemaOutput {
    match serde_json::from_str::<Value>(strip_code_fence(response)) {
        Ok(Value::Object(fields)) => SchemaOutput::Structured(StructuredResult::new(fields)),
        Ok(Value::Array(items)) => SchemaOutput::Structured(StructuredResult::from_items(items)),
        Ok(other) => {
            debug!(kind = ?other, "model answered with a bare JSON scalar");
            SchemaOutput::Raw(response.to_string())
        }
        Err(e) => {
            warn!(error = %e, "model answer is not valid JSON, keeping raw text");
            SchemaOutput::Raw(response.to_string())
        }
    }
}

pub async fn map_to_schema(
    llm: &dyn LanguageModel,
    summary: &str,
    user_query: &str,
) -> Result<SchemaOutput, LlmError> {
    let response = llm
        .complete(&schema_prompt(summary, user_query), SCHEMA_TEMPERATURE)
        .await?;
    Ok(parse_model_json(&response))
}
