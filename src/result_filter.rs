use tracing::info;

use crate::data_models::{RESULTS_KEY, SchemaOutput};
use crate::llm::{LanguageModel, LlmError};
use crate::schema_mapper::{SCHEMA_TEMPERATURE, parse_model_json};

pub fn filter_prompt(results_json: &str, user_query: &str) -> String {
    format!(
        "You are a business research assistant. The user asked: \"{user_query}\".\n\
         Here is the data to process:\n{results_json}\n\n\
         Please return a JSON array with only the most relevant or summarized info, \
         based on the user query. Remove unnecessary or empty keys and combine \
         duplicate entries into a single clean response."
    )
}

/// Asks the model to deduplicate and trim a result set against the query.
///
/// Anything without a `results` list (including raw fallbacks) is returned unchanged
/// and no model call is made.
pub async fn summarize_or_filter(
    llm: &dyn LanguageModel,
    data: SchemaOutput,
    user_query: &str,
) -> Result<SchemaOutput, LlmError> {
    let Some(results) = data
        .as_structured()
        .and_then(|s| s.fields().get(RESULTS_KEY))
    else {
        return Ok(data);
    };

    let results_json = serde_json::to_string_pretty(results)
        .map_err(|e| LlmError::Parse(e.to_string()))?;
    let response = llm
        .complete(&filter_prompt(&results_json, user_query), SCHEMA_TEMPERATURE)
        .await?;
    info!("filtered structured results");
    Ok(parse_model_json(&response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_results_and_query() {
        let prompt = filter_prompt("[{\"a\": 1}]", "who raised money");
        assert!(prompt.contains("The user asked: \"who raised money\""));
        assert!(prompt.contains("[{\"a\": 1}]"));
    }
}
