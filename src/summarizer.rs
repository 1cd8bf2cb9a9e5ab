use tracing::info;

use crate::llm::{LanguageModel, LlmError};

pub const SUMMARY_TEMPERATURE: f32 = 0.3;
pub const SUMMARY_WORD_LIMIT: usize = 150;

pub fn summary_prompt(text: &str, user_query: &str) -> String {
    format!(
        "Summarize the following content in a concise, informative way:\n\n{text}\n\n\
         Only keep the information required by the user. User query: {user_query}.\n\
         <Instruction> 1. Keep only the necessary information in the summary. \
         2. Keep the summary within {SUMMARY_WORD_LIMIT} words."
    )
}

/// Joins scraped texts the way they are handed to the summarizer.
pub fn combine_texts(texts: &[String]) -> String {
    texts.join("\n\n")
}

pub async fn summarize_text(
    llm: &dyn LanguageModel,
    text: &str,
    user_query: &str,
) -> Result<String, LlmError> {
    let response = llm
        .complete(&summary_prompt(text, user_query), SUMMARY_TEMPERATURE)
        .await?;
    let summary = response.trim().to_string();
    info!(words = summary.split_whitespace().count(), "summarized scraped text");
    Ok(summary)
}
