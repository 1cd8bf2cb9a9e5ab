use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::ResearchAgent;

use super::models::{ErrorResponse, ResearchRequest, ResearchResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub async fn research_handler(
    State(agent): State<Arc<ResearchAgent>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let start = Instant::now();

    let query = request.query.trim();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Query cannot be empty"));
    }

    let outcome = agent.run(query).await.map_err(|e| {
        tracing::error!(query, error = %format!("{e:#}"), "research run failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e:#}"))
    })?;

    Ok(Json(ResearchResponse {
        query: outcome.state.query().to_string(),
        stage_errors: outcome.state.stage_errors.clone(),
        result: outcome.data,
        report_link: outcome.report_link,
        generated_at: outcome.generated_at,
        processing_time_ms: start.elapsed().as_millis(),
    }))
}
