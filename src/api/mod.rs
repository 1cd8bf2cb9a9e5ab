use axum::{Router, routing::post};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::pipeline::ResearchAgent;

pub mod handlers;
pub mod models;

pub fn create_router(agent: Arc<ResearchAgent>, reports_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/research", post(handlers::research_handler))
        .with_state(agent)
        // generated .docx reports
        .nest_service("/reports", ServeDir::new(reports_dir))
        .layer(cors)
}
