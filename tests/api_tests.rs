use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use dossier::api::create_router;
use dossier::report::ReportWriter;

mod test_helpers;
use test_helpers::*;

const FUNDING_JSON: &str = r#"{"results": [{"company": "OpenAI", "amount": "$6.6B"}]}"#;

fn router(reports_dir: &Path, urls: &[&str]) -> axum::Router {
    let agent = agent(
        Arc::new(FakeSearch::new(urls)),
        Arc::new(funding_fetcher()),
        Arc::new(ScriptedModel::new("OpenAI raised $6.6B.", FUNDING_JSON)),
        ReportWriter::new(reports_dir),
    );
    create_router(Arc::new(agent), reports_dir)
}

fn research_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/research")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_research_returns_result_and_serves_report() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), &funding_urls());

    let response = app
        .clone()
        .oneshot(research_request(json!({"query": FUNDING_QUERY})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["query"], FUNDING_QUERY);
    assert_eq!(body["result"], serde_json::from_str::<Value>(FUNDING_JSON).unwrap());
    assert_eq!(body["stage_errors"], json!([]));

    let link = body["report_link"].as_str().unwrap().to_string();
    assert!(link.starts_with("/reports/recent_fundings_of_openai_and_"));

    let report = app
        .oneshot(Request::builder().uri(link.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(report.status(), StatusCode::OK);
    let bytes = to_bytes(report.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_no_results_returns_null_fields() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), &[]);

    let response = app
        .oneshot(research_request(json!({"query": "nothing"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["result"], Value::Null);
    assert_eq!(body["report_link"], Value::Null);
    assert!(report_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_empty_query_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), &funding_urls());

    let response = app
        .oneshot(research_request(json!({"query": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Query cannot be empty");
}

#[tokio::test]
async fn test_report_failure_becomes_error_message() {
    let dir = tempfile::tempdir().unwrap();
    // a file where the reports directory should be
    let blocked = dir.path().join("reports");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let app = router(&blocked, &funding_urls());

    let response = app
        .oneshot(research_request(json!({"query": FUNDING_QUERY})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Error: "));
}
