use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use query_core::{FilterExpression, Page};
use querykit::{query_error_to_problem, ListBody, ListQuery, APPLICATION_PROBLEM_JSON};
use querykit_db::QueryError;
use serde_json::Value;
use tower::ServiceExt;

const NAMES: [&str; 5] = ["alpha", "bravo", "charlie", "delta", "echo"];

async fn list_names(ListQuery(expr): ListQuery) -> Json<Page<&'static str>> {
    Json(page_of(&expr))
}

async fn search_names(ListBody(expr): ListBody) -> Json<Page<&'static str>> {
    Json(page_of(&expr))
}

async fn broken(ListQuery(_): ListQuery) -> Response {
    query_error_to_problem(&QueryError::UnmappedColumn("color".into()), "/broken").into_response()
}

fn page_of(expr: &FilterExpression) -> Page<&'static str> {
    let limit = expr.effective_limit();
    let items = NAMES
        .iter()
        .copied()
        .skip(expr.skip() as usize)
        .take(limit as usize)
        .collect();
    Page::assemble(items, NAMES.len() as u64, expr.page, limit)
}

fn app() -> Router {
    Router::new()
        .route("/names", get(list_names))
        .route("/names/search", post(search_names))
        .route("/broken", get(broken))
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_list_envelope() {
    let resp = app()
        .oneshot(Request::get("/names?page=2&limit=2").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["data"], serde_json::json!(["charlie", "delta"]));
    assert_eq!(body["meta"]["total"], 5);
    assert_eq!(body["meta"]["totalPages"], 3);
    assert_eq!(body["meta"]["hasNext"], true);
    assert_eq!(body["meta"]["hasPrev"], true);
}

#[tokio::test]
async fn test_garbage_query_is_not_rejected() {
    let resp = app()
        .oneshot(
            Request::get("/names?page=abc&limit=-1&filters=%7B%7B")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 10);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn test_post_structured_body() {
    let resp = app()
        .oneshot(
            Request::post("/names/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"page":3,"limit":2}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["data"], serde_json::json!(["echo"]));
    assert_eq!(body["meta"]["hasNext"], false);
}

#[tokio::test]
async fn test_query_error_renders_problem() {
    let resp = app()
        .oneshot(Request::get("/broken").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some(APPLICATION_PROBLEM_JSON)
    );
    let body = json_body(resp).await;
    assert_eq!(body["code"], "UNMAPPED_COLUMN");
    assert_eq!(body["instance"], "/broken");
}
