//! Integration tests for the HTTP API
//!
//! Every request goes through `oneshot` on a fresh router, so each test
//! compiles its own feed first.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ludics::config::EngineConfig;
use ludics::core::create_router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_router() -> Router {
    create_router(EngineConfig::default())
}

fn feed() -> Value {
    json!([
        {"id": "m1", "actor_id": "alice", "kind": "ASSERT",
         "target": {"type": "claim", "id": "c1"}, "payload": {"expression": "p"}},
        {"id": "m2", "actor_id": "bob", "kind": "WHY",
         "target": {"type": "move", "id": "m1"}},
        {"id": "m3", "actor_id": "bob", "kind": "CONCEDE",
         "target": {"type": "move", "id": "m2"}}
    ])
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn compiled() -> Router {
    let app = create_test_router();
    let (status, _) = send(&app, "POST", "/compile", Some(json!({"moves": feed()}))).await;
    assert_eq!(status, StatusCode::OK);
    app
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["designs"], 0);
}

#[tokio::test]
async fn test_compile_endpoint() {
    let app = create_test_router();
    let (status, json) = send(
        &app,
        "POST",
        "/compile",
        Some(json!({"moves": feed(), "strategy": "argument"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "argument");
    assert_eq!(json["scopes"][0]["key"], "argument:claim:c1");
    assert_eq!(json["scopes"][0]["metadata"]["move_count"], 3);
}

#[tokio::test]
async fn test_get_design() {
    let app = compiled().await;
    let (status, json) = send(&app, "GET", "/designs/legacy%2FP", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["design"]["id"], "legacy/P");
    assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);

    let (status, json) = send(&app, "GET", "/designs/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "DESIGN_NOT_FOUND");
}

#[tokio::test]
async fn test_step_endpoint() {
    let app = compiled().await;
    let (status, json) = send(
        &app,
        "POST",
        "/step",
        Some(json!({"pos_design_id": "legacy/P", "neg_design_id": "legacy/O"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trace"]["status"], "CONVERGENT");
    assert_eq!(json["trace"]["pos_design"]["version"], 1);
    assert!(json["fingerprint"].is_string());
}

#[tokio::test]
async fn test_step_version_conflict() {
    let app = compiled().await;
    let (status, json) = send(
        &app,
        "POST",
        "/step",
        Some(json!({"pos_design_id": "legacy/P", "neg_design_id": "legacy/O", "pos_version": 9})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DESIGN_VERSION_MISMATCH");
}

#[tokio::test]
async fn test_locus_operations() {
    let app = compiled().await;

    let (status, json) = send(
        &app,
        "POST",
        "/loci/copy",
        Some(json!({"design_id": "legacy/P", "base": "0.1", "count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["children"], json!(["0.2"]));
    assert_eq!(json["design"]["version"], 2);

    let (status, json) = send(
        &app,
        "POST",
        "/loci/instantiate",
        Some(json!({"design_id": "legacy/P", "base": "0.2", "name": "x", "expected_version": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"id": "legacy/P", "version": 3}));

    let (status, json) = send(
        &app,
        "POST",
        "/uniformity/check",
        Some(json!({"design_id": "legacy/P", "base": "0", "child_a": "0.1", "child_b": "0.2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["uniform"], false);
}

#[tokio::test]
async fn test_bad_locus_rejected() {
    let app = compiled().await;
    let (status, json) = send(
        &app,
        "POST",
        "/loci/copy",
        Some(json!({"design_id": "legacy/P", "base": "0", "count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_LOCUS");

    let (status, _) = send(
        &app,
        "POST",
        "/loci/copy",
        Some(json!({"design_id": "legacy/P", "base": "0.9", "count": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
