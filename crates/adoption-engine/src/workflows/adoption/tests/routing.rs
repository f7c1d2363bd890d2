use super::common::*;
use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::adoption::oracle::FixedDraw;
use crate::workflows::adoption::router::{adoption_router, submit_handler};

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn submit(payload: Value) -> Request<Body> {
    Request::post("/api/v1/adoptions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).expect("encode")))
        .expect("request")
}

fn request_payload(adoptable_id: &str) -> Value {
    json!({
        "requester_name": "Ash",
        "requester_last_name": "Ketchum",
        "requester_id_number": "1-9",
        "description": "Loves electric types",
        "adoptable_id": adoptable_id,
    })
}

#[tokio::test]
async fn lists_only_available_adoptables() {
    let (workflow, _store, _clock) = build_workflow(0.0);
    let router = adoption_router(Arc::new(workflow));

    let response = router
        .oneshot(
            Request::get("/api/v1/adoptables")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    let names: Vec<&str> = payload
        .as_array()
        .expect("array payload")
        .iter()
        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["bulbasaur", "pikachu"]);
    assert_eq!(payload[1]["type"], json!(["electric"]));
}

#[tokio::test]
async fn accepted_submission_can_be_polled() {
    let (workflow, _store, _clock) = build_workflow(0.1);
    let router = adoption_router(Arc::new(workflow));

    let response = router
        .clone()
        .oneshot(submit(request_payload("25")))
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let payload = json_body(response).await;
    assert_eq!(payload["accepted"], json!(true));
    let tracking_id = payload["tracking_id"]
        .as_str()
        .expect("tracking id")
        .to_string();
    assert!(payload["message"]
        .as_str()
        .unwrap_or_default()
        .contains(&tracking_id));

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/adoptions/{tracking_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["tracking_id"], json!(tracking_id));
    assert_eq!(payload["requester_id_number"], json!("1-9"));
    assert_eq!(payload["status"], json!("preparation"));
}

#[tokio::test]
async fn rejections_are_reported_as_messages() {
    let (workflow, _store, _clock) = build_workflow(0.0);
    let router = adoption_router(Arc::new(workflow));

    let response = router
        .oneshot(submit(request_payload("133")))
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["accepted"], json!(false));
    assert!(payload.get("tracking_id").is_none());
    assert!(payload["message"]
        .as_str()
        .unwrap_or_default()
        .contains("already been adopted"));
}

#[tokio::test]
async fn unknown_tracking_id_is_not_found() {
    let (workflow, _store, _clock) = build_workflow(0.0);
    let router = adoption_router(Arc::new(workflow));

    let response = router
        .oneshot(
            Request::get("/api/v1/adoptions/does-not-exist")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router dispatch");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = json_body(response).await;
    assert_eq!(payload["error"], json!("Adoption status not found"));
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_store_failure() {
    let (workflow, _clock) = build_workflow_with_store(Arc::new(UnavailableStore), 0.0);

    let response = submit_handler::<UnavailableStore, SequenceIds, FixedDraw>(
        State(Arc::new(workflow)),
        axum::Json(request_for("25")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("persistence failure"));
}
