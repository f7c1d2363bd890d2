use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{AdoptionRequest, TrackingId};
use super::identifier::IdentifierGenerator;
use super::oracle::RandomSource;
use super::service::AdoptionWorkflow;
use super::store::EntityStore;

type SharedWorkflow<S, I, G> = Arc<AdoptionWorkflow<S, I, G>>;

/// Router builder exposing the browse, submit, and status endpoints.
pub fn adoption_router<S, I, G>(workflow: SharedWorkflow<S, I, G>) -> Router
where
    S: EntityStore + 'static,
    I: IdentifierGenerator + 'static,
    G: RandomSource + 'static,
{
    Router::new()
        .route("/api/v1/adoptables", get(available_handler::<S, I, G>))
        .route("/api/v1/adoptions", post(submit_handler::<S, I, G>))
        .route(
            "/api/v1/adoptions/:tracking_id",
            get(status_handler::<S, I, G>),
        )
        .with_state(workflow)
}

pub(crate) async fn available_handler<S, I, G>(
    State(workflow): State<SharedWorkflow<S, I, G>>,
) -> Response
where
    S: EntityStore + 'static,
    I: IdentifierGenerator + 'static,
    G: RandomSource + 'static,
{
    match workflow.list_available() {
        Ok(adoptables) => (StatusCode::OK, axum::Json(adoptables)).into_response(),
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn submit_handler<S, I, G>(
    State(workflow): State<SharedWorkflow<S, I, G>>,
    axum::Json(request): axum::Json<AdoptionRequest>,
) -> Response
where
    S: EntityStore + 'static,
    I: IdentifierGenerator + 'static,
    G: RandomSource + 'static,
{
    match workflow.submit_request(request) {
        Ok(outcome) => {
            let status = if outcome.is_accepted() {
                StatusCode::ACCEPTED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(outcome.summary())).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn status_handler<S, I, G>(
    State(workflow): State<SharedWorkflow<S, I, G>>,
    Path(tracking_id): Path<String>,
) -> Response
where
    S: EntityStore + 'static,
    I: IdentifierGenerator + 'static,
    G: RandomSource + 'static,
{
    match workflow.get_status(&TrackingId(tracking_id)) {
        Ok(Some(status)) => (StatusCode::OK, axum::Json(status)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": "Adoption status not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    error!(error = %err, "adoption request failed");
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
