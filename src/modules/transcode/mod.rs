use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::middleware::webhook_auth::{webhook_auth_middleware, MAX_WEBHOOK_BODY};
use crate::state::AppState;

pub mod dto;
pub mod error;
pub mod event_validator;
pub mod events;
pub mod guard;
pub mod handler;
pub mod memory;
pub mod model;
pub mod notification;
pub mod repository;
pub mod service;
pub mod store;

pub const WEBHOOK_PATH: &str = "/aws/listener/eventbridge/video";

/// Pipeline-facing listener. Authentication wraps only this route; oversize
/// bodies surface through the handler as `PayloadTooLarge`.
pub fn webhook_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(WEBHOOK_PATH, post(handler::receive_event))
        .route_layer(middleware::from_fn_with_state(state, webhook_auth_middleware))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transcode-jobs", post(handler::register_job))
        .route("/transcode-jobs/{job_id}", get(handler::get_job))
}
