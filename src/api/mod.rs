//! HTTP/JSON surface over the engine.

pub mod dto;
pub mod error;
pub mod events;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::observability::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/computers", get(handlers::list_computers))
        .route("/api/computers/{id}", get(handlers::get_computer))
        .route("/api/computers/{id}/start", put(handlers::start_computer))
        .route("/api/computers/{id}/free", put(handlers::free_computer))
        .route(
            "/api/computers/{id}/reservations",
            get(handlers::computer_reservations),
        )
        .route(
            "/api/computers/{id}/availability",
            get(handlers::computer_availability),
        )
        .route("/api/computers/{id}/events", get(events::computer_events))
        .route("/api/availability", get(handlers::multi_availability))
        .route(
            "/api/reservations",
            get(handlers::list_reservations).post(handlers::create_reservation),
        )
        .route(
            "/api/reservations/{id}",
            get(handlers::get_reservation)
                .patch(handlers::reschedule_reservation)
                .delete(handlers::cancel_reservation),
        )
        .route(
            "/api/reservations/{id}/extend",
            post(handlers::extend_reservation),
        )
        .route("/api/stats/occupancy", get(handlers::occupancy))
        .route("/api/stats/summary", get(handlers::summary))
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Request count and latency per matched route.
async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(HTTP_REQUESTS_TOTAL, "route" => route.clone(), "status" => status).increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "route" => route)
        .record(started.elapsed().as_secs_f64());
    response
}
