//! HTTP API server for the pickup-point service.
//!
//! Exposes pickup-point, reception and product endpoints behind JWT role
//! checks, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use pvz_store::{PickupPointStore, ProductStore, ReceptionStore, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Store requirements of the HTTP layer.
pub trait AppStore:
    PickupPointStore + ReceptionStore + ProductStore + UserStore + Clone + 'static
{
}

impl<T> AppStore for T where
    T: PickupPointStore + ReceptionStore + ProductStore + UserStore + Clone + 'static
{
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: AppStore>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let public = Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/dummyLogin", post(routes::auth::dummy_login::<S>))
        .route("/register", post(routes::auth::register::<S>))
        .route("/login", post(routes::auth::login::<S>))
        .with_state(state.clone());

    let protected = Router::new()
        .route(
            "/pvz",
            post(routes::pvz::create::<S>).get(routes::pvz::list::<S>),
        )
        .route(
            "/pvz/{pvzId}/close_last_reception",
            post(routes::receptions::close_last::<S>),
        )
        .route(
            "/pvz/{pvzId}/delete_last_product",
            post(routes::products::delete_last::<S>),
        )
        .route("/receptions", post(routes::receptions::create::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.keys.clone(),
            auth::authenticate,
        ))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(create_metrics_app(metrics_handle))
        .route_layer(middleware::from_fn(metrics::track_http))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Router serving only `/metrics`, for the dedicated scrape port.
pub fn create_metrics_app(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics::render))
        .with_state(metrics_handle)
}
