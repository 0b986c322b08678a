use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod engine;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::trace::TRACE_ID_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1/analytics", analytics_routes())
        .nest("/api/v1/recommendations", recommendation_routes())
        .nest("/api/v1/documents", document_routes())
        .fallback(handlers::not_found)
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/difficulty", post(handlers::analytics::adaptive_difficulty))
        .route("/weaknesses", post(handlers::analytics::weaknesses))
        .route("/predictions", post(handlers::analytics::predictions))
}

fn recommendation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/content", post(handlers::recommendations::content))
        .route(
            "/learning-path",
            post(handlers::recommendations::learning_path),
        )
}

fn document_routes() -> Router<Arc<AppState>> {
    Router::new().route("/insights", post(handlers::documents::insights))
}
