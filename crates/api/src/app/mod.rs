use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use tower::ServiceBuilder;

use market_infra::CatalogService;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full router around a shared catalog service.
pub fn build_app(service: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(service)))
}
