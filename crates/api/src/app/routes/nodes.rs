use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use market_infra::CatalogService;

use crate::app::{dto, errors};

use super::off_runtime;

pub async fn get_node(
    Extension(service): Extension<Arc<CatalogService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_unit_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match off_runtime(move || service.get_subtree(&id)).await {
        Ok(tree) => (StatusCode::OK, Json(dto::NodeResponse::from(tree))).into_response(),
        Err(response) => response,
    }
}

pub async fn delete_unit(
    Extension(service): Extension<Arc<CatalogService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_unit_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match off_runtime(move || service.delete_unit(&id)).await {
        Ok(_) => errors::success(),
        Err(response) => response,
    }
}
