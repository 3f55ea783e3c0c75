use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use market_infra::CatalogService;

use crate::app::{dto, errors};

use super::off_runtime;

/// Offers updated in the sales window ending at `date`.
pub async fn sales(
    Extension(service): Extension<Arc<CatalogService>>,
    Query(query): Query<dto::SalesQuery>,
) -> axum::response::Response {
    let date = match dto::required_timestamp(query.date.as_deref(), "date") {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match off_runtime(move || service.sales(date)).await {
        Ok(entries) => (StatusCode::OK, Json(dto::statistic_items(entries))).into_response(),
        Err(response) => response,
    }
}

/// History of one unit in `[dateStart, dateEnd)`: price sets of an offer, or
/// the recorded versions of a category.
pub async fn unit_statistic(
    Extension(service): Extension<Arc<CatalogService>>,
    Path(id): Path<String>,
    Query(query): Query<dto::StatisticQuery>,
) -> axum::response::Response {
    let id = match dto::parse_unit_id(&id) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(&e),
    };
    let (from, to) = match query.range() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match off_runtime(move || service.get_statistics(Some(&id), from, to)).await {
        Ok(entries) => (StatusCode::OK, Json(dto::statistic_items(entries))).into_response(),
        Err(response) => response,
    }
}

pub async fn all_statistics(
    Extension(service): Extension<Arc<CatalogService>>,
    Query(query): Query<dto::StatisticQuery>,
) -> axum::response::Response {
    let (from, to) = match query.range() {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(&e),
    };

    match off_runtime(move || service.get_statistics(None, from, to)).await {
        Ok(entries) => (StatusCode::OK, Json(dto::statistic_items(entries))).into_response(),
        Err(response) => response,
    }
}
