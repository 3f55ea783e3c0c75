use axum::{
    response::Response,
    routing::{delete, get, post},
    Router,
};

use market_infra::ServiceError;

use crate::app::errors;

pub mod imports;
pub mod nodes;
pub mod statistics;
pub mod system;

/// Catalog endpoints. Expects an `Extension<Arc<CatalogService>>` layer.
pub fn router() -> Router {
    Router::new()
        .route("/imports", post(imports::import_units))
        .route("/delete/:id", delete(nodes::delete_unit))
        .route("/nodes/:id", get(nodes::get_node))
        .route("/sales", get(statistics::sales))
        .route("/node/:id/statistic", get(statistics::unit_statistic))
        .route("/statistics", get(statistics::all_statistics))
}

/// Run a catalog call on tokio's blocking pool.
///
/// The service takes std locks and writes snapshots to disk, neither of
/// which may stall a runtime worker.
pub(crate) async fn off_runtime<T, F>(call: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(errors::service_error_to_response(e)),
        Err(e) => {
            tracing::error!(error = %e, "catalog task failed");
            Err(errors::internal_error())
        }
    }
}
