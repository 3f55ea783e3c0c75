use std::sync::Arc;

use axum::{body::Bytes, extract::Extension};

use market_infra::CatalogService;

use crate::app::{dto, errors};

use super::off_runtime;

/// Body is parsed by hand so that every malformed request maps to the same 400.
pub async fn import_units(
    Extension(service): Extension<Arc<CatalogService>>,
    body: Bytes,
) -> axum::response::Response {
    let request: dto::ImportRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "rejected malformed import body");
            return errors::validation_failed();
        }
    };

    let batch = match request.into_batch() {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "rejected import");
            return errors::domain_error_to_response(&e);
        }
    };

    match off_runtime(move || service.import_batch(batch)).await {
        Ok(_) => errors::success(),
        Err(response) => response,
    }
}
