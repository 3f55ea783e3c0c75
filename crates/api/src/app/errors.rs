use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use market_core::DomainError;
use market_infra::ServiceError;

pub const VALIDATION_FAILED: &str = "Validation Failed";
pub const NOT_FOUND: &str = "Item not found";

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "code": status.as_u16(),
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_failed() -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, VALIDATION_FAILED)
}

pub fn not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, NOT_FOUND)
}

pub fn internal_error() -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

pub fn success() -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(json!({ "code": 200, "message": "Success" })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: &DomainError) -> axum::response::Response {
    match err {
        DomainError::NotFound(_) => not_found(),
        _ => validation_failed(),
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(&e),
        other => {
            tracing::error!(error = %other, "internal error");
            internal_error()
        }
    }
}
