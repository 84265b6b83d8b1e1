use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use userhub_infra::RepositoryError;

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Validation(e) => json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        RepositoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        RepositoryError::Timeout(operation) => json_error(
            StatusCode::GATEWAY_TIMEOUT,
            "timeout",
            format!("store timed out in {operation}"),
        ),
        e @ (RepositoryError::NotPersisted | RepositoryError::Store { .. } | RepositoryError::MalformedRow { .. }) => {
            error!(error = %e, "repository failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
