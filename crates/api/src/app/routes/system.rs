use std::any::Any;
use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response};
use tracing::{error, warn};

use crate::app::errors::json_error;
use crate::app::services::AppServices;

/// 204 when every dependency answers, 500 otherwise.
pub async fn healthz(Extension(services): Extension<Arc<AppServices>>) -> StatusCode {
    match services.health().test_connection().await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => {
            warn!(error = %e, "health check failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Turn a handler panic into a 500 instead of dropping the connection.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    error!(panic = detail, "request handler panicked");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}
