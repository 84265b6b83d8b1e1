use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use userhub_core::{UserId, UserInput};

use crate::app::dto::{FindUsersQuery, RemoveUserResponse, UpdateUserRequest};
use crate::app::errors::{
    json_error, json_rejection_to_response, query_rejection_to_response, repository_error_to_response,
};
use crate::app::services::AppServices;

pub async fn find_users(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<FindUsersQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejection_to_response(rejection),
    };

    let limit = match query.limit() {
        Ok(limit) => limit,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_limit", e.to_string()),
    };

    match services.users().find(&query.filter(), query.page_token(), limit).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => repository_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<UserInput>, JsonRejection>,
) -> axum::response::Response {
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection_to_response(rejection),
    };

    match services.users().create(input).await {
        Ok(user) => {
            info!(user_id = %user.id, "user created");
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(e) => repository_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(UpdateUserRequest { id, input }) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection_to_response(rejection),
    };

    match services.users().update(id, input).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => repository_error_to_response(e),
    }
}

pub async fn remove_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<UserId>() {
        Ok(id) => id,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()),
    };

    match services.users().remove(id).await {
        Ok(rows_affected) => (StatusCode::OK, Json(RemoveUserResponse { rows_affected })).into_response(),
        Err(e) => repository_error_to_response(e),
    }
}
