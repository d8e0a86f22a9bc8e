use axum::{extract::State, http::StatusCode, Extension};

use crate::{
    error::AppResult,
    middleware::RequestId,
    routes::{extract::ApiPath, AppState},
};

/// Handler for liking a film; liking twice is accepted
pub async fn add_like(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((film_id, user_id)): ApiPath<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.films.add_like(film_id, user_id).await?;

    tracing::info!(request_id = %request_id, film_id, user_id, "Like added");

    Ok(StatusCode::OK)
}

/// Handler for withdrawing a like; a missing like is accepted
pub async fn remove_like(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((film_id, user_id)): ApiPath<(i32, i32)>,
) -> AppResult<StatusCode> {
    state.films.remove_like(film_id, user_id).await?;

    tracing::info!(request_id = %request_id, film_id, user_id, "Like removed");

    Ok(StatusCode::OK)
}
