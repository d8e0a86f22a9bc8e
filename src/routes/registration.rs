use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Director, NewUser, User},
    routes::{extract::ApiJson, AppState},
};

#[derive(Debug, Deserialize)]
pub struct DirectorPayload {
    name: String,
}

/// Handler for registering a user
pub async fn create_user(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(profile): ApiJson<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.films.register_user(profile).await?;

    tracing::info!(request_id = %request_id, user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for registering a director
pub async fn create_director(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(payload): ApiJson<DirectorPayload>,
) -> AppResult<(StatusCode, Json<Director>)> {
    let director = state.films.register_director(&payload.name).await?;

    tracing::info!(request_id = %request_id, director_id = director.id, "Director registered");

    Ok((StatusCode::CREATED, Json(director)))
}
