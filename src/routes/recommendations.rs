use axum::{extract::State, Extension, Json};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::Film,
    routes::{extract::ApiPath, AppState},
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(user_id): ApiPath<i32>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(request_id = %request_id, user_id, "Processing recommendation request");

    let recommendations = state.films.recommendations(user_id).await?;

    tracing::info!(
        request_id = %request_id,
        recommended = recommendations.len(),
        "Recommendations computed"
    );

    Ok(Json(recommendations))
}
