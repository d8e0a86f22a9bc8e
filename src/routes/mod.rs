use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::FilmService,
};

pub mod extract;
pub mod films;
pub mod likes;
pub mod recommendations;
pub mod registration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub films: FilmService,
}

impl AppState {
    pub fn new(films: FilmService) -> Self {
        Self { films }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(film_routes())
        .route("/users", post(registration::create_user))
        .route(
            "/users/:id/recommendations",
            get(recommendations::recommend),
        )
        .route("/directors", post(registration::create_director))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn film_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/films",
            get(films::find_all).post(films::create).put(films::update),
        )
        .route("/films/popular", get(films::popular))
        .route("/films/search", get(films::search))
        .route("/films/common", get(films::common))
        .route("/films/director/:director_id", get(films::by_director))
        .route("/films/:id", get(films::find_by_id).delete(films::delete))
        .route(
            "/films/:id/like/:user_id",
            put(likes::add_like).delete(likes::remove_like),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
