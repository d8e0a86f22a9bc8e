use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{DirectorSort, Film, NewFilm, PopularQuery, SearchScope},
    routes::{
        extract::{ApiJson, ApiPath, ApiQuery},
        AppState,
    },
};

const DEFAULT_POPULAR_COUNT: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularParams {
    count: Option<i64>,
    genre_id: Option<i32>,
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    query: String,
    by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonParams {
    user_id: i32,
    friend_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorParams {
    sort_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdRef {
    id: i32,
}

/// Film body of `POST /films` and `PUT /films`; `mpa`, `genres` and
/// `directors` reference existing entities by id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmPayload {
    id: Option<i32>,
    name: String,
    #[serde(default)]
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa: Option<IdRef>,
    genres: Option<Vec<IdRef>>,
    directors: Option<Vec<IdRef>>,
}

impl FilmPayload {
    fn into_parts(self) -> (Option<i32>, NewFilm) {
        let ids = |refs: Option<Vec<IdRef>>| {
            refs.unwrap_or_default()
                .into_iter()
                .map(|r| r.id)
                .collect::<Vec<_>>()
        };

        let film = NewFilm {
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            rating_id: self.mpa.map(|mpa| mpa.id),
            genre_ids: ids(self.genres),
            director_ids: ids(self.directors),
        };
        (self.id, film)
    }
}

/// Handler for listing every film
pub async fn find_all(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    let films = state.films.all_films().await?;
    tracing::debug!(count = films.len(), "Listed films");
    Ok(Json(films))
}

/// Handler for a single film
pub async fn find_by_id(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.films.film_by_id(id).await?))
}

/// Handler for adding a film
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(payload): ApiJson<FilmPayload>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let (_, film) = payload.into_parts();
    let created = state.films.create_film(film).await?;

    tracing::info!(request_id = %request_id, film_id = created.id, "Film created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for replacing a film; the body must carry its id
pub async fn update(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(payload): ApiJson<FilmPayload>,
) -> AppResult<Json<Film>> {
    let (id, film) = payload.into_parts();
    let id = id.ok_or_else(|| AppError::InvalidArgument("film id is required".to_string()))?;
    let updated = state.films.update_film(id, film).await?;

    tracing::info!(request_id = %request_id, film_id = id, "Film updated");

    Ok(Json(updated))
}

/// Handler for deleting a film together with its likes
pub async fn delete(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    state.films.delete_film(id).await?;

    tracing::info!(request_id = %request_id, film_id = id, "Film deleted");

    Ok(StatusCode::OK)
}

/// Handler for the popularity ranking
pub async fn popular(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<PopularParams>,
) -> AppResult<Json<Vec<Film>>> {
    let query = PopularQuery {
        limit: Some(params.count.unwrap_or(DEFAULT_POPULAR_COUNT)),
        genre_id: params.genre_id,
        year: params.year,
    };

    tracing::info!(
        request_id = %request_id,
        limit = ?query.limit,
        genre_id = ?query.genre_id,
        year = ?query.year,
        "Ranking popular films"
    );

    Ok(Json(state.films.popular(&query).await?))
}

/// Handler for title/director search
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<Json<Vec<Film>>> {
    let by = params.by.as_deref().unwrap_or("title");
    let scope = SearchScope::parse(by)
        .ok_or_else(|| AppError::InvalidArgument(format!("Unsupported search scope `{}`", by)))?;

    let films = state.films.search(&params.query, scope).await?;

    tracing::info!(
        request_id = %request_id,
        query = %params.query,
        scope = ?scope,
        matches = films.len(),
        "Searched films"
    );

    Ok(Json(films))
}

/// Handler for films liked by both a user and a friend
pub async fn common(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CommonParams>,
) -> AppResult<Json<Vec<Film>>> {
    let films = state
        .films
        .common_films(params.user_id, params.friend_id)
        .await?;
    Ok(Json(films))
}

/// Handler for films of one director
pub async fn by_director(
    State(state): State<AppState>,
    ApiPath(director_id): ApiPath<i32>,
    ApiQuery(params): ApiQuery<DirectorParams>,
) -> AppResult<Json<Vec<Film>>> {
    let sort = match params.sort_by.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(sort_by) => Some(DirectorSort::parse(sort_by).ok_or_else(|| {
            AppError::InvalidArgument(format!("Unsupported sortBy `{}`", sort_by))
        })?),
        None => None,
    };

    Ok(Json(state.films.films_by_director(director_id, sort).await?))
}
