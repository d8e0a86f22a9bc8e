use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    db::{CatalogWriter, Directory, FilmFilter, FilmRowSource, LikeStore},
    error::{AppError, AppResult},
    models::{Director, DirectorSort, Film, NewFilm, NewUser, PopularQuery, SearchScope, User},
    services::{aggregation, like_graph, popularity, recommendations, search},
};

/// Entry point for every catalog read and write
///
/// Collaborators are passed in explicitly; the service fetches rows or edges
/// from them and hands the results to the synchronous core.
#[derive(Clone)]
pub struct FilmService {
    rows: Arc<dyn FilmRowSource>,
    likes: Arc<dyn LikeStore>,
    directory: Arc<dyn Directory>,
    writer: Arc<dyn CatalogWriter>,
}

impl FilmService {
    pub fn new(
        rows: Arc<dyn FilmRowSource>,
        likes: Arc<dyn LikeStore>,
        directory: Arc<dyn Directory>,
        writer: Arc<dyn CatalogWriter>,
    ) -> Self {
        Self {
            rows,
            likes,
            directory,
            writer,
        }
    }

    /// Builds a service whose collaborators are all the same store
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: FilmRowSource + LikeStore + Directory + CatalogWriter + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    async fn films(&self, filter: &FilmFilter) -> AppResult<Vec<Film>> {
        let rows = self.rows.film_rows(filter).await?;
        aggregation::aggregate_films(rows)
    }

    /// Every film, ascending by id
    pub async fn all_films(&self) -> AppResult<Vec<Film>> {
        self.films(&FilmFilter::All).await
    }

    pub async fn film_by_id(&self, film_id: i32) -> AppResult<Film> {
        self.films(&FilmFilter::ById(film_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| film_not_found(film_id))
    }

    pub async fn popular(&self, query: &PopularQuery) -> AppResult<Vec<Film>> {
        // Reject a bad limit before touching storage
        if let Some(limit) = query.limit.filter(|limit| *limit <= 0) {
            return Err(AppError::InvalidArgument(format!(
                "count must be positive, got {}",
                limit
            )));
        }

        let films = self.all_films().await?;
        popularity::rank_popular(films, query)
    }

    /// Films of one director, by id unless a sort is requested
    pub async fn films_by_director(
        &self,
        director_id: i32,
        sort: Option<DirectorSort>,
    ) -> AppResult<Vec<Film>> {
        if !self.directory.director_exists(director_id).await? {
            return Err(AppError::NotFound(format!(
                "Director {} not found",
                director_id
            )));
        }

        let mut films = self.films(&FilmFilter::ByDirector(director_id)).await?;
        match sort {
            Some(DirectorSort::Year) => films.sort_by_key(|film| film.release_date),
            Some(DirectorSort::Likes) => films.sort_by_key(|film| Reverse(film.like_count())),
            None => {}
        }

        Ok(films)
    }

    pub async fn search(&self, query: &str, scope: SearchScope) -> AppResult<Vec<Film>> {
        let filter = FilmFilter::Search {
            query: query.to_string(),
            scope,
        };
        let films = self.films(&filter).await?;
        Ok(search::search_films(films, query, scope))
    }

    /// Films both users liked, most liked first
    pub async fn common_films(&self, user_id: i32, friend_id: i32) -> AppResult<Vec<Film>> {
        self.require_user(user_id).await?;
        self.require_user(friend_id).await?;

        let ours: BTreeSet<i32> = self.likes.liked_film_ids(user_id).await?.into_iter().collect();
        let theirs: BTreeSet<i32> = self.likes.liked_film_ids(friend_id).await?.into_iter().collect();
        let shared: Vec<i32> = ours.intersection(&theirs).copied().collect();

        let mut films = self.materialize(shared).await?;
        films.sort_by_key(|film| Reverse(film.like_count()));
        Ok(films)
    }

    pub async fn create_film(&self, film: NewFilm) -> AppResult<Film> {
        let film = film.validate()?;
        self.require_references(&film).await?;

        let film_id = self.writer.create_film(&film).await?;
        tracing::debug!(film_id, "Created film");

        self.film_by_id(film_id).await
    }

    /// Overwrites a film; its genres and directors are replaced, likes stay
    pub async fn update_film(&self, film_id: i32, film: NewFilm) -> AppResult<Film> {
        let film = film.validate()?;
        self.require_film(film_id).await?;
        self.require_references(&film).await?;

        if !self.writer.update_film(film_id, &film).await? {
            return Err(film_not_found(film_id));
        }
        tracing::debug!(film_id, "Updated film");

        self.film_by_id(film_id).await
    }

    pub async fn delete_film(&self, film_id: i32) -> AppResult<()> {
        if !self.writer.delete_film(film_id).await? {
            return Err(film_not_found(film_id));
        }
        tracing::debug!(film_id, "Deleted film");
        Ok(())
    }

    pub async fn register_user(&self, user: NewUser) -> AppResult<User> {
        let user = user.validate()?;
        let user_id = self.writer.create_user(&user).await?;
        Ok(User::new(user_id, user))
    }

    pub async fn register_director(&self, name: &str) -> AppResult<Director> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "director name must not be blank".to_string(),
            ));
        }

        let id = self.writer.create_director(name).await?;
        Ok(Director {
            id,
            name: name.to_string(),
        })
    }

    pub async fn add_like(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        self.require_user(user_id).await?;
        self.require_film(film_id).await?;
        self.likes.add_like_edge(film_id, user_id).await
    }

    pub async fn remove_like(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        self.require_user(user_id).await?;
        self.require_film(film_id).await?;
        self.likes.remove_like_edge(film_id, user_id).await
    }

    /// Films liked by the user's most similar peers, ascending by id
    pub async fn recommendations(&self, user_id: i32) -> AppResult<Vec<Film>> {
        self.require_user(user_id).await?;

        let Some(graph) = like_graph::build_like_graph(self.likes.as_ref(), user_id).await? else {
            return Ok(Vec::new());
        };

        let film_ids = recommendations::recommend_film_ids(&graph);
        tracing::debug!(
            user_id,
            peers = graph.peer_count(),
            candidates = film_ids.len(),
            "Computed recommendation candidates"
        );

        self.materialize(film_ids).await
    }

    /// Turns film ids into full films, ascending by id
    async fn materialize(&self, mut film_ids: Vec<i32>) -> AppResult<Vec<Film>> {
        if film_ids.is_empty() {
            return Ok(Vec::new());
        }

        film_ids.sort_unstable();
        film_ids.dedup();
        let mut films = self.films(&FilmFilter::ByIds(film_ids)).await?;
        films.sort_by_key(|film| film.id);
        Ok(films)
    }

    async fn require_user(&self, user_id: i32) -> AppResult<()> {
        if self.directory.user_exists(user_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {} not found", user_id)))
        }
    }

    async fn require_film(&self, film_id: i32) -> AppResult<()> {
        if self.directory.film_exists(film_id).await? {
            Ok(())
        } else {
            Err(film_not_found(film_id))
        }
    }

    /// Rating, genres and directors named by the film must exist
    async fn require_references(&self, film: &NewFilm) -> AppResult<()> {
        if let Some(rating_id) = film.rating_id {
            if !self.directory.rating_exists(rating_id).await? {
                return Err(AppError::NotFound(format!("MPA rating {} not found", rating_id)));
            }
        }
        for genre_id in &film.genre_ids {
            if !self.directory.genre_exists(*genre_id).await? {
                return Err(AppError::NotFound(format!("Genre {} not found", genre_id)));
            }
        }
        for director_id in &film.director_ids {
            if !self.directory.director_exists(*director_id).await? {
                return Err(AppError::NotFound(format!("Director {} not found", director_id)));
            }
        }
        Ok(())
    }
}

fn film_not_found(film_id: i32) -> AppError {
    AppError::NotFound(format!("Film {} not found", film_id))
}
