use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CatalogWriter, Directory, FilmFilter, FilmRowSource, LikeStore};
use crate::{
    error::{AppError, AppResult},
    models::{FilmRow, LikeEdge, NewFilm, NewUser},
};

/// In-process catalog that emulates the relational left join row for row
///
/// Backs the `memory` storage backend and the integration tests.
#[derive(Clone)]
pub struct MemoryFilmStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

struct MemoryStoreInner {
    films: BTreeMap<i32, NewFilm>,
    ratings: HashMap<i32, String>,
    genres: HashMap<i32, String>,
    directors: BTreeMap<i32, String>,
    users: BTreeMap<i32, NewUser>,
    /// Ordered by (user, film)
    likes: BTreeSet<LikeEdge>,
    /// Film id to the users who liked it
    fans: BTreeMap<i32, BTreeSet<i32>>,
    next_film_id: i32,
    next_director_id: i32,
    next_user_id: i32,
}

impl Default for MemoryFilmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFilmStore {
    /// Creates an empty store with the standard MPA ratings and genres
    pub fn new() -> Self {
        let ratings = [(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")];
        let genres = [
            (1, "Comedy"),
            (2, "Drama"),
            (3, "Animation"),
            (4, "Thriller"),
            (5, "Documentary"),
            (6, "Action"),
        ];

        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner {
                films: BTreeMap::new(),
                ratings: ratings.iter().map(|(id, name)| (*id, name.to_string())).collect(),
                genres: genres.iter().map(|(id, name)| (*id, name.to_string())).collect(),
                directors: BTreeMap::new(),
                users: BTreeMap::new(),
                likes: BTreeSet::new(),
                fans: BTreeMap::new(),
                next_film_id: 1,
                next_director_id: 1,
                next_user_id: 1,
            })),
        }
    }
}

impl MemoryStoreInner {
    fn selected(&self, filter: &FilmFilter) -> Vec<(i32, &NewFilm)> {
        match filter {
            FilmFilter::All | FilmFilter::Search { .. } => {
                self.films.iter().map(|(id, film)| (*id, film)).collect()
            }
            FilmFilter::ById(id) => self.films.get(id).map(|film| (*id, film)).into_iter().collect(),
            FilmFilter::ByIds(ids) => {
                let wanted: BTreeSet<i32> = ids.iter().copied().collect();
                wanted
                    .into_iter()
                    .filter_map(|id| self.films.get(&id).map(|film| (id, film)))
                    .collect()
            }
            FilmFilter::ByDirector(director_id) => self
                .films
                .iter()
                .filter(|(_, film)| film.director_ids.contains(director_id))
                .map(|(id, film)| (*id, film))
                .collect(),
        }
    }

    fn likers(&self, film_id: i32) -> Vec<i32> {
        self.fans
            .get(&film_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    fn edges_of(&self, user_id: i32) -> impl Iterator<Item = LikeEdge> + '_ {
        self.likes
            .range(LikeEdge::new(user_id, i32::MIN)..=LikeEdge::new(user_id, i32::MAX))
            .copied()
    }

    fn insert_like(&mut self, edge: LikeEdge) {
        self.likes.insert(edge);
        self.fans.entry(edge.film_id).or_default().insert(edge.user_id);
    }

    fn remove_like(&mut self, edge: LikeEdge) {
        self.likes.remove(&edge);
        if let Some(users) = self.fans.get_mut(&edge.film_id) {
            users.remove(&edge.user_id);
            if users.is_empty() {
                self.fans.remove(&edge.film_id);
            }
        }
    }

    /// Rating, genres and directors must already exist
    fn check_references(&self, film: &NewFilm) -> AppResult<()> {
        if let Some(rating_id) = film.rating_id {
            if !self.ratings.contains_key(&rating_id) {
                return Err(AppError::NotFound(format!("MPA rating {} not found", rating_id)));
            }
        }
        if let Some(genre_id) = film.genre_ids.iter().find(|id| !self.genres.contains_key(*id)) {
            return Err(AppError::NotFound(format!("Genre {} not found", genre_id)));
        }
        if let Some(director_id) = film
            .director_ids
            .iter()
            .find(|id| !self.directors.contains_key(*id))
        {
            return Err(AppError::NotFound(format!("Director {} not found", director_id)));
        }
        Ok(())
    }

    /// Cartesian product of genres × directors × likers, with a single empty
    /// slot standing in for each missing association
    fn join_rows(&self, film_id: i32, film: &NewFilm) -> Vec<FilmRow> {
        let genres = optional_slots(&film.genre_ids);
        let directors = optional_slots(&film.director_ids);
        let likers = optional_slots(&self.likers(film_id));

        let mut rows = Vec::with_capacity(genres.len() * directors.len() * likers.len());
        for genre_id in &genres {
            for director_id in &directors {
                for liker in &likers {
                    rows.push(FilmRow {
                        film_id,
                        name: Some(film.name.clone()),
                        description: Some(film.description.clone()),
                        release_date: Some(film.release_date),
                        duration: Some(film.duration),
                        rating_id: film.rating_id,
                        rating_name: film.rating_id.and_then(|id| self.ratings.get(&id).cloned()),
                        genre_id: *genre_id,
                        genre_name: genre_id.and_then(|id| self.genres.get(&id).cloned()),
                        director_id: *director_id,
                        director_name: director_id.and_then(|id| self.directors.get(&id).cloned()),
                        liker_user_id: *liker,
                    });
                }
            }
        }
        rows
    }
}

fn optional_slots(ids: &[i32]) -> Vec<Option<i32>> {
    if ids.is_empty() {
        vec![None]
    } else {
        ids.iter().copied().map(Some).collect()
    }
}

/// Repeated genre or director ids are stored once
fn normalized(film: &NewFilm) -> NewFilm {
    let mut film = film.clone();
    let mut seen = BTreeSet::new();
    film.genre_ids.retain(|id| seen.insert(*id));
    seen.clear();
    film.director_ids.retain(|id| seen.insert(*id));
    film
}

#[async_trait::async_trait]
impl FilmRowSource for MemoryFilmStore {
    async fn film_rows(&self, filter: &FilmFilter) -> AppResult<Vec<FilmRow>> {
        let inner = self.inner.read().await;
        let rows: Vec<FilmRow> = inner
            .selected(filter)
            .into_iter()
            .flat_map(|(film_id, film)| inner.join_rows(film_id, film))
            .collect();

        tracing::debug!(filter = ?filter, row_count = rows.len(), "Built film join rows");

        Ok(rows)
    }
}

#[async_trait::async_trait]
impl LikeStore for MemoryFilmStore {
    async fn liked_film_ids(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let inner = self.inner.read().await;
        Ok(inner.edges_of(user_id).map(|edge| edge.film_id).collect())
    }

    async fn cohort_like_edges(&self, user_id: i32) -> AppResult<Vec<LikeEdge>> {
        let inner = self.inner.read().await;

        let cohort: BTreeSet<i32> = inner
            .edges_of(user_id)
            .filter_map(|edge| inner.fans.get(&edge.film_id))
            .flatten()
            .copied()
            .collect();

        Ok(cohort.into_iter().flat_map(|peer| inner.edges_of(peer)).collect())
    }

    async fn add_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        self.inner.write().await.insert_like(LikeEdge::new(user_id, film_id));
        Ok(())
    }

    async fn remove_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        self.inner.write().await.remove_like(LikeEdge::new(user_id, film_id));
        Ok(())
    }
}

#[async_trait::async_trait]
impl Directory for MemoryFilmStore {
    async fn user_exists(&self, user_id: i32) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains_key(&user_id))
    }

    async fn film_exists(&self, film_id: i32) -> AppResult<bool> {
        Ok(self.inner.read().await.films.contains_key(&film_id))
    }

    async fn director_exists(&self, director_id: i32) -> AppResult<bool> {
        Ok(self.inner.read().await.directors.contains_key(&director_id))
    }

    async fn rating_exists(&self, rating_id: i32) -> AppResult<bool> {
        Ok(self.inner.read().await.ratings.contains_key(&rating_id))
    }

    async fn genre_exists(&self, genre_id: i32) -> AppResult<bool> {
        Ok(self.inner.read().await.genres.contains_key(&genre_id))
    }
}

#[async_trait::async_trait]
impl CatalogWriter for MemoryFilmStore {
    async fn create_film(&self, film: &NewFilm) -> AppResult<i32> {
        let mut inner = self.inner.write().await;
        inner.check_references(film)?;

        let id = inner.next_film_id;
        inner.next_film_id += 1;
        inner.films.insert(id, normalized(film));
        Ok(id)
    }

    async fn update_film(&self, film_id: i32, film: &NewFilm) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.films.contains_key(&film_id) {
            return Ok(false);
        }
        inner.check_references(film)?;

        inner.films.insert(film_id, normalized(film));
        Ok(true)
    }

    async fn delete_film(&self, film_id: i32) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.films.remove(&film_id).is_none() {
            return Ok(false);
        }

        let fans = inner.fans.remove(&film_id).unwrap_or_default();
        for user_id in fans {
            inner.likes.remove(&LikeEdge::new(user_id, film_id));
        }
        Ok(true)
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<i32> {
        let mut inner = self.inner.write().await;
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        inner.users.insert(id, user.clone());
        Ok(id)
    }

    async fn create_director(&self, name: &str) -> AppResult<i32> {
        let mut inner = self.inner.write().await;
        let id = inner.next_director_id;
        inner.next_director_id += 1;
        inner.directors.insert(id, name.to_string());
        Ok(id)
    }
}
