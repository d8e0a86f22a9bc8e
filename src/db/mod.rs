/// Storage collaborators for the film core
///
/// The aggregation and recommendation code never talks to a database directly.
/// It receives these traits as explicit arguments, so the same core runs on
/// PostgreSQL in production and on the in-memory store in tests.
use crate::{
    error::AppResult,
    models::{FilmRow, LikeEdge, NewFilm, NewUser, SearchScope},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryFilmStore;
pub use postgres::{create_pool, run_migrations, PgFilmStore};

#[cfg(test)]
use mockall::automock;

/// Selects which films a join query returns
///
/// Filters choose film ids only. Every returned film carries all of its genre,
/// director and liker rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilmFilter {
    All,
    ById(i32),
    ByIds(Vec<i32>),
    ByDirector(i32),
    /// Narrowing hint: sources may return a superset of the matching films
    Search { query: String, scope: SearchScope },
}

/// Produces the flattened films × likes × genres × rating × directors join
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FilmRowSource: Send + Sync {
    /// Rows grouped by film, films in ascending id order
    async fn film_rows(&self, filter: &FilmFilter) -> AppResult<Vec<FilmRow>>;
}

/// Read and mutate the like relation
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait LikeStore: Send + Sync {
    /// Films the user liked, ascending by id
    async fn liked_film_ids(&self, user_id: i32) -> AppResult<Vec<i32>>;

    /// Every like edge of every user sharing at least one like with `user_id`,
    /// the user's own edges included
    async fn cohort_like_edges(&self, user_id: i32) -> AppResult<Vec<LikeEdge>>;

    /// Adding an edge that already exists is a no-op
    async fn add_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()>;

    /// Removing an edge that does not exist is a no-op
    async fn remove_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()>;
}

/// Id resolution, used to raise `NotFound` before any work begins
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    async fn user_exists(&self, user_id: i32) -> AppResult<bool>;

    async fn film_exists(&self, film_id: i32) -> AppResult<bool>;

    async fn director_exists(&self, director_id: i32) -> AppResult<bool>;

    async fn rating_exists(&self, rating_id: i32) -> AppResult<bool>;

    async fn genre_exists(&self, genre_id: i32) -> AppResult<bool>;
}

/// Writes to the catalog: films with their associations, users and directors
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CatalogWriter: Send + Sync {
    /// Inserts the film and its genre and director links, returning the new id
    async fn create_film(&self, film: &NewFilm) -> AppResult<i32>;

    /// Overwrites the columns and replaces every genre and director link.
    /// Returns `false` when no film has this id.
    async fn update_film(&self, film_id: i32, film: &NewFilm) -> AppResult<bool>;

    /// Deletes the film together with its links and likes. Returns `false`
    /// when no film has this id.
    async fn delete_film(&self, film_id: i32) -> AppResult<bool>;

    async fn create_user(&self, user: &NewUser) -> AppResult<i32>;

    async fn create_director(&self, name: &str) -> AppResult<i32>;
}
