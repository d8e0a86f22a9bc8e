use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Transaction};

use super::{CatalogWriter, Directory, FilmFilter, FilmRowSource, LikeStore};
use crate::{
    error::AppResult,
    models::{FilmRow, LikeEdge, NewFilm, NewUser, SearchScope},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Left join of every film with its likes, genres, rating and directors.
/// One row per (film × like × genre × director) combination.
const FILM_JOIN: &str = r#"
SELECT f.film_id,
       f.name,
       f.description,
       f.release_date,
       f.duration,
       f.rating_id,
       mpa.name      AS rating_name,
       g.genre_id,
       g.name        AS genre_name,
       d.director_id,
       d.name        AS director_name,
       l.user_id     AS liker_user_id
FROM films AS f
         LEFT JOIN likes AS l ON l.film_id = f.film_id
         LEFT JOIN film_genres AS fg ON fg.film_id = f.film_id
         LEFT JOIN genres AS g ON g.genre_id = fg.genre_id
         LEFT JOIN mpa_rating AS mpa ON mpa.rating_id = f.rating_id
         LEFT JOIN film_directors AS fd ON fd.film_id = f.film_id
         LEFT JOIN directors AS d ON d.director_id = fd.director_id
"#;

const FILM_ORDER: &str = " ORDER BY f.film_id, g.genre_id, d.director_id, l.user_id";

/// Film catalog and like relation backed by PostgreSQL
#[derive(Clone)]
pub struct PgFilmStore {
    pool: PgPool,
}

impl PgFilmStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(sql).bind(id).fetch_one(&self.pool).await?;
        Ok(exists)
    }
}

/// Swaps the genre and director links of a film for the ones in `film`
async fn replace_links(
    tx: &mut Transaction<'_, Postgres>,
    film_id: i32,
    film: &NewFilm,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM film_genres WHERE film_id = $1")
        .bind(film_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO film_genres (film_id, genre_id) \
         SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING",
    )
    .bind(film_id)
    .bind(film.genre_ids.clone())
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM film_directors WHERE film_id = $1")
        .bind(film_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO film_directors (film_id, director_id) \
         SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING",
    )
    .bind(film_id)
    .bind(film.director_ids.clone())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Escapes `LIKE` metacharacters so the query is matched literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the WHERE clause for `filter`. Filters pick film ids through
/// subqueries so the joined associations of a matching film stay complete.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &FilmFilter) {
    match filter {
        FilmFilter::All => {}
        FilmFilter::ById(id) => {
            builder.push(" WHERE f.film_id = ").push_bind(*id);
        }
        FilmFilter::ByIds(ids) => {
            builder.push(" WHERE f.film_id = ANY(").push_bind(ids.clone()).push(")");
        }
        FilmFilter::ByDirector(director_id) => {
            builder
                .push(" WHERE f.film_id IN (SELECT film_id FROM film_directors WHERE director_id = ")
                .push_bind(*director_id)
                .push(")");
        }
        FilmFilter::Search { query, scope } => {
            let pattern = like_pattern(query);
            builder.push(" WHERE ");
            if scope.matches_title() {
                builder.push("f.name ILIKE ").push_bind(pattern.clone());
            }
            if *scope == SearchScope::Both {
                builder.push(" OR ");
            }
            if scope.matches_director() {
                builder
                    .push(
                        "f.film_id IN (SELECT sfd.film_id FROM film_directors AS sfd \
                         JOIN directors AS sd ON sd.director_id = sfd.director_id \
                         WHERE sd.name ILIKE ",
                    )
                    .push_bind(pattern)
                    .push(")");
            }
        }
    }
}

#[async_trait::async_trait]
impl FilmRowSource for PgFilmStore {
    async fn film_rows(&self, filter: &FilmFilter) -> AppResult<Vec<FilmRow>> {
        let mut builder = QueryBuilder::<Postgres>::new(FILM_JOIN);
        push_filter(&mut builder, filter);
        builder.push(FILM_ORDER);

        let rows = builder
            .build_query_as::<FilmRow>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(filter = ?filter, row_count = rows.len(), "Fetched film join rows");

        Ok(rows)
    }
}

#[async_trait::async_trait]
impl LikeStore for PgFilmStore {
    async fn liked_film_ids(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let film_ids: Vec<i32> =
            sqlx::query_scalar("SELECT film_id FROM likes WHERE user_id = $1 ORDER BY film_id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(film_ids)
    }

    async fn cohort_like_edges(&self, user_id: i32) -> AppResult<Vec<LikeEdge>> {
        let rows: Vec<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT l.user_id, l.film_id
            FROM likes AS l
            WHERE l.user_id IN (
                SELECT other.user_id
                FROM likes AS other
                WHERE other.film_id IN (SELECT film_id FROM likes WHERE user_id = $1)
            )
            ORDER BY l.user_id, l.film_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(user_id, edge_count = rows.len(), "Fetched cohort like edges");

        Ok(rows.into_iter().map(LikeEdge::from).collect())
    }

    async fn add_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        sqlx::query("INSERT INTO likes (film_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_like_edge(&self, film_id: i32, user_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM likes WHERE film_id = $1 AND user_id = $2")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl Directory for PgFilmStore {
    async fn user_exists(&self, user_id: i32) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)", user_id)
            .await
    }

    async fn film_exists(&self, film_id: i32) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM films WHERE film_id = $1)", film_id)
            .await
    }

    async fn director_exists(&self, director_id: i32) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM directors WHERE director_id = $1)",
            director_id,
        )
        .await
    }

    async fn rating_exists(&self, rating_id: i32) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM mpa_rating WHERE rating_id = $1)",
            rating_id,
        )
        .await
    }

    async fn genre_exists(&self, genre_id: i32) -> AppResult<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM genres WHERE genre_id = $1)", genre_id)
            .await
    }
}

#[async_trait::async_trait]
impl CatalogWriter for PgFilmStore {
    async fn create_film(&self, film: &NewFilm) -> AppResult<i32> {
        let mut tx = self.pool.begin().await?;

        let film_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO films (name, description, release_date, duration, rating_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING film_id
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.rating_id)
        .fetch_one(&mut *tx)
        .await?;

        replace_links(&mut tx, film_id, film).await?;
        tx.commit().await?;

        tracing::debug!(film_id, "Inserted film");

        Ok(film_id)
    }

    async fn update_film(&self, film_id: i32, film: &NewFilm) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE films
            SET name = $1, description = $2, release_date = $3, duration = $4, rating_id = $5
            WHERE film_id = $6
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.rating_id)
        .bind(film_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        replace_links(&mut tx, film_id, film).await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn delete_film(&self, film_id: i32) -> AppResult<bool> {
        // Links and likes go with it through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM films WHERE film_id = $1")
            .bind(film_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<i32> {
        let user_id: i32 = sqlx::query_scalar(
            "INSERT INTO users (email, login, name, birthday) VALUES ($1, $2, $3, $4) RETURNING user_id",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn create_director(&self, name: &str) -> AppResult<i32> {
        let director_id: i32 =
            sqlx::query_scalar("INSERT INTO directors (name) VALUES ($1) RETURNING director_id")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        Ok(director_id)
    }
}
