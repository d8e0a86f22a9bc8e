use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

const MAX_DESCRIPTION_CHARS: usize = 200;

/// MPA-style age rating attached to a film
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mpa {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Director {
    pub id: i32,
    pub name: String,
}

/// A fully aggregated film returned to the client
///
/// Genres keep the order in which they were first seen. Directors are ordered
/// by id and likes are a sorted set, so neither depends on row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Duration in minutes
    pub duration: i32,
    pub mpa: Option<Mpa>,
    pub genres: Vec<Genre>,
    pub directors: Vec<Director>,
    /// Ids of users who liked the film
    pub likes: BTreeSet<i32>,
}

impl Film {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn release_year(&self) -> i32 {
        self.release_date.year()
    }

    pub fn has_genre(&self, genre_id: i32) -> bool {
        self.genres.iter().any(|g| g.id == genre_id)
    }
}

/// Film as written by a client: descriptive columns plus association ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFilm {
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub rating_id: Option<i32>,
    pub genre_ids: Vec<i32>,
    pub director_ids: Vec<i32>,
}

impl NewFilm {
    /// Checks the descriptive columns and drops repeated genre and director ids
    pub fn validate(mut self) -> AppResult<Self> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidArgument("film name must not be blank".to_string()));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::InvalidArgument(format!(
                "description is longer than {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
        if NaiveDate::from_ymd_opt(1895, 12, 28).is_some_and(|first| self.release_date < first) {
            return Err(AppError::InvalidArgument(format!(
                "release date {} is before 1895-12-28",
                self.release_date
            )));
        }
        if self.duration <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }

        dedup_in_order(&mut self.genre_ids);
        dedup_in_order(&mut self.director_ids);
        Ok(self)
    }
}

fn dedup_in_order(ids: &mut Vec<i32>) {
    let mut seen = BTreeSet::new();
    ids.retain(|id| seen.insert(*id));
}

/// One row of the films × likes × genres × rating × directors left join
///
/// Every association column is optional: `None` or a non-positive id means the
/// join found no such row. The descriptive columns are mandatory, but they are
/// typed as `Option` so a corrupt join surfaces as an error instead of a
/// decode panic.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct FilmRow {
    pub film_id: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub duration: Option<i32>,
    pub rating_id: Option<i32>,
    pub rating_name: Option<String>,
    pub genre_id: Option<i32>,
    pub genre_name: Option<String>,
    pub director_id: Option<i32>,
    pub director_name: Option<String>,
    pub liker_user_id: Option<i32>,
}

/// Returns the id only when it is a real reference, treating `None` and the
/// zero sentinel alike
pub(crate) fn present(id: Option<i32>) -> Option<i32> {
    id.filter(|id| *id > 0)
}
