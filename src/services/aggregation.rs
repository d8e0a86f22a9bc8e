use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::{
    error::{AppError, AppResult},
    models::{present, Director, Film, FilmRow, Genre, Mpa},
};

/// Mutable record for one film while its rows are being folded
struct FilmDraft {
    id: i32,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa: Option<Mpa>,
    genres: Vec<Genre>,
    seen_genres: HashSet<i32>,
    directors: BTreeMap<i32, Director>,
    likes: BTreeSet<i32>,
}

impl FilmDraft {
    fn from_row(row: &FilmRow) -> AppResult<Self> {
        Ok(Self {
            id: row.film_id,
            name: required(row, "name", row.name.clone())?,
            description: required(row, "description", row.description.clone())?,
            release_date: required(row, "release_date", row.release_date)?,
            duration: required(row, "duration", row.duration)?,
            mpa: None,
            genres: Vec::new(),
            seen_genres: HashSet::new(),
            directors: BTreeMap::new(),
            likes: BTreeSet::new(),
        })
    }

    /// Adds the row's associations; scalar fields are never touched
    fn merge(&mut self, row: &FilmRow) {
        if let Some(user_id) = present(row.liker_user_id) {
            self.likes.insert(user_id);
        }

        if let Some(rating_id) = present(row.rating_id) {
            self.mpa.get_or_insert_with(|| Mpa {
                id: rating_id,
                name: row.rating_name.clone().unwrap_or_default(),
            });
        }

        if let Some(genre_id) = present(row.genre_id) {
            if self.seen_genres.insert(genre_id) {
                self.genres.push(Genre {
                    id: genre_id,
                    name: row.genre_name.clone().unwrap_or_default(),
                });
            }
        }

        if let Some(director_id) = present(row.director_id) {
            self.directors.entry(director_id).or_insert_with(|| Director {
                id: director_id,
                name: row.director_name.clone().unwrap_or_default(),
            });
        }
    }

    fn finish(self) -> Film {
        Film {
            id: self.id,
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            mpa: self.mpa,
            genres: self.genres,
            directors: self.directors.into_values().collect(),
            likes: self.likes,
        }
    }
}

fn required<T>(row: &FilmRow, column: &str, value: Option<T>) -> AppResult<T> {
    value.ok_or_else(|| {
        AppError::DataIntegrity(format!(
            "join row for film {} is missing `{}`",
            row.film_id, column
        ))
    })
}

/// Folds a flat join result into one film per distinct film id
///
/// Films come out in the order their id was first seen. Scalar fields are taken
/// from the first row of each film; later rows only add genres, directors,
/// likers and the rating. Every row must carry the mandatory descriptive
/// columns, otherwise the whole fold fails with `DataIntegrity`.
pub fn aggregate_films<I>(rows: I) -> AppResult<Vec<Film>>
where
    I: IntoIterator<Item = FilmRow>,
{
    let mut drafts: Vec<FilmDraft> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for row in rows {
        if row.film_id <= 0 {
            return Err(AppError::DataIntegrity(format!(
                "join row has invalid film id {}",
                row.film_id
            )));
        }

        let slot = match index.get(&row.film_id).copied() {
            Some(slot) => {
                validate_scalars(&row)?;
                slot
            }
            None => {
                let slot = drafts.len();
                drafts.push(FilmDraft::from_row(&row)?);
                index.insert(row.film_id, slot);
                slot
            }
        };

        drafts[slot].merge(&row);
    }

    Ok(drafts.into_iter().map(FilmDraft::finish).collect())
}

fn validate_scalars(row: &FilmRow) -> AppResult<()> {
    required(row, "name", row.name.as_ref())?;
    required(row, "description", row.description.as_ref())?;
    required(row, "release_date", row.release_date)?;
    required(row, "duration", row.duration)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_rows {
    use super::*;

    /// A row with only the mandatory columns set
    pub fn base_row(film_id: i32, name: &str) -> FilmRow {
        FilmRow {
            film_id,
            name: Some(name.to_string()),
            description: Some(format!("About {}", name)),
            release_date: NaiveDate::from_ymd_opt(2000 + film_id, 1, 1),
            duration: Some(90 + film_id),
            ..FilmRow::default()
        }
    }

    pub fn with_genre(mut row: FilmRow, id: i32, name: &str) -> FilmRow {
        row.genre_id = Some(id);
        row.genre_name = Some(name.to_string());
        row
    }

    pub fn with_director(mut row: FilmRow, id: i32, name: &str) -> FilmRow {
        row.director_id = Some(id);
        row.director_name = Some(name.to_string());
        row
    }

    pub fn with_liker(mut row: FilmRow, user_id: i32) -> FilmRow {
        row.liker_user_id = Some(user_id);
        row
    }

    pub fn with_rating(mut row: FilmRow, id: i32, name: &str) -> FilmRow {
        row.rating_id = Some(id);
        row.rating_name = Some(name.to_string());
        row
    }
}
