use crate::{
    error::{AppError, AppResult},
    models::{Film, PopularQuery},
};

/// Ranks films by like count, most liked first
///
/// `genre_id` and `year` are independent filters applied before ranking and
/// truncation. Ties keep their input order (the sort is stable), and the
/// catalog sources return films by ascending id, so equal counts rank by id.
pub fn rank_popular(films: Vec<Film>, query: &PopularQuery) -> AppResult<Vec<Film>> {
    let limit = match query.limit {
        Some(limit) if limit <= 0 => {
            return Err(AppError::InvalidArgument(format!(
                "count must be positive, got {}",
                limit
            )));
        }
        Some(limit) => Some(usize::try_from(limit).unwrap_or(usize::MAX)),
        None => None,
    };

    let mut ranked: Vec<Film> = films
        .into_iter()
        .filter(|film| query.genre_id.map_or(true, |genre_id| film.has_genre(genre_id)))
        .filter(|film| query.year.map_or(true, |year| film.release_year() == year))
        .collect();

    ranked.sort_by(|a, b| b.like_count().cmp(&a.like_count()));

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    Ok(ranked)
}
