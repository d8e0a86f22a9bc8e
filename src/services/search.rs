use crate::models::{Film, SearchScope};

/// Case-insensitive substring match over titles and/or director names
///
/// No scoring: matches come back by descending film id. An empty query is a
/// substring of everything and matches every film.
pub fn search_films(films: Vec<Film>, query: &str, scope: SearchScope) -> Vec<Film> {
    let needle = query.to_lowercase();

    let mut matched: Vec<Film> = films
        .into_iter()
        .filter(|film| matches(film, &needle, scope))
        .collect();

    matched.sort_by(|a, b| b.id.cmp(&a.id));
    matched
}

fn matches(film: &Film, needle: &str, scope: SearchScope) -> bool {
    if scope.matches_title() && film.name.to_lowercase().contains(needle) {
        return true;
    }

    scope.matches_director()
        && film
            .directors
            .iter()
            .any(|director| director.name.to_lowercase().contains(needle))
}
