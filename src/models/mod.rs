mod film;
mod like;
mod user;

pub use film::{Director, Film, FilmRow, Genre, Mpa, NewFilm};
pub(crate) use film::present;
pub use like::LikeEdge;
pub use user::{NewUser, User};

/// Which fields a search query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Title,
    Director,
    Both,
}

impl SearchScope {
    /// Parses the comma-separated `by` parameter (`title`, `director`, or both)
    pub fn parse(by: &str) -> Option<Self> {
        let mut title = false;
        let mut director = false;
        for part in by.split(',').map(str::trim) {
            match part.to_lowercase().as_str() {
                "title" => title = true,
                "director" => director = true,
                _ => return None,
            }
        }

        match (title, director) {
            (true, true) => Some(SearchScope::Both),
            (true, false) => Some(SearchScope::Title),
            (false, true) => Some(SearchScope::Director),
            (false, false) => None,
        }
    }

    pub fn matches_title(&self) -> bool {
        matches!(self, SearchScope::Title | SearchScope::Both)
    }

    pub fn matches_director(&self) -> bool {
        matches!(self, SearchScope::Director | SearchScope::Both)
    }
}

/// Ordering for films of a single director
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorSort {
    Year,
    Likes,
}

impl DirectorSort {
    pub fn parse(sort_by: &str) -> Option<Self> {
        match sort_by.trim().to_lowercase().as_str() {
            "year" => Some(DirectorSort::Year),
            "likes" => Some(DirectorSort::Likes),
            _ => None,
        }
    }
}

/// Optional filters for the popularity ranking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopularQuery {
    pub limit: Option<i64>,
    pub genre_id: Option<i32>,
    pub year: Option<i32>,
}
