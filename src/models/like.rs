use serde::{Deserialize, Serialize};

/// "User liked film" fact; the like relation is a set of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LikeEdge {
    pub user_id: i32,
    pub film_id: i32,
}

impl LikeEdge {
    pub fn new(user_id: i32, film_id: i32) -> Self {
        Self { user_id, film_id }
    }
}

impl From<(i32, i32)> for LikeEdge {
    fn from((user_id, film_id): (i32, i32)) -> Self {
        Self { user_id, film_id }
    }
}
