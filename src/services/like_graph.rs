use std::collections::{BTreeMap, BTreeSet};

use crate::{db::LikeStore, error::AppResult, models::LikeEdge};

/// Who liked what, restricted to one user's taste cohort
///
/// Built per request and dropped afterwards. The target user's own likes are
/// held apart from the peers so overlap is only ever computed against others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeGraph {
    user_id: i32,
    target_likes: BTreeSet<i32>,
    peers: BTreeMap<i32, BTreeSet<i32>>,
}

impl LikeGraph {
    /// Folds cohort edges into a graph for `user_id`
    ///
    /// Returns `None` when the edges contain no like by `user_id`: without a
    /// single like there is nothing to compare against.
    pub fn from_edges<I>(user_id: i32, edges: I) -> Option<Self>
    where
        I: IntoIterator<Item = LikeEdge>,
    {
        let mut by_user: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();
        for edge in edges {
            by_user.entry(edge.user_id).or_default().insert(edge.film_id);
        }

        let target_likes = by_user.remove(&user_id).filter(|likes| !likes.is_empty())?;

        Some(Self {
            user_id,
            target_likes,
            peers: by_user,
        })
    }

    pub fn user_id(&self) -> i32 {
        self.user_id
    }

    /// Films the target user liked
    pub fn target_likes(&self) -> &BTreeSet<i32> {
        &self.target_likes
    }

    /// Every other cohort member with their liked films, ascending by user id
    pub fn peers(&self) -> impl Iterator<Item = (i32, &BTreeSet<i32>)> {
        self.peers.iter().map(|(user_id, films)| (*user_id, films))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

/// Loads the like graph for `user_id` from the store
///
/// The user's own likes are checked first; a user with no likes short-circuits
/// to `None` without fetching the cohort.
pub async fn build_like_graph(likes: &dyn LikeStore, user_id: i32) -> AppResult<Option<LikeGraph>> {
    if likes.liked_film_ids(user_id).await?.is_empty() {
        return Ok(None);
    }

    let edges = likes.cohort_like_edges(user_id).await?;
    Ok(LikeGraph::from_edges(user_id, edges))
}
