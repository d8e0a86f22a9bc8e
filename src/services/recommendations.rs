use std::collections::{BTreeMap, BTreeSet};

use super::like_graph::LikeGraph;

/// Groups peers by how many films they share with the target user
///
/// Maps overlap size to the union of everything liked by the peers with that
/// overlap. Peers with zero overlap are bucketed too.
pub fn overlap_buckets(graph: &LikeGraph) -> BTreeMap<usize, BTreeSet<i32>> {
    let target = graph.target_likes();
    let mut buckets: BTreeMap<usize, BTreeSet<i32>> = BTreeMap::new();

    for (_, films) in graph.peers() {
        let overlap = films.intersection(target).count();
        buckets.entry(overlap).or_default().extend(films.iter().copied());
    }

    buckets
}

/// Picks films for the target user from the most similar peers
///
/// Similarity is the raw count of shared likes, not Jaccard or cosine. Every
/// peer at the maximal overlap contributes equally: the result is the union of
/// their likes minus what the target already liked, ascending by film id. An
/// empty result means there is not enough signal, which is not an error.
pub fn recommend_film_ids(graph: &LikeGraph) -> Vec<i32> {
    let mut buckets = overlap_buckets(graph);

    let Some((max_overlap, candidates)) = buckets.pop_last() else {
        return Vec::new();
    };
    if max_overlap == 0 {
        return Vec::new();
    }

    candidates
        .difference(graph.target_likes())
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LikeEdge;

    fn graph(user_id: i32, likes: &[(i32, &[i32])]) -> LikeGraph {
        let edges = likes.iter().flat_map(|(user, films)| {
            films.iter().map(move |film| LikeEdge::new(*user, *film))
        });
        LikeGraph::from_edges(user_id, edges).unwrap()
    }

    #[test]
    fn test_superset_peer_contributes_missing_film() {
        let graph = graph(1, &[(1, &[1, 2, 3]), (2, &[1, 2, 3, 4])]);
        assert_eq!(recommend_film_ids(&graph), vec![4]);
    }

    #[test]
    fn test_three_user_scenario() {
        let likes: &[(i32, &[i32])] = &[(10, &[1, 2]), (20, &[1, 2, 3]), (30, &[3])];

        assert_eq!(recommend_film_ids(&graph(10, likes)), vec![3]);
        assert_eq!(recommend_film_ids(&graph(30, likes)), vec![1, 2]);
    }

    #[test]
    fn test_no_peers_yields_nothing() {
        let graph = graph(1, &[(1, &[1, 2])]);
        assert!(recommend_film_ids(&graph).is_empty());
    }

    #[test]
    fn test_zero_overlap_yields_nothing() {
        let graph = graph(1, &[(1, &[1]), (2, &[5, 6])]);
        assert!(recommend_film_ids(&graph).is_empty());
    }

    #[test]
    fn test_identical_tastes_yield_nothing() {
        let graph = graph(1, &[(1, &[1, 2]), (2, &[1, 2])]);
        assert!(recommend_film_ids(&graph).is_empty());
    }

    #[test]
    fn test_only_maximal_overlap_bucket_counts() {
        // user 2 shares two films, user 3 only one
        let graph = graph(1, &[(1, &[1, 2, 3]), (2, &[1, 2, 8]), (3, &[3, 9])]);

        let buckets = overlap_buckets(&graph);
        assert_eq!(buckets.get(&2), Some(&BTreeSet::from([1, 2, 8])));
        assert_eq!(buckets.get(&1), Some(&BTreeSet::from([3, 9])));
        assert_eq!(recommend_film_ids(&graph), vec![8]);
    }

    #[test]
    fn test_tied_peers_are_unioned() {
        let graph = graph(1, &[(1, &[1]), (2, &[1, 7]), (3, &[1, 4, 7])]);
        assert_eq!(recommend_film_ids(&graph), vec![4, 7]);
    }

    #[test]
    fn test_raw_overlap_beats_proportional_overlap() {
        // user 2 shares 1 of 1, user 3 shares 2 of 10
        let graph = graph(
            1,
            &[
                (1, &[1, 2, 3]),
                (2, &[1, 50]),
                (3, &[1, 2, 60, 61, 62, 63, 64, 65, 66, 67]),
            ],
        );
        let recommended = recommend_film_ids(&graph);
        assert!(!recommended.contains(&50));
        assert_eq!(recommended, vec![60, 61, 62, 63, 64, 65, 66, 67]);
    }
}
