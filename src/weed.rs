//! Constraint propagation across node types ("weeding")
//!
//! Patterns constrain only the node types they are given for. Weeding
//! makes the node sets of all types consistent with each other through
//! the containment hierarchy, in three passes over the type sequence
//! (finest first). With `lo`/`hi` the finest/coarsest constrained type:
//!
//! 1. from `hi` down to `lo`: a finer type without a node set inherits
//!    the children of the coarser set, one with a set keeps only the
//!    nodes whose parent is in the coarser set
//! 2. from `lo` up to the top: each coarser set becomes the parents of
//!    the finer set
//! 3. from `lo` down to the bottom: each finer set becomes the children
//!    of the coarser set
//!
//! Every pass replaces the sets it writes. This is a fixed sweep, not an
//! iteration to a fixed point.

use crate::corpus::{NodeSet, TypeIdx};
use crate::matcher::TypeResult;
use crate::relation::RelationIndex;
use std::collections::BTreeMap;
use tracing::debug;

/// Surviving node count per node type; types never constrained are absent
pub type Stats = BTreeMap<TypeIdx, usize>;

/// Reconcile the node sets of all types in place
pub fn weed(results: &mut [TypeResult], relation: &RelationIndex) -> Stats {
    let present: Vec<TypeIdx> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.nodes.is_some())
        .map(|(t, _)| t)
        .collect();
    let (Some(&lo), Some(&hi)) = (present.first(), present.last()) else {
        debug!("weed: no constrained types");
        return Stats::new();
    };
    debug!(lo, hi, "weed");

    // Pass 1: restrict downward between hi and lo
    for i in (lo + 1..=hi).rev() {
        let coarser = results[i].nodes.take().unwrap_or_default();
        let finer = match results[i - 1].nodes.take() {
            None => descend(&coarser, relation),
            Some(mut finer) => {
                finer.retain(|&n| {
                    relation
                        .parent(n)
                        .is_some_and(|p| coarser.contains(&p))
                });
                finer
            }
        };
        results[i].nodes = Some(coarser);
        results[i - 1].nodes = Some(finer);
    }

    // Pass 2: propagate upward from lo to the top
    for i in lo..results.len().saturating_sub(1) {
        let parents = results[i]
            .nodes
            .as_ref()
            .map(|finer| ascend(finer, relation))
            .unwrap_or_default();
        results[i + 1].nodes = Some(parents);
    }

    // Pass 3: propagate downward from lo to the bottom
    for i in (1..=lo).rev() {
        let children = results[i]
            .nodes
            .as_ref()
            .map(|coarser| descend(coarser, relation))
            .unwrap_or_default();
        results[i - 1].nodes = Some(children);
    }

    results
        .iter()
        .enumerate()
        .filter_map(|(t, r)| Some((t, r.nodes.as_ref()?.len())))
        .collect()
}

/// Children of all nodes, in order
fn descend(nodes: &NodeSet, relation: &RelationIndex) -> NodeSet {
    nodes.iter().flat_map(|&u| relation.children(u)).collect()
}

/// Parents of all nodes, in order
fn ascend(nodes: &NodeSet, relation: &RelationIndex) -> NodeSet {
    nodes.iter().filter_map(|&d| relation.parent(d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// chars 0..6, words 10 (0-2) and 11 (3-5), phrases 20 (10) and 21 (11),
    /// one sentence 30 over both phrases
    fn create_test_relation() -> RelationIndex {
        RelationIndex::decode(b"0-2\t10\n3-5\t11\n10\t20\n11\t21\n20-21\t30\n").unwrap()
    }

    fn absent(n: usize) -> Vec<TypeResult> {
        vec![TypeResult::default(); n]
    }

    fn nodes(result: &TypeResult) -> Vec<usize> {
        result.nodes.as_ref().unwrap().iter().copied().collect()
    }

    #[test]
    fn test_weed_no_constraints() {
        let mut results = absent(4);
        let stats = weed(&mut results, &create_test_relation());

        assert!(stats.is_empty());
        assert!(results.iter().all(|r| r.nodes.is_none()));
    }

    #[test]
    fn test_weed_upward_union() {
        let relation = create_test_relation();
        let mut results = absent(4);
        results[0] = TypeResult::with_nodes([1, 2]);

        let stats = weed(&mut results, &relation);

        assert_eq!(stats, Stats::from([(0, 2), (1, 1), (2, 1), (3, 1)]));
        assert_eq!(nodes(&results[1]), vec![10]);
        assert_eq!(nodes(&results[3]), vec![30]);
    }

    #[test]
    fn test_weed_downward_from_coarse() {
        let relation = create_test_relation();
        let mut results = absent(4);
        results[1] = TypeResult::with_nodes([11]);

        let stats = weed(&mut results, &relation);

        assert_eq!(stats[&0], 3);
        assert_eq!(nodes(&results[0]), vec![3, 4, 5]);
        assert_eq!(nodes(&results[2]), vec![21]);
    }

    #[test]
    fn test_weed_intersects_between_levels() {
        let relation = create_test_relation();
        let mut results = absent(4);
        // char 1 sits in word 10, char 4 in word 11; only phrase 21 is allowed
        results[0] = TypeResult::with_nodes([1, 4]);
        results[2] = TypeResult::with_nodes([21]);

        weed(&mut results, &relation);

        assert_eq!(nodes(&results[0]), vec![4]);
        assert_eq!(nodes(&results[1]), vec![11]);
        assert_eq!(nodes(&results[2]), vec![21]);
        assert_eq!(nodes(&results[3]), vec![30]);
    }

    #[test]
    fn test_weed_empty_at_top_clears_all() {
        let relation = create_test_relation();
        let mut results = absent(4);
        results[0] = TypeResult::with_nodes([1]);
        results[3] = TypeResult::with_nodes([]);

        let stats = weed(&mut results, &relation);

        assert_eq!(stats, Stats::from([(0, 0), (1, 0), (2, 0), (3, 0)]));
    }

    #[test]
    fn test_weed_lower_levels_rederived() {
        let relation = create_test_relation();
        let mut results = absent(4);
        results[1] = TypeResult::with_nodes([10]);
        results[2] = TypeResult::with_nodes([20, 21]);

        weed(&mut results, &relation);

        // pass 2 narrows the phrase set to the parents of word 10
        assert_eq!(nodes(&results[2]), vec![20]);
        assert_eq!(nodes(&results[0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_weed_is_idempotent() {
        let relation = create_test_relation();
        let mut first = absent(4);
        first[0] = TypeResult::with_nodes([5, 0]);
        first[2] = TypeResult::with_nodes([20, 21]);
        let mut second = first.clone();

        let a = weed(&mut first, &relation);
        let b = weed(&mut second, &relation);

        assert_eq!(a, b);
        assert_eq!(first, second);
        // source order is kept, not sorted
        assert_eq!(nodes(&first[0]), vec![5, 0]);
    }
}
