//! Topological Orderer - one dependency-respecting order of predecessors
//!
//! Kahn's algorithm over the subgraph induced by the discovered nodes. Ties
//! between ready nodes go to the earliest discovered one, so independent
//! branches keep discovery order. A cycle is broken by releasing the earliest
//! discovered node still waiting.

use crate::graph::GraphIndex;
use std::collections::{BTreeSet, HashMap};

/// Reorder `discovered` (positions, in discovery order) so that every edge
/// between two of them points forward.
pub(crate) fn topological_order(index: &GraphIndex<'_>, discovered: &[usize]) -> Vec<usize> {
    let rank: HashMap<usize, usize> = discovered
        .iter()
        .enumerate()
        .map(|(r, &p)| (p, r))
        .collect();

    let mut indegree = vec![0usize; discovered.len()];
    for &p in discovered {
        for (v, _) in index.out_edges_at(p) {
            if let Some(&r) = rank.get(v) {
                indegree[r] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..discovered.len()).filter(|&r| indegree[r] == 0).collect();
    let mut waiting: BTreeSet<usize> = (0..discovered.len()).filter(|&r| indegree[r] > 0).collect();
    let mut order = Vec::with_capacity(discovered.len());

    while order.len() < discovered.len() {
        let next = match ready.pop_first() {
            Some(r) => r,
            None => match waiting.pop_first() {
                Some(r) => {
                    tracing::trace!("Breaking cycle at {}", index.node_at(discovered[r]).id);
                    r
                }
                None => break,
            },
        };
        order.push(discovered[next]);

        for (v, _) in index.out_edges_at(discovered[next]) {
            let Some(&r) = rank.get(v) else { continue };
            if !waiting.contains(&r) {
                continue;
            }
            indegree[r] -= 1;
            if indegree[r] == 0 {
                waiting.remove(&r);
                ready.insert(r);
            }
        }
    }

    order
}
