//! A* over a taxi's local map.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::network::{LocalMap, NodeId};

/// Frontier entry. Ordered so the max-heap pops the lowest estimated total
/// first, and among equal estimates the earliest pushed.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    estimate: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Cost of the street `from -> to` as recorded in `map`.
pub fn edge_cost(map: &LocalMap, from: NodeId, to: NodeId) -> Option<f64> {
    map.segment(from, to).map(|s| s.distance.unwrap_or(1.0))
}

/// Cheapest path from `origin` to `target`, both ends included.
///
/// `[origin]` when already there; empty when either end is missing from the
/// map or no connection exists.
pub fn plan_path(map: &LocalMap, origin: NodeId, target: NodeId) -> VecDeque<NodeId> {
    if !map.contains(origin) || !map.contains(target) {
        return VecDeque::new();
    }
    if origin == target {
        return VecDeque::from([origin]);
    }

    let mut open = BinaryHeap::new();
    let mut cost_so_far: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut closed: HashSet<NodeId> = HashSet::new();
    let mut seq = 0u64;

    cost_so_far.insert(origin, 0.0);
    open.push(Frontier {
        estimate: origin.euclidean(target),
        seq,
        node: origin,
    });

    while let Some(Frontier { node: current, .. }) = open.pop() {
        if current == target {
            return rebuild(&came_from, origin, target);
        }
        if !closed.insert(current) {
            continue;
        }
        let base = cost_so_far.get(&current).copied().unwrap_or(f64::INFINITY);
        for (next, segment) in map.neighbours(current) {
            if closed.contains(&next) {
                continue;
            }
            let tentative = base + segment.distance.unwrap_or(1.0);
            if cost_so_far.get(&next).map_or(true, |&known| tentative < known) {
                cost_so_far.insert(next, tentative);
                came_from.insert(next, current);
                seq += 1;
                open.push(Frontier {
                    estimate: tentative + next.euclidean(target),
                    seq,
                    node: next,
                });
            }
        }
    }
    VecDeque::new()
}

fn rebuild(came_from: &HashMap<NodeId, NodeId>, origin: NodeId, target: NodeId) -> VecDeque<NodeId> {
    let mut path = VecDeque::from([target]);
    let mut node = target;
    while node != origin {
        match came_from.get(&node) {
            Some(&prev) => {
                path.push_front(prev);
                node = prev;
            }
            None => return VecDeque::new(),
        }
    }
    path
}

/// Sum of recorded street costs along `path`; `None` if a step is not a street.
pub fn path_cost(map: &LocalMap, path: &VecDeque<NodeId>) -> Option<f64> {
    path.iter()
        .zip(path.iter().skip(1))
        .map(|(a, b)| edge_cost(map, *a, *b))
        .sum()
}
