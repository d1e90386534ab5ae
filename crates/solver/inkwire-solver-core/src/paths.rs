//! Dependency-path analysis over the bipartite connector/constraint graph.
//!
//! All edges are equal weight, so shortest paths reduce to a multi-source
//! breadth-first search alternating connector → constraint → connector hops.
//! Used by the priority-reordering rules ("which connectors sit between the
//! dependent set and this one") and by downstream-of-this-toy queries.

use hashbrown::HashSet;
use std::collections::VecDeque;

use crate::graph::Graph;
use crate::types::{ConnectorId, ConstraintId};

struct PathToExplore {
    path: Vec<ConnectorId>,
    /// The constraint we arrived through. We never re-explore it from the new
    /// connector; otherwise we could backtrack through a constraint directly
    /// connected to an end connector (and thus never marked visited).
    entered_by: Option<ConstraintId>,
}

/// Connectors lying on a shortest path from `from` to `to`, excluding the
/// start connectors themselves.
///
/// With `stop_on_first` the search returns as soon as any end connector is
/// reached (simple reachability); otherwise it runs until the frontier is
/// empty and returns the union of all connectors on some discovered shortest
/// path. `excluding` connectors are treated as already visited and act as
/// walls.
///
/// A connector is marked visited on first discovery only, so the result is a
/// single shortest-path tree rooted at the start set: when several
/// equal-length paths reach the same connector, only the first-discovered one
/// is reported.
pub fn connectors_on_path(
    graph: &Graph,
    from: &[ConnectorId],
    to: &[ConnectorId],
    stop_on_first: bool,
    excluding: &[ConnectorId],
) -> HashSet<ConnectorId> {
    let mut visited: HashSet<ConnectorId> = HashSet::new();
    // Logically a FIFO queue: the first connector discovered is the first
    // one expanded. Breadth-first order is what makes these paths shortest.
    let mut frontier: VecDeque<PathToExplore> = VecDeque::new();

    for start in from {
        visited.insert(*start);
        frontier.push_back(PathToExplore {
            path: vec![*start],
            entered_by: None,
        });
    }
    for excluded in excluding {
        visited.insert(*excluded);
    }

    let mut on_paths: HashSet<ConnectorId> = HashSet::new();
    while let Some(explore) = frontier.pop_front() {
        let current = match explore.path.last() {
            Some(current) => *current,
            None => continue,
        };
        for constraint_id in graph.constraints_on(current) {
            if Some(constraint_id) == explore.entered_by {
                continue;
            }
            let constraint = match graph.constraint(constraint_id) {
                Some(constraint) => constraint,
                None => continue,
            };
            for next in constraint.connectors() {
                if to.contains(&next) {
                    // Everything after the start connector lies on a path.
                    for connector in &explore.path[1..] {
                        on_paths.insert(*connector);
                    }
                    if stop_on_first {
                        return on_paths;
                    }
                } else if visited.insert(next) {
                    // First discovery: remember this as the shortest path to
                    // `next`.
                    let mut path = explore.path.clone();
                    path.push(next);
                    frontier.push_back(PathToExplore {
                        path,
                        entered_by: Some(constraint_id),
                    });
                }
            }
        }
    }

    on_paths
}
