//! Speculative ("ghost") evaluation.
//!
//! Ghost passes answer what-if queries (sampling a toy's outputs across a
//! continuum of input values, once per plotted pixel) without disturbing the
//! engine's retained state. Each call gets its own override set and runs the
//! ordinary propagation algorithm in shortcut mode; nothing is written back,
//! so calls are safe to repeat arbitrarily often.

use hashbrown::HashMap;

use crate::graph::Graph;
use crate::priority::PriorityOrder;
use crate::solve::context::{run_pass, ExprMode, PassInput, ResolvedValue};
use crate::types::ConnectorId;

/// Run one side-effect-free pass and return the resolved map.
///
/// `bindings` names connectors that should stay symbolic: a bound connector
/// seeds with a variable leaf, and expression construction is kept on so the
/// sampled output can display a formula in terms of that variable. With no
/// bindings the pass skips expression construction entirely.
///
/// Conflicts and materialization requests are dropped: a speculative pass
/// must not grow the graph, and its disagreements are not user-visible
/// state.
pub fn ghost_pass(
    graph: &Graph,
    priority: &PriorityOrder,
    overrides: &HashMap<ConnectorId, f64>,
    bindings: &HashMap<ConnectorId, String>,
    previous: Option<&HashMap<ConnectorId, ResolvedValue>>,
) -> HashMap<ConnectorId, ResolvedValue> {
    let mode = if bindings.is_empty() {
        ExprMode::Shortcut
    } else {
        ExprMode::Rewrite
    };
    let output = run_pass(PassInput {
        graph,
        priority,
        overrides,
        bindings,
        dependents: &[],
        previous,
        mode,
    });
    output.resolved
}
