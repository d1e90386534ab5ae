//! One propagation pass over the connector graph.
//!
//! A [`SimulationContext`] is scoped to a single pass: it owns the
//! in-progress resolved-value map and the conflict set, and drives newly
//! known values through the solve contracts until a fixed point. The pass
//! never mutates the graph; connectors a constraint wants to create come back
//! as [`Materialization`] requests for the caller to apply.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::expr::Expr;
use crate::graph::Graph;
use crate::priority::PriorityOrder;
use crate::solve::contracts::{self, values_match, Outcome};
use crate::types::{ConnectorId, Constraint, ConstraintId};

/// How resolved values carry symbolic expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    /// Build and retain composite expressions for display (default).
    Rewrite,
    /// Skip composite construction; computed values carry constant leaves.
    /// Used when a pass will be discarded immediately (ghost sampling).
    Shortcut,
}

/// Per-pass record of how one connector resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub value: f64,
    pub expression: Expr,
    /// Whether this value is treated as computed output rather than
    /// independent input for this pass.
    pub was_dependent: bool,
    /// The constraint that computed the value, or `None` for seeds and
    /// overrides.
    pub informant: Option<ConstraintId>,
}

/// Request to create a connector for a port a constraint just resolved.
/// The caller owns creation (and any visual placement); the engine applies
/// these after the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Materialization {
    pub constraint: ConstraintId,
    pub port: usize,
    pub value: ResolvedValue,
}

/// Everything one pass reads. Priority order and the previous pass's map are
/// passed in explicitly so the pass stays a pure function of its inputs.
pub struct PassInput<'a> {
    pub graph: &'a Graph,
    pub priority: &'a PriorityOrder,
    /// Explicit connector values scoped to this pass.
    pub overrides: &'a HashMap<ConnectorId, f64>,
    /// Ghost-evaluation variable names; bound connectors seed with a variable
    /// leaf instead of a constant so sampled formulas stay symbolic.
    pub bindings: &'a HashMap<ConnectorId, String>,
    /// Connectors currently treated as dependent (selection, toy outputs).
    pub dependents: &'a [ConnectorId],
    pub previous: Option<&'a HashMap<ConnectorId, ResolvedValue>>,
    pub mode: ExprMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassOutput {
    pub resolved: HashMap<ConnectorId, ResolvedValue>,
    pub conflicts: HashSet<ConnectorId>,
    pub materializations: Vec<Materialization>,
}

/// Transient solver state scoped to one pass.
pub struct SimulationContext<'g> {
    graph: &'g Graph,
    mode: ExprMode,
    values: HashMap<ConnectorId, ResolvedValue>,
    conflicts: HashSet<ConnectorId>,
    materializations: Vec<Materialization>,
    /// Constraints that already informed a port this pass. Each constraint
    /// informs at most once, which bounds the fixed-point loop.
    informed: HashSet<ConstraintId>,
    queue: VecDeque<ConnectorId>,
}

impl<'g> SimulationContext<'g> {
    pub fn new(graph: &'g Graph, mode: ExprMode) -> Self {
        SimulationContext {
            graph,
            mode,
            values: HashMap::new(),
            conflicts: HashSet::new(),
            materializations: Vec::new(),
            informed: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn is_resolved(&self, connector: ConnectorId) -> bool {
        self.values.contains_key(&connector)
    }

    /// Record a value for `connector` and propagate the consequences through
    /// every constraint it touches, to fixed point.
    ///
    /// If the connector already resolved this pass from a different source,
    /// the first value is kept; a disagreement beyond tolerance flags a
    /// conflict.
    pub fn set_connector_value(&mut self, connector: ConnectorId, value: ResolvedValue) {
        if let Some(existing) = self.values.get(&connector) {
            if !values_match(existing.value, value.value) {
                log::debug!(
                    "conflict on {connector:?}: kept {}, rejected {}",
                    existing.value,
                    value.value
                );
                self.conflicts.insert(connector);
            }
            return;
        }
        self.values.insert(connector, value);
        self.queue.push_back(connector);
        self.propagate();
    }

    pub fn finish(self) -> PassOutput {
        PassOutput {
            resolved: self.values,
            conflicts: self.conflicts,
            materializations: self.materializations,
        }
    }

    fn propagate(&mut self) {
        let graph = self.graph;
        while let Some(connector) = self.queue.pop_front() {
            for constraint_id in graph.constraints_on(connector) {
                self.apply_constraint(constraint_id);
            }
        }
    }

    fn apply_constraint(&mut self, constraint_id: ConstraintId) {
        let graph = self.graph;
        let constraint = match graph.constraint(constraint_id) {
            Some(constraint) => constraint,
            None => return,
        };
        let known: Vec<Option<f64>> = constraint
            .ports
            .iter()
            .map(|port| {
                port.connector
                    .and_then(|id| self.values.get(&id).map(|resolved| resolved.value))
            })
            .collect();

        match contracts::solve_constraint(constraint.kind, &known) {
            Outcome::Indeterminate => {}
            Outcome::Unsolvable { port, fault } => {
                log::debug!("constraint {constraint_id:?} cannot resolve port {port}: {fault}");
                if let Some(connector) = constraint.ports.get(port).and_then(|p| p.connector) {
                    self.conflicts.insert(connector);
                }
            }
            Outcome::Computed { port, value } => {
                self.inform(constraint_id, constraint, port, value);
            }
        }
    }

    fn inform(
        &mut self,
        constraint_id: ConstraintId,
        constraint: &Constraint,
        port: usize,
        value: f64,
    ) {
        match constraint.ports.get(port).and_then(|p| p.connector) {
            Some(target) => {
                if let Some(existing) = self.values.get(&target) {
                    // Already resolved from another source this pass: first
                    // writer wins, disagreement is a conflict.
                    if !values_match(existing.value, value) {
                        log::debug!(
                            "constraint {constraint_id:?} disagrees on {target:?}: kept {}, computed {value}",
                            existing.value
                        );
                        self.conflicts.insert(target);
                    }
                } else if self.informed.insert(constraint_id) {
                    let expression = self.expression_for(constraint, port, value);
                    self.values.insert(
                        target,
                        ResolvedValue {
                            value,
                            expression,
                            was_dependent: true,
                            informant: Some(constraint_id),
                        },
                    );
                    self.queue.push_back(target);
                }
            }
            None => {
                // The computed port has no backing connector yet; ask the
                // caller to create one.
                if self.informed.insert(constraint_id) {
                    let expression = self.expression_for(constraint, port, value);
                    self.materializations.push(Materialization {
                        constraint: constraint_id,
                        port,
                        value: ResolvedValue {
                            value,
                            expression,
                            was_dependent: true,
                            informant: Some(constraint_id),
                        },
                    });
                }
            }
        }
    }

    fn expression_for(&self, constraint: &Constraint, port: usize, value: f64) -> Expr {
        match self.mode {
            ExprMode::Shortcut => Expr::number(value),
            ExprMode::Rewrite => {
                let exprs: Vec<Option<Expr>> = constraint
                    .ports
                    .iter()
                    .map(|p| {
                        p.connector
                            .and_then(|id| self.values.get(&id).map(|rv| rv.expression.clone()))
                    })
                    .collect();
                contracts::build_expression(constraint.kind, port, &exprs)
                    .unwrap_or_else(|| Expr::number(value))
            }
        }
    }
}

/// Run one full pass: seed explicit overrides, keep dependent connectors
/// stable from history, seed the rest in priority order, and propagate to
/// fixed point.
pub fn run_pass(input: PassInput<'_>) -> PassOutput {
    let mut context = SimulationContext::new(input.graph, input.mode);

    // Explicit overrides first, in stable handle order.
    let mut overridden: Vec<(ConnectorId, f64)> =
        input.overrides.iter().map(|(id, v)| (*id, *v)).collect();
    overridden.sort_by_key(|(id, _)| *id);
    for (connector, value) in overridden {
        let expression = seed_expression(input.bindings, connector, value);
        context.set_connector_value(
            connector,
            ResolvedValue {
                value,
                expression,
                was_dependent: input.dependents.contains(&connector),
                informant: None,
            },
        );
    }

    // Dependent connectors keep their previous value unless a constraint
    // actively recomputes them; this keeps a display stable across passes.
    for connector in input.dependents {
        seed_from_previous(&mut context, &input, *connector);
    }

    // Everything else seeds top-down in priority order. Connectors with no
    // previous value and no override stay unresolved.
    for connector in input.priority.iter() {
        seed_from_previous(&mut context, &input, connector);
    }

    context.finish()
}

fn seed_from_previous(
    context: &mut SimulationContext<'_>,
    input: &PassInput<'_>,
    connector: ConnectorId,
) {
    if context.is_resolved(connector) {
        return;
    }
    let previous = match input.previous.and_then(|map| map.get(&connector)) {
        Some(previous) => previous.value,
        None => return,
    };
    let expression = seed_expression(input.bindings, connector, previous);
    context.set_connector_value(
        connector,
        ResolvedValue {
            value: previous,
            expression,
            was_dependent: input.dependents.contains(&connector),
            informant: None,
        },
    );
}

fn seed_expression(
    bindings: &HashMap<ConnectorId, String>,
    connector: ConnectorId,
    value: f64,
) -> Expr {
    match bindings.get(&connector) {
        Some(name) => Expr::variable(name.clone()),
        None => Expr::number(value),
    }
}
