//! Stateful façade over the pure solver pass.
//!
//! The engine owns the graph, the priority order, the pending explicit
//! values, the current dependent set, and the previous pass's resolved map.
//! `solve()` feeds all of it into
//! [`run_pass`](crate::solve::run_pass) and applies the pass's
//! materialization requests afterwards, so the pass itself stays a pure
//! function of its inputs. Single-threaded by design: state is mutated only
//! between passes, never during one.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphError};
use crate::paths;
use crate::priority::PriorityOrder;
use crate::solve::context::{run_pass, ExprMode, PassInput, PassOutput, ResolvedValue};
use crate::solve::ghost::ghost_pass;
use crate::types::{ConnectorId, ConstraintId, ConstraintKind};

/// Everything one `solve()` call reports back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Resolved value per connector; connectors with no override, no history,
    /// and no informing constraint are absent (displayed as unknown).
    pub resolved: HashMap<ConnectorId, ResolvedValue>,
    /// Connectors whose value was contested this pass (disagreeing
    /// informants or a domain violation at their port).
    pub conflicts: HashSet<ConnectorId>,
    /// Connectors created by auto-materialization during this call, already
    /// wired to the port that produced them. The host owns their placement.
    pub materialized: Vec<ConnectorId>,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    graph: Graph,
    priority: PriorityOrder,
    pending_values: HashMap<ConnectorId, f64>,
    dependents: Vec<ConnectorId>,
    last_resolved: Option<HashMap<ConnectorId, ResolvedValue>>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn priority(&self) -> &PriorityOrder {
        &self.priority
    }

    // --- Graph mutation --------------------------------------------------

    /// Create a connector at the lowest-confidence end of the priority
    /// order. Hosts front it via [`move_to_front`](Engine::move_to_front)
    /// when the user selects it.
    pub fn create_connector(&mut self) -> ConnectorId {
        let id = self.graph.create_connector();
        self.priority.push_back(id);
        id
    }

    pub fn create_named_connector(&mut self, name: impl Into<String>) -> ConnectorId {
        let id = self.graph.create_named_connector(name);
        self.priority.push_back(id);
        id
    }

    pub fn create_constraint(&mut self, kind: ConstraintKind) -> ConstraintId {
        self.graph.create_constraint(kind)
    }

    pub fn connect(
        &mut self,
        constraint: ConstraintId,
        port: usize,
        connector: ConnectorId,
    ) -> Result<Option<ConnectorId>, GraphError> {
        self.graph.connect(constraint, port, connector)
    }

    pub fn disconnect(
        &mut self,
        constraint: ConstraintId,
        port: usize,
    ) -> Result<Option<ConnectorId>, GraphError> {
        self.graph.disconnect(constraint, port)
    }

    /// Remove a connector everywhere: graph, priority order, pending
    /// overrides, dependent set, and solve history. Returns the detached
    /// `(constraint, port)` pairs for host re-wiring.
    pub fn remove_connector(
        &mut self,
        connector: ConnectorId,
    ) -> Result<Vec<(ConstraintId, usize)>, GraphError> {
        let detached = self.graph.remove_connector(connector)?;
        self.priority.remove(connector);
        self.pending_values.remove(&connector);
        self.dependents.retain(|entry| *entry != connector);
        if let Some(map) = self.last_resolved.as_mut() {
            map.remove(&connector);
        }
        Ok(detached)
    }

    pub fn remove_constraint(&mut self, constraint: ConstraintId) -> Result<(), GraphError> {
        self.graph.remove_constraint(constraint)?;
        Ok(())
    }

    pub fn set_name(
        &mut self,
        connector: ConnectorId,
        name: impl Into<String>,
    ) -> Result<(), GraphError> {
        let entry = self
            .graph
            .connector_mut(connector)
            .ok_or(GraphError::UnknownConnector(connector))?;
        entry.name = Some(name.into());
        Ok(())
    }

    /// Store the display-scale hint a host picker uses for this connector.
    pub fn set_scale(&mut self, connector: ConnectorId, scale: i32) -> Result<(), GraphError> {
        let entry = self
            .graph
            .connector_mut(connector)
            .ok_or(GraphError::UnknownConnector(connector))?;
        entry.scale = scale;
        Ok(())
    }

    // --- Pass inputs -----------------------------------------------------

    /// Pin `connector` to `value` for the next `solve()` call only.
    pub fn set_explicit_value(
        &mut self,
        connector: ConnectorId,
        value: f64,
    ) -> Result<(), GraphError> {
        if !self.graph.contains_connector(connector) {
            return Err(GraphError::UnknownConnector(connector));
        }
        self.pending_values.insert(connector, value);
        Ok(())
    }

    /// Replace the current dependent set (the selected connector and any
    /// selected toy's outputs). Dependents seed from history before the
    /// priority walk and surface as `was_dependent` in the report.
    pub fn set_dependents(&mut self, dependents: Vec<ConnectorId>) {
        self.dependents = dependents;
    }

    pub fn clear_dependents(&mut self) {
        self.dependents.clear();
    }

    pub fn move_to_front(&mut self, connector: ConnectorId) {
        self.priority.move_to_front(connector);
    }

    pub fn move_to_back(&mut self, connector: ConnectorId) {
        self.priority.move_to_back(connector);
    }

    // --- Queries ---------------------------------------------------------

    /// Connectors on a shortest path between the two sets; see
    /// [`connectors_on_path`](crate::paths::connectors_on_path).
    pub fn dependency_path(
        &self,
        from: &[ConnectorId],
        to: &[ConnectorId],
        stop_on_first: bool,
        excluding: &[ConnectorId],
    ) -> HashSet<ConnectorId> {
        paths::connectors_on_path(&self.graph, from, to, stop_on_first, excluding)
    }

    pub fn last_value(&self, connector: ConnectorId) -> Option<f64> {
        self.last_resolved
            .as_ref()?
            .get(&connector)
            .map(|resolved| resolved.value)
    }

    /// `(was_dependent, informant)` from the most recent pass, for hosts
    /// drawing arrowheads on wires.
    pub fn last_informant(&self, connector: ConnectorId) -> Option<(bool, Option<ConstraintId>)> {
        self.last_resolved
            .as_ref()?
            .get(&connector)
            .map(|resolved| (resolved.was_dependent, resolved.informant))
    }

    // --- Solving ---------------------------------------------------------

    /// Run one pass over the current graph. Consumes the pending explicit
    /// values, applies any auto-materialization requests, and retains the
    /// resolved map as the seed for the next pass.
    pub fn solve(&mut self) -> SolveReport {
        let bindings = HashMap::new();
        let PassOutput {
            mut resolved,
            conflicts,
            materializations,
        } = run_pass(PassInput {
            graph: &self.graph,
            priority: &self.priority,
            overrides: &self.pending_values,
            bindings: &bindings,
            dependents: &self.dependents,
            previous: self.last_resolved.as_ref(),
            mode: ExprMode::Rewrite,
        });

        let mut materialized = Vec::with_capacity(materializations.len());
        for request in materializations {
            let id = self.graph.create_connector();
            match self.graph.connect(request.constraint, request.port, id) {
                Ok(_) => {
                    self.priority.push_back(id);
                    resolved.insert(id, request.value);
                    materialized.push(id);
                }
                Err(error) => {
                    log::warn!(
                        "dropping materialized connector for {:?} port {}: {error}",
                        request.constraint,
                        request.port
                    );
                    let _ = self.graph.remove_connector(id);
                }
            }
        }

        for (connector, value) in &resolved {
            if let Some(entry) = self.graph.connector_mut(*connector) {
                entry.last_value = Some(value.value);
            }
        }

        self.pending_values.clear();
        self.last_resolved = Some(resolved.clone());
        SolveReport {
            resolved,
            conflicts,
            materialized,
        }
    }

    /// Speculative evaluation with caller-supplied overrides and variable
    /// bindings. Never touches the engine's retained state; safe to call
    /// once per sampled point.
    pub fn ghost_evaluate(
        &self,
        overrides: &HashMap<ConnectorId, f64>,
        bindings: &HashMap<ConnectorId, String>,
    ) -> HashMap<ConnectorId, ResolvedValue> {
        ghost_pass(
            &self.graph,
            &self.priority,
            overrides,
            bindings,
            self.last_resolved.as_ref(),
        )
    }
}
