//! Arena-backed storage for the bipartite connector/constraint multigraph.
//!
//! Connectors and constraints live in handle-indexed arenas; ports hold
//! [`ConnectorId`]s rather than owning pointers, so removing a connector is an
//! arena removal plus port clearing, never a graph-wide fix-up. Cycles are
//! structurally legal here; cyclic equation systems are resolved (or flagged)
//! by the solver, not rejected at construction time.

use hashbrown::HashMap;
use thiserror::Error;

use crate::types::{Connector, ConnectorId, ConnectorPort, Constraint, ConstraintId, ConstraintKind};

/// Host programming errors raised by graph mutation. Solver-level outcomes
/// (conflicts, unsolvable domains) are data, not `Err`; see the solve module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown connector {0:?}")]
    UnknownConnector(ConnectorId),
    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintId),
    #[error("port {port} out of range for constraint {constraint:?} with {len} ports")]
    PortOutOfRange {
        constraint: ConstraintId,
        port: usize,
        len: usize,
    },
}

/// The connector/constraint graph. Pure data plus identity: no values are
/// stored here beyond the per-connector display hints.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    connectors: HashMap<ConnectorId, Connector>,
    constraints: HashMap<ConstraintId, Constraint>,
    /// Constraints touching each connector, in first-connect order. Kept
    /// explicitly so traversal order is deterministic.
    attached: HashMap<ConnectorId, Vec<ConstraintId>>,
    next_connector: u32,
    next_constraint: u32,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    // --- Creation --------------------------------------------------------

    pub fn create_connector(&mut self) -> ConnectorId {
        let id = ConnectorId(self.next_connector);
        self.next_connector += 1;
        self.connectors.insert(id, Connector::default());
        id
    }

    pub fn create_named_connector(&mut self, name: impl Into<String>) -> ConnectorId {
        let id = self.create_connector();
        if let Some(connector) = self.connectors.get_mut(&id) {
            connector.name = Some(name.into());
        }
        id
    }

    pub fn create_constraint(&mut self, kind: ConstraintKind) -> ConstraintId {
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.insert(id, Constraint::new(kind));
        id
    }

    // --- Lookup ----------------------------------------------------------

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    pub fn connector_mut(&mut self, id: ConnectorId) -> Option<&mut Connector> {
        self.connectors.get_mut(&id)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(&id)
    }

    pub fn contains_connector(&self, id: ConnectorId) -> bool {
        self.connectors.contains_key(&id)
    }

    /// Connector ids in ascending handle order.
    pub fn connector_ids(&self) -> Vec<ConnectorId> {
        let mut ids: Vec<ConnectorId> = self.connectors.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Constraint ids in ascending handle order.
    pub fn constraint_ids(&self) -> Vec<ConstraintId> {
        let mut ids: Vec<ConstraintId> = self.constraints.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Constraints touching `connector`, in the order they were first
    /// connected. Each constraint appears once even if several of its ports
    /// reference the connector.
    pub fn constraints_on(&self, connector: ConnectorId) -> impl Iterator<Item = ConstraintId> + '_ {
        self.attached.get(&connector).into_iter().flatten().copied()
    }

    // --- Wiring ----------------------------------------------------------

    /// Point `port` of `constraint` at `connector`, replacing whatever the
    /// port referenced before. Returns the displaced connector, if any.
    pub fn connect(
        &mut self,
        constraint: ConstraintId,
        port: usize,
        connector: ConnectorId,
    ) -> Result<Option<ConnectorId>, GraphError> {
        if !self.connectors.contains_key(&connector) {
            return Err(GraphError::UnknownConnector(connector));
        }
        let previous = {
            let slot = self.port_mut(constraint, port)?;
            slot.connector.replace(connector)
        };
        if let Some(previous) = previous {
            if previous != connector {
                self.detach(constraint, previous);
            }
        }
        let entries = self.attached.entry(connector).or_default();
        if !entries.contains(&constraint) {
            entries.push(constraint);
        }
        Ok(previous)
    }

    /// Clear `port` of `constraint`. Returns the connector it referenced.
    pub fn disconnect(
        &mut self,
        constraint: ConstraintId,
        port: usize,
    ) -> Result<Option<ConnectorId>, GraphError> {
        let previous = {
            let slot = self.port_mut(constraint, port)?;
            slot.connector.take()
        };
        if let Some(previous) = previous {
            self.detach(constraint, previous);
        }
        Ok(previous)
    }

    // --- Removal ---------------------------------------------------------

    /// Remove a connector, clearing every port that referenced it. Returns
    /// the detached `(constraint, port)` pairs so hosts can offer re-wiring.
    pub fn remove_connector(
        &mut self,
        id: ConnectorId,
    ) -> Result<Vec<(ConstraintId, usize)>, GraphError> {
        if self.connectors.remove(&id).is_none() {
            return Err(GraphError::UnknownConnector(id));
        }
        let mut detached = Vec::new();
        for constraint_id in self.attached.remove(&id).unwrap_or_default() {
            if let Some(constraint) = self.constraints.get_mut(&constraint_id) {
                for (index, port) in constraint.ports.iter_mut().enumerate() {
                    if port.connector == Some(id) {
                        port.connector = None;
                        detached.push((constraint_id, index));
                    }
                }
            }
        }
        Ok(detached)
    }

    /// Remove a constraint and all of its port references.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<Constraint, GraphError> {
        let constraint = self
            .constraints
            .remove(&id)
            .ok_or(GraphError::UnknownConstraint(id))?;
        for connector in constraint.connectors() {
            if let Some(entries) = self.attached.get_mut(&connector) {
                entries.retain(|entry| *entry != id);
            }
        }
        Ok(constraint)
    }

    // --- Internals -------------------------------------------------------

    fn port_mut(
        &mut self,
        constraint: ConstraintId,
        port: usize,
    ) -> Result<&mut ConnectorPort, GraphError> {
        let entry = self
            .constraints
            .get_mut(&constraint)
            .ok_or(GraphError::UnknownConstraint(constraint))?;
        let len = entry.ports.len();
        entry
            .ports
            .get_mut(port)
            .ok_or(GraphError::PortOutOfRange {
                constraint,
                port,
                len,
            })
    }

    /// Drop the adjacency entry for (`constraint`, `connector`) unless another
    /// port of the constraint still references the connector.
    fn detach(&mut self, constraint: ConstraintId, connector: ConnectorId) {
        let still_referenced = self
            .constraints
            .get(&constraint)
            .map(|entry| entry.connectors().any(|c| c == connector))
            .unwrap_or(false);
        if still_referenced {
            return;
        }
        if let Some(entries) = self.attached.get_mut(&connector) {
            entries.retain(|entry| *entry != constraint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_and_disconnect_roundtrip() {
        let mut graph = Graph::new();
        let a = graph.create_connector();
        let add = graph.create_constraint(ConstraintKind::Adder);

        assert_eq!(graph.connect(add, 0, a).expect("connect"), None);
        assert_eq!(graph.constraints_on(a).collect::<Vec<_>>(), vec![add]);

        assert_eq!(graph.disconnect(add, 0).expect("disconnect"), Some(a));
        assert_eq!(graph.constraints_on(a).count(), 0);
    }

    #[test]
    fn connect_replaces_and_reports_displaced() {
        let mut graph = Graph::new();
        let a = graph.create_connector();
        let b = graph.create_connector();
        let add = graph.create_constraint(ConstraintKind::Adder);

        graph.connect(add, 0, a).expect("connect a");
        assert_eq!(graph.connect(add, 0, b).expect("connect b"), Some(a));
        assert_eq!(graph.constraints_on(a).count(), 0);
        assert_eq!(graph.constraints_on(b).collect::<Vec<_>>(), vec![add]);
    }

    #[test]
    fn shared_connector_keeps_adjacency_until_last_port_detaches() {
        let mut graph = Graph::new();
        let a = graph.create_connector();
        let add = graph.create_constraint(ConstraintKind::Adder);

        graph.connect(add, 0, a).expect("connect port 0");
        graph.connect(add, 1, a).expect("connect port 1");
        assert_eq!(graph.constraints_on(a).collect::<Vec<_>>(), vec![add]);

        graph.disconnect(add, 0).expect("disconnect port 0");
        assert_eq!(graph.constraints_on(a).collect::<Vec<_>>(), vec![add]);

        graph.disconnect(add, 1).expect("disconnect port 1");
        assert_eq!(graph.constraints_on(a).count(), 0);
    }

    #[test]
    fn remove_connector_reports_detached_ports() {
        let mut graph = Graph::new();
        let a = graph.create_connector();
        let add = graph.create_constraint(ConstraintKind::Adder);
        let mul = graph.create_constraint(ConstraintKind::Multiplier);

        graph.connect(add, 2, a).expect("connect adder");
        graph.connect(mul, 0, a).expect("connect multiplier");

        let detached = graph.remove_connector(a).expect("remove");
        assert_eq!(detached, vec![(add, 2), (mul, 0)]);
        assert!(graph.constraint(add).expect("adder").ports[2]
            .connector
            .is_none());
        assert!(!graph.contains_connector(a));
    }

    #[test]
    fn unknown_handles_are_errors() {
        let mut graph = Graph::new();
        let a = graph.create_connector();
        let add = graph.create_constraint(ConstraintKind::Adder);
        graph.remove_connector(a).expect("remove once");

        assert_eq!(
            graph.remove_connector(a),
            Err(GraphError::UnknownConnector(a))
        );
        assert_eq!(
            graph.connect(add, 0, a),
            Err(GraphError::UnknownConnector(a))
        );
        let b = graph.create_connector();
        assert_eq!(
            graph.connect(add, 3, b),
            Err(GraphError::PortOutOfRange {
                constraint: add,
                port: 3,
                len: 3
            })
        );
    }
}
