//! Handles, constraint kinds, and the plain data types of the connector graph.

use serde::{Deserialize, Serialize};

/// Stable handle for a connector. Handed out by [`Graph`](crate::graph::Graph)
/// and never reused within one graph's lifetime; identity is the handle, so two
/// connectors holding equal numeric values are still distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub(crate) u32);

/// Stable handle for a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(pub(crate) u32);

impl ConnectorId {
    /// Raw index, for hosts that key their own side tables by connector.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl ConstraintId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Operator family of a constraint. The propagation loop never matches on
/// this; only the solve contracts and the schema registry do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Adder,
    Multiplier,
    Exponent,
}

impl ConstraintKind {
    /// Fixed port layout for this kind, in port-index order.
    pub fn port_roles(self) -> &'static [PortRole] {
        match self {
            ConstraintKind::Adder | ConstraintKind::Multiplier => {
                &[PortRole::Operand, PortRole::Operand, PortRole::Result]
            }
            ConstraintKind::Exponent => &[PortRole::Base, PortRole::Exponent, PortRole::Result],
        }
    }
}

/// Role tag carried by a port. Meaningful only to the owning constraint's
/// solve contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    Operand,
    Base,
    Exponent,
    Result,
}

/// One numeric quantity in the equation network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connector {
    /// Optional display name, shown by hosts next to the value.
    pub name: Option<String>,
    /// Display-scale hint (decimal digit offset for value pickers). Opaque to
    /// the engine; passed through for hosts.
    pub scale: i32,
    /// Last value this connector resolved to. Display and debugging only; the
    /// solver never reads it.
    pub last_value: Option<f64>,
}

/// An attachment point on a constraint, referencing zero or one connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorPort {
    pub role: PortRole,
    /// Opaque display tag; hosts map it to wire colors.
    pub channel: u8,
    pub connector: Option<ConnectorId>,
}

/// An operator relating the values at its ports. Never owns connectors; ports
/// store handles only, and many constraints may reference the same connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub ports: Vec<ConnectorPort>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        let ports = kind
            .port_roles()
            .iter()
            .enumerate()
            .map(|(index, role)| ConnectorPort {
                role: *role,
                channel: index as u8,
                connector: None,
            })
            .collect();
        Constraint { kind, ports }
    }

    /// Connectors referenced by this constraint's ports, in port order.
    /// Disconnected ports are skipped; duplicates are possible when two ports
    /// share a connector.
    pub fn connectors(&self) -> impl Iterator<Item = ConnectorId> + '_ {
        self.ports.iter().filter_map(|port| port.connector)
    }
}
