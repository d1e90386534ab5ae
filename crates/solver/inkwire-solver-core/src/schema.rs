//! Serializable descriptors of the constraint operators, for host UIs.
//!
//! Hosts draw operator glyphs, port markers, and wire colors; the registry
//! tells them what exists without hard-coding the engine's internals.

use serde::Serialize;

use crate::types::{ConstraintKind, PortRole};

#[derive(Debug, Clone, Serialize)]
pub struct PortSchema {
    pub id: &'static str,
    pub role: PortRole,
    /// Opaque display channel; matches `ConnectorPort::channel` on created
    /// constraints. Hosts map it to a wire color.
    pub channel: u8,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstraintSchema {
    pub kind: ConstraintKind,
    pub label: &'static str,
    /// Operator glyph shown on the canvas element.
    pub glyph: &'static str,
    pub ports: Vec<PortSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registry {
    pub version: &'static str,
    pub constraints: Vec<ConstraintSchema>,
}

fn operand(id: &'static str, channel: u8, label: &'static str) -> PortSchema {
    PortSchema {
        id,
        role: PortRole::Operand,
        channel,
        label,
    }
}

fn result(channel: u8) -> PortSchema {
    PortSchema {
        id: "result",
        role: PortRole::Result,
        channel,
        label: "Result",
    }
}

pub fn registry() -> Registry {
    Registry {
        version: "1",
        constraints: vec![
            ConstraintSchema {
                kind: ConstraintKind::Adder,
                label: "Adder",
                glyph: "+",
                ports: vec![operand("a", 0, "A"), operand("b", 1, "B"), result(2)],
            },
            ConstraintSchema {
                kind: ConstraintKind::Multiplier,
                label: "Multiplier",
                glyph: "×",
                ports: vec![operand("a", 0, "A"), operand("b", 1, "B"), result(2)],
            },
            ConstraintSchema {
                kind: ConstraintKind::Exponent,
                label: "Exponent",
                glyph: "^",
                ports: vec![
                    PortSchema {
                        id: "base",
                        role: PortRole::Base,
                        channel: 0,
                        label: "Base",
                    },
                    PortSchema {
                        id: "exponent",
                        role: PortRole::Exponent,
                        channel: 1,
                        label: "Exponent",
                    },
                    result(2),
                ],
            },
        ],
    }
}
