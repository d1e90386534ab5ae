//! Core value-propagation engine used by Inkwire.
//!
//! Connectors hold numeric quantities, constraints relate them through
//! arithmetic operators, and the solver infers unknown values from whatever
//! the user has pinned down, re-running deterministically every time a
//! value, wire, or priority changes. Gesture handling, rendering, stroke
//! recognition, and persistence are host concerns; they talk to this crate
//! through [`engine::Engine`].

pub mod engine;
pub mod expr;
pub mod graph;
pub mod paths;
pub mod priority;
pub mod schema;
pub mod solve;
pub mod types;

pub use engine::{Engine, SolveReport};
pub use expr::{BinaryOp, Expr};
pub use graph::{Graph, GraphError};
pub use paths::connectors_on_path;
pub use priority::PriorityOrder;
pub use solve::{
    ghost_pass, run_pass, ExprMode, Materialization, PassInput, PassOutput, ResolvedValue,
};
pub use types::{
    Connector, ConnectorId, ConnectorPort, Constraint, ConstraintId, ConstraintKind, PortRole,
};
