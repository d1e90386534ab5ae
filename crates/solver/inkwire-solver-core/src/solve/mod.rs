//! The value-propagation solver.
//!
//! The submodules keep the concerns separated:
//!
//! - [`contracts`] holds the per-operator partial-evaluation rules: which
//!   subsets of known ports are solvable, what they yield, and the symbolic
//!   expression for the computed port.
//! - [`context`] runs one pass: seeding (overrides, then dependents, then
//!   priority order), fixed-point propagation, conflict tracking, and
//!   auto-materialization requests.
//! - [`ghost`] is the side-effect-free variant used for speculative
//!   sampling.
//!
//! Integration code should primarily interact with
//! [`Engine`](crate::engine::Engine), which owns the inputs a pass needs and
//! applies its outputs.

pub mod contracts;
pub mod context;
pub mod ghost;

pub use contracts::{DomainFault, Outcome, VALUE_TOLERANCE};
pub use context::{
    run_pass, ExprMode, Materialization, PassInput, PassOutput, ResolvedValue, SimulationContext,
};
pub use ghost::ghost_pass;

#[cfg(test)]
mod tests;
