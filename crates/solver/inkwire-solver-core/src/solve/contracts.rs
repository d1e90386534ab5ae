//! Per-operator partial-evaluation rules.
//!
//! Each constraint kind defines, for every subset of known port values,
//! whether the subset is solvable and what it yields. Outcomes are data:
//! `Indeterminate` means not enough information (no error), `Unsolvable`
//! means a domain violation the solver reports as a conflict on the port's
//! connector. Contracts never panic and never emit non-finite values.

use thiserror::Error;

use crate::expr::{BinaryOp, Expr};
use crate::types::ConstraintKind;

/// Absolute tolerance below which two resolved values count as agreeing,
/// scaled up for large magnitudes.
pub const VALUE_TOLERANCE: f64 = 1e-9;

/// Whether two values agree within [`VALUE_TOLERANCE`].
pub fn values_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= VALUE_TOLERANCE * f64::max(1.0, f64::max(a.abs(), b.abs()))
}

/// Domain violation encountered while inverting an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("no real root exists")]
    NoRealRoot,
    #[error("no real power exists")]
    NoRealPower,
    #[error("a zero exponent cannot be inverted")]
    ZeroExponent,
    #[error("logarithm argument outside its domain")]
    LogDomain,
    #[error("result is not finite")]
    NonFinite,
}

/// Result of applying a contract to a set of known port values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Exactly enough ports were known to determine `port`.
    Computed { port: usize, value: f64 },
    /// Not enough (or ambiguous) information; the port stays unresolved.
    Indeterminate,
    /// The known values fall outside the operator's domain; reported as a
    /// conflict on `port`'s connector.
    Unsolvable { port: usize, fault: DomainFault },
}

/// Apply the solve contract for `kind` to the known values at its ports
/// (index-aligned with the constraint's port list).
///
/// When more ports are known than needed, the result port is recomputed from
/// the operands; the caller's conflict rule catches any disagreement.
pub fn solve_constraint(kind: ConstraintKind, known: &[Option<f64>]) -> Outcome {
    if known.len() != 3 {
        return Outcome::Indeterminate;
    }
    let (a, b, c) = (known[0], known[1], known[2]);
    match kind {
        ConstraintKind::Adder => match (a, b, c) {
            (Some(a), Some(b), _) => finite_or_fault(2, a + b),
            (Some(a), None, Some(c)) => finite_or_fault(1, c - a),
            (None, Some(b), Some(c)) => finite_or_fault(0, c - b),
            _ => Outcome::Indeterminate,
        },
        ConstraintKind::Multiplier => match (a, b, c) {
            (Some(a), Some(b), _) => finite_or_fault(2, a * b),
            (Some(a), None, Some(c)) => divide(1, c, a),
            (None, Some(b), Some(c)) => divide(0, c, b),
            _ => Outcome::Indeterminate,
        },
        ConstraintKind::Exponent => match (a, b, c) {
            (Some(base), Some(exponent), _) => power(2, base, exponent),
            (None, Some(exponent), Some(result)) => root(0, result, exponent),
            (Some(base), None, Some(result)) => logarithm(1, result, base),
            _ => Outcome::Indeterminate,
        },
    }
}

/// Symbolic expression for the port `solve_constraint` computed, built from
/// the known ports' expressions. `None` when a needed source expression is
/// missing (the caller falls back to a constant leaf).
pub fn build_expression(
    kind: ConstraintKind,
    port: usize,
    exprs: &[Option<Expr>],
) -> Option<Expr> {
    let source = |index: usize| exprs.get(index).and_then(|expr| expr.clone());
    let expr = match (kind, port) {
        (ConstraintKind::Adder, 2) => Expr::binary(BinaryOp::Add, source(0)?, source(1)?),
        (ConstraintKind::Adder, 1) => Expr::binary(BinaryOp::Subtract, source(2)?, source(0)?),
        (ConstraintKind::Adder, 0) => Expr::binary(BinaryOp::Subtract, source(2)?, source(1)?),
        (ConstraintKind::Multiplier, 2) => Expr::binary(BinaryOp::Multiply, source(0)?, source(1)?),
        (ConstraintKind::Multiplier, 1) => Expr::binary(BinaryOp::Divide, source(2)?, source(0)?),
        (ConstraintKind::Multiplier, 0) => Expr::binary(BinaryOp::Divide, source(2)?, source(1)?),
        (ConstraintKind::Exponent, 2) => Expr::binary(BinaryOp::Power, source(0)?, source(1)?),
        (ConstraintKind::Exponent, 0) => Expr::binary(BinaryOp::Root, source(2)?, source(1)?),
        (ConstraintKind::Exponent, 1) => Expr::binary(BinaryOp::Log, source(2)?, source(0)?),
        _ => return None,
    };
    Some(expr)
}

fn finite_or_fault(port: usize, value: f64) -> Outcome {
    if value.is_finite() {
        Outcome::Computed { port, value }
    } else {
        Outcome::Unsolvable {
            port,
            fault: DomainFault::NonFinite,
        }
    }
}

fn divide(port: usize, numerator: f64, denominator: f64) -> Outcome {
    if denominator == 0.0 {
        if numerator == 0.0 {
            // 0 · x = 0 holds for every x.
            Outcome::Indeterminate
        } else {
            Outcome::Unsolvable {
                port,
                fault: DomainFault::DivisionByZero,
            }
        }
    } else {
        finite_or_fault(port, numerator / denominator)
    }
}

fn power(port: usize, base: f64, exponent: f64) -> Outcome {
    if base < 0.0 && !is_integer(exponent) {
        return Outcome::Unsolvable {
            port,
            fault: DomainFault::NoRealPower,
        };
    }
    finite_or_fault(port, base.powf(exponent))
}

/// Solve `base` from `base ^ exponent = result`. For even integer exponents
/// the non-negative root is chosen; odd integer exponents of a negative
/// result take the real negative branch.
fn root(port: usize, result: f64, exponent: f64) -> Outcome {
    if exponent == 0.0 {
        return Outcome::Unsolvable {
            port,
            fault: DomainFault::ZeroExponent,
        };
    }
    if result < 0.0 {
        if is_odd_integer(exponent) {
            return finite_or_fault(port, -(-result).powf(1.0 / exponent));
        }
        return Outcome::Unsolvable {
            port,
            fault: DomainFault::NoRealRoot,
        };
    }
    finite_or_fault(port, result.powf(1.0 / exponent))
}

/// Solve `exponent` from `base ^ exponent = result`.
fn logarithm(port: usize, result: f64, base: f64) -> Outcome {
    if base <= 0.0 || result <= 0.0 {
        return Outcome::Unsolvable {
            port,
            fault: DomainFault::LogDomain,
        };
    }
    if base == 1.0 {
        if result == 1.0 {
            // 1 ^ x = 1 holds for every x.
            return Outcome::Indeterminate;
        }
        return Outcome::Unsolvable {
            port,
            fault: DomainFault::LogDomain,
        };
    }
    finite_or_fault(port, result.ln() / base.ln())
}

fn is_integer(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

fn is_odd_integer(value: f64) -> bool {
    is_integer(value) && (value / 2.0).fract() != 0.0
}
