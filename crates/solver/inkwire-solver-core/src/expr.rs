//! Symbolic expressions carried alongside resolved values.
//!
//! Every resolved connector records how it was computed: a constant leaf for
//! seeded or overridden values, a variable leaf for ghost-evaluation
//! bindings, or a composite built by the informant constraint from its known
//! ports' expressions. Hosts render these to explain a dependent value.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    /// `Root(radicand, degree)`: the real `degree`-th root.
    Root,
    /// `Log(value, base)`: logarithm of `value` in base `base`.
    Log,
}

impl BinaryOp {
    fn infix_symbol(self) -> Option<&'static str> {
        match self {
            BinaryOp::Add => Some("+"),
            BinaryOp::Subtract => Some("-"),
            BinaryOp::Multiply => Some("×"),
            BinaryOp::Divide => Some("/"),
            BinaryOp::Power => Some("^"),
            BinaryOp::Root | BinaryOp::Log => None,
        }
    }

    fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Root => "root",
            BinaryOp::Log => "log",
            _ => "",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Subtract => 1,
            BinaryOp::Multiply | BinaryOp::Divide => 2,
            BinaryOp::Power => 3,
            BinaryOp::Root | BinaryOp::Log => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// True for leaves seeded directly rather than computed by a constraint.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Expr::Binary { .. })
    }

    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Variable(_) => u8::MAX,
            Expr::Binary { op, .. } => op.precedence(),
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent: BinaryOp, is_rhs: bool) -> fmt::Result {
        // Parenthesize when the child binds looser than the parent. On equal
        // precedence the non-associative sides still need parens: the right
        // of `-` and `/` ("a - (b - c)"), the left of `^` ("(a ^ b) ^ c").
        let needs_parens = match self.precedence().cmp(&parent.precedence()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => match parent {
                BinaryOp::Subtract | BinaryOp::Divide => is_rhs,
                BinaryOp::Power => !is_rhs,
                _ => false,
            },
            std::cmp::Ordering::Greater => false,
        };
        if needs_parens {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{value}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Binary { op, lhs, rhs } => {
                if let Some(symbol) = op.infix_symbol() {
                    lhs.fmt_child(f, *op, false)?;
                    write!(f, " {symbol} ")?;
                    rhs.fmt_child(f, *op, true)
                } else {
                    write!(f, "{}({lhs}, {rhs})", op.function_name())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_infix_with_precedence_parens() {
        let sum = Expr::binary(BinaryOp::Add, Expr::number(3.0), Expr::number(4.0));
        let product = Expr::binary(BinaryOp::Multiply, sum, Expr::number(2.0));
        assert_eq!(product.to_string(), "(3 + 4) × 2");

        let nested = Expr::binary(
            BinaryOp::Subtract,
            Expr::number(10.0),
            Expr::binary(BinaryOp::Subtract, Expr::number(4.0), Expr::number(1.0)),
        );
        assert_eq!(nested.to_string(), "10 - (4 - 1)");
    }

    #[test]
    fn renders_tight_children_without_parens() {
        let inner = Expr::binary(BinaryOp::Multiply, Expr::number(2.0), Expr::number(5.0));
        let sum = Expr::binary(BinaryOp::Add, inner, Expr::variable("x"));
        assert_eq!(sum.to_string(), "2 × 5 + x");
    }

    #[test]
    fn renders_root_and_log_as_functions() {
        let root = Expr::binary(BinaryOp::Root, Expr::number(9.0), Expr::number(2.0));
        assert_eq!(root.to_string(), "root(9, 2)");
        let log = Expr::binary(BinaryOp::Log, Expr::number(8.0), Expr::number(2.0));
        assert_eq!(log.to_string(), "log(8, 2)");
    }
}
