//! Expression evaluator
//!
//! Evaluates expression ASTs to `f64` against a [`Resolver`] that binds
//! cell references to their current human values. Comparisons yield
//! `1.0`/`0.0`. Failures are typed [`ExprError`]s; the cell graph is the
//! boundary that recovers them.

use crate::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::parser::parse;
use hartsim_core::CellId;

/// Binds cell references to values during evaluation.
pub trait Resolver {
    /// The current human value of the referenced cell, or `None` if it
    /// cannot be resolved.
    fn resolve(&self, id: &CellId) -> Option<f64>;
}

impl<F> Resolver for F
where
    F: Fn(&CellId) -> Option<f64>,
{
    fn resolve(&self, id: &CellId) -> Option<f64> {
        self(id)
    }
}

/// Evaluate a parsed expression.
pub fn evaluate(expr: &Expr, resolver: &dyn Resolver) -> ExprResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(id) => resolver
            .resolve(id)
            .ok_or_else(|| ExprError::Unresolved(id.to_ref())),
        Expr::UnaryOp { op, operand } => {
            let v = evaluate(operand, resolver)?;
            match op {
                UnaryOp::Negate => Ok(-v),
            }
        }
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, resolver)?;
            let r = evaluate(right, resolver)?;
            apply_binary(*op, l, r)
        }
        Expr::Function { function, args } => {
            let v = evaluate(&args[0], resolver)?;
            apply_function(*function, v)
        }
    }
}

/// Parse and evaluate in one step.
pub fn evaluate_text(text: &str, resolver: &dyn Resolver) -> ExprResult<f64> {
    evaluate(&parse(text)?, resolver)
}

fn apply_binary(op: BinaryOp, l: f64, r: f64) -> ExprResult<f64> {
    let v = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Subtract => l - r,
        BinaryOp::Multiply => l * r,
        BinaryOp::Divide => {
            if r == 0.0 {
                return Err(ExprError::Arithmetic(format!("{l} / 0")));
            }
            l / r
        }
        BinaryOp::Power => {
            let v = l.powf(r);
            if !v.is_finite() {
                return Err(ExprError::Arithmetic(format!("{l} ** {r}")));
            }
            v
        }
        BinaryOp::Equal => bool_num(l == r),
        BinaryOp::NotEqual => bool_num(l != r),
        BinaryOp::LessThan => bool_num(l < r),
        BinaryOp::LessEqual => bool_num(l <= r),
        BinaryOp::GreaterThan => bool_num(l > r),
        BinaryOp::GreaterEqual => bool_num(l >= r),
    };
    Ok(v)
}

fn apply_function(function: Function, v: f64) -> ExprResult<f64> {
    let result = match function {
        Function::Sqrt => v.sqrt(),
        Function::Exp => v.exp(),
        Function::Log => v.ln(),
        Function::Abs => v.abs(),
        Function::Int => v.trunc(),
    };
    if !result.is_finite() {
        return Err(ExprError::Arithmetic(format!("{}({v})", function.name())));
    }
    Ok(result)
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
