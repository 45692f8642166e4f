//! Restricted arithmetic expression engine for hartsim formula cells.
//!
//! Formula cells hold a small expression language, not a general-purpose
//! interpreter: `+ - * / **` and parentheses, comparisons, a fixed allowlist
//! of functions (`sqrt`, `exp`, `log`, `abs`, `int`), the `math.pi` /
//! `math.e` constants, and dotted `Table.Column.Row` cell references.
//!
//! The crate provides:
//! - [`parse`] - recursive-descent parser producing an [`Expr`] AST
//! - [`evaluate`] - AST evaluation against a [`Resolver`] that binds cell
//!   references to their current human values
//! - [`extract_refs`] - the `Table.Column.Row` token pattern used to derive
//!   a cell's dependency set
//! - [`parse_tfunc`] - the `[num],[den],delay,input` shape of
//!   transfer-function origins
//! - [`DepGraph`] - precedent/dependent edge bookkeeping for the cell graph

mod ast;
mod dependency;
mod error;
mod evaluator;
mod parser;
mod refs;

pub use ast::{BinaryOp, Expr, Function, UnaryOp};
pub use dependency::DepGraph;
pub use error::{ExprError, ExprResult};
pub use evaluator::{evaluate, evaluate_text, Resolver};
pub use parser::parse;
pub use refs::{extract_refs, parse_tfunc, TfSpec};
