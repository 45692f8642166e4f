//! Core data model and typed-value codec for the hartsim transmitter simulator.
//!
//! This crate contains the leaf components that everything else builds on:
//! - [`CellId`] / [`CellModel`] / [`CellData`] - the parameter-table data model
//! - [`HartType`] - the closed set of HART wire data types
//! - [`codec`] - bit-exact conversion between the persisted hex ("origin"),
//!   raw numeric ("machine") and display ("human") representations
//!
//! The codec is a set of pure functions with no state; all failures are typed
//! [`CodecError`]s and callers decide whether to surface or substitute.

mod cell;
mod error;
mod types;

pub mod codec;

pub use cell::{is_meta_column, CellData, CellId, CellModel, META_COLUMNS};
pub use codec::{from_human, to_human, HumanValue};
pub use error::{CodecError, Result};
pub use types::HartType;
