//! HART field-transmitter simulator.
//!
//! The heart of the crate is [`SimTable`]: a live table of device parameters
//! where every cell is stored in three interchangeable representations
//! (origin hex, raw machine value, display value) and may be defined by a
//! formula over other cells. Formula cells re-evaluate eagerly when a
//! dependency changes, and changes fan out to subscribed listeners - the
//! GUI, the Modbus bridge, and other cells.
//!
//! Around the table:
//! - [`Store`] is the persistence collaborator (the real application backs
//!   it with SQLite; [`MemoryStore`] backs tests and the CLI)
//! - [`TfRegistry`] hands transfer-function inputs to the external dynamic
//!   simulator and takes its outputs back
//! - [`ModbusBridge`] / [`GuiBridge`] are the narrow seams the external
//!   Modbus server and desktop GUI consume
//! - `hart-protocol`'s dispatcher runs against [`SimTable`] through its
//!   [`DeviceTable`](hart_protocol::DeviceTable) implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hartsim::{MemoryStore, Repr, SimTable};
//! use hartsim_core::CellId;
//!
//! # async fn example() -> Result<(), hartsim::GraphError> {
//! let store = Arc::new(MemoryStore::new());
//! let mut table = SimTable::load("HART", store).await?;
//! let pv = CellId::new("HART", "pv", "dev1");
//! let value = table.get(&pv, Repr::Human)?;
//! # Ok(())
//! # }
//! ```

mod bridge;
mod graph;
mod store;
mod tfunc;

pub mod prelude;

pub use bridge::{GuiBridge, ModbusBridge, PointKind};
pub use graph::{ChangeEvent, GraphError, Repr, SimTable, SubscriptionId};
pub use store::{MemoryStore, Store};
pub use tfunc::{TfEntry, TfRegistry};
