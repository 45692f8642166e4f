//! Convenient re-exports for typical use.
//!
//! ```rust
//! use hartsim::prelude::*;
//! ```

pub use crate::{
    ChangeEvent, GraphError, GuiBridge, MemoryStore, ModbusBridge, PointKind, Repr, SimTable,
    Store, SubscriptionId, TfRegistry,
};
pub use hart_protocol::{build, parse, respond, request, Address, Frame, FrameType};
pub use hartsim_core::{CellId, CellModel, HartType, HumanValue};
