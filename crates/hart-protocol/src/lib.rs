//! HART wire-frame codec and command dispatcher.
//!
//! A HART message on the wire is a hex-encoded byte stream:
//!
//! ```text
//! PREAMBLE(FF..) + DELIMITER(1B) + ADDRESS(1B short | 5B long)
//!                + COMMAND(1B) + LEN(1B) + BODY(LEN bytes) + CHECKSUM(1B)
//! ```
//!
//! Delimiter bit 7 selects short/long addressing, bits 0-2 the frame type
//! (`02` request, `06` response). The checksum is the XOR of every byte from
//! the delimiter through the end of the body.
//!
//! The crate has two layers:
//! - **Frame** (`frame.rs`): [`parse`]/[`build`] between hex strings and
//!   [`Frame`] values, round-tripping bit-for-bit
//! - **Dispatcher** (`dispatcher.rs`): turns a parsed request into a
//!   response (device role) or the next request (master role) against a
//!   [`DeviceTable`] of named parameter cells

pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod rows;

pub use dispatcher::{respond, request, DeviceTable};
pub use error::{FrameError, Result};
pub use frame::{build, parse, Address, DecodedFrame, Frame, FrameType};
