//! Binary layout of a HART message.
//!
//! [`parse`] and [`build`] are exact inverses: any frame produced by one
//! round-trips bit-for-bit through the other, including the preamble length.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Delimiter bits 0-2 for a master-to-device request.
pub const FRAME_TYPE_REQUEST: u8 = 0x02;
/// Delimiter bits 0-2 for a device-to-master response.
pub const FRAME_TYPE_RESPONSE: u8 = 0x06;

/// Preamble length used when building frames from scratch.
const DEFAULT_PREAMBLE: usize = 5;

/// Frame type, from delimiter bits 0-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Request,
    Response,
    /// Any other delimiter value; kept verbatim so parse/build round-trip
    Other(u8),
}

impl FrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            FRAME_TYPE_REQUEST => FrameType::Request,
            FRAME_TYPE_RESPONSE => FrameType::Response,
            other => FrameType::Other(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            FrameType::Request => FRAME_TYPE_REQUEST,
            FrameType::Response => FRAME_TYPE_RESPONSE,
            FrameType::Other(b) => *b & 0x07,
        }
    }
}

/// Device addressing, from the delimiter's bit 7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// 1 byte: bits 0-5 are the polling address
    Short { polling: u8 },
    /// 5 bytes: 6-bit manufacturer id, device type, 3-byte device id
    Long {
        manufacturer: u8,
        device_type: u8,
        device_id: [u8; 3],
    },
}

impl Address {
    pub fn is_long(&self) -> bool {
        matches!(self, Address::Long { .. })
    }
}

/// A HART message, decoupled from its wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Number of leading `FF` bytes
    pub preamble_len: usize,
    pub frame_type: FrameType,
    /// Address bit 7: primary (true) or secondary master
    pub master: bool,
    /// Address bit 6: device is in burst mode
    pub burst: bool,
    pub address: Address,
    pub command: u8,
    pub body: Vec<u8>,
}

impl Frame {
    /// A request frame with the default preamble.
    pub fn request(address: Address, command: u8, body: Vec<u8>) -> Self {
        Self {
            preamble_len: DEFAULT_PREAMBLE,
            frame_type: FrameType::Request,
            master: true,
            burst: false,
            address,
            command,
            body,
        }
    }
}

/// A parse result: the frame plus the checksum verdict.
///
/// An incorrect checksum is an annotation, not an error; the parsed fields
/// are still returned for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub frame: Frame,
    pub checksum_ok: bool,
}

// ============================================================================
// Parse
// ============================================================================

/// Parse a hex-encoded HART message.
pub fn parse(hex: &str) -> Result<DecodedFrame> {
    let bytes = hex_to_bytes(hex)?;

    // The preamble is the leading run of FF bytes; it must exist and must
    // leave something behind to be a frame at all.
    let preamble_len = bytes.iter().take_while(|b| **b == 0xFF).count();
    if preamble_len == 0 || preamble_len == bytes.len() {
        return Err(FrameError::MissingPreamble);
    }

    let mut buf = Bytes::copy_from_slice(&bytes[preamble_len..]);
    let total = buf.remaining();
    let need = |n: usize, buf: &Bytes| -> Result<()> {
        if buf.remaining() < n {
            Err(FrameError::Truncated {
                expected: total + n - buf.remaining(),
                actual: total,
            })
        } else {
            Ok(())
        }
    };

    need(2, &buf)?;
    let delimiter = buf.get_u8();
    let long = delimiter & 0x80 != 0;
    let frame_type = FrameType::from_bits(delimiter & 0x07);

    let first = buf.get_u8();
    let master = first & 0x80 != 0;
    let burst = first & 0x40 != 0;
    let address = if long {
        need(4, &buf)?;
        let manufacturer = first & 0x3F;
        let device_type = buf.get_u8();
        let mut device_id = [0u8; 3];
        buf.copy_to_slice(&mut device_id);
        Address::Long {
            manufacturer,
            device_type,
            device_id,
        }
    } else {
        Address::Short {
            polling: first & 0x3F,
        }
    };

    need(2, &buf)?;
    let command = buf.get_u8();
    let body_len = buf.get_u8() as usize;
    need(body_len + 1, &buf)?;
    let mut body = vec![0u8; body_len];
    buf.copy_to_slice(&mut body);
    let checksum = buf.get_u8();

    let frame = Frame {
        preamble_len,
        frame_type,
        master,
        burst,
        address,
        command,
        body,
    };
    let checksum_ok = checksum == xor_checksum(&frame);
    Ok(DecodedFrame { frame, checksum_ok })
}

// ============================================================================
// Build
// ============================================================================

/// Encode a frame as an uppercase hex string, checksum computed and appended.
pub fn build(frame: &Frame) -> String {
    let mut buf = BytesMut::new();
    for _ in 0..frame.preamble_len.max(1) {
        buf.put_u8(0xFF);
    }
    put_layout(&mut buf, frame);
    buf.put_u8(xor_checksum(frame));
    bytes_to_hex(&buf)
}

/// Delimiter through body, without preamble or checksum.
fn put_layout(buf: &mut BytesMut, frame: &Frame) {
    let mut delimiter = frame.frame_type.bits();
    if frame.address.is_long() {
        delimiter |= 0x80;
    }
    buf.put_u8(delimiter);

    let flags = (frame.master as u8) << 7 | (frame.burst as u8) << 6;
    match &frame.address {
        Address::Short { polling } => buf.put_u8(flags | (polling & 0x3F)),
        Address::Long {
            manufacturer,
            device_type,
            device_id,
        } => {
            buf.put_u8(flags | (manufacturer & 0x3F));
            buf.put_u8(*device_type);
            buf.put_slice(device_id);
        }
    }

    buf.put_u8(frame.command);
    buf.put_u8(frame.body.len() as u8);
    buf.put_slice(&frame.body);
}

/// XOR of every byte from the delimiter through the end of the body.
fn xor_checksum(frame: &Frame) -> u8 {
    let mut buf = BytesMut::new();
    put_layout(&mut buf, frame);
    buf.iter().fold(0, |acc, b| acc ^ b)
}

// ============================================================================
// Hex helpers
// ============================================================================

pub(crate) fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.is_empty() || hex.len() % 2 != 0 {
        return Err(FrameError::BadHex(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| FrameError::BadHex(hex.to_string()))
        })
        .collect()
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
