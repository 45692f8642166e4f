//! Command dispatcher: request frame in, response frame out.
//!
//! As the device (slave) side, [`respond`] primes a response header from the
//! incoming frame, matches the address against the table's device columns
//! (multi-drop: no match means no answer at all), then assembles the body
//! from a fixed command -> cell-read sequence. As the master side,
//! [`request`] builds the next request frame for a device column.
//!
//! All cell traffic is in machine representation (hex strings); the
//! dispatcher never goes through the human codec.

use tracing::{debug, warn};

use crate::frame::{bytes_to_hex, hex_to_bytes, Address, Frame, FrameType};
use crate::rows;

/// Cell access as the dispatcher sees it: machine-hex reads and writes by
/// (column, row), plus the set of device columns to match addresses against.
pub trait DeviceTable {
    /// Non-meta columns: one per simulated device entry.
    fn device_columns(&self) -> Vec<String>;
    /// Machine-representation hex of a cell, `None` when absent.
    fn read(&self, column: &str, row: &str) -> Option<String>;
    /// Write machine-representation hex into a cell.
    fn write(&mut self, column: &str, row: &str, hex: &str);
}

// ============================================================================
// Device (slave) role
// ============================================================================

/// Produce the response to `req`, or `None` when no configured device entry
/// matches the request address (the simulated device stays silent, which is
/// correct multi-drop bus behavior).
pub fn respond<T: DeviceTable>(req: &Frame, table: &mut T) -> Option<Frame> {
    if req.frame_type != FrameType::Request {
        return None;
    }

    let column = match_column(req, table)?;
    debug!(command = req.command, column = %column, "dispatching request");
    persist_header(req, table, &column);

    let body = match req.command {
        0x00 => identity_body(table, &column),
        0x01 => read_body(table, &column, &[rows::PV_UNIT, rows::PV]),
        0x02 => read_body(table, &column, &[rows::LOOP_CURRENT, rows::PERCENT_RANGE]),
        0x03 => read_body(
            table,
            &column,
            &[
                rows::LOOP_CURRENT,
                rows::PV_UNIT,
                rows::PV,
                rows::SV_UNIT,
                rows::SV,
                rows::TV_UNIT,
                rows::TV,
                rows::QV_UNIT,
                rows::QV,
            ],
        ),
        // Reserved command numbers: error code only
        0x04 | 0x05 | 0x09 | 0x0A | 0x2A => status(table, &column),
        0x06 => write_polling_address(req, table, &column),
        0x07 => read_body(
            table,
            &column,
            &[rows::POLLING_ADDRESS, rows::LOOP_CURRENT_MODE],
        ),
        0x08 => {
            // Dynamic variable classifications: fixed zero payload
            let mut body = status(table, &column);
            body.extend_from_slice(&[0, 0, 0, 0]);
            body
        }
        0x0B => return unique_id_by_tag(req, table, &column),
        0x0C => read_body(table, &column, &[rows::MESSAGE]),
        0x0D => read_body(table, &column, &[rows::TAG, rows::DESCRIPTOR, rows::DATE]),
        0x0E => read_body(
            table,
            &column,
            &[
                rows::TRANSDUCER_SERIAL,
                rows::TRANSDUCER_UNIT,
                rows::UPPER_LIMIT,
                rows::LOWER_LIMIT,
                rows::MIN_SPAN,
            ],
        ),
        0x0F => read_body(
            table,
            &column,
            &[
                rows::ALARM_CODE,
                rows::TRANSFER_FUNCTION,
                rows::PV_UNIT,
                rows::UPPER_RANGE,
                rows::LOWER_RANGE,
                rows::DAMPING,
                rows::WRITE_PROTECT,
                rows::PRIVATE_LABEL,
            ],
        ),
        0x10 => read_body(table, &column, &[rows::FINAL_ASSEMBLY]),
        0x11 => write_echo(req, table, &column, rows::MESSAGE),
        0x12 => write_tag_descriptor_date(req, table, &column),
        0x13 => write_echo(req, table, &column, rows::FINAL_ASSEMBLY),
        0x21 => read_device_variables(req, table, &column),
        0x26 => reset_error_flags(table, &column),
        0x28 => {
            // Enter/exit fixed-current mode: echo the requested level
            let mut body = status(table, &column);
            body.extend_from_slice(&req.body);
            body
        }
        0x29 | 0x2D | 0x2E => status(table, &column),
        0x50 => variable_assignments(table, &column),
        cmd => match vendor_payload(cmd) {
            Some(hex) => hex_to_bytes(hex).unwrap_or_default(),
            None => {
                debug!(command = cmd, "unknown command, empty body");
                Vec::new()
            }
        },
    };

    Some(response_frame(req, body))
}

/// The response header mirrors the request: same address and flags, frame
/// type switched to response.
fn response_frame(req: &Frame, body: Vec<u8>) -> Frame {
    Frame {
        preamble_len: req.preamble_len,
        frame_type: FrameType::Response,
        master: req.master,
        burst: req.burst,
        address: req.address.clone(),
        command: req.command,
        body,
    }
}

/// Scan the table's device columns for one matching the request address.
fn match_column<T: DeviceTable>(req: &Frame, table: &T) -> Option<String> {
    for column in table.device_columns() {
        let hit = match &req.address {
            Address::Short { polling } => {
                read_u32(table, &column, rows::POLLING_ADDRESS)
                    .map(|stored| stored as u8 & 0x3F == *polling)
                    .unwrap_or(false)
            }
            Address::Long {
                manufacturer,
                device_type,
                device_id,
            } => {
                let mfr = read_u32(table, &column, rows::MANUFACTURER_ID);
                let dt = read_u32(table, &column, rows::DEVICE_TYPE);
                let id = read_u32(table, &column, rows::DEVICE_ID);
                let wanted = u32::from_be_bytes([0, device_id[0], device_id[1], device_id[2]]);
                mfr.map(|m| m as u8 & 0x3F == *manufacturer).unwrap_or(false)
                    && dt.map(|d| d as u8 == *device_type).unwrap_or(false)
                    && id.map(|i| i == wanted).unwrap_or(false)
            }
        };
        if hit {
            return Some(column);
        }
    }
    debug!("no device entry matches request address, staying silent");
    None
}

/// Persist the discovered header fields into the matched column for reuse.
fn persist_header<T: DeviceTable>(req: &Frame, table: &mut T, column: &str) {
    table.write(
        column,
        rows::FRAME_TYPE,
        &format!("{:02X}", req.frame_type.bits()),
    );
    table.write(
        column,
        rows::ADDRESS_TYPE,
        if req.address.is_long() { "01" } else { "00" },
    );
    table.write(
        column,
        rows::MASTER_ADDRESS,
        if req.master { "01" } else { "00" },
    );
    table.write(column, rows::BURST_MODE, if req.burst { "01" } else { "00" });
}

// === Body builders ===

/// Standard response prefix: response code + device status.
fn status<T: DeviceTable>(table: &T, column: &str) -> Vec<u8> {
    let mut body = Vec::new();
    push_row(&mut body, table, column, rows::RESPONSE_CODE);
    push_row(&mut body, table, column, rows::DEVICE_STATUS);
    body
}

fn read_body<T: DeviceTable>(table: &T, column: &str, sequence: &[&str]) -> Vec<u8> {
    let mut body = status(table, column);
    for row in sequence {
        push_row(&mut body, table, column, row);
    }
    body
}

fn identity_body<T: DeviceTable>(table: &T, column: &str) -> Vec<u8> {
    read_body(
        table,
        column,
        &[
            rows::IDENTITY_MARKER,
            rows::MANUFACTURER_ID,
            rows::DEVICE_TYPE,
            rows::MIN_PREAMBLES,
            rows::UNIVERSAL_REV,
            rows::DEVICE_REV,
            rows::SOFTWARE_REV,
            rows::HARDWARE_REV,
            rows::DEVICE_FLAGS,
            rows::DEVICE_ID,
        ],
    )
}

/// Command 06: parse polling address + loop current mode from the request,
/// persist both, echo them after the error code.
fn write_polling_address<T: DeviceTable>(req: &Frame, table: &mut T, column: &str) -> Vec<u8> {
    let mut body = status(table, column);
    if req.body.len() >= 2 {
        table.write(column, rows::POLLING_ADDRESS, &format!("{:02X}", req.body[0]));
        table.write(
            column,
            rows::LOOP_CURRENT_MODE,
            &format!("{:02X}", req.body[1]),
        );
        body.extend_from_slice(&req.body[..2]);
    } else {
        warn!(len = req.body.len(), "command 06 body too short");
    }
    body
}

/// Command 0B: answer with the identity payload when the requested tag
/// matches the stored one; otherwise stay silent.
fn unique_id_by_tag<T: DeviceTable>(req: &Frame, table: &mut T, column: &str) -> Option<Frame> {
    let stored = table.read(column, rows::TAG)?;
    let wanted = hex_to_bytes(&stored).ok()?;
    if req.body != wanted {
        return None;
    }
    let body = identity_body(table, column);
    Some(response_frame(req, body))
}

/// Commands 11/13: persist the request payload verbatim and echo it.
fn write_echo<T: DeviceTable>(req: &Frame, table: &mut T, column: &str, row: &str) -> Vec<u8> {
    let mut body = status(table, column);
    table.write(column, row, &bytes_to_hex(&req.body));
    body.extend_from_slice(&req.body);
    body
}

/// Command 12: split a 21-byte body into 6-byte tag, 12-byte descriptor and
/// 3-byte date, persist each, echo the whole payload.
fn write_tag_descriptor_date<T: DeviceTable>(req: &Frame, table: &mut T, column: &str) -> Vec<u8> {
    let mut body = status(table, column);
    if req.body.len() >= 21 {
        table.write(column, rows::TAG, &bytes_to_hex(&req.body[..6]));
        table.write(column, rows::DESCRIPTOR, &bytes_to_hex(&req.body[6..18]));
        table.write(column, rows::DATE, &bytes_to_hex(&req.body[18..21]));
        body.extend_from_slice(&req.body[..21]);
    } else {
        warn!(len = req.body.len(), "command 12 body too short");
    }
    body
}

/// Command 21: a single variable code, or a count-prefixed list of codes.
/// Code 00 is the PV; anything else answers "not used" (unit FA, NaN float).
fn read_device_variables<T: DeviceTable>(req: &Frame, table: &T, column: &str) -> Vec<u8> {
    let codes: Vec<u8> = match req.body.as_slice() {
        [] => Vec::new(),
        [code] => vec![*code],
        [count, rest @ ..] => rest.iter().take(*count as usize).copied().collect(),
    };
    let mut body = status(table, column);
    for code in codes {
        if code == 0x00 {
            push_row(&mut body, table, column, rows::PV_UNIT);
            push_row(&mut body, table, column, rows::PV);
        } else {
            body.push(0xFA);
            body.extend_from_slice(&[0x7F, 0xC0, 0x00, 0x00]);
        }
    }
    body
}

/// Command 26: fixed prefix 02 + error/response/device/comm status, and the
/// configuration-changed flag is cleared.
fn reset_error_flags<T: DeviceTable>(table: &mut T, column: &str) -> Vec<u8> {
    let mut body = vec![0x02];
    push_row(&mut body, table, column, rows::ERROR_STATUS);
    push_row(&mut body, table, column, rows::RESPONSE_CODE);
    push_row(&mut body, table, column, rows::DEVICE_STATUS);
    push_row(&mut body, table, column, rows::COMM_STATUS);
    table.write(column, rows::CONFIG_CHANGED, "00");
    body
}

/// Command 50: PV/SV/TV/QV assignment codes, FA when not configured.
fn variable_assignments<T: DeviceTable>(table: &T, column: &str) -> Vec<u8> {
    let mut body = status(table, column);
    for row in [
        rows::PV_ASSIGNMENT,
        rows::SV_ASSIGNMENT,
        rows::TV_ASSIGNMENT,
        rows::QV_ASSIGNMENT,
    ] {
        match table.read(column, row) {
            Some(hex) => push_hex(&mut body, &hex, row),
            None => body.push(0xFA),
        }
    }
    body
}

/// Vendor-specific commands answer a fixed canned payload, byte for byte.
fn vendor_payload(command: u8) -> Option<&'static str> {
    let hex = match command {
        0x82 => "0000010203",
        0x84 => "00000A141E28",
        0x87 => "0000FF",
        0x88 => "000001",
        0x8A => "0000A0B0C0",
        0x8C => "00000102030405",
        0x98 => "0000E1",
        0xA2 => "00004C4F4F50",
        0xA4 => "000000000000",
        0xA6 => "0000F1F2",
        0xA8 => "00000310",
        0xAD => "0000BEEF",
        0xB9 => "00001234567890",
        0xBB => "0000CAFE",
        0xC6 => "00000F0F0F",
        0xDF => "0000DEADBEEF",
        _ => return None,
    };
    Some(hex)
}

// ============================================================================
// Master role
// ============================================================================

/// Build the next request frame for a device column. Read commands send an
/// empty body; the write commands send the payload currently in the table.
pub fn request<T: DeviceTable>(command: u8, column: &str, table: &T) -> Frame {
    let body = match command {
        0x06 => read_rows_bytes(
            table,
            column,
            &[rows::POLLING_ADDRESS, rows::LOOP_CURRENT_MODE],
        ),
        0x11 => read_rows_bytes(table, column, &[rows::MESSAGE]),
        0x12 => read_rows_bytes(table, column, &[rows::TAG, rows::DESCRIPTOR, rows::DATE]),
        0x13 => read_rows_bytes(table, column, &[rows::FINAL_ASSEMBLY]),
        _ => Vec::new(),
    };
    Frame::request(request_address(table, column), command, body)
}

/// Long address when the column carries a device id, short otherwise.
fn request_address<T: DeviceTable>(table: &T, column: &str) -> Address {
    if let Some(id) = read_u32(table, column, rows::DEVICE_ID) {
        let [_, b0, b1, b2] = id.to_be_bytes();
        return Address::Long {
            manufacturer: read_u32(table, column, rows::MANUFACTURER_ID).unwrap_or(0) as u8 & 0x3F,
            device_type: read_u32(table, column, rows::DEVICE_TYPE).unwrap_or(0) as u8,
            device_id: [b0, b1, b2],
        };
    }
    Address::Short {
        polling: read_u32(table, column, rows::POLLING_ADDRESS).unwrap_or(0) as u8 & 0x3F,
    }
}

// ============================================================================
// Cell access helpers
// ============================================================================

fn read_u32<T: DeviceTable>(table: &T, column: &str, row: &str) -> Option<u32> {
    let hex = table.read(column, row)?;
    u32::from_str_radix(hex.trim(), 16).ok()
}

fn read_rows_bytes<T: DeviceTable>(table: &T, column: &str, sequence: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in sequence {
        push_row(&mut out, table, column, row);
    }
    out
}

fn push_row<T: DeviceTable>(body: &mut Vec<u8>, table: &T, column: &str, row: &str) {
    match table.read(column, row) {
        Some(hex) => push_hex(body, &hex, row),
        None => warn!(row, column, "cell missing, omitted from body"),
    }
}

fn push_hex(body: &mut Vec<u8>, hex: &str, row: &str) {
    match hex_to_bytes(hex) {
        Ok(bytes) => body.extend_from_slice(&bytes),
        Err(_) => warn!(row, hex, "cell is not machine hex, omitted from body"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    /// Minimal in-memory device table for dispatcher tests.
    #[derive(Default)]
    struct FakeTable {
        cells: BTreeMap<(String, String), String>,
        columns: Vec<String>,
    }

    impl FakeTable {
        fn with_device(column: &str) -> Self {
            let mut t = Self {
                columns: vec![column.to_string()],
                ..Default::default()
            };
            for (row, hex) in [
                (rows::POLLING_ADDRESS, "1A"),
                (rows::LOOP_CURRENT_MODE, "00"),
                (rows::MANUFACTURER_ID, "0026"),
                (rows::DEVICE_TYPE, "06"),
                (rows::DEVICE_ID, "123456"),
                (rows::RESPONSE_CODE, "00"),
                (rows::DEVICE_STATUS, "40"),
                (rows::ERROR_STATUS, "00"),
                (rows::COMM_STATUS, "00"),
                (rows::CONFIG_CHANGED, "01"),
                (rows::IDENTITY_MARKER, "FE"),
                (rows::MIN_PREAMBLES, "05"),
                (rows::UNIVERSAL_REV, "05"),
                (rows::DEVICE_REV, "01"),
                (rows::SOFTWARE_REV, "02"),
                (rows::HARDWARE_REV, "0B"),
                (rows::DEVICE_FLAGS, "00"),
                (rows::PV_UNIT, "20"),
                (rows::PV, "3FBE3A80"),
                (rows::TAG, "0010810C1505"),
            ] {
                t.write(column, row, hex);
            }
            t
        }
    }

    impl DeviceTable for FakeTable {
        fn device_columns(&self) -> Vec<String> {
            self.columns.clone()
        }
        fn read(&self, column: &str, row: &str) -> Option<String> {
            self.cells
                .get(&(column.to_string(), row.to_string()))
                .cloned()
        }
        fn write(&mut self, column: &str, row: &str, hex: &str) {
            self.cells
                .insert((column.to_string(), row.to_string()), hex.to_string());
        }
    }

    fn short_request(polling: u8, command: u8, body: Vec<u8>) -> Frame {
        Frame::request(Address::Short { polling }, command, body)
    }

    #[test]
    fn test_multi_drop_silence_on_unmatched_address() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x05, 0x01, vec![]);
        assert_eq!(respond(&req, &mut table), None);
    }

    #[test]
    fn test_read_pv() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x01, vec![]);
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(rsp.frame_type, FrameType::Response);
        assert_eq!(rsp.command, 0x01);
        // status (00 40) + unit (20) + pv (3FBE3A80)
        assert_eq!(rsp.body, vec![0x00, 0x40, 0x20, 0x3F, 0xBE, 0x3A, 0x80]);
    }

    #[test]
    fn test_long_address_match() {
        let mut table = FakeTable::with_device("dev1");
        let req = Frame::request(
            Address::Long {
                manufacturer: 0x26,
                device_type: 0x06,
                device_id: [0x12, 0x34, 0x56],
            },
            0x01,
            vec![],
        );
        assert!(respond(&req, &mut table).is_some());

        let wrong_id = Frame::request(
            Address::Long {
                manufacturer: 0x26,
                device_type: 0x06,
                device_id: [0x12, 0x34, 0x57],
            },
            0x01,
            vec![],
        );
        assert_eq!(respond(&wrong_id, &mut table), None);
    }

    #[test]
    fn test_write_polling_address_persists_and_echoes() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x06, vec![0x25, 0x00]);
        let rsp = respond(&req, &mut table).unwrap();
        // error code first, then the echoed payload
        assert_eq!(&rsp.body[2..], &[0x25, 0x00]);
        assert_eq!(table.read("dev1", rows::POLLING_ADDRESS).unwrap(), "25");
        assert_eq!(table.read("dev1", rows::LOOP_CURRENT_MODE).unwrap(), "00");
    }

    #[test]
    fn test_header_fields_persisted_on_match() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x01, vec![]);
        respond(&req, &mut table).unwrap();
        assert_eq!(table.read("dev1", rows::FRAME_TYPE).unwrap(), "02");
        assert_eq!(table.read("dev1", rows::ADDRESS_TYPE).unwrap(), "00");
        assert_eq!(table.read("dev1", rows::MASTER_ADDRESS).unwrap(), "01");
        assert_eq!(table.read("dev1", rows::BURST_MODE).unwrap(), "00");
    }

    #[test]
    fn test_write_message_echoes_payload() {
        let mut table = FakeTable::with_device("dev1");
        let payload: Vec<u8> = (0..24).collect();
        let req = short_request(0x1A, 0x11, payload.clone());
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(&rsp.body[2..], payload.as_slice());
        assert_eq!(
            table.read("dev1", rows::MESSAGE).unwrap(),
            bytes_to_hex(&payload)
        );
    }

    #[test]
    fn test_write_tag_descriptor_date_splits_fields() {
        let mut table = FakeTable::with_device("dev1");
        let payload: Vec<u8> = (0..21).collect();
        let req = short_request(0x1A, 0x12, payload.clone());
        respond(&req, &mut table).unwrap();
        assert_eq!(
            table.read("dev1", rows::TAG).unwrap(),
            bytes_to_hex(&payload[..6])
        );
        assert_eq!(
            table.read("dev1", rows::DESCRIPTOR).unwrap(),
            bytes_to_hex(&payload[6..18])
        );
        assert_eq!(
            table.read("dev1", rows::DATE).unwrap(),
            bytes_to_hex(&payload[18..21])
        );
    }

    #[test]
    fn test_read_device_variables_not_used_code() {
        let mut table = FakeTable::with_device("dev1");
        // Count-prefixed list: codes 00 and 07
        let req = short_request(0x1A, 0x21, vec![0x02, 0x00, 0x07]);
        let rsp = respond(&req, &mut table).unwrap();
        let expected = [
            0x00, 0x40, // status
            0x20, 0x3F, 0xBE, 0x3A, 0x80, // code 00: unit + pv
            0xFA, 0x7F, 0xC0, 0x00, 0x00, // code 07: not used + NaN
        ];
        assert_eq!(rsp.body, expected);
    }

    #[test]
    fn test_reset_error_flags_clears_config_changed() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x26, vec![]);
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(rsp.body[0], 0x02);
        assert_eq!(table.read("dev1", rows::CONFIG_CHANGED).unwrap(), "00");
    }

    #[test]
    fn test_unique_id_by_tag() {
        let mut table = FakeTable::with_device("dev1");
        let tag = hex_to_bytes("0010810C1505").unwrap();
        let req = short_request(0x1A, 0x0B, tag);
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(rsp.body[2], 0xFE); // identity marker

        let wrong = short_request(0x1A, 0x0B, vec![0; 6]);
        assert_eq!(respond(&wrong, &mut table), None);
    }

    #[test]
    fn test_variable_assignments_default_fa() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x50, vec![]);
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(&rsp.body[2..], &[0xFA, 0xFA, 0xFA, 0xFA]);
    }

    #[test]
    fn test_vendor_command_canned_payload() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0xAD, vec![]);
        let rsp = respond(&req, &mut table).unwrap();
        assert_eq!(rsp.body, hex_to_bytes("0000BEEF").unwrap());
    }

    #[test]
    fn test_unknown_command_empty_body() {
        let mut table = FakeTable::with_device("dev1");
        let req = short_request(0x1A, 0x7B, vec![]);
        let rsp = respond(&req, &mut table).unwrap();
        assert!(rsp.body.is_empty());
    }

    #[test]
    fn test_master_request_bodies() {
        let table = FakeTable::with_device("dev1");
        let req = request(0x06, "dev1", &table);
        assert_eq!(req.body, vec![0x1A, 0x00]);
        assert_eq!(request(0x01, "dev1", &table).body, Vec::<u8>::new());
        // dev1 has a device id, so master requests go out long-framed
        assert!(req.address.is_long());
    }
}
