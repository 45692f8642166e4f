//! End-to-end dispatch tests: wire hex in, wire hex out, against a live
//! formula-driven table.

use std::sync::Arc;

use hart_protocol::rows;
use hartsim::prelude::*;
use pretty_assertions::assert_eq;

const TABLE: &str = "HART";

fn seed_row(store: &MemoryStore, row: &str, ty: &str, size: &str, value: &str) {
    store.seed(TABLE, row, "NAME", row);
    store.seed(TABLE, row, "TYPE", ty);
    store.seed(TABLE, row, "BYTE_SIZE", size);
    store.seed(TABLE, row, "dev1", value);
}

/// One simulated transmitter with enough parameters for the universal
/// command set.
async fn device_table(store: Arc<MemoryStore>) -> SimTable {
    seed_row(&store, rows::POLLING_ADDRESS, "UINT", "1", "1A");
    seed_row(&store, rows::LOOP_CURRENT_MODE, "ENUM<1>", "1", "00");
    seed_row(&store, rows::MANUFACTURER_ID, "UINT", "2", "0026");
    seed_row(&store, rows::DEVICE_TYPE, "UINT", "1", "06");
    seed_row(&store, rows::DEVICE_ID, "UINT", "3", "123456");
    seed_row(&store, rows::FRAME_TYPE, "UINT", "1", "00");
    seed_row(&store, rows::ADDRESS_TYPE, "UINT", "1", "00");
    seed_row(&store, rows::MASTER_ADDRESS, "UINT", "1", "00");
    seed_row(&store, rows::BURST_MODE, "UINT", "1", "00");
    seed_row(&store, rows::RESPONSE_CODE, "UINT", "1", "00");
    seed_row(&store, rows::DEVICE_STATUS, "BIT_ENUM<4>", "1", "40");
    seed_row(&store, rows::ERROR_STATUS, "UINT", "1", "00");
    seed_row(&store, rows::COMM_STATUS, "UINT", "1", "00");
    seed_row(&store, rows::CONFIG_CHANGED, "UINT", "1", "01");
    seed_row(&store, rows::IDENTITY_MARKER, "UINT", "1", "FE");
    seed_row(&store, rows::MIN_PREAMBLES, "UINT", "1", "05");
    seed_row(&store, rows::UNIVERSAL_REV, "UINT", "1", "05");
    seed_row(&store, rows::DEVICE_REV, "UINT", "1", "01");
    seed_row(&store, rows::SOFTWARE_REV, "UINT", "1", "02");
    seed_row(&store, rows::HARDWARE_REV, "UINT", "1", "0B");
    seed_row(&store, rows::DEVICE_FLAGS, "UINT", "1", "00");
    seed_row(&store, rows::PV_UNIT, "ENUM<0>", "1", "20");
    // The PV is formula-driven: the dispatcher reads its machine encoding
    seed_row(&store, rows::PV, "SREAL", "4", "@1.25 * 2");
    seed_row(&store, rows::TAG, "PACKED_ASCII", "6", "0010810C1505");
    SimTable::load(TABLE, store).await.unwrap()
}

fn short_request(polling: u8, command: u8, body: Vec<u8>) -> Frame {
    Frame::request(Address::Short { polling }, command, body)
}

/// A request addressed to a polling address not present in the table gets
/// no response frame at all.
#[tokio::test]
async fn test_multi_drop_silence() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(store).await;

    let req = short_request(0x05, 0x00, vec![]);
    assert!(respond(&req, &mut table).is_none());
}

/// Command 06 with body `1A00`: polling address and loop-current mode are
/// persisted, and the response body echoes them after the error code.
#[tokio::test]
async fn test_write_polling_address() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(store).await;

    let req = short_request(0x1A, 0x06, vec![0x1A, 0x00]);
    let rsp = respond(&req, &mut table).unwrap();

    assert_eq!(&rsp.body[2..], &[0x1A, 0x00]);
    let polling = CellId::new(TABLE, rows::POLLING_ADDRESS, "dev1");
    assert_eq!(
        table.get(&polling, Repr::Machine).unwrap(),
        HumanValue::Text("1A".into())
    );
}

/// Read PV picks up the formula cell's machine encoding.
#[tokio::test]
async fn test_read_pv_from_formula_cell() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(store).await;

    let req = short_request(0x1A, 0x01, vec![]);
    let rsp = respond(&req, &mut table).unwrap();

    // status (00 40) + unit (20) + 2.5f32 (40200000)
    assert_eq!(rsp.body, vec![0x00, 0x40, 0x20, 0x40, 0x20, 0x00, 0x00]);
}

/// Full wire round trip: hex request in, hex response out, both parseable.
#[tokio::test]
async fn test_wire_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(store).await;

    let req_hex = build(&short_request(0x1A, 0x00, vec![]));
    let decoded = parse(&req_hex).unwrap();
    assert!(decoded.checksum_ok);

    let rsp = respond(&decoded.frame, &mut table).unwrap();
    let rsp_hex = build(&rsp);
    let round = parse(&rsp_hex).unwrap();
    assert!(round.checksum_ok);
    assert_eq!(round.frame, rsp);
    assert_eq!(round.frame.frame_type, FrameType::Response);
    // Identity payload starts with the FE marker after the status bytes
    assert_eq!(round.frame.body[2], 0xFE);
}

/// Long-frame addressing matches on manufacturer id / device type /
/// device id.
#[tokio::test]
async fn test_long_frame_match() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(store).await;

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

    let header = CellId::new(TABLE, rows::ADDRESS_TYPE, "dev1");
    assert_eq!(
        table.get(&header, Repr::Machine).unwrap(),
        HumanValue::Text("01".into())
    );
}

/// Writes through the dispatcher reach the persistence layer.
#[tokio::test]
async fn test_dispatcher_writes_persist() {
    let store = Arc::new(MemoryStore::new());
    let mut table = device_table(Arc::clone(&store)).await;

    let req = short_request(0x1A, 0x06, vec![0x25, 0x01]);
    respond(&req, &mut table).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(
        store.raw(TABLE, rows::POLLING_ADDRESS, "dev1").unwrap(),
        "25"
    );
}

/// Master role: command 06 carries the table's current payload, other
/// read commands go out empty.
#[tokio::test]
async fn test_master_request() {
    let store = Arc::new(MemoryStore::new());
    let table = device_table(store).await;

    let req = request(0x06, "dev1", &table);
    assert_eq!(req.body, vec![0x1A, 0x00]);
    assert!(req.address.is_long());

    let read = request(0x03, "dev1", &table);
    assert!(read.body.is_empty());
}
