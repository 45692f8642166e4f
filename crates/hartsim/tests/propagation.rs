//! Tests for the reactive cell graph: load, representation translation,
//! dependency propagation, model-switch hygiene and composite reads.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use hartsim::prelude::*;
use pretty_assertions::assert_eq;

const TABLE: &str = "HART";

/// Seed one row with its meta cells and a dev1 value.
fn seed_row(store: &MemoryStore, row: &str, ty: &str, size: &str, value: &str) {
    store.seed(TABLE, row, "NAME", row);
    store.seed(TABLE, row, "TYPE", ty);
    store.seed(TABLE, row, "BYTE_SIZE", size);
    store.seed(TABLE, row, "dev1", value);
}

fn cell(row: &str) -> CellId {
    CellId::new(TABLE, row, "dev1")
}

async fn load(store: Arc<MemoryStore>) -> SimTable {
    SimTable::load(TABLE, store).await.unwrap()
}

/// A literal cell translates between its three representations on demand.
#[tokio::test]
async fn test_representations() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    let table = load(store).await;

    assert_eq!(
        table.get(&cell("b"), Repr::Origin).unwrap(),
        HumanValue::Text("0005".into())
    );
    // Origin <-> machine is a no-op: same underlying bytes
    assert_eq!(
        table.get(&cell("b"), Repr::Machine).unwrap(),
        HumanValue::Text("0005".into())
    );
    assert_eq!(
        table.get(&cell("b"), Repr::Human).unwrap(),
        HumanValue::Int(5)
    );
}

/// Meta cells are opaque strings in every representation.
#[tokio::test]
async fn test_meta_cells_are_opaque() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    let table = load(store).await;

    let ty = CellId::new(TABLE, "b", "TYPE");
    assert_eq!(
        table.get(&ty, Repr::Human).unwrap(),
        HumanValue::Text("UINT".into())
    );
}

/// `@B+1` with B = 5 evaluates to 6; setting B to 10 pushes 11 into A with
/// no further calls from the test.
#[tokio::test]
async fn test_dependency_propagation() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.b + 1");
    let mut table = load(store).await;

    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(6.0)
    );

    table.set(&cell("b"), "10", Repr::Human, true).unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(11.0)
    );
}

/// Formula chains settle during load regardless of evaluation order.
#[tokio::test]
async fn test_formula_chain_settles_at_load() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "c", "UINT", "2", "0002");
    seed_row(&store, "b", "SREAL", "4", "@HART.dev1.c * 10");
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.b + 1");
    let table = load(store).await;

    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(21.0)
    );
}

/// Changing A's formula from `@B+1` to `@C+1` unsubscribes A from B and
/// subscribes it to C.
#[tokio::test]
async fn test_model_switch_hygiene() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    seed_row(&store, "c", "UINT", "2", "0064");
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.b + 1");
    let mut table = load(store).await;

    table
        .set(&cell("a"), "@HART.dev1.c + 1", Repr::Origin, true)
        .unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(101.0)
    );

    // B no longer reaches A
    table.set(&cell("b"), "9999", Repr::Human, true).unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(101.0)
    );

    // C still does
    table.set(&cell("c"), "200", Repr::Human, true).unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(201.0)
    );
}

/// Leaving a formula model clears the value back to the literal path.
#[tokio::test]
async fn test_formula_to_value_switch() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    seed_row(&store, "a", "UINT", "2", "@HART.dev1.b + 1");
    let mut table = load(store).await;

    table.set(&cell("a"), "0042", Repr::Machine, true).unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Int(66)
    );

    // The old subscription is gone
    table.set(&cell("b"), "7", Repr::Human, true).unwrap();
    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Int(66)
    );
}

/// Subscribers see changes with the user-edit flag, and dependents' own
/// notifications fire during the same cascade.
#[tokio::test]
async fn test_change_notifications() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.b + 1");
    let mut table = load(store).await;

    let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();
    let seen_a = Arc::clone(&seen);
    table.subscribe(&cell("a"), move |event| {
        seen_a
            .lock()
            .unwrap()
            .push((event.cell.row.clone(), event.user_edit));
    });
    let seen_b = Arc::clone(&seen);
    table.subscribe(&cell("b"), move |event| {
        seen_b
            .lock()
            .unwrap()
            .push((event.cell.row.clone(), event.user_edit));
    });

    table.set(&cell("b"), "10", Repr::Human, true).unwrap();

    let events = seen.lock().unwrap().clone();
    assert!(events.contains(&("a".to_string(), true)));
    assert!(events.contains(&("b".to_string(), true)));
}

/// Unsubscribed listeners stop firing.
#[tokio::test]
async fn test_unsubscribe() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    let mut table = load(store).await;

    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);
    let sub = table.subscribe(&cell("b"), move |_| {
        count2.fetch_add(1, Ordering::SeqCst);
    });

    table.set(&cell("b"), "6", Repr::Human, true).unwrap();
    table.unsubscribe(sub);
    table.set(&cell("b"), "7", Repr::Human, true).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// A formula that references an unloadable cell renders as zero with the
/// recoverable-error indicator, and the rest of the table keeps working.
#[tokio::test]
async fn test_bad_formula_defaults_to_zero() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "0005");
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.missing * 2");
    let table = load(store).await;

    assert_eq!(
        table.get(&cell("a"), Repr::Human).unwrap(),
        HumanValue::Number(0.0)
    );
    assert_eq!(
        table.get(&cell("b"), Repr::Human).unwrap(),
        HumanValue::Int(5)
    );
}

/// A dependency cycle stalls at the re-entrancy guard instead of recursing.
#[tokio::test]
async fn test_cycle_is_cut_by_reentrancy_guard() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "a", "SREAL", "4", "@HART.dev1.b + 1");
    seed_row(&store, "b", "SREAL", "4", "0000");
    let mut table = load(store).await;

    table
        .set(&cell("b"), "@HART.dev1.a + 1", Repr::Origin, true)
        .unwrap();
    // Both cells hold some stale-but-finite value; no stack overflow
    assert!(table.get(&cell("a"), Repr::Human).is_ok());
    assert!(table.get(&cell("b"), Repr::Human).is_ok());
}

/// Composite `|` / `&` row addressing combines the referenced cells.
#[tokio::test]
async fn test_composite_rows() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "alarms", "UINT", "2", "0041");
    seed_row(&store, "mask", "UINT", "2", "004F");
    let table = load(store).await;

    let or = CellId::new(TABLE, "alarms | mask", "dev1");
    assert_eq!(table.get(&or, Repr::Human).unwrap(), HumanValue::Int(0x4F));

    let and = CellId::new(TABLE, "alarms & mask", "dev1");
    assert_eq!(table.get(&and, Repr::Human).unwrap(), HumanValue::Int(0x41));

    let broken = CellId::new(TABLE, "alarms | nothere", "dev1");
    assert!(table.get(&broken, Repr::Human).is_err());
}

/// A `$`-cell registers with the transfer-function registry, exposes its
/// input, and takes the simulator's output back through injection.
#[tokio::test]
async fn test_transfer_function_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "sp", "UINT", "2", "0005");
    seed_row(&store, "pv", "SREAL", "4", "$[1.0],[1.0,0.5],2,HART.dev1.sp * 2");
    seed_row(&store, "out", "SREAL", "4", "@HART.dev1.pv + 100");
    let mut table = load(store).await;

    let entry = table.tf_registry().get(&cell("pv")).expect("registered");
    assert_eq!(entry.spec.denominator, vec![1.0, 0.5]);
    assert_eq!(entry.input, Some(10.0));

    // Input follows its expression
    table.set(&cell("sp"), "8", Repr::Human, true).unwrap();
    assert_eq!(table.tf_registry().get(&cell("pv")).unwrap().input, Some(16.0));

    // Simulator output lands in the cell and fans out
    table.inject_simulated(&cell("pv"), 12.5).unwrap();
    assert_eq!(
        table.get(&cell("pv"), Repr::Human).unwrap(),
        HumanValue::Number(12.5)
    );
    assert_eq!(
        table.get(&cell("out"), Repr::Human).unwrap(),
        HumanValue::Number(112.5)
    );

    // Overwriting the formula deregisters the cell
    table.set(&cell("pv"), "0", Repr::Human, true).unwrap();
    assert!(table.tf_registry().get(&cell("pv")).is_none());
    assert!(table.inject_simulated(&cell("pv"), 1.0).is_err());
}

/// Human-representation writes go through the codec before persisting.
#[tokio::test]
async fn test_human_write_persists_native_encoding() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "INT", "2", "0000");
    let mut table = SimTable::load(TABLE, Arc::clone(&store) as Arc<dyn Store>)
        .await
        .unwrap();

    table.set(&cell("b"), "-32513", Repr::Human, true).unwrap();
    assert_eq!(
        table.get(&cell("b"), Repr::Machine).unwrap(),
        HumanValue::Text("80FF".into())
    );

    // The writer task persists in order; give it a beat
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(store.raw(TABLE, "b", "dev1").unwrap(), "80FF");
}

/// The GUI bridge formats values and routes edits with the user flag set.
#[tokio::test]
async fn test_gui_bridge() {
    let store = Arc::new(MemoryStore::new());
    seed_row(&store, "b", "UINT", "2", "00FF");
    let table = Arc::new(Mutex::new(load(store).await));
    let gui = GuiBridge::new(Arc::clone(&table));

    assert_eq!(gui.display_value(&cell("b")), "255");
    gui.apply_user_edit(&cell("b"), "300").unwrap();
    assert_eq!(gui.display_value(&cell("b")), "300");
    assert_eq!(gui.display_value(&CellId::new(TABLE, "nope", "dev1")), "#ERR");
}

/// The Modbus bridge resolves ADDRESS/MB_POINT meta cells to registers.
#[tokio::test]
async fn test_modbus_bridge() {
    let store = Arc::new(MemoryStore::new());
    store.seed(TABLE, "gain", "NAME", "gain");
    store.seed(TABLE, "gain", "TYPE", "UINT");
    store.seed(TABLE, "gain", "BYTE_SIZE", "2");
    store.seed(TABLE, "gain", "MB_POINT", "HR");
    store.seed(TABLE, "gain", "ADDRESS", "3");
    store.seed(TABLE, "gain", "dev1", "001E");
    store.seed(TABLE, "pv", "NAME", "pv");
    store.seed(TABLE, "pv", "TYPE", "SREAL");
    store.seed(TABLE, "pv", "BYTE_SIZE", "4");
    store.seed(TABLE, "pv", "MB_POINT", "IR");
    store.seed(TABLE, "pv", "ADDRESS", "0");
    store.seed(TABLE, "pv", "dev1", "3FBE3A80");

    let table = Arc::new(Mutex::new(load(store).await));
    let modbus = ModbusBridge::new(Arc::clone(&table), "dev1");

    assert_eq!(modbus.read_register(3, PointKind::Holding), Some(30));
    // SREAL registers carry the full 32-bit pattern
    assert_eq!(modbus.read_register(0, PointKind::Input), Some(0x3FBE3A80));
    assert_eq!(modbus.read_register(99, PointKind::Input), None);

    modbus.write_register(3, 45.0).unwrap();
    let table = table.lock().unwrap();
    assert_eq!(
        table.get(&cell("gain"), Repr::Human).unwrap(),
        HumanValue::Int(45)
    );
}
