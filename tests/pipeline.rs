use std::sync::Arc;

use coolease::codec::encode_batch;
use coolease::ingest::Ingestor;
use coolease::merge::{Lookup, MergePolicy, RowAccounting};
use coolease::storage::{SensorReading, Table, TableStore};
use coolease::Error;

const KNOWN: u32 = 0xAABBCCDD;

fn reading(customer_id: u32, device_id: u32) -> SensorReading {
    SensorReading {
        customer_id,
        device_id,
        temperature_raw: 2210,
        voltage_raw: 296,
        total_packets: 300,
        ok_packets: 297,
        signal_raw: 65470,
        timestamp: String::new(),
    }
}

fn batch(customer_id: u32, devices: std::ops::Range<u32>) -> String {
    let readings: Vec<_> = devices.map(|d| reading(customer_id, d)).collect();
    encode_batch(customer_id, &readings)
}

async fn setup(accounting: RowAccounting) -> (tempfile::TempDir, Arc<TableStore>, Ingestor) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(TableStore::new(dir.path().join("data.csv")));
    store.init_if_missing().await.unwrap();
    let ingestor = Ingestor::new(store.clone(), accounting);
    (dir, store, ingestor)
}

fn file_lines(store: &TableStore) -> Vec<String> {
    std::fs::read_to_string(store.path())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn new_customer_batch_grows_table() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;

    let outcome = ingestor.ingest(MergePolicy::AppendOrInsert, &batch(0x0102_0304, 0..3)).await.unwrap();
    assert!(outcome.status_text().starts_with("Customer Not Found"));
    assert!(outcome.status_text().ends_with("Done"));

    let table = store.load().await.unwrap();
    assert_eq!(table.row_count(), 5);
    assert!(table.is_consistent());
    assert!(table.rows().iter().all(|r| r.customer_id == 0x0102_0304));
    assert!(table.rows().iter().all(|r| !r.timestamp.is_empty()));

    let lines = file_lines(&store);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "\"Num Rows:\",5,N/A,N/A");
}

#[tokio::test]
async fn known_customer_keeps_legacy_row_count() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;
    ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 0..1)).await.unwrap();

    let outcome = ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 1..3)).await.unwrap();
    assert_eq!(outcome.lookup, Lookup::Found(2));
    assert!(outcome.status_text().starts_with("Found Customer"));
    assert_eq!(outcome.appended, 2);
    // the two rows are on disk, but the header does not cover them
    assert_eq!(outcome.row_count, 3);

    let lines = file_lines(&store);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "\"Num Rows:\",3,N/A,N/A");

    let table = store.load().await.unwrap();
    assert_eq!(table.rows().len(), 1);
}

#[tokio::test]
async fn known_customer_corrected_row_count() {
    let (_dir, store, ingestor) = setup(RowAccounting::Corrected).await;
    ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 0..1)).await.unwrap();
    ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 1..3)).await.unwrap();

    let table = store.load().await.unwrap();
    assert_eq!(table.row_count(), 5);
    assert_eq!(file_lines(&store).len(), table.row_count());
    assert!(table.is_consistent());
}

#[tokio::test]
async fn always_append_adds_exactly_one_row() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;
    ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 0..2)).await.unwrap();

    for expected in [5, 6] {
        let outcome = ingestor.ingest(MergePolicy::AlwaysAppend, &batch(KNOWN, 10..13)).await.unwrap();
        assert_eq!(outcome.status_text(), "Done");
        assert_eq!(outcome.appended, 1);
        let table = store.load().await.unwrap();
        assert_eq!(table.row_count(), expected);
        assert!(table.is_consistent());
        assert_eq!(table.rows().last().unwrap().device_id, 10);
    }
}

#[tokio::test]
async fn malformed_batch_leaves_file_untouched() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;
    ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 0..2)).await.unwrap();
    let before = std::fs::read(store.path()).unwrap();

    let mut unterminated = batch(KNOWN, 2..4);
    unterminated.pop();
    let err = ingestor.ingest(MergePolicy::AppendOrInsert, &unterminated).await.unwrap_err();
    assert!(matches!(err, Error::MalformedBatch { .. }));

    let non_hex = batch(KNOWN, 2..3).replacen("00000002", "0000000G", 1);
    let err = ingestor.ingest(MergePolicy::AppendOrInsert, &non_hex).await.unwrap_err();
    assert!(matches!(err, Error::MalformedBatch { .. }));

    let err = ingestor.ingest(MergePolicy::AlwaysAppend, "AABBCCDD0001N").await.unwrap_err();
    assert!(matches!(err, Error::MalformedBatch { .. }));

    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[tokio::test]
async fn corrupt_table_is_reported() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;
    std::fs::write(store.path(), "h\n\"Num Rows:\",3,N/A,N/A\nnot,a,row\n").unwrap();
    let err = ingestor.ingest(MergePolicy::AppendOrInsert, &batch(KNOWN, 0..1)).await.unwrap_err();
    assert!(matches!(err, Error::MalformedTable { line: 3, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_do_not_lose_rows() {
    let (_dir, store, ingestor) = setup(RowAccounting::Legacy).await;
    let ingestor = Arc::new(ingestor);

    let mut handles = Vec::new();
    for customer in 0..16u32 {
        let ingestor = ingestor.clone();
        handles.push(tokio::spawn(async move {
            let policy = if customer % 2 == 0 { MergePolicy::AlwaysAppend } else { MergePolicy::AppendOrInsert };
            // odd customers are all new, so every row they add is counted
            ingestor.ingest(policy, &batch(1000 + customer, 0..2)).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let table: Table = store.load().await.unwrap();
    // 8 single-row appends + 8 two-row batches
    assert_eq!(table.rows().len(), 8 + 16);
    assert_eq!(table.row_count(), 2 + 8 + 16);
    assert!(table.is_consistent());
}
