use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::codec::{now_stamp, split_customer};
use crate::error::Result;
use crate::merge::{self, Lookup, MergeOutcome, MergePolicy, RowAccounting};
use crate::storage::TableStore;

/// Runs one request through load, merge and save.
///
/// The whole sequence happens under a single write lock, so two requests
/// can never both load the same table and overwrite each other's rows.
/// Readers do not take the lock: saves are renamed into place, so a reader
/// sees either the old table or the new one.
pub struct Ingestor {
    store: Arc<TableStore>,
    accounting: RowAccounting,
    write_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(store: Arc<TableStore>, accounting: RowAccounting) -> Self {
        Self { store, accounting, write_lock: Mutex::new(()) }
    }

    pub fn accounting(&self) -> RowAccounting {
        self.accounting
    }

    /// Ingest the encoded request string `s` (customer id, batch body,
    /// terminator) under `policy`.
    pub async fn ingest(&self, policy: MergePolicy, s: &str) -> Result<MergeOutcome> {
        let (customer_id, body) = split_customer(s).inspect_err(|e| {
            warn!(error = %e, "rejected request without a valid customer id");
        })?;

        let customer = format!("{:08X}", customer_id);

        let _guard = self.write_lock.lock().await;
        let mut table = self.store.load().await?;

        let outcome = match merge::merge(&mut table, policy, self.accounting, customer_id, body, &now_stamp()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(customer = %customer, ?policy, error = %e, "batch rejected");
                return Err(e);
            }
        };
        match outcome.lookup {
            Lookup::Found(idx) => info!(customer = %customer, row = idx, "found customer"),
            Lookup::NotFound => info!(customer = %customer, "customer not found"),
            Lookup::Skipped => {}
        }

        self.store.save(&table).await?;
        info!(
            customer = %customer,
            ?policy,
            appended = outcome.appended,
            row_count = outcome.row_count,
            "batch stored"
        );
        Ok(outcome)
    }
}
