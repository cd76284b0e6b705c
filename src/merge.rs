//! Folding decoded batches into the table.
//!
//! Two policies exist, one per ingestion route. Both decode the whole batch
//! before touching the table, so a malformed batch leaves it unchanged.

use crate::codec::{decode_batch, decode_single};
use crate::error::Result;
use crate::storage::table::Table;

/// How a batch is folded into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Look the customer up, then append every reading in the batch.
    AppendOrInsert,
    /// Append the first reading of the batch without looking anything up.
    AlwaysAppend,
}

/// How `AppendOrInsert` maintains the row-count header for a customer that
/// already has rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowAccounting {
    /// Leave the count alone. Appended rows are written but sit past the
    /// count, so the next load drops them. Matches the deployed dashboard.
    #[default]
    Legacy,
    /// Count every appended row.
    Corrected,
}

/// Result of the customer scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Table index of the first row owned by the customer.
    Found(usize),
    NotFound,
    /// The policy does not scan.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub lookup: Lookup,
    pub appended: usize,
    pub row_count: usize,
}

impl MergeOutcome {
    /// Plain-text response body once the table has been saved.
    pub fn status_text(&self) -> String {
        match self.lookup {
            Lookup::Found(_) => "Found Customer\nDone".to_string(),
            Lookup::NotFound => "Customer Not Found\nDone".to_string(),
            Lookup::Skipped => "Done".to_string(),
        }
    }
}

impl MergePolicy {
    pub fn lookup(self, table: &Table, customer_id: u32) -> Lookup {
        match self {
            MergePolicy::AppendOrInsert => match table.find_customer(customer_id) {
                Some(idx) => Lookup::Found(idx),
                None => Lookup::NotFound,
            },
            MergePolicy::AlwaysAppend => Lookup::Skipped,
        }
    }

    fn counts_appended(self, lookup: Lookup, accounting: RowAccounting) -> bool {
        match (self, lookup) {
            (MergePolicy::AlwaysAppend, _) => true,
            (MergePolicy::AppendOrInsert, Lookup::Found(_)) => accounting == RowAccounting::Corrected,
            (MergePolicy::AppendOrInsert, _) => true,
        }
    }
}

/// Decode `body` under `policy` and append the readings to `table`, tagged
/// with `customer_id` and `timestamp`. On error the table is untouched.
pub fn merge(
    table: &mut Table,
    policy: MergePolicy,
    accounting: RowAccounting,
    customer_id: u32,
    body: &str,
    timestamp: &str,
) -> Result<MergeOutcome> {
    let lookup = policy.lookup(table, customer_id);
    let readings = match policy {
        MergePolicy::AppendOrInsert => decode_batch(body, customer_id, timestamp)?,
        MergePolicy::AlwaysAppend => vec![decode_single(body, customer_id, timestamp)?],
    };

    let appended = readings.len();
    for r in readings {
        table.push(r);
    }
    if policy.counts_appended(lookup, accounting) {
        table.grow_row_count(appended);
    }

    Ok(MergeOutcome { lookup, appended, row_count: table.row_count() })
}
