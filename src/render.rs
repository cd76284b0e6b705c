//! Read-side views of the table.
//!
//! Storage keeps raw unsigned words. The JSON served to the legacy
//! dashboard is raw as well; only `PresentedReading` applies sign
//! correction and unit scaling.

use serde::Serialize;
use serde_json::{json, Value};

use crate::storage::table::{SensorReading, Table};

/// Reinterpret a 16-bit word as two's-complement: values above 32767 map to
/// `value - 65536`.
pub fn twos_complement(raw: u16) -> i32 {
    raw as i16 as i32
}

/// The array-of-arrays view the dashboard polls: row 0 as stored, row 1 as
/// the count header, then one array per data row with plain numbers.
pub fn raw_rows(table: &Table) -> Vec<Value> {
    let mut out = Vec::with_capacity(2 + table.visible_rows().len());
    out.push(json!(table.preamble()));
    out.push(json!([crate::storage::table::COUNT_LABEL, table.row_count(), "N/A", "N/A"]));
    for r in table.visible_rows() {
        out.push(json!([
            r.customer_id,
            r.device_id,
            r.temperature_raw,
            r.voltage_raw,
            r.total_packets,
            r.ok_packets,
            r.signal_raw,
            r.timestamp,
        ]));
    }
    out
}

/// One reading in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedReading {
    pub customer_id: u32,
    pub device_id: u32,
    pub temperature_c: f64,
    pub battery_v: f64,
    pub total_packets: u32,
    pub ok_packets: u32,
    /// Percentage of packets received intact; absent before the first packet.
    pub accuracy_pct: Option<f64>,
    pub signal_dbm: i32,
    pub time: String,
}

impl From<&SensorReading> for PresentedReading {
    fn from(r: &SensorReading) -> Self {
        let accuracy_pct = if r.total_packets == 0 {
            None
        } else {
            Some(100.0 * r.ok_packets as f64 / r.total_packets as f64)
        };
        Self {
            customer_id: r.customer_id,
            device_id: r.device_id,
            temperature_c: twos_complement(r.temperature_raw) as f64 / 100.0,
            battery_v: r.voltage_raw as f64 / 100.0,
            total_packets: r.total_packets,
            ok_packets: r.ok_packets,
            accuracy_pct,
            signal_dbm: twos_complement(r.signal_raw),
            time: r.timestamp.clone(),
        }
    }
}

pub fn presented(table: &Table) -> Vec<PresentedReading> {
    table.visible_rows().iter().map(PresentedReading::from).collect()
}
