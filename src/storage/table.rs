use serde::{Deserialize, Serialize};

/// Label written in front of the row count on line 2 of the table.
pub const COUNT_LABEL: &str = "Num Rows:";

/// Index of the first data row; rows 0 and 1 are headers.
pub const FIRST_DATA_ROW: usize = 2;

/// Column titles written into row 0 of a freshly created table.
pub const DEFAULT_PREAMBLE: [&str; 8] = [
    "Customer ID",
    "Sensor ID",
    "Temperature",
    "Battery",
    "Total Packets",
    "OK Packets",
    "Signal Strength",
    "Time",
];

/// One decoded telemetry record. Temperature and signal are raw
/// two's-complement words; see `render` for the signed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    pub customer_id: u32,
    pub device_id: u32,
    pub temperature_raw: u16,
    /// Hundredths of a volt.
    pub voltage_raw: u16,
    pub total_packets: u32,
    pub ok_packets: u32,
    pub signal_raw: u16,
    pub timestamp: String,
}

/// In-memory image of the table file.
///
/// `row_count` is the exclusive upper bound of data row indices, so a table
/// with no data has `row_count == 2`. Rows pushed without bumping the count
/// are still written out on save, but a later load stops at `row_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    preamble: Vec<String>,
    row_count: usize,
    rows: Vec<SensorReading>,
}

impl Table {
    pub fn new(preamble: Vec<String>) -> Self {
        Self { preamble, row_count: FIRST_DATA_ROW, rows: Vec::new() }
    }

    /// Table with the default column titles and no data.
    pub fn empty() -> Self {
        Self::new(DEFAULT_PREAMBLE.iter().map(|s| s.to_string()).collect())
    }

    pub fn from_parts(preamble: Vec<String>, row_count: usize, rows: Vec<SensorReading>) -> Self {
        Self { preamble, row_count, rows }
    }

    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn grow_row_count(&mut self, by: usize) {
        self.row_count += by;
    }

    /// Every data row held in memory, including any past `row_count`.
    pub fn rows(&self) -> &[SensorReading] {
        &self.rows
    }

    /// Data rows covered by the row-count header.
    pub fn visible_rows(&self) -> &[SensorReading] {
        let n = self.row_count.saturating_sub(FIRST_DATA_ROW).min(self.rows.len());
        &self.rows[..n]
    }

    pub fn push(&mut self, reading: SensorReading) {
        self.rows.push(reading);
    }

    /// Number of physical rows, headers included.
    pub fn physical_rows(&self) -> usize {
        FIRST_DATA_ROW + self.rows.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.row_count == self.physical_rows()
    }

    /// Table index (not data index) of the first visible row for `customer_id`.
    pub fn find_customer(&self, customer_id: u32) -> Option<usize> {
        self.visible_rows()
            .iter()
            .position(|r| r.customer_id == customer_id)
            .map(|i| i + FIRST_DATA_ROW)
    }

    /// Fields of row 1.
    pub fn count_header(&self) -> [String; 4] {
        [
            COUNT_LABEL.to_string(),
            self.row_count.to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
        ]
    }
}
