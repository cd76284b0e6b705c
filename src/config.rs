use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::merge::RowAccounting;

/// Sensor table ingestion server.
#[derive(Debug, Clone, Parser)]
#[command(name = "coolease", version)]
pub struct Config {
    /// Table file shared with the dashboard.
    #[arg(long, env = "COOLEASE_DATA_FILE", default_value = "data.csv")]
    pub data_file: PathBuf,

    /// Address the HTTP server listens on.
    #[arg(long, env = "COOLEASE_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Count every appended row, even for customers already in the table.
    /// Off by default to stay compatible with existing tables.
    #[arg(long, env = "COOLEASE_CORRECTED_ROW_COUNT")]
    pub corrected_row_count: bool,

    /// Create an empty table at startup when the data file is missing.
    #[arg(long, env = "COOLEASE_INIT_TABLE", default_value_t = true, action = ArgAction::Set)]
    pub init_table: bool,
}

impl Config {
    pub fn accounting(&self) -> RowAccounting {
        if self.corrected_row_count {
            RowAccounting::Corrected
        } else {
            RowAccounting::Legacy
        }
    }
}
