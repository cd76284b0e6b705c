use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::codec::{encode_record, parse_records, reading_from_record, reading_to_record};
use crate::error::{Error, Result};
use crate::storage::table::{Table, FIRST_DATA_ROW};

/// Durable home of the table: one flat file, always rewritten whole.
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write an empty table if the file does not exist yet. Returns whether
    /// a table was created.
    pub async fn init_if_missing(&self) -> Result<bool> {
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| Error::StoreUnavailable { path: self.path.clone(), source })?;
        if exists {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::StoreUnavailable { path: parent.to_path_buf(), source })?;
            }
        }
        self.save(&Table::empty()).await?;
        info!(path = %self.path.display(), "created empty table");
        Ok(true)
    }

    /// Read the header rows and every data row the row count covers.
    pub async fn load(&self) -> Result<Table> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::StoreUnavailable { path: self.path.clone(), source })?;
        let text = String::from_utf8(data).map_err(|_| Error::table(0, "table is not valid UTF-8"))?;
        let table = decode_table(&text)?;
        debug!(path = %self.path.display(), row_count = table.row_count(), "loaded table");
        Ok(table)
    }

    /// Replace the table file with `table`. The new content goes to a
    /// sibling temp file first and is renamed over the old one once synced.
    pub async fn save(&self, table: &Table) -> Result<()> {
        let text = encode_table(table);
        let tmp = self.temp_path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .await
            .map_err(|source| Error::StoreUnavailable { path: tmp.clone(), source })?;

        let written = async {
            file.write_all(text.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        if let Err(source) = written {
            warn!(path = %self.path.display(), error = %source, "table rewrite failed");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::WriteFailure { path: self.path.clone(), source });
        }
        debug!(
            path = %self.path.display(),
            row_count = table.row_count(),
            physical_rows = table.physical_rows(),
            "saved table"
        );
        Ok(())
    }
}

/// Row 0 verbatim, row 1 as the count header, then every data row in memory.
pub fn encode_table(table: &Table) -> String {
    let mut out = encode_record(table.preamble());
    out.push_str(&encode_record(&table.count_header()));
    for r in table.rows() {
        out.push_str(&encode_record(&reading_to_record(r)));
    }
    out
}

pub fn decode_table(text: &str) -> Result<Table> {
    let mut records = parse_records(text).into_iter();
    let preamble = records.next().ok_or_else(|| Error::table(1, "missing header row"))?;
    let header = records.next().ok_or_else(|| Error::table(2, "missing row count"))?;
    let row_count: usize = header
        .get(1)
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| Error::table(2, format!("row count is not a number: {:?}", header.get(1))))?;
    if row_count < FIRST_DATA_ROW {
        return Err(Error::table(2, format!("row count {} is below {}", row_count, FIRST_DATA_ROW)));
    }

    let mut rows = Vec::new();
    for idx in FIRST_DATA_ROW..row_count {
        let line = idx + 1;
        let fields = records
            .next()
            .ok_or_else(|| Error::table(line, format!("row count is {} but table ends at line {}", row_count, idx)))?;
        rows.push(reading_from_record(&fields, line)?);
    }
    Ok(Table::from_parts(preamble, row_count, rows))
}
