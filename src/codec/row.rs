// Row codec for the persisted table.
// One record per line, comma separated, numbers in decimal. A field is
// enclosed in double quotes when it contains a comma, quote, backslash,
// space, tab, CR or LF, and embedded quotes are doubled. This is the dialect
// the legacy dashboard files were written in, so tables stay byte-compatible.

use crate::error::{Error, Result};
use crate::storage::table::SensorReading;

pub const DELIMITER: char = ',';
pub const ENCLOSURE: char = '"';

/// Number of fields in a data row.
pub const DATA_FIELDS: usize = 8;

fn needs_enclosure(field: &str) -> bool {
    field
        .chars()
        .any(|c| matches!(c, ',' | '"' | '\\' | ' ' | '\t' | '\r' | '\n'))
}

/// Encode one record, trailing newline included.
pub fn encode_record<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        let field = field.as_ref();
        if needs_enclosure(field) {
            line.push(ENCLOSURE);
            for c in field.chars() {
                if c == ENCLOSURE {
                    line.push(ENCLOSURE);
                }
                line.push(c);
            }
            line.push(ENCLOSURE);
        } else {
            line.push_str(field);
        }
    }
    line.push('\n');
    line
}

/// Split a whole file into records. Quoted fields may span lines; CRLF is
/// accepted as a line ending.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut pending = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == ENCLOSURE {
                if chars.peek() == Some(&ENCLOSURE) {
                    chars.next();
                    field.push(ENCLOSURE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            ENCLOSURE if field.is_empty() => {
                in_quotes = true;
                pending = true;
            }
            DELIMITER => {
                record.push(std::mem::take(&mut field));
                pending = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                pending = false;
            }
            _ => {
                field.push(c);
                pending = true;
            }
        }
    }
    if pending {
        record.push(field);
        records.push(record);
    }
    records
}

pub fn reading_to_record(r: &SensorReading) -> [String; DATA_FIELDS] {
    [
        r.customer_id.to_string(),
        r.device_id.to_string(),
        r.temperature_raw.to_string(),
        r.voltage_raw.to_string(),
        r.total_packets.to_string(),
        r.ok_packets.to_string(),
        r.signal_raw.to_string(),
        r.timestamp.clone(),
    ]
}

fn number<T: std::str::FromStr>(fields: &[String], idx: usize, name: &str, line: usize) -> Result<T> {
    fields[idx]
        .trim()
        .parse()
        .map_err(|_| Error::table(line, format!("{} is not a number: {:?}", name, fields[idx])))
}

/// Parse a data row. `line` is the 1-based line number used in errors.
pub fn reading_from_record(fields: &[String], line: usize) -> Result<SensorReading> {
    if fields.len() != DATA_FIELDS {
        return Err(Error::table(
            line,
            format!("expected {} fields, found {}", DATA_FIELDS, fields.len()),
        ));
    }
    Ok(SensorReading {
        customer_id: number(fields, 0, "customer id", line)?,
        device_id: number(fields, 1, "device id", line)?,
        temperature_raw: number(fields, 2, "temperature", line)?,
        voltage_raw: number(fields, 3, "voltage", line)?,
        total_packets: number(fields, 4, "total packets", line)?,
        ok_packets: number(fields, 5, "ok packets", line)?,
        signal_raw: number(fields, 6, "signal", line)?,
        timestamp: fields[7].clone(),
    })
}
