// Telemetry batch codec.
// Layout of the `s` parameter sent by a hub (hex digits, either case):
// - customer id: 8 digits
// - zero or more strides of 36 digits (18 bytes), one per sensor reading:
//     device id (8) | temperature (4) | voltage (4) | total packets (8) | ok packets (8) | signal (4)
// - terminator 'N'
// Values are kept exactly as received; temperature and signal are
// two's-complement on the wire and stay unsigned here.

use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;

use crate::error::{Error, Result};
use crate::storage::table::SensorReading;

pub const CUSTOMER_DIGITS: usize = 8;
pub const STRIDE: usize = 36;
pub const TERMINATOR: u8 = b'N';

/// Format the legacy dashboard expects in the timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %P";

fn hex_field(bytes: &[u8], at: usize, width: usize) -> Result<u32> {
    let mut value = 0u32;
    for (i, b) in bytes[at..at + width].iter().enumerate() {
        let digit = (*b as char)
            .to_digit(16)
            .ok_or_else(|| Error::batch(at + i, format!("non-hex character {:?}", *b as char)))?;
        value = (value << 4) | digit;
    }
    Ok(value)
}

fn read_stride(bytes: &[u8], at: usize, customer_id: u32, timestamp: &str) -> Result<SensorReading> {
    Ok(SensorReading {
        customer_id,
        device_id: hex_field(bytes, at, 8)?,
        temperature_raw: hex_field(bytes, at + 8, 4)? as u16,
        voltage_raw: hex_field(bytes, at + 12, 4)? as u16,
        total_packets: hex_field(bytes, at + 16, 8)?,
        ok_packets: hex_field(bytes, at + 24, 8)?,
        signal_raw: hex_field(bytes, at + 32, 4)? as u16,
        timestamp: timestamp.to_string(),
    })
}

/// Split the 8-digit customer id off the front of an encoded request string.
/// Returns the id and the batch body that follows it.
pub fn split_customer(input: &str) -> Result<(u32, &str)> {
    let bytes = input.as_bytes();
    if bytes.len() < CUSTOMER_DIGITS {
        return Err(Error::batch(bytes.len(), "customer id shorter than 8 digits"));
    }
    let customer_id = hex_field(bytes, 0, CUSTOMER_DIGITS)?;
    // the first 8 bytes are ASCII hex, so this is a char boundary
    Ok((customer_id, &input[CUSTOMER_DIGITS..]))
}

/// Decode strides from `body` until the terminator. Every reading is tagged
/// with `customer_id` and `timestamp`. Nothing past the terminator is read.
pub fn decode_batch(body: &str, customer_id: u32, timestamp: &str) -> Result<Vec<SensorReading>> {
    let bytes = body.as_bytes();
    let mut idx = 0usize;
    let mut out = Vec::new();
    loop {
        match bytes.get(idx) {
            Some(&TERMINATOR) => return Ok(out),
            Some(_) => {}
            None => return Err(Error::batch(idx, "missing terminator")),
        }
        if bytes.len() - idx < STRIDE {
            return Err(Error::batch(idx, "truncated stride"));
        }
        out.push(read_stride(bytes, idx, customer_id, timestamp)?);
        idx += STRIDE;
    }
}

/// Decode exactly one stride from the front of `body`. Whatever follows the
/// stride is ignored.
pub fn decode_single(body: &str, customer_id: u32, timestamp: &str) -> Result<SensorReading> {
    let bytes = body.as_bytes();
    if bytes.len() < STRIDE {
        return Err(Error::batch(bytes.len(), "truncated stride"));
    }
    read_stride(bytes, 0, customer_id, timestamp)
}

/// Encode readings the way hub firmware does, customer id prefix and
/// terminator included.
pub fn encode_batch(customer_id: u32, readings: &[SensorReading]) -> String {
    let mut out = String::with_capacity(CUSTOMER_DIGITS + readings.len() * STRIDE + 1);
    out.push_str(&format!("{:08X}", customer_id));
    for r in readings {
        out.push_str(&format!(
            "{:08X}{:04X}{:04X}{:08X}{:08X}{:04X}",
            r.device_id, r.temperature_raw, r.voltage_raw, r.total_packets, r.ok_packets, r.signal_raw
        ));
    }
    out.push(TERMINATOR as char);
    out
}

/// Render `now` in the fixed zone and format used by the table.
pub fn stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&London).format(TIMESTAMP_FORMAT).to_string()
}

/// Server-side timestamp for readings decoded right now.
pub fn now_stamp() -> String {
    stamp(Utc::now())
}
