pub mod batch;
pub mod row;

// Convenience re-exports for callers.
pub use batch::{decode_batch, decode_single, encode_batch, now_stamp, split_customer};
pub use row::{encode_record, parse_records, reading_from_record, reading_to_record};
