pub mod table;
pub mod table_store;

pub use table::{SensorReading, Table};
pub use table_store::TableStore;
