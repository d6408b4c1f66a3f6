pub mod connection;
pub mod reports;
pub mod runs;
pub mod schema;
pub mod store;

pub use connection::Database;
pub use store::{MemoryReportStore, ReportKey, ReportStore, StoredReport};
