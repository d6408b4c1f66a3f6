pub mod export;
pub mod formatter;

pub use export::{atomic_write, export_report, PersistedReport};
pub use formatter::{format_report_markdown, format_report_terminal};
