pub mod export;

pub use export::{export_ratio_csv, export_trace_csv, write_ratio_csv, write_trace_csv};
