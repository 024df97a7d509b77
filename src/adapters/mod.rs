//! File-backed implementations of the ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod text_report;
