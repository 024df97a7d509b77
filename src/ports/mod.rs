//! Traits at the I/O seams: where prices come from, where configuration is
//! read and where reports go.

pub mod config_port;
pub mod data_port;
pub mod report_port;
