pub mod error_report;
pub mod file_utils;
pub mod logging_setup;
pub mod timestamp_utils;
