//! Test Helper Utilities
//!
//! Shared utilities for testing mpcp-etl

// Each test binary uses a subset of the helpers
#![allow(dead_code)]

pub mod db_utils;
pub mod fixtures;
pub mod log_capture;

// Re-export commonly used items
pub use db_utils::{get_table_columns, has_column, temp_gateway, FailingGateway};
pub use fixtures::{
    field_image, flat_frame, geometry_csv_rows, MeasurementFolder, SCENARIO_A_FOLDER,
    SCENARIO_B_FOLDER,
};
pub use log_capture::{init_test_logging, LogCapture};
