//! Utility helpers shared by the fetch and compose jobs.
//!
//! - [`time`] - wire and display timestamp formats
//! - [`fs`] - atomic writes, JSON stores and content hashing

pub mod fs;
pub mod time;

pub use fs::{read_json_or_default, sha256_hex, write_atomic, write_json_pretty};
pub use time::{format_display, format_wire, parse_wire};
