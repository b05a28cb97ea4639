//! `issue_threads` - mirror labeled tracker issues and render thread documents
//!
//! This crate provides the core functionality for the `ithreads` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Flag/environment validation into per-job settings
//! - [`github`] - Issue source trait, HTTP client and in-memory mock
//! - [`sync`] - Incremental fetch and the watermark store
//! - [`compose`] - Change detection and thread rendering
//! - [`model`] - Issue and comment records
//! - [`error`] - Error types and handling
//! - [`util`] - Atomic writes, hashing and timestamp formats

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod model;
pub mod sync;
pub mod util;

pub use error::{Result, ThreadsError};
