//! CLI command handlers

pub mod commands;

pub use commands::{scopes, serve, validate, watch, write_report, RunOptions};
