//! Parasuite CLI
//!
//! Command-line interface for running YAML test suites in parallel, one
//! browser session per test.

pub mod commands;
pub mod output;
