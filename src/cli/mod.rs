//! Command-line interface for clipshelf.
//!
//! This module provides CLI commands for scanning, listing, tagging,
//! and maintaining the video library.

mod commands;

pub use commands::{Cli, Commands, run_command};
