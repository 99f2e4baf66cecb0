//! Clipshelf - a personal video-library manager.
//!
//! Videos are ingested from disk, their performing artists resolved
//! from bracketed filename prefixes, and the collection browsed through
//! tag/artist/search filters from the command line.

pub mod artist;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod library;
pub mod media;
pub mod model;
pub mod mover;
pub mod scanner;
pub mod sort;
pub mod tags;
#[cfg(test)]
pub mod test_utils;
pub mod thumbs;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("clipshelf=info".parse().unwrap()))
        .init();

    if cli::run_command(&args)? {
        return Ok(());
    }

    // No command specified
    cli::Cli::command().print_help()?;
    Ok(())
}
