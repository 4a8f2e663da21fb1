//! Command-line interface for groundwork.
//!
//! The binary is a thin surface over the library, mainly for inspecting
//! what the pipeline does on a real project:
//!
//! - `resolve`: map dependencies to source repositories
//! - `sync`: resolve, then create or refresh the source checkouts
//! - `consult`: pick the relevant cached frameworks for a story and print
//!   the guidance block
//! - `cache status | prune | clean`: inspect and maintain the cache
//!
//! # Examples
//!
//! ```bash
//! groundwork resolve -e node -p . --dep react@^18.2.0 --dep next
//! groundwork sync -e go --deps-file deps.json
//! groundwork consult --story story.json --max 2
//! groundwork cache status --format json
//! ```
//!
//! # Global options
//!
//! - `--verbose` / `--quiet`: log level (`RUST_LOG` wins when set)
//! - `--config <FILE>`: configuration file (default `~/.groundwork/config.toml`)
//! - `--cache-dir <DIR>`: cache root, overriding the configuration

mod cache;
pub mod common;
mod consult;
mod resolve;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use common::CommandContext;

/// Framework source grounding for coding agents.
#[derive(Debug, Parser)]
#[command(
    name = "groundwork",
    about = "Resolve, cache and consult the source of the frameworks a project depends on",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache directory (overrides the configuration)
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve dependencies to source repositories
    Resolve(resolve::ResolveCommand),

    /// Resolve dependencies and sync their checkouts
    Sync(sync::SyncCommand),

    /// Consult the cached frameworks relevant to a story
    Consult(consult::ConsultCommand),

    /// Inspect and maintain the cache
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Default log directive implied by `--verbose` / `--quiet`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let ctx = CommandContext::load(self.config, self.cache_dir).await?;
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&ctx).await,
            Commands::Sync(cmd) => cmd.execute(&ctx).await,
            Commands::Consult(cmd) => cmd.execute(&ctx).await,
            Commands::Cache(cmd) => cmd.execute(&ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ecosystem;

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::try_parse_from([
            "groundwork", "resolve", "-e", "npm", "--dep", "react@^18", "--dep", "next", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), "warn");
        match cli.command {
            Commands::Resolve(_) => {}
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_ecosystem_rejected() {
        assert!(Cli::try_parse_from(["groundwork", "sync", "-e", "cobol", "--dep", "x"]).is_err());
        assert_eq!("golang".parse::<Ecosystem>().unwrap(), Ecosystem::Go);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["groundwork", "cache", "status", "--verbose", "--cache-dir", "/tmp/gw"])
            .unwrap();
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/gw")));

        assert!(Cli::try_parse_from(["groundwork", "cache", "prune", "-v", "-q"]).is_err());
    }
}
