//! `groundwork cache`: inspect and maintain the cache directory.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{CommandContext, OutputFormat, format_size};
use crate::cache::ResourceManager;
use crate::consult::GuidanceCache;
use crate::registry::RegistryStats;
use crate::utils::remove_dir_all;

/// Inspect or clean the cache.
#[derive(Debug, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    /// Show what the cache holds
    Status {
        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Drop expired URL memos and unresolvable markers
    Prune,
    /// Remove checkouts the registry does not know about
    Clean {
        /// Remove the whole cache: checkouts, registry and guidance
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Serialize)]
struct CacheStatus {
    cache_dir: PathBuf,
    #[serde(flatten)]
    registry: RegistryStats,
    consultations: usize,
}

impl CacheCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match self.action {
            CacheAction::Status { format } => status(ctx, format),
            CacheAction::Prune => prune(ctx),
            CacheAction::Clean { all } => clean(ctx, all),
        }
    }
}

fn status(ctx: &CommandContext, format: OutputFormat) -> Result<()> {
    let registry = ctx.registry()?;
    let status = CacheStatus {
        cache_dir: ctx.cache_dir.clone(),
        registry: registry.stats(),
        consultations: GuidanceCache::new(&ctx.cache_dir).len(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Table => {
            println!("{}", "Cache".bold());
            println!("  Location:       {}", status.cache_dir.display());
            println!(
                "  Checkouts:      {} ({})",
                status.registry.repos,
                format_size(status.registry.total_size)
            );
            println!("  Resolved URLs:  {}", status.registry.resolved);
            println!("  Unresolvable:   {}", status.registry.unresolvable);
            println!("  Guidance files: {}", status.consultations);

            let mut repos: Vec<_> = registry.repos().collect();
            repos.sort_by(|a, b| a.0.cmp(b.0));
            if !repos.is_empty() {
                println!();
                for (key, meta) in repos {
                    let reference = meta.tag.as_deref().unwrap_or("HEAD");
                    println!(
                        "  {:<40} {:<16} {:>10}  {}",
                        key,
                        reference,
                        format_size(meta.size),
                        meta.last_sync.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
    }
    Ok(())
}

fn prune(ctx: &CommandContext) -> Result<()> {
    let mut registry = ctx.registry()?;
    let pruned = registry.prune_expired();
    registry.save()?;
    println!(
        "{} Pruned {} expired URL memos and {} unresolvable markers",
        "✓".green(),
        pruned.resolved,
        pruned.unresolvable
    );
    Ok(())
}

fn clean(ctx: &CommandContext, all: bool) -> Result<()> {
    if all {
        remove_dir_all(&ctx.cache_dir)?;
        println!("{} Removed {}", "✓".green(), ctx.cache_dir.display());
        return Ok(());
    }

    let registry = ctx.registry()?;
    let manager = ResourceManager::with_git(&ctx.cache_dir);
    let removed = manager.clean_orphans(&registry)?;
    for path in &removed {
        println!("  removed {}", path.display());
    }
    println!("{} Removed {} orphaned checkouts", "✓".green(), removed.len());
    Ok(())
}
