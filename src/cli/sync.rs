//! `groundwork sync`: resolve dependencies and bring their checkouts up to date.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, DependencyArgs};
use crate::cache::{ResourceManager, SyncOutcome};

/// Resolve dependencies and create or refresh their source checkouts.
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(flatten)]
    deps: DependencyArgs,
}

impl SyncCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut registry = ctx.registry()?;
        let resolved = self.deps.resolve(ctx, &mut registry).await?;

        let mut manager = ResourceManager::with_git(&ctx.cache_dir);
        let reports = manager.sync_all(&resolved, &mut registry).await;
        registry.save()?;

        let mut failed = 0;
        for report in &reports {
            let status = match &report.outcome {
                SyncOutcome::Created => "created".green(),
                SyncOutcome::Updated => "updated".cyan(),
                SyncOutcome::Skipped => "up to date".dimmed(),
                SyncOutcome::Failed(reason) => {
                    failed += 1;
                    format!("failed: {reason}").red()
                }
            };
            println!("{:<48} {}", report.key, status);
        }

        let cached = manager.get_cached_resources(&registry);
        println!(
            "\n{} {} checkouts cached ({} failed)",
            if failed == 0 { "✓".green() } else { "!".yellow() },
            cached.len(),
            failed
        );
        Ok(())
    }
}
