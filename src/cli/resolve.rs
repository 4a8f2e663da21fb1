//! `groundwork resolve`: map dependencies to source repositories.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, DependencyArgs, OutputFormat};

/// Resolve dependencies to repository URLs without cloning anything.
#[derive(Debug, Args)]
pub struct ResolveCommand {
    #[command(flatten)]
    deps: DependencyArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl ResolveCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut registry = ctx.registry()?;
        let requested = self.deps.dependencies()?.len();
        let resolved = self.deps.resolve(ctx, &mut registry).await?;
        registry.save()?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolved)?),
            OutputFormat::Table => {
                for dep in &resolved {
                    let tag = dep.tag.as_deref().unwrap_or("(default branch)");
                    println!("{:<40} {:<12} {} {}", dep.name.bold(), dep.version, dep.repo_url, tag.dimmed());
                }
                println!(
                    "\n{} {} of {} dependencies resolved",
                    "✓".green(),
                    resolved.len(),
                    requested
                );
            }
        }
        Ok(())
    }
}
