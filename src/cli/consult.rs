//! `groundwork consult`: produce the framework guidance block for a story.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use super::common::CommandContext;
use crate::cache::ResourceManager;
use crate::consult::{Consultant, format_guidance_block};
use crate::core::GroundworkError;
use crate::models::UnitOfWork;
use crate::relevance::{RelevanceScorer, select_all};
use crate::templating::PromptAssets;

/// Consult the cached frameworks relevant to a unit of work.
#[derive(Debug, Args)]
pub struct ConsultCommand {
    /// JSON file describing the unit of work
    #[arg(short, long, value_name = "FILE")]
    story: PathBuf,

    /// Consult at most this many frameworks (defaults to max_frameworks)
    #[arg(short, long)]
    max: Option<usize>,

    /// Skip relevance scoring and consult every cached framework, up to the cap
    #[arg(long)]
    all: bool,

    /// Print the selected frameworks instead of consulting them
    #[arg(long)]
    dry_run: bool,
}

impl ConsultCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let story = read_story(&self.story)?;
        let registry = ctx.registry()?;

        let mut manager = ResourceManager::with_git(&ctx.cache_dir);
        manager.detect_from_registry(&registry);
        let cached = manager.get_cached_resources(&registry);

        let max = self.max.unwrap_or(ctx.config.max_frameworks).max(1);
        let selected = if self.all {
            select_all(&cached, max)
        } else {
            RelevanceScorer::new()
                .with_min_score(ctx.config.relevance.min_score)
                .select(&story, &cached, max)
        };
        tracing::info!(
            target: "cli",
            "{} of {} cached frameworks selected for '{}'",
            selected.len(),
            cached.len(),
            story.id
        );

        if self.dry_run {
            for resource in &selected {
                println!("{} {} {}", resource.name, resource.version, resource.path.display());
            }
            return Ok(());
        }

        let assets = match ctx.config.consult.prompts_dir()? {
            Some(dir) => PromptAssets::from_dir(&dir)?,
            None => PromptAssets::builtin(),
        };
        let consultant = Consultant::new(ctx.config.consult.runner(), &ctx.cache_dir)
            .with_assets(assets)
            .with_word_range(ctx.config.consult.min_words, ctx.config.consult.max_words);

        let batch = consultant.consult_all(&selected, &story).await;
        print!("{}", format_guidance_block(&batch));
        Ok(())
    }
}

fn read_story(path: &Path) -> Result<UnitOfWork> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read story file: {}", path.display()))?;
    let story: UnitOfWork =
        serde_json::from_str(&content).map_err(|e| GroundworkError::InvalidUnitOfWork {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    if story.id.trim().is_empty() {
        return Err(GroundworkError::InvalidUnitOfWork {
            path: path.display().to_string(),
            reason: "missing id".to_string(),
        }
        .into());
    }
    Ok(story)
}
