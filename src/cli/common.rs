//! Shared plumbing for CLI commands: configuration, cache location,
//! dependency input and output formatting.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::GitSync;
use crate::config::GlobalConfig;
use crate::models::{Dependency, Ecosystem, ResolvedDependency};
use crate::registry::ResourceRegistry;
use crate::resolver::DependencyResolver;
use crate::resolvers::RegistryClient;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// Loaded configuration plus the resolved cache root.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Effective configuration
    pub config: GlobalConfig,
    /// Cache root
    pub cache_dir: PathBuf,
}

impl CommandContext {
    /// Load configuration from `config_path` (or the default location) and
    /// apply a `--cache-dir` override.
    pub async fn load(config_path: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Result<Self> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let cache_dir = match cache_dir {
            Some(dir) => dir,
            None => config.cache_dir()?,
        };
        tracing::debug!(target: "cli", "Using cache directory {}", cache_dir.display());
        Ok(Self { config, cache_dir })
    }

    /// Load the registry for this cache.
    pub fn registry(&self) -> Result<ResourceRegistry> {
        ResourceRegistry::load(&self.cache_dir)
    }

    /// Resolver configured from `[resolver]`.
    pub fn resolver(&self) -> Result<DependencyResolver> {
        let client = RegistryClient::new()?;
        let mut resolver =
            DependencyResolver::new(client).with_workers(self.config.resolver.workers);
        if self.config.resolver.lookup_tags {
            resolver = resolver.with_tag_lookup(Arc::new(GitSync));
        }
        Ok(resolver)
    }
}

/// Where dependencies come from.
#[derive(Debug, Clone, Args)]
pub struct DependencyArgs {
    /// Ecosystem: node, go, python, rust or ruby
    #[arg(short, long)]
    pub ecosystem: Ecosystem,

    /// Project root holding the lock files
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Dependency as NAME or NAME@SPECIFIER (repeatable)
    #[arg(short, long = "dep", value_name = "NAME[@SPEC]")]
    pub deps: Vec<String>,

    /// JSON file holding an array of {"name", "version", "is_dev"} objects
    #[arg(long, value_name = "FILE")]
    pub deps_file: Option<PathBuf>,
}

impl DependencyArgs {
    /// All dependencies named on the command line or in `--deps-file`.
    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        let mut deps: Vec<Dependency> = self.deps.iter().map(|d| Dependency::parse_arg(d)).collect();
        if let Some(path) = &self.deps_file {
            deps.extend(read_dependency_file(path)?);
        }
        if deps.is_empty() {
            anyhow::bail!("No dependencies given; use --dep NAME[@SPEC] or --deps-file FILE");
        }
        Ok(deps)
    }

    /// Resolve the dependencies, recording results in `registry`.
    pub async fn resolve(
        &self,
        ctx: &CommandContext,
        registry: &mut ResourceRegistry,
    ) -> Result<Vec<ResolvedDependency>> {
        let deps = self.dependencies()?;
        let resolver = ctx.resolver()?;
        Ok(resolver.resolve_all(&deps, self.ecosystem, &self.project, registry).await)
    }
}

fn read_dependency_file(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dependency file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse dependency file: {}\n\n\
            Expected a JSON array such as:\n\
            [{{\"name\": \"react\", \"version\": \"^18.2.0\"}}]",
            path.display()
        )
    })
}

/// `1536` → `1.5 KiB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
