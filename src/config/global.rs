//! User-wide groundwork configuration (`~/.groundwork/config.toml`).
//!
//! Every field has a default, so an absent file, an empty file and a file
//! setting a single key are all valid:
//!
//! ```toml
//! cache_dir = "~/.cache/groundwork"
//! max_frameworks = 3
//!
//! [resolver]
//! workers = 5
//! lookup_tags = true
//!
//! [relevance]
//! min_score = 2
//!
//! [consult]
//! command = "claude"
//! args = ["-p"]
//! prompt_via = "stdin"   # or "argument"
//! timeout_secs = 120
//! min_words = 200
//! max_words = 400
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::consult::{ProcessRunner, PromptDelivery};
use crate::constants::{
    DEFAULT_CONSULT_TIMEOUT_SECS, DEFAULT_GUIDANCE_MAX_WORDS, DEFAULT_GUIDANCE_MIN_WORDS,
    DEFAULT_MAX_FRAMEWORKS, DEFAULT_MIN_RELEVANCE_SCORE, DEFAULT_RESOLVER_WORKERS,
};
use crate::core::GroundworkError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Cache root; `~` and `$VARS` are expanded. Defaults to
    /// `~/.groundwork/cache`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    /// Upper bound on frameworks consulted per unit of work.
    pub max_frameworks: usize,

    /// Dependency resolution settings.
    pub resolver: ResolverConfig,

    /// Relevance scoring settings.
    pub relevance: RelevanceConfig,

    /// Consultation subprocess settings.
    pub consult: ConsultConfig,
}

/// `[resolver]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Width of the lookup pool
    pub workers: usize,
    /// Look up the git tag matching each pinned version
    pub lookup_tags: bool,
}

/// `[relevance]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Points a resource needs to qualify
    pub min_score: u32,
}

/// `[consult]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsultConfig {
    /// Program invoked per consultation
    pub command: String,
    /// Arguments placed before the prompt
    pub args: Vec<String>,
    /// Prompt on stdin or as the last argument
    pub prompt_via: PromptDelivery,
    /// Wall-clock budget per consultation
    pub timeout_secs: u64,
    /// Requested guidance length, lower bound
    pub min_words: u32,
    /// Requested guidance length, upper bound
    pub max_words: u32,
    /// Directory of `*.tera` prompt overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_frameworks: DEFAULT_MAX_FRAMEWORKS,
            resolver: ResolverConfig::default(),
            relevance: RelevanceConfig::default(),
            consult: ConsultConfig::default(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_RESOLVER_WORKERS,
            lookup_tags: true,
        }
    }
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_RELEVANCE_SCORE,
        }
    }
}

impl Default for ConsultConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec!["-p".to_string()],
            prompt_via: PromptDelivery::Stdin,
            timeout_secs: DEFAULT_CONSULT_TIMEOUT_SECS,
            min_words: DEFAULT_GUIDANCE_MIN_WORDS,
            max_words: DEFAULT_GUIDANCE_MAX_WORDS,
            prompts_dir: None,
        }
    }
}

impl ConsultConfig {
    /// Runner configured from this table.
    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.command.clone(), self.args.clone())
            .with_delivery(self.prompt_via)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Expanded prompt override directory, if configured.
    pub fn prompts_dir(&self) -> Result<Option<PathBuf>> {
        self.prompts_dir.as_deref().map(expand_path).transpose()
    }
}

impl GlobalConfig {
    /// Load from the default location; a missing file yields defaults.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else from the default location.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is an
    /// error.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(target: "config", "No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| GroundworkError::ConfigError {
            message: format!("{}: {}", path.display(), e.message()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// `~/.groundwork/config.toml` (`%LOCALAPPDATA%\groundwork` on Windows).
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Resolved cache root.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => expand_path(dir),
            None => Ok(Self::base_dir()?.join("cache")),
        }
    }

    fn base_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("groundwork")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".groundwork")
        };
        Ok(dir)
    }

    fn validate(&self) -> Result<(), GroundworkError> {
        let invalid = |message: &str| GroundworkError::ConfigError {
            message: message.to_string(),
        };
        if self.max_frameworks == 0 {
            return Err(invalid("max_frameworks must be at least 1"));
        }
        if self.resolver.workers == 0 {
            return Err(invalid("resolver.workers must be at least 1"));
        }
        if self.consult.command.trim().is_empty() {
            return Err(invalid("consult.command must not be empty"));
        }
        if self.consult.timeout_secs == 0 {
            return Err(invalid("consult.timeout_secs must be at least 1"));
        }
        if self.consult.min_words > self.consult.max_words {
            return Err(invalid("consult.min_words must not exceed consult.max_words"));
        }
        Ok(())
    }
}

/// Expand `~` and environment variables in a configured path.
fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path '{raw}'"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = GlobalConfig::load_with_optional(Some(temp.path().join("nope.toml")))
            .await
            .unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.max_frameworks, 3);
        assert_eq!(config.resolver.workers, 5);
        assert_eq!(config.relevance.min_score, 2);
        assert_eq!(config.consult.timeout_secs, 120);
        assert_eq!((config.consult.min_words, config.consult.max_words), (200, 400));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "cache_dir = \"/var/tmp/gw\"\n[consult]\ncommand = \"my-agent\"\nprompt_via = \"argument\"\n",
        )
        .unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/var/tmp/gw"));
        assert_eq!(config.consult.command, "my-agent");
        assert_eq!(config.consult.prompt_via, PromptDelivery::Argument);
        assert_eq!(config.consult.args, vec!["-p"]);
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_values_are_config_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        std::fs::write(&path, "[resolver]\nworkers = 0\n").unwrap();
        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(err.to_string().contains("workers"));

        std::fs::write(&path, "max_frameworks = \"three\"\n").unwrap();
        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GroundworkError>(),
            Some(GroundworkError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = GlobalConfig::default();
        config.max_frameworks = 5;
        config.consult.timeout_secs = 30;

        config.save_to(&path).await.unwrap();
        assert_eq!(GlobalConfig::load_from(&path).await.unwrap(), config);
    }

    #[test]
    fn test_tilde_cache_dir_expands() {
        let config = GlobalConfig {
            cache_dir: Some("~/gw-cache".to_string()),
            ..Default::default()
        };
        let dir = config.cache_dir().unwrap();
        assert!(dir.is_absolute() || dirs::home_dir().is_none());
        assert!(dir.ends_with("gw-cache"));
    }

    #[test]
    fn test_runner_from_config() {
        let consult = ConsultConfig {
            timeout_secs: 7,
            ..Default::default()
        };
        assert_eq!(consult.runner().timeout(), Duration::from_secs(7));
    }
}
