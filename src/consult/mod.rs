//! Consultation orchestration.
//!
//! A consultation asks an external reasoning process to read one cached
//! framework checkout and write guidance for one unit of work. Each
//! consultation moves through
//!
//! ```text
//! Pending → Running → Succeeded
//!                   → Failed(Timeout | NoMarkers | NoCitation | ProcessError)
//! ```
//!
//! and is short-circuited by the [`GuidanceCache`] when the same story,
//! framework and commit were consulted before. [`Consultant::consult_all`]
//! runs one consultation per resource concurrently and partitions the
//! outcomes into guidance and fallback paths; no single failure aborts the
//! batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use groundwork::consult::{Consultant, ProcessRunner, format_guidance_block};
//! use groundwork::models::{CachedResource, UnitOfWork};
//! use std::path::Path;
//!
//! # async fn example(resources: Vec<CachedResource>, story: UnitOfWork) {
//! let runner = ProcessRunner::new("claude", vec!["-p".to_string()]);
//! let consultant = Consultant::new(runner, Path::new("/tmp/groundwork-cache"));
//! let batch = consultant.consult_all(&resources, &story).await;
//! println!("{}", format_guidance_block(&batch));
//! # }
//! ```

mod cache;
mod extract;
mod format;
mod runner;

pub use cache::GuidanceCache;
pub use extract::{GuidanceScanner, extract_guidance};
pub use format::{FALLBACK_HEADING, GUIDANCE_HEADING, format_guidance_block};
pub use runner::{ProcessRunner, PromptDelivery};

use futures::future::join_all;
use std::path::Path;
use std::time::{Duration, Instant};
use tera::Context as TeraContext;
use thiserror::Error;

use crate::constants::{
    CITATION_TOKEN, DEFAULT_GUIDANCE_MAX_WORDS, DEFAULT_GUIDANCE_MIN_WORDS, GUIDANCE_END_MARKER,
    GUIDANCE_START_MARKER,
};
use crate::models::{
    CachedResource, ConsultationBatch, FallbackPath, ResourceConsultation, UnitOfWork,
};
use crate::templating::{CONSULTATION_TEMPLATE, PromptAssets};

/// `120s` for whole seconds, `1500ms` otherwise.
fn format_budget(budget: &Duration) -> String {
    if budget.subsec_nanos() == 0 {
        format!("{}s", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}

/// Why a consultation produced no guidance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsultError {
    /// The process exceeded its wall-clock budget and was killed
    #[error("consultation timed out after {}", format_budget(.budget))]
    Timeout {
        /// The budget that was exceeded
        budget: Duration,
    },

    /// No complete start/end marker bracket on either output stream
    #[error("no guidance markers in output")]
    NoMarkers,

    /// Guidance present but without a `source:` citation
    #[error("guidance cites no source")]
    NoCitation,

    /// Spawn, pipe or prompt failure
    #[error("consultation process failed: {0}")]
    ProcessError(String),
}

/// Runs consultations for cached resources.
#[derive(Debug, Clone)]
pub struct Consultant {
    runner: ProcessRunner,
    cache: GuidanceCache,
    assets: PromptAssets,
    min_words: u32,
    max_words: u32,
}

impl Consultant {
    /// Consultant caching guidance under `cache_dir`, with built-in prompts.
    pub fn new(runner: ProcessRunner, cache_dir: &Path) -> Self {
        Self {
            runner,
            cache: GuidanceCache::new(cache_dir),
            assets: PromptAssets::builtin(),
            min_words: DEFAULT_GUIDANCE_MIN_WORDS,
            max_words: DEFAULT_GUIDANCE_MAX_WORDS,
        }
    }

    /// Use `assets` for prompt rendering.
    #[must_use]
    pub fn with_assets(mut self, assets: PromptAssets) -> Self {
        self.assets = assets;
        self
    }

    /// Requested guidance length in words.
    #[must_use]
    pub fn with_word_range(mut self, min_words: u32, max_words: u32) -> Self {
        self.min_words = min_words.min(max_words);
        self.max_words = max_words.max(min_words);
        self
    }

    /// The guidance cache.
    pub fn cache(&self) -> &GuidanceCache {
        &self.cache
    }

    /// Consult `resource` about `story`.
    pub async fn consult(
        &self,
        resource: &CachedResource,
        story: &UnitOfWork,
    ) -> Result<ResourceConsultation, ConsultError> {
        let key = GuidanceCache::key(story, &resource.name, &resource.commit);
        if let Some(guidance) = self.cache.get(&key) {
            tracing::debug!(target: "consult", "Cached guidance for {} ({})", resource.name, &key[..12]);
            return Ok(ResourceConsultation {
                name: resource.name.clone(),
                version: resource.version.clone(),
                guidance,
                duration: Duration::ZERO,
                cached: true,
                error: None,
            });
        }

        let prompt = self.prompt(resource, story)?;
        let start = Instant::now();
        tracing::info!(target: "consult", "Consulting {} {} for '{}'", resource.name, resource.version, story.id);

        let guidance = self.runner.run(&prompt, &resource.path).await?;
        let duration = start.elapsed();

        if let Err(e) = self.cache.put(&key, &guidance) {
            tracing::warn!(target: "consult", "Could not cache guidance for {}: {:#}", resource.name, e);
        }
        tracing::info!(target: "consult", "Guidance for {} ready in {:.1}s", resource.name, duration.as_secs_f64());

        Ok(ResourceConsultation {
            name: resource.name.clone(),
            version: resource.version.clone(),
            guidance,
            duration,
            cached: false,
            error: None,
        })
    }

    /// Consult every resource concurrently and partition the outcomes.
    pub async fn consult_all(
        &self,
        resources: &[CachedResource],
        story: &UnitOfWork,
    ) -> ConsultationBatch {
        let outcomes = join_all(resources.iter().map(|resource| async move {
            (resource, self.consult(resource, story).await)
        }))
        .await;

        let mut batch = ConsultationBatch::default();
        for (resource, outcome) in outcomes {
            match outcome {
                Ok(consultation) => batch.consultations.push(consultation),
                Err(error) => {
                    tracing::warn!(target: "consult", "Consultation of {} failed: {}", resource.name, error);
                    batch.fallback_paths.push(FallbackPath {
                        name: resource.name.clone(),
                        version: resource.version.clone(),
                        path: resource.path.clone(),
                        error,
                    });
                }
            }
        }

        batch.consultations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        batch.fallback_paths.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        batch
    }

    fn prompt(&self, resource: &CachedResource, story: &UnitOfWork) -> Result<String, ConsultError> {
        let mut ctx = TeraContext::new();
        ctx.insert("framework", &resource.name);
        ctx.insert("version", &resource.version);
        ctx.insert("path", &resource.path.display().to_string());
        ctx.insert("url", &resource.url);
        ctx.insert("title", &story.title);
        ctx.insert("description", &story.description);
        ctx.insert("acceptance_criteria", &story.acceptance_criteria);
        ctx.insert("tags", &story.tags);
        ctx.insert("min_words", &self.min_words);
        ctx.insert("max_words", &self.max_words);
        ctx.insert("citation", CITATION_TOKEN);
        ctx.insert("start_marker", GUIDANCE_START_MARKER);
        ctx.insert("end_marker", GUIDANCE_END_MARKER);

        self.assets
            .render(CONSULTATION_TEMPLATE, &ctx)
            .map_err(|e| ConsultError::ProcessError(e.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resource(temp: &TempDir, name: &str) -> CachedResource {
        let path = temp.path().join("repos").join(format!("{name}@1.0.0"));
        std::fs::create_dir_all(&path).unwrap();
        CachedResource {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            path,
            url: format!("https://github.com/example/{name}"),
            ref_name: Some("v1.0.0".to_string()),
            commit: "0123456789abcdef".to_string(),
        }
    }

    fn story() -> UnitOfWork {
        UnitOfWork {
            id: "US-1".to_string(),
            title: "Profile page".to_string(),
            description: "Show the avatar".to_string(),
            ..Default::default()
        }
    }

    /// Emits guidance naming the working directory; fails in directories
    /// whose name starts with `bad`.
    fn runner(counter: &Path) -> ProcessRunner {
        let script = format!(
            "cat > /dev/null; echo run >> {}; dir=$(basename \"$(pwd -P)\"); case \"$dir\" in bad*) echo oops; exit 1;; esac; \
             echo '{GUIDANCE_START_MARKER}'; echo \"Guidance for $dir\"; echo 'source: README.md'; echo '{GUIDANCE_END_MARKER}'",
            counter.display()
        );
        ProcessRunner::new("sh", vec!["-c".to_string(), script])
    }

    fn runs(counter: &Path) -> usize {
        std::fs::read_to_string(counter).map(|s| s.lines().count()).unwrap_or(0)
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_budgets() {
        let timeout = |budget| ConsultError::Timeout { budget }.to_string();
        assert_eq!(timeout(Duration::from_secs(120)), "consultation timed out after 120s");
        assert_eq!(timeout(Duration::from_millis(500)), "consultation timed out after 500ms");
        assert_eq!(timeout(Duration::from_millis(1500)), "consultation timed out after 1500ms");
    }

    #[tokio::test]
    async fn test_consult_caches_guidance() {
        let temp = TempDir::new().unwrap();
        let counter = temp.path().join("runs.log");
        let consultant = Consultant::new(runner(&counter), &temp.path().join("cache"));
        let react = resource(&temp, "react");

        let first = consultant.consult(&react, &story()).await.unwrap();
        assert_eq!(first.guidance, "Guidance for react@1.0.0\nsource: README.md");
        assert!(!first.cached);
        assert_eq!(runs(&counter), 1);

        let second = consultant.consult(&react, &story()).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.guidance, first.guidance);
        assert_eq!(second.duration, Duration::ZERO);
        assert_eq!(runs(&counter), 1);

        // a new commit invalidates the entry
        let mut moved = react.clone();
        moved.commit = "fedcba9876543210".to_string();
        assert!(!consultant.consult(&moved, &story()).await.unwrap().cached);
        assert_eq!(runs(&counter), 2);
    }

    #[tokio::test]
    async fn test_consult_all_partitions_and_sorts() {
        let temp = TempDir::new().unwrap();
        let counter = temp.path().join("runs.log");
        let consultant = Consultant::new(runner(&counter), &temp.path().join("cache"));
        let resources = [resource(&temp, "vue"), resource(&temp, "bad-lib"), resource(&temp, "next")];

        let batch = consultant.consult_all(&resources, &story()).await;
        let ok: Vec<&str> = batch.consultations.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(ok, vec!["next", "vue"]);
        assert_eq!(batch.fallback_paths.len(), 1);
        assert_eq!(batch.fallback_paths[0].name, "bad-lib");
        assert_eq!(batch.fallback_paths[0].error, ConsultError::NoMarkers);
        assert_eq!(batch.fallback_paths[0].path, resources[1].path);

        // failures are not cached
        assert_eq!(consultant.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_prompt_template_is_process_error() {
        let temp = TempDir::new().unwrap();
        let mut assets = PromptAssets::builtin();
        assets.insert(CONSULTATION_TEMPLATE, "{{ undefined_variable }}");
        let consultant = Consultant::new(runner(&temp.path().join("runs.log")), temp.path())
            .with_assets(assets);

        let err = consultant.consult(&resource(&temp, "react"), &story()).await.unwrap_err();
        assert!(matches!(err, ConsultError::ProcessError(_)));
    }
}
