//! groundwork - framework source grounding for coding agents
//!
//! groundwork finds out which third-party frameworks a project depends on,
//! keeps local checkouts of their *source* repositories, decides which of
//! those matter for a given unit of work, and asks an external reasoning
//! process to read that source and write citation-backed guidance. Guidance
//! is cached, so repeating a story against unchanged dependencies is free.
//!
//! # Pipeline
//!
//! ```text
//! Dependency list ──► resolver ──► cache ──► relevance ──► consult ──► guidance block
//!   (name, spec)      (exact        (local     (score vs      (subprocess,
//!                      version,      checkout)  story tags     markers,
//!                      repo URL)                and text)      citation)
//! ```
//!
//! 1. [`resolver::DependencyResolver`] pins every dependency to an exact
//!    version using the project's lock files ([`lockfile`]) and maps it to a
//!    normalized repository URL through the public registries
//!    ([`resolvers`]), with a bounded worker pool.
//! 2. [`cache::ResourceManager`] creates, refreshes or skips a shallow git
//!    checkout per `name@version` ([`git`]) and records it in the
//!    persisted [`registry::ResourceRegistry`].
//! 3. [`relevance::RelevanceScorer`] picks the cached frameworks worth
//!    consulting for a [`models::UnitOfWork`].
//! 4. [`consult::Consultant`] runs one supervised consultation per picked
//!    framework and [`consult::format_guidance_block`] renders the result.
//!
//! Failures are contained per item: a package that cannot be resolved is
//! remembered as unresolvable for a week, a checkout that fails to sync is
//! reported and skipped, and a consultation that times out or produces
//! unverifiable output becomes a fallback path for manual inspection.
//!
//! # Cache layout
//!
//! ```text
//! ~/.groundwork/cache/
//! ├── registry.json          # checkouts, URL memos, unresolvable markers
//! ├── repos/<name@version>/  # one shallow checkout per package version
//! ├── consultations/<sha256> # raw guidance text, content-addressed
//! └── .locks/<key>.lock      # per-checkout advisory locks
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use groundwork::cache::ResourceManager;
//! use groundwork::models::{Dependency, Ecosystem};
//! use groundwork::registry::ResourceRegistry;
//! use groundwork::resolver::DependencyResolver;
//! use groundwork::resolvers::RegistryClient;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache_dir = Path::new("/tmp/groundwork-cache");
//! let mut registry = ResourceRegistry::load(cache_dir)?;
//!
//! let deps = vec![Dependency::new("react", "^18.2.0"), Dependency::new("next", "14.1.0")];
//! let resolver = DependencyResolver::new(RegistryClient::new()?);
//! let resolved = resolver.resolve_all(&deps, Ecosystem::Node, Path::new("."), &mut registry).await;
//!
//! let mut manager = ResourceManager::with_git(cache_dir);
//! manager.sync_all(&resolved, &mut registry).await;
//! registry.save()?;
//!
//! for resource in manager.get_cached_resources(&registry) {
//!     println!("{} {} at {}", resource.name, resource.version, resource.path.display());
//! }
//! # Ok(())
//! # }
//! ```

// Pipeline stages
pub mod cache;
pub mod consult;
pub mod lockfile;
pub mod registry;
pub mod relevance;
pub mod resolver;
pub mod resolvers;

// Infrastructure
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod git;
pub mod models;
pub mod templating;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
