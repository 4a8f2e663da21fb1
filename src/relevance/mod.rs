//! Relevance scoring: which cached frameworks matter for a unit of work.
//!
//! Each cached resource earns points against a [`UnitOfWork`]:
//!
//! - **2 points** ([`TAG_MATCH_POINTS`]) when one of the story's tags lists
//!   the resource as a candidate (`ui` → `react`, `next`, `vue`, ...)
//! - **1 point** ([`KEYWORD_MATCH_POINTS`]) per keyword of the resource
//!   found as a case-insensitive substring of the story's title,
//!   description and acceptance criteria
//! - resources without a keyword list earn 1 point per *name variant*
//!   found instead: `@scope/name` contributes `scope` and `name`, an
//!   unscoped name contributes itself
//!
//! Only resources reaching the minimum score (2 by default) qualify. The
//! qualifying set is ordered by score descending, then name ascending, and
//! truncated to the caller's cap.

mod tables;

use std::collections::BTreeMap;

use crate::constants::{DEFAULT_MIN_RELEVANCE_SCORE, KEYWORD_MATCH_POINTS, TAG_MATCH_POINTS};
use crate::models::{CachedResource, UnitOfWork};

/// A scored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredResource {
    /// The resource
    pub resource: CachedResource,
    /// Points earned
    pub score: u32,
}

/// Scores cached resources against units of work.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    min_score: u32,
    tag_candidates: BTreeMap<String, Vec<String>>,
    keywords: BTreeMap<String, Vec<String>>,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RelevanceScorer {
    /// Scorer with the built-in tables and the default threshold.
    pub fn new() -> Self {
        let own = |table: &[(&str, &[&str])]| -> BTreeMap<String, Vec<String>> {
            table
                .iter()
                .map(|(key, values)| {
                    (key.to_string(), values.iter().map(|v| v.to_string()).collect())
                })
                .collect()
        };
        Self {
            min_score: DEFAULT_MIN_RELEVANCE_SCORE,
            tag_candidates: own(tables::TAG_CANDIDATES),
            keywords: own(tables::FRAMEWORK_KEYWORDS),
        }
    }

    /// Change the qualifying threshold.
    #[must_use]
    pub fn with_min_score(mut self, min_score: u32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Add (or replace) the candidate frameworks for `tag`.
    #[must_use]
    pub fn with_tag(mut self, tag: &str, candidates: &[&str]) -> Self {
        self.tag_candidates.insert(
            tag.to_lowercase(),
            candidates.iter().map(|c| c.to_lowercase()).collect(),
        );
        self
    }

    /// Add (or replace) the keyword list of `framework`.
    #[must_use]
    pub fn with_keywords(mut self, framework: &str, keywords: &[&str]) -> Self {
        self.keywords.insert(
            framework.to_lowercase(),
            keywords.iter().map(|k| k.to_lowercase()).collect(),
        );
        self
    }

    /// Current threshold.
    pub fn min_score(&self) -> u32 {
        self.min_score
    }

    /// Points `resource` earns against `story`.
    pub fn score(&self, story: &UnitOfWork, resource: &CachedResource) -> u32 {
        let name = resource.name.to_lowercase();
        let variants = name_variants(&name);
        let text = story.search_text();

        let mut score = 0;

        let tag_hit = story.tags.iter().any(|tag| {
            self.tag_candidates.get(&tag.trim().to_lowercase()).is_some_and(|candidates| {
                candidates.iter().any(|c| *c == name)
            })
        });
        if tag_hit {
            score += TAG_MATCH_POINTS;
        }

        match self.keywords_for(&name, &variants) {
            Some(keywords) => {
                let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
                score += KEYWORD_MATCH_POINTS * hits as u32;
            }
            None => {
                let hits = variants.iter().filter(|v| text.contains(v.as_str())).count();
                score += KEYWORD_MATCH_POINTS * hits as u32;
            }
        }

        score
    }

    /// Qualifying resources for `story`, best first, at most `max_results`.
    pub fn rank(
        &self,
        story: &UnitOfWork,
        resources: &[CachedResource],
        max_results: usize,
    ) -> Vec<ScoredResource> {
        let mut scored: Vec<ScoredResource> = resources
            .iter()
            .map(|resource| ScoredResource {
                score: self.score(story, resource),
                resource: resource.clone(),
            })
            .filter(|s| s.score >= self.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.resource.name.cmp(&b.resource.name))
                .then_with(|| a.resource.version.cmp(&b.resource.version))
        });
        scored.truncate(max_results);

        for s in &scored {
            tracing::debug!(target: "relevance", "{} scored {} for '{}'", s.resource.name, s.score, story.id);
        }
        scored
    }

    /// [`rank`](Self::rank) without the scores.
    pub fn select(
        &self,
        story: &UnitOfWork,
        resources: &[CachedResource],
        max_results: usize,
    ) -> Vec<CachedResource> {
        self.rank(story, resources, max_results).into_iter().map(|s| s.resource).collect()
    }

    fn keywords_for(&self, name: &str, variants: &[String]) -> Option<&Vec<String>> {
        self.keywords
            .get(name)
            .or_else(|| variants.iter().find_map(|v| self.keywords.get(v)))
    }
}

/// Feature-level selection: every cached resource, no scoring, capped.
pub fn select_all(resources: &[CachedResource], max_results: usize) -> Vec<CachedResource> {
    resources.iter().take(max_results).cloned().collect()
}

/// Lowercase name variants: `@scope/name` → `[scope, name]`, else `[name]`.
pub fn name_variants(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    match lower.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, leaf)) => [scope, leaf]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![lower],
    }
}
