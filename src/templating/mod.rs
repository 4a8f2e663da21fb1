//! Prompt assets.
//!
//! [`PromptAssets`] is a plain mapping from template name to template text,
//! constructed once and handed to whoever renders prompts. The built-in set
//! holds the `consultation` template; a directory of `*.tera` files can
//! replace or extend it. Templates are rendered with Tera.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::core::GroundworkError;

/// Name of the per-framework consultation prompt.
pub const CONSULTATION_TEMPLATE: &str = "consultation";

const BUILTIN_CONSULTATION: &str = include_str!("consultation.tera");

/// Template name → template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAssets {
    templates: BTreeMap<String, String>,
}

impl Default for PromptAssets {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptAssets {
    /// The templates shipped with groundwork.
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(CONSULTATION_TEMPLATE.to_string(), BUILTIN_CONSULTATION.to_string());
        Self { templates }
    }

    /// Exactly the given templates.
    pub fn from_map(templates: BTreeMap<String, String>) -> Self {
        Self { templates }
    }

    /// Built-in templates overridden by every `<name>.tera` file in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut assets = Self::builtin();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read prompt directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("tera") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;
            tracing::debug!(target: "templating", "Loaded prompt template '{}' from {}", name, path.display());
            assets.templates.insert(name.to_string(), text);
        }
        Ok(assets)
    }

    /// Add or replace one template.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }

    /// Raw text of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Render `name` with `context`.
    pub fn render(&self, name: &str, context: &TeraContext) -> Result<String, GroundworkError> {
        let text = self.get(name).ok_or_else(|| GroundworkError::TemplateError {
            name: name.to_string(),
            reason: "no such template".to_string(),
        })?;

        let mut tera = Tera::default();
        tera.render_str(text, context).map_err(|e| GroundworkError::TemplateError {
            name: name.to_string(),
            reason: render_error_chain(&e),
        })
    }
}

/// Tera nests the useful message in the error source chain.
fn render_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message.replace("'__tera_one_off'", "template")
}
