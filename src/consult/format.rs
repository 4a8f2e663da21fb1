//! Markdown rendering of a consultation batch for prompt assembly.

use std::fmt::Write as _;

use crate::models::ConsultationBatch;

/// Heading of the successful-guidance section.
pub const GUIDANCE_HEADING: &str = "## Framework Guidance";

/// Heading of the manual-inspection section.
pub const FALLBACK_HEADING: &str = "## Framework Sources (consult manually)";

const NO_CONSULTATION_NOTE: &str = "No framework source code was consulted for this task. \
Before relying on any framework API, verify it against the current official documentation \
(use web search) for the version this project depends on.";

/// Render `batch` as the guidance block handed to the coding agent.
pub fn format_guidance_block(batch: &ConsultationBatch) -> String {
    let mut out = String::new();

    if batch.is_empty() {
        let _ = write!(out, "{GUIDANCE_HEADING}\n\n{NO_CONSULTATION_NOTE}\n");
        return out;
    }

    if !batch.consultations.is_empty() {
        out.push_str(GUIDANCE_HEADING);
        out.push('\n');
        for c in &batch.consultations {
            let _ = write!(out, "\n### {} {}\n\n{}\n", c.name, c.version, c.guidance.trim());
        }
    }

    if !batch.fallback_paths.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(FALLBACK_HEADING);
        out.push_str("\n\nGuidance could not be produced for these frameworks. Read their source directly:\n\n");
        for f in &batch.fallback_paths {
            let _ = writeln!(out, "- {} {}: `{}` ({})", f.name, f.version, f.path.display(), f.error);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consult::ConsultError;
    use crate::models::{FallbackPath, ResourceConsultation};
    use std::path::PathBuf;
    use std::time::Duration;

    fn success(name: &str) -> ResourceConsultation {
        ResourceConsultation {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            guidance: format!("  Use {name} hooks.\nsource: src/index.ts  "),
            duration: Duration::from_secs(3),
            cached: false,
            error: None,
        }
    }

    #[test]
    fn test_empty_batch_falls_back_to_web_search() {
        let block = format_guidance_block(&ConsultationBatch::default());
        assert!(block.starts_with(GUIDANCE_HEADING));
        assert!(block.contains("web search"));
        assert!(!block.contains(FALLBACK_HEADING));
    }

    #[test]
    fn test_sections() {
        let batch = ConsultationBatch {
            consultations: vec![success("next"), success("react")],
            fallback_paths: vec![FallbackPath {
                name: "prisma".to_string(),
                version: "5.10.0".to_string(),
                path: PathBuf::from("/cache/repos/prisma@5.10.0"),
                error: ConsultError::Timeout {
                    budget: Duration::from_secs(120),
                },
            }],
        };
        let block = format_guidance_block(&batch);

        let next = block.find("### next 1.0.0").unwrap();
        let react = block.find("### react 1.0.0").unwrap();
        let fallback = block.find(FALLBACK_HEADING).unwrap();
        assert!(next < react && react < fallback);
        assert!(block.contains("Use react hooks.\nsource: src/index.ts\n"));
        assert!(block.contains("- prisma 5.10.0: `/cache/repos/prisma@5.10.0` (consultation timed out after 120s)"));
        assert!(!block.contains("web search"));
    }

    #[test]
    fn test_only_fallbacks() {
        let batch = ConsultationBatch {
            consultations: Vec::new(),
            fallback_paths: vec![FallbackPath {
                name: "vue".to_string(),
                version: "3.4.0".to_string(),
                path: PathBuf::from("/c/vue"),
                error: ConsultError::NoCitation,
            }],
        };
        let block = format_guidance_block(&batch);
        assert!(block.starts_with(FALLBACK_HEADING));
        assert!(!block.contains(GUIDANCE_HEADING));
    }
}
