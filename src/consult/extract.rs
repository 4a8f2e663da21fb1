//! Guidance extraction from consultation output.
//!
//! The consulted process brackets its answer with two sentinel lines:
//!
//! ```text
//! <<<GROUNDWORK_GUIDANCE_START>>>
//! ...guidance...
//! <<<GROUNDWORK_GUIDANCE_END>>>
//! ```
//!
//! Everything outside the bracket (progress chatter, tool logs) is ignored.
//! The first complete bracket wins. Guidance must cite the source it was
//! derived from with at least one `source:` token (any case).

use super::ConsultError;
use crate::constants::{CITATION_TOKEN, GUIDANCE_END_MARKER, GUIDANCE_START_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ScanState {
    #[default]
    BeforeStart,
    InGuidance,
    Done,
}

/// Incremental line scanner for one output stream.
#[derive(Debug, Clone, Default)]
pub struct GuidanceScanner {
    state: ScanState,
    lines: Vec<String>,
}

impl GuidanceScanner {
    /// Fresh scanner, waiting for the start marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator).
    pub fn push_line(&mut self, line: &str) {
        let marker = line.trim();
        match self.state {
            ScanState::BeforeStart if marker == GUIDANCE_START_MARKER => {
                self.state = ScanState::InGuidance;
            }
            ScanState::InGuidance if marker == GUIDANCE_END_MARKER => {
                self.state = ScanState::Done;
            }
            // a repeated start marker restarts the block
            ScanState::InGuidance if marker == GUIDANCE_START_MARKER => {
                self.lines.clear();
            }
            ScanState::InGuidance => self.lines.push(line.to_string()),
            _ => {}
        }
    }

    /// Whether a complete bracket has been seen.
    pub fn is_complete(&self) -> bool {
        self.state == ScanState::Done
    }

    /// The validated guidance, or why there is none.
    pub fn finish(self) -> Result<String, ConsultError> {
        if self.state != ScanState::Done {
            return Err(ConsultError::NoMarkers);
        }
        let guidance = self.lines.join("\n").trim().to_string();
        if !guidance.to_lowercase().contains(CITATION_TOKEN) {
            return Err(ConsultError::NoCitation);
        }
        Ok(guidance)
    }
}

/// Extract and validate the guidance block from complete output text.
pub fn extract_guidance(text: &str) -> Result<String, ConsultError> {
    let mut scanner = GuidanceScanner::new();
    for line in text.lines() {
        scanner.push_line(line);
        if scanner.is_complete() {
            break;
        }
    }
    scanner.finish()
}
