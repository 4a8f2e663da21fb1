use std::time::{Duration, Instant};

use groundwork::constants::{GUIDANCE_END_MARKER, GUIDANCE_START_MARKER};
use groundwork::consult::{
    ConsultError, Consultant, FALLBACK_HEADING, GUIDANCE_HEADING, ProcessRunner, format_guidance_block,
};
use groundwork::relevance::RelevanceScorer;
use groundwork::test_utils::{cached_resource, init_test_logging, story};
use tempfile::TempDir;

/// Answers with cited guidance naming its working directory, except in
/// directories starting with `slow`, where it hangs with a child process.
fn script_runner() -> ProcessRunner {
    let script = format!(
        "cat > /dev/null; dir=$(basename \"$(pwd -P)\"); \
         case \"$dir\" in slow*) sleep 30 & wait;; esac; \
         echo 'thinking...'; echo '{GUIDANCE_START_MARKER}'; \
         echo \"Prefer server components in $dir.\"; echo 'Source: packages/core/index.ts'; \
         echo '{GUIDANCE_END_MARKER}'"
    );
    ProcessRunner::new("sh", vec!["-c".to_string(), script])
}

#[tokio::test]
async fn test_timeout_becomes_fallback_path() {
    init_test_logging(None);
    let temp = TempDir::new().unwrap();
    let repos = temp.path().join("repos");
    let resources = vec![cached_resource(&repos, "next", "14.1.0"), cached_resource(&repos, "slow-orm", "2.0.0")];
    let consultant = Consultant::new(script_runner().with_timeout(Duration::from_secs(1)), temp.path());

    let started = Instant::now();
    let batch = consultant.consult_all(&resources, &story("US-4", "Dashboard", &["ui"])).await;
    assert!(started.elapsed() < Duration::from_secs(15));

    assert_eq!(batch.consultations.len(), 1);
    assert_eq!(batch.consultations[0].name, "next");
    assert_eq!(
        batch.consultations[0].guidance,
        "Prefer server components in next@14.1.0.\nSource: packages/core/index.ts"
    );
    assert_eq!(batch.fallback_paths.len(), 1);
    assert_eq!(batch.fallback_paths[0].name, "slow-orm");
    assert_eq!(
        batch.fallback_paths[0].error,
        ConsultError::Timeout {
            budget: Duration::from_secs(1)
        }
    );

    let block = format_guidance_block(&batch);
    assert!(block.starts_with(GUIDANCE_HEADING));
    assert!(block.contains("### next 14.1.0"));
    assert!(block.contains(FALLBACK_HEADING));
    assert!(block.contains("- slow-orm 2.0.0:"));
    assert!(block.contains("timed out after 1s"));
}

/// Selection feeds consultation; a second consultant over the same cache
/// answers without running anything.
#[tokio::test]
async fn test_selected_frameworks_are_consulted_once() {
    let temp = TempDir::new().unwrap();
    let repos = temp.path().join("repos");
    let cached = vec![
        cached_resource(&repos, "next", "14.1.0"),
        cached_resource(&repos, "prisma", "5.10.0"),
        cached_resource(&repos, "react", "18.3.1"),
    ];
    let story = story("US-7", "Settings page", &["ui"]);
    let selected = RelevanceScorer::new().select(&story, &cached, 3);

    let first = Consultant::new(script_runner(), temp.path()).consult_all(&selected, &story).await;
    let consulted: Vec<&str> = first.consultations.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(consulted, vec!["next", "react"]);
    assert!(first.fallback_paths.is_empty());
    assert!(first.consultations.iter().all(|c| !c.cached));

    let broken = ProcessRunner::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
    let second = Consultant::new(broken, temp.path()).consult_all(&selected, &story).await;
    assert!(second.fallback_paths.is_empty());
    assert!(second.consultations.iter().all(|c| c.cached));
    assert_eq!(format_guidance_block(&first), format_guidance_block(&second));
}

#[tokio::test]
async fn test_nothing_to_consult_renders_web_search_note() {
    let temp = TempDir::new().unwrap();
    let consultant = Consultant::new(script_runner(), temp.path());
    let batch = consultant.consult_all(&[], &story("US-1", "Anything", &[])).await;

    assert!(batch.is_empty());
    let block = format_guidance_block(&batch);
    assert!(block.starts_with(GUIDANCE_HEADING));
    assert!(block.contains("web search"));
    assert!(!block.contains(FALLBACK_HEADING));
}
