use groundwork::models::{CachedResource, UnitOfWork};
use groundwork::relevance::{RelevanceScorer, select_all};
use groundwork::test_utils::{cached_resource, story};
use tempfile::TempDir;

fn names(selected: &[CachedResource]) -> Vec<&str> {
    selected.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn test_ui_story_picks_ui_frameworks() {
    let temp = TempDir::new().unwrap();
    let cached = vec![
        cached_resource(temp.path(), "next", "14.1.0"),
        cached_resource(temp.path(), "prisma", "5.10.0"),
        cached_resource(temp.path(), "react", "18.3.1"),
    ];
    let story = story("US-7", "Settings page", &["ui"]);

    let selected = RelevanceScorer::new().select(&story, &cached, 3);
    assert_eq!(names(&selected), vec!["next", "react"]);
}

#[test]
fn test_description_keywords_reach_threshold() {
    let temp = TempDir::new().unwrap();
    let cached = vec![
        cached_resource(temp.path(), "@prisma/client", "5.10.0"),
        cached_resource(temp.path(), "express", "4.19.2"),
    ];
    let story = UnitOfWork {
        id: "US-12".to_string(),
        title: "Store orders".to_string(),
        description: "Add an Order model to schema.prisma and run prisma migrate".to_string(),
        ..Default::default()
    };

    let selected = RelevanceScorer::new().select(&story, &cached, 3);
    assert_eq!(names(&selected), vec!["@prisma/client"]);
}

#[test]
fn test_nothing_relevant_selects_nothing() {
    let temp = TempDir::new().unwrap();
    let cached = vec![
        cached_resource(temp.path(), "lodash", "4.17.21"),
        cached_resource(temp.path(), "react", "18.3.1"),
    ];
    let story = story("US-9", "Rotate log files nightly", &["ops"]);

    assert!(RelevanceScorer::new().select(&story, &cached, 3).is_empty());
    // explicit opt-out of scoring still respects the cap
    assert_eq!(names(&select_all(&cached, 1)), vec!["lodash"]);
}
