//! Integration test: TOML configuration through classification, selection
//! and style checking.
//!
//! Uses fixture files under `tests/fixtures/` holding an extracted thesis
//! front matter and its configuration.

use blocklint_core::declarative::{load_classifiers, load_styles};
use blocklint_core::walker::{JsonWalker, Walker};
use blocklint_core::{Block, Classifier, Config, Selector, Severity, StyleChecker};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn classified() -> (Config, Vec<Block>) {
    let config = Config::from_file(&fixture("thesis.toml")).expect("fixture config should parse");
    let mut blocks = JsonWalker::from_path(fixture("thesis.json"))
        .blocks()
        .expect("fixture blocks should load");
    let rules = load_classifiers(&config.classifiers).expect("classifiers should load");
    Classifier::new(rules).classify(&mut blocks);
    (config, blocks)
}

fn indices(found: &[&Block]) -> Vec<u32> {
    found.iter().map(|b| b.index()).collect()
}

// ── Classification ──

#[test]
fn title_is_the_first_block_only() {
    let (_, blocks) = classified();
    let titled: Vec<u32> = blocks
        .iter()
        .filter(|b| b.has_label("title"))
        .map(Block::index)
        .collect();
    assert_eq!(titled, [0]);
}

#[test]
fn relative_range_collects_reference_items() {
    let (_, blocks) = classified();
    let selector = Selector::new(&blocks);
    assert_eq!(indices(&selector.select(".reference-item")), [8, 9, 10]);
    let last = selector.select(".reference-item:last");
    assert_eq!(indices(&last), [10]);
    assert!(last[0].text().starts_with("[3]"));
}

#[test]
fn range_excludes_its_anchors() {
    let (_, blocks) = classified();
    let selector = Selector::new(&blocks);
    assert_eq!(indices(&selector.select(".chapter")), [4, 5, 6]);
    assert_eq!(selector.count(".chapter [type=\"table\"]"), 1);
}

#[test]
fn classification_is_idempotent() {
    let (config, mut blocks) = classified();
    let before: Vec<Vec<String>> = blocks.iter().map(|b| b.labels().clone().into()).collect();
    let rules = load_classifiers(&config.classifiers).expect("classifiers should load");
    Classifier::new(rules).classify(&mut blocks);
    let after: Vec<Vec<String>> = blocks.iter().map(|b| b.labels().clone().into()).collect();
    assert_eq!(before, after);
}

// ── Selection ──

#[test]
fn adjacent_heading_and_body() {
    let (_, blocks) = classified();
    let selector = Selector::new(&blocks);
    assert_eq!(indices(&selector.select(".heading-intro + .body-intro")), [2]);
    assert!(selector.exists(".body-intro + .keywords"));
    assert!(!selector.exists(".title + .keywords"));
}

// ── Style checking ──

#[test]
fn style_checker_reports_title_font() {
    let (config, blocks) = classified();
    let checker = StyleChecker::new(load_styles(&config.styles).expect("styles should load"));
    let issues = checker.check(&blocks);

    let codes: Vec<&str> = issues.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, ["STYLE-FONT-NAME-TITLE"]);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(issues[0].location.block_index, 0);
    assert_eq!(
        issues[0].evidence_value("actual").and_then(|v| v.as_str()),
        Some("宋体")
    );
}
