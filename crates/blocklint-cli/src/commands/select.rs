//! Select command implementation.

use anyhow::{Context, Result};
use blocklint::declarative::load_classifiers;
use blocklint::walker::{JsonWalker, Walker};
use blocklint::{Classifier, Query, Selector};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Runs the select command.
///
/// Only the classifiers of the configuration are used, so a file whose
/// rules do not build can still be queried.
pub fn run(
    blocks_path: &Path,
    query: &str,
    format: OutputFormat,
    source: &ConfigSource,
) -> Result<()> {
    let query = Query::parse(query).with_context(|| format!("Invalid selector `{query}`"))?;
    let config = source.load()?;
    let classifier = Classifier::new(
        load_classifiers(&config.classifiers).context("Invalid classifier configuration")?,
    );

    let mut blocks = JsonWalker::from_path(blocks_path)
        .blocks()
        .with_context(|| format!("Failed to read blocks from {}", blocks_path.display()))?;
    classifier.classify(&mut blocks);

    let selector = Selector::new(&blocks);
    let found = selector.query(&query);
    tracing::debug!("Selector {} matched {} blocks", query.as_str(), found.len());

    super::output::print_blocks(&found, format)
}
