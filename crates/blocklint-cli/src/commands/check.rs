//! Check command implementation.

use anyhow::{Context, Result};
use blocklint::walker::{JsonWalker, Walker};
use blocklint::{LintReport, Linter};
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Runs the check command.
pub fn run(
    blocks_path: &Path,
    format: OutputFormat,
    codes_filter: Option<&str>,
    source: &ConfigSource,
) -> Result<()> {
    if let ConfigSource::Global(p) = source {
        tracing::info!("Using global config: {}", p.display());
    }
    let config = source.load()?;
    let linter = match Linter::from_config(&config) {
        Ok(linter) => linter,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(2);
        }
    };

    let mut blocks = JsonWalker::from_path(blocks_path)
        .blocks()
        .with_context(|| format!("Failed to read blocks from {}", blocks_path.display()))?;

    tracing::info!(
        "Checking {} blocks in {} mode with {} rules",
        blocks.len(),
        linter.mode(),
        linter.rule_count()
    );

    let mut report = linter.run(&mut blocks);
    if let Some(filter) = codes_filter {
        retain_codes(&mut report, filter, &linter);
    }

    super::output::print_report(&report, format)?;

    if linter.fails(&report) {
        std::process::exit(1);
    }

    Ok(())
}

/// Keeps issues whose code is listed in the comma-separated `filter`.
fn retain_codes(report: &mut LintReport, filter: &str, linter: &Linter) {
    let codes: Vec<&str> = filter
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    let known = linter.rule_ids();
    if !known.is_empty() {
        for code in codes.iter().filter(|c| !known.contains(c)) {
            tracing::warn!("Unknown rule id: {}", code);
        }
    }

    report.issues.retain(|i| codes.contains(&i.code.as_str()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint::{Config, Issue, Location, Severity};

    fn report(codes: &[&str]) -> LintReport {
        LintReport {
            issues: codes
                .iter()
                .map(|c| Issue::new(*c, Severity::Warn, "x", Location::document("")))
                .collect(),
            blocks_checked: 1,
        }
    }

    #[test]
    fn filter_keeps_listed_codes() {
        let linter = Linter::from_config(&Config::default()).unwrap();
        let mut report = report(&["HDG_SEQ", "REF_CIT", "HDG_SEQ"]);
        retain_codes(&mut report, "HDG_SEQ, ,FONT-001", &linter);
        let codes: Vec<&str> = report.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, ["HDG_SEQ", "HDG_SEQ"]);
    }
}
