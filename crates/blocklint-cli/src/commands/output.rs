//! Shared output formatting for reports and selections.

use anyhow::Result;
use blocklint::{Block, LintReport, Severity};

use crate::OutputFormat;

/// Characters of block text shown in text output.
const TEXT_PREVIEW: usize = 60;

/// Prints a lint report in the specified format.
pub fn print_report(report: &LintReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => {
            for issue in &report.issues {
                println!("{issue}");
            }
        }
    }
    Ok(())
}

fn print_text(report: &LintReport) {
    let (errors, warnings, infos) = report.count_by_severity();

    for issue in &report.issues {
        let severity_indicator = match issue.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warn => "\x1b[33mwarn\x1b[0m",
            Severity::Info => "\x1b[34minfo\x1b[0m",
        };
        let mut lines = issue.format().lines().map(str::to_string).collect::<Vec<_>>();
        if let Some(second) = lines.get_mut(1) {
            *second = second.replacen(&issue.severity.to_string(), severity_indicator, 1);
        }
        println!("{}", lines.join("\n"));
        println!();
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} block(s)\x1b[0m",
        summary_color, errors, warnings, infos, report.blocks_checked
    );
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Prints selected blocks in the specified format.
pub fn print_blocks(blocks: &[&Block], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => return print_json(&blocks),
        OutputFormat::Text => {
            for block in blocks {
                println!(
                    "{:>4}  {:<9} {}",
                    block.index(),
                    block.kind().to_string(),
                    labels(block)
                );
                println!("      {}", preview(&block.text()));
            }
            println!("{} block(s) matched", blocks.len());
        }
        OutputFormat::Compact => {
            for block in blocks {
                println!("{}", block.index());
            }
        }
    }
    Ok(())
}

fn labels(block: &Block) -> String {
    block
        .labels()
        .into_iter()
        .map(|l| format!(".{l}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn preview(text: &str) -> String {
    let line = text.trim().replace('\n', " ");
    if line.chars().count() > TEXT_PREVIEW {
        let cut: String = line.chars().take(TEXT_PREVIEW).collect();
        format!("{cut}...")
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_by_characters() {
        assert_eq!(preview("  摘要\n"), "摘要");
        let long = "字".repeat(TEXT_PREVIEW + 5);
        assert_eq!(preview(&long).chars().count(), TEXT_PREVIEW + 3);
    }
}
