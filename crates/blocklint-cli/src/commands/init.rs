//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# blocklint configuration

# Severity at or above which `blocklint check` exits with status 1.
fail_on = "error"

[engine]
# "auto" checks [styles] when present and runs [[rules]] otherwise.
mode = "auto"

# Classifiers assign labels in declaration order; later rules can anchor on
# labels assigned by earlier ones.

[[classifiers]]
class = "title"
match = { type = "paragraph", position = 0 }

[[classifiers]]
class = "heading-intro"
match = { pattern = '摘\s*要$' }

[[classifiers]]
class = "body-intro"
match = { type = "paragraph", after = { class = "heading-intro" } }

[[classifiers]]
class = "references-heading"
match = { pattern = '参考文献$' }

[[classifiers]]
class = "reference-item"
match = { type = "paragraph", position = { type = "relative", index = "(references-heading, -1]" } }

# Styles are keyed by class selector.

[styles.".title"]
font = { name_eastasia = "黑体", size = "二号", bold = true }
paragraph = { alignment = "居中" }

[styles.".body-intro"]
font = { name_eastasia = "宋体", size = "小四" }
paragraph = { line_spacing = "1.5倍", first_line_indent = "2字符" }

# Rule mode: set `mode = "rules"` above, then add rule instances
# (see `blocklint list-rules`) or a [document] description.
#
# [[rules]]
# type = "heading-numbering"
# id = "HDG-001"
#
# [[rules]]
# type = "selector-check"
# id = "REF-001"
# selector = ".reference-item"
# check = { count = ">= 1" }
# message = "The reference list is empty"
#
# [document.references]
# heading = "参考文献"

# Per-code overrides.
# [overrides.STYLE-FONT-BOLD-TITLE]
# enabled = false
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("blocklint.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created blocklint.toml");
    println!("\nNext steps:");
    println!("  1. Edit blocklint.toml to describe your document");
    println!("  2. Run: blocklint select blocks.json '.title'");
    println!("  3. Run: blocklint check blocks.json");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint::{Config, Linter, Mode};

    #[test]
    fn default_config_builds_a_class_style_linter() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.classifiers.len(), 5);
        let linter = Linter::from_config(&config).unwrap();
        assert_eq!(linter.mode(), Mode::ClassStyle);
        assert_eq!(linter.rule_count(), 2);
    }
}
