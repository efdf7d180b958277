//! Lint orchestration: mode selection, classification and checking.

use blocklint_core::declarative::{load_classifiers, load_styles, LoadError};
use blocklint_core::{
    Block, Classifier, Config, ConfigError, Engine, EngineError, EngineMode, LintReport, Overrides,
    Severity, StyleChecker,
};
use blocklint_rules::{GenerateError, RuleBuildError, RuleGenerator, RuleRegistry};
use std::fmt;
use tracing::{debug, info};

/// Errors raised while turning a configuration into a [`Linter`].
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LintError {
    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// A classifier or style entry is invalid.
    #[error("{0}")]
    #[diagnostic(
        code(blocklint::load),
        help("check the `[[classifiers]]` and `[styles]` sections")
    )]
    Load(#[from] LoadError),

    /// A `[[rules]]` entry could not be built.
    #[error("{0}")]
    #[diagnostic(
        code(blocklint::rule),
        help("run `blocklint list-rules` to see the available rule types")
    )]
    Rule(#[from] RuleBuildError),

    /// The `[document]` section could not be expanded.
    #[error("{0}")]
    #[diagnostic(code(blocklint::document))]
    Generate(#[from] GenerateError),

    /// Two rules share an id.
    #[error("{0}")]
    #[diagnostic(
        code(blocklint::engine),
        help("give every `[[rules]]` entry a distinct `id`")
    )]
    Engine(#[from] EngineError),

    /// Rules are configured but the run checks styles only.
    #[error("rules configured in class-style mode")]
    #[diagnostic(
        code(blocklint::mode),
        help("set `[engine] mode = \"rules\"` or remove the `[[rules]]` and `[document]` sections")
    )]
    RulesInClassStyle,
}

/// The pipeline a [`Linter`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Classify, then check `[styles]` against the labels.
    ClassStyle,
    /// Classify when classifiers exist, then run rule instances.
    Rules,
}

impl Mode {
    /// Resolves `auto` against the configuration.
    #[must_use]
    pub fn resolve(config: &Config) -> Self {
        match config.engine.mode {
            EngineMode::ClassStyle => Self::ClassStyle,
            EngineMode::Rules => Self::Rules,
            EngineMode::Auto if config.styles.is_empty() => Self::Rules,
            EngineMode::Auto => Self::ClassStyle,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClassStyle => "class-style",
            Self::Rules => "rules",
        })
    }
}

/// Run phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Nothing has run yet.
    Idle,
    /// Labels are being assigned.
    Classifying,
    /// Styles or rules are being evaluated.
    Checking,
    /// The report is complete.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Classifying => "classifying",
            Self::Checking => "checking",
            Self::Done => "done",
        })
    }
}

enum Checker {
    Styles {
        checker: StyleChecker,
        overrides: Overrides,
    },
    Rules(Engine),
}

/// A validated configuration ready to lint any number of documents.
///
/// # Example
///
/// ```
/// use blocklint::{Block, Config, Linter, Mode, Paragraph};
///
/// let config = Config::parse(r#"
/// [[classifiers]]
/// class = "title"
/// match = { position = 0 }
///
/// [styles.".title"]
/// paragraph = { alignment = "center" }
/// "#).unwrap();
///
/// let linter = Linter::from_config(&config).unwrap();
/// assert_eq!(linter.mode(), Mode::ClassStyle);
///
/// let mut blocks = vec![Block::paragraph(0, Paragraph::new("Title"))];
/// let report = linter.run(&mut blocks);
/// assert_eq!(report.issues[0].code, "STYLE-PARA-ALIGN-TITLE");
/// ```
pub struct Linter {
    mode: Mode,
    classifier: Classifier,
    checker: Checker,
    fail_on: Severity,
}

impl Linter {
    /// Builds a linter with the built-in rule kinds.
    ///
    /// # Errors
    ///
    /// Returns [`LintError`] for any invalid classifier, style, rule or
    /// document entry, and for rules configured in class-style mode.
    pub fn from_config(config: &Config) -> Result<Self, LintError> {
        Self::with_registry(config, &RuleRegistry::with_builtins())
    }

    /// Builds a linter resolving `[[rules]]` kinds through `registry`.
    ///
    /// # Errors
    ///
    /// See [`Linter::from_config`].
    pub fn with_registry(config: &Config, registry: &RuleRegistry) -> Result<Self, LintError> {
        let mode = Mode::resolve(config);
        let classifier = Classifier::new(load_classifiers(&config.classifiers)?);

        let checker = match mode {
            Mode::ClassStyle => {
                if config.has_rules() {
                    return Err(LintError::RulesInClassStyle);
                }
                Checker::Styles {
                    checker: StyleChecker::new(load_styles(&config.styles)?),
                    overrides: Overrides::new(config.overrides.clone()),
                }
            }
            Mode::Rules => {
                let mut rules = registry.build_all(&config.rules)?;
                if let Some(document) = &config.document {
                    rules.extend(RuleGenerator::new().generate(document)?);
                }
                Checker::Rules(Engine::builder().rules(rules).config(config).build()?)
            }
        };

        let linter = Self {
            mode,
            classifier,
            checker,
            fail_on: config.fail_threshold(),
        };
        info!(
            mode = %linter.mode,
            classifiers = linter.classifier.rules().len(),
            rules = linter.rule_count(),
            "Linter ready"
        );
        Ok(linter)
    }

    /// The resolved mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of rule instances, or style definitions in class-style mode.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        match &self.checker {
            Checker::Styles { checker, .. } => checker.len(),
            Checker::Rules(engine) => engine.rule_count(),
        }
    }

    /// Rule instance ids in registration order; empty in class-style mode.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<&str> {
        match &self.checker {
            Checker::Styles { .. } => Vec::new(),
            Checker::Rules(engine) => engine.rules().map(|r| r.id()).collect(),
        }
    }

    /// Severity at or above which a report fails.
    #[must_use]
    pub fn fail_threshold(&self) -> Severity {
        self.fail_on
    }

    /// Labels `blocks` with the configured classifiers.
    pub fn classify<'b>(&self, blocks: &'b mut [Block]) -> &'b mut [Block] {
        self.classifier.classify(blocks)
    }

    /// Classifies `blocks`, then checks them.
    pub fn run(&self, blocks: &mut [Block]) -> LintReport {
        let mut phase = Phase::Idle;
        debug!(%phase, mode = %self.mode, blocks = blocks.len(), "Starting run");

        if !self.classifier.is_empty() {
            phase = Phase::Classifying;
            debug!(%phase, "Assigning labels");
            self.classify(blocks);
        }

        phase = Phase::Checking;
        debug!(%phase, "Evaluating");
        let report = match &self.checker {
            Checker::Styles { checker, overrides } => LintReport {
                issues: overrides.apply(checker.check(blocks)),
                blocks_checked: blocks.len(),
            },
            Checker::Rules(engine) => engine.run(blocks),
        };

        phase = Phase::Done;
        info!(%phase, issues = report.issues.len(), "Run complete");
        report
    }

    /// Returns true if `report` has issues at or above the fail threshold.
    #[must_use]
    pub fn fails(&self, report: &LintReport) -> bool {
        report.has_issues_at(self.fail_on)
    }
}

impl fmt::Debug for Linter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linter")
            .field("mode", &self.mode)
            .field("classifier", &self.classifier)
            .field("rules", &self.rule_count())
            .field("fail_on", &self.fail_on)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::Paragraph;

    fn linter(toml: &str) -> Result<Linter, LintError> {
        Linter::from_config(&Config::parse(toml).unwrap())
    }

    fn headings(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .zip(0u32..)
            .map(|(t, i)| Block::paragraph(i, Paragraph::new(*t).with_style("Heading 1")))
            .collect()
    }

    #[test]
    fn auto_mode_follows_styles() {
        let styled = linter("[styles.\".title\"]\nparagraph = { alignment = \"center\" }").unwrap();
        assert_eq!(styled.mode(), Mode::ClassStyle);

        let plain = linter("[[rules]]\ntype = \"heading-numbering\"").unwrap();
        assert_eq!(plain.mode(), Mode::Rules);
        assert_eq!(plain.rule_ids(), ["HEADING_NUMBERING-001"]);
    }

    #[test]
    fn rules_in_class_style_mode_are_rejected() {
        let err = linter(
            r#"
            [engine]
            mode = "class-style"

            [[rules]]
            type = "heading-numbering"
            "#,
        )
        .err()
        .unwrap();
        assert!(matches!(err, LintError::RulesInClassStyle));
    }

    #[test]
    fn explicit_rules_mode_ignores_styles() {
        let linter = linter(
            r#"
            [engine]
            mode = "rules"

            [styles.".title"]
            paragraph = { alignment = "center" }
            "#,
        )
        .unwrap();
        assert_eq!(linter.mode(), Mode::Rules);
        assert_eq!(linter.rule_count(), 0);
        assert!(linter.run(&mut headings(&["1 x"])).issues.is_empty());
    }

    #[test]
    fn overrides_reach_rule_issues() {
        let linter = linter(
            r#"
            fail_on = "warn"

            [[rules]]
            type = "heading-numbering"
            id = "HDG"

            [overrides.HDG]
            severity = "info"
            "#,
        )
        .unwrap();
        let report = linter.run(&mut headings(&["1 绪论", "2 方法", "4 结论"]));
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Info);
        assert!(!linter.fails(&report));
    }

    #[test]
    fn build_errors_surface() {
        let err = linter("[[rules]]\ntype = \"spelling\"").err().unwrap();
        assert!(matches!(err, LintError::Rule(_)));

        let err = linter("[styles.title]\nfont = { bold = true }").err().unwrap();
        assert!(matches!(err, LintError::Load(_)));

        let err = linter("[[rules]]\ntype = \"matching\"\nid = \"A\"\npattern = \"x\"\n[[rules]]\ntype = \"matching\"\nid = \"A\"\npattern = \"y\"")
            .err()
            .unwrap();
        assert!(matches!(err, LintError::Engine(_)));
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Idle < Phase::Classifying);
        assert!(Phase::Checking < Phase::Done);
        assert_eq!(Phase::Checking.to_string(), "checking");
    }
}
