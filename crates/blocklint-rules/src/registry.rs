//! Mapping from rule kind names to factories.

use crate::error::RuleBuildError;
use crate::{
    counting, font_style, heading, matching, paragraph_content, paragraph_format, references,
    selector_check, sequence, structure,
};
use blocklint_core::{RuleBox, RuleSpec};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Builds a rule instance from its configuration.
pub type RuleFactory = fn(&RuleSpec) -> Result<RuleBox, RuleBuildError>;

#[derive(Clone, Copy)]
struct Entry {
    description: &'static str,
    factory: RuleFactory,
}

/// Rule kinds available to `[[rules]]` entries.
///
/// # Example
///
/// ```
/// use blocklint_core::RuleSpec;
/// use blocklint_rules::RuleRegistry;
///
/// let registry = RuleRegistry::with_builtins();
/// let spec = RuleSpec::new("heading-numbering").with_id("HDG_SEQ-001");
/// let rule = registry.build(&spec).unwrap();
/// assert_eq!(rule.id(), "HDG_SEQ-001");
/// ```
#[derive(Clone, Default)]
pub struct RuleRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in kind.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(font_style::KIND, "Run font name, size, bold and italic", font_style::build)
            .register(
                paragraph_format::KIND,
                "Line spacing, alignment, indents and spacing",
                paragraph_format::build,
            )
            .register(
                paragraph_content::KIND,
                "Paragraph text presence and length",
                paragraph_content::build,
            )
            .register(
                heading::NUMBERING_KIND,
                "Consecutive heading numbers per level",
                heading::build_numbering,
            )
            .register(
                heading::HIERARCHY_KIND,
                "Sub-heading numbers extend their parent's",
                heading::build_hierarchy,
            )
            .register(sequence::KIND, "Heading number sequence per style level", sequence::build)
            .register(matching::KIND, "Paragraph text against a regex", matching::build)
            .register(counting::KIND, "Number of paragraphs, tables or headings", counting::build)
            .register(
                structure::PRESENCE_KIND,
                "A required element is present",
                structure::build_presence,
            )
            .register(
                structure::PAGE_CONTINUITY_KIND,
                "Page numbers of list entries never decrease",
                structure::build_page_continuity,
            )
            .register(
                references::HEADING_KIND,
                "The reference section exists",
                references::build_heading,
            )
            .register(
                references::CITATION_KIND,
                "Every reference is cited",
                references::build_citation,
            )
            .register(
                references::VALIDITY_KIND,
                "Every citation has a reference entry",
                references::build_validity,
            )
            .register(
                references::LEVEL_KIND,
                "Reference section heading level",
                references::build_level,
            )
            .register(
                selector_check::KIND,
                "Selector with a pattern, exists, count or count_equals check",
                selector_check::build,
            );
        registry
    }

    /// Registers a kind, replacing any previous factory for it.
    pub fn register(
        &mut self,
        kind: &'static str,
        description: &'static str,
        factory: RuleFactory,
    ) -> &mut Self {
        self.entries.insert(kind, Entry { description, factory });
        self
    }

    /// Registered kinds with their descriptions, sorted by kind.
    pub fn kinds(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(kind, e)| (*kind, e.description))
    }

    /// Returns true if `kind` is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Builds one rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleBuildError`] for unknown kinds and invalid parameters.
    /// A `severity` is only accepted by `selector-check`; other kinds have
    /// fixed severities that `[overrides]` can change.
    pub fn build(&self, spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
        let entry = self
            .entries
            .get(spec.kind.as_str())
            .ok_or_else(|| RuleBuildError::UnknownKind {
                kind: spec.kind.clone(),
                known: self.entries.keys().copied().collect::<Vec<_>>().join(", "),
            })?;

        if spec.severity.is_some() && spec.kind != selector_check::KIND {
            let id = spec.id.clone().unwrap_or_else(|| spec.kind.clone());
            return Err(RuleBuildError::invalid(
                &id,
                format!(
                    "`severity` is not a parameter of `{}`, use `[overrides.\"{id}\"]` instead",
                    spec.kind
                ),
            ));
        }

        let rule = (entry.factory)(spec)?;
        debug!(kind = %spec.kind, id = rule.id(), "Built rule");
        Ok(rule)
    }

    /// Builds every spec in order. Specs without an id get
    /// `<KIND>-<NNN>`, numbered per kind from 001.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleBuildError`].
    pub fn build_all(&self, specs: &[RuleSpec]) -> Result<Vec<RuleBox>, RuleBuildError> {
        let mut counters: HashMap<&str, usize> = HashMap::new();
        specs
            .iter()
            .map(|spec| {
                if spec.id.is_some() {
                    return self.build(spec);
                }
                let n = counters.entry(spec.kind.as_str()).or_insert(0);
                *n += 1;
                let id = format!("{}-{:03}", spec.kind.to_uppercase().replace('-', "_"), n);
                self.build(&spec.clone().with_id(id))
            })
            .collect()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocklint_core::{Block, Context, Issue, Rule, Severity};

    struct Noop(String);

    impl Rule for Noop {
        fn id(&self) -> &str {
            &self.0
        }
        fn kind(&self) -> &'static str {
            "noop"
        }
        fn check(&self, _block: &Block, _ctx: &Context<'_>) -> Vec<Issue> {
            Vec::new()
        }
    }

    fn noop(spec: &RuleSpec) -> Result<RuleBox, RuleBuildError> {
        Ok(Box::new(Noop(spec.id.clone().unwrap_or_default())))
    }

    #[test]
    fn builtins_are_listed_sorted() {
        let registry = RuleRegistry::with_builtins();
        let kinds: Vec<_> = registry.kinds().map(|(k, _)| k).collect();
        assert_eq!(kinds.len(), 15);
        assert!(kinds.windows(2).all(|w| w[0] < w[1]));
        assert!(registry.contains("selector-check"));
    }

    #[test]
    fn unknown_kind_lists_known() {
        let err = RuleRegistry::with_builtins()
            .build(&RuleSpec::new("spelling"))
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.starts_with("unknown rule type `spelling`"));
        assert!(message.contains("font-style"));
    }

    #[test]
    fn severity_is_only_for_selector_checks() {
        let registry = RuleRegistry::with_builtins();
        let spec = RuleSpec {
            severity: Some(Severity::Error),
            ..RuleSpec::new("counting").with_id("CNT-001")
        };
        let err = registry.build(&spec).err().unwrap();
        assert!(err.to_string().contains("[overrides.\"CNT-001\"]"));
    }

    #[test]
    fn build_all_numbers_missing_ids_per_kind() {
        let mut registry = RuleRegistry::new();
        registry.register("noop", "does nothing", noop);
        let specs = [
            RuleSpec::new("noop"),
            RuleSpec::new("noop").with_id("MINE"),
            RuleSpec::new("noop"),
        ];
        let ids: Vec<String> = registry
            .build_all(&specs)
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, ["NOOP-001", "MINE", "NOOP-002"]);
    }
}
