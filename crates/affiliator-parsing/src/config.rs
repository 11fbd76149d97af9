use std::str::FromStr;

use regex::Regex;

use affiliator_core::config_file::ParsingSection;

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// What the non-keyed parser does with an ORG that directly follows a PERSON
/// while no affiliation is being accumulated.
///
/// `Drop` only starts an affiliation on an ORG-after-ORG pair, so the first
/// ORG after an author name is discarded. This avoids treating a lone
/// organization mention next to a name as that author's affiliation, at the
/// cost of losing the department in "Jane Doe, Dept of Physics, MIT".
/// `Append` starts the affiliation at any ORG while an author is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrgAfterPerson {
    #[default]
    Drop,
    Append,
}

impl FromStr for OrgAfterPerson {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OrgAfterPerson::Drop),
            "append" => Ok(OrgAfterPerson::Append),
            other => Err(format!("unknown org_after_person policy: {other}")),
        }
    }
}

/// Default part-of-speech tags whose tokens are never promoted to keys.
pub(crate) const DEFAULT_KEY_EXCLUDED_POS: &[&str] = &["DET"];

/// Configuration for the affiliation extraction pipeline.
///
/// Regex fields are `Option<Regex>`; `None` means "use the built-in default".
/// Use [`ParsingConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── blocks.rs ──
    /// Minimum AFFILIATION probability (and `1 - threshold` NOT_AFFILIATION ceiling).
    pub(crate) threshold: f64,
    /// Blocks scoring at or above this on CITATION are never affiliations.
    pub(crate) citation_threshold: Option<f64>,
    /// Also accept blocks made only of entities, punctuation and digits.
    pub(crate) entity_density: bool,

    // ── region.rs ──
    /// How many leading blocks of the next page are checked for spillover.
    pub(crate) lookahead_blocks: usize,

    // ── normalize.rs ──
    /// Pattern a single token must match to be a key candidate.
    pub(crate) key_pattern: Option<Regex>,
    /// How many times a candidate text must occur to become a key.
    pub(crate) min_key_occurrences: usize,
    /// Part-of-speech tags excluded from key promotion.
    pub(crate) key_excluded_pos: ListOverride<String>,
    /// Trim key-like leading tokens off tagged entities.
    pub(crate) strip_leading_keys: bool,

    // ── parser ──
    pub(crate) org_after_person: OrgAfterPerson,

    // ── text_processing.rs ──
    pub(crate) remove_line_numbers: bool,
    pub(crate) fix_diacritics: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            citation_threshold: None,
            entity_density: false,
            lookahead_blocks: 3,
            key_pattern: None,
            min_key_occurrences: 2,
            key_excluded_pos: ListOverride::Default,
            strip_leading_keys: true,
            org_after_person: OrgAfterPerson::Drop,
            remove_line_numbers: true,
            fix_diacritics: true,
        }
    }
}

impl ParsingConfig {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn org_after_person(&self) -> OrgAfterPerson {
        self.org_after_person
    }

    /// Resolved list of part-of-speech tags excluded from key promotion.
    pub(crate) fn excluded_pos(&self) -> Vec<String> {
        let defaults: Vec<String> = DEFAULT_KEY_EXCLUDED_POS
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.key_excluded_pos.resolve(&defaults)
    }
}

/// Builder for [`ParsingConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    threshold: Option<f64>,
    citation_threshold: Option<f64>,
    entity_density: Option<bool>,
    lookahead_blocks: Option<usize>,
    key_pattern: Option<String>,
    min_key_occurrences: Option<usize>,
    key_excluded_pos: ListOverride<String>,
    strip_leading_keys: Option<bool>,
    org_after_person: Option<OrgAfterPerson>,
    remove_line_numbers: Option<bool>,
    fix_diacritics: Option<bool>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from the `[parsing]` section of a config file.
    ///
    /// An unrecognized `org_after_person` value is ignored with a warning.
    pub fn from_section(section: &ParsingSection) -> Self {
        let org_after_person = section.org_after_person.as_deref().and_then(|s| {
            s.parse::<OrgAfterPerson>()
                .map_err(|e| tracing::warn!(error = %e, "ignoring config value"))
                .ok()
        });
        Self {
            threshold: section.threshold,
            citation_threshold: section.citation_threshold,
            entity_density: section.entity_density,
            lookahead_blocks: section.lookahead_blocks,
            key_pattern: None,
            min_key_occurrences: section.min_key_occurrences,
            key_excluded_pos: section
                .key_excluded_pos
                .clone()
                .map(ListOverride::Replace)
                .unwrap_or_default(),
            strip_leading_keys: section.strip_leading_keys,
            org_after_person,
            remove_line_numbers: section.remove_line_numbers,
            fix_diacritics: section.fix_diacritics,
        }
    }

    // ── Block classification ──

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn citation_threshold(mut self, threshold: f64) -> Self {
        self.citation_threshold = Some(threshold);
        self
    }

    pub fn entity_density(mut self, enabled: bool) -> Self {
        self.entity_density = Some(enabled);
        self
    }

    // ── Region selection ──

    pub fn lookahead_blocks(mut self, n: usize) -> Self {
        self.lookahead_blocks = Some(n);
        self
    }

    // ── Keys ──

    pub fn key_regex(mut self, pattern: &str) -> Self {
        self.key_pattern = Some(pattern.to_string());
        self
    }

    pub fn min_key_occurrences(mut self, n: usize) -> Self {
        self.min_key_occurrences = Some(n);
        self
    }

    pub fn set_key_excluded_pos(mut self, tags: Vec<String>) -> Self {
        self.key_excluded_pos = ListOverride::Replace(tags);
        self
    }

    pub fn add_key_excluded_pos(mut self, tag: String) -> Self {
        match &mut self.key_excluded_pos {
            ListOverride::Extend(v) => v.push(tag),
            _ => self.key_excluded_pos = ListOverride::Extend(vec![tag]),
        }
        self
    }

    pub fn strip_leading_keys(mut self, enabled: bool) -> Self {
        self.strip_leading_keys = Some(enabled);
        self
    }

    // ── Parsing ──

    pub fn org_after_person(mut self, policy: OrgAfterPerson) -> Self {
        self.org_after_person = Some(policy);
        self
    }

    // ── Text normalization ──

    pub fn remove_line_numbers(mut self, enabled: bool) -> Self {
        self.remove_line_numbers = Some(enabled);
        self
    }

    pub fn fix_diacritics(mut self, enabled: bool) -> Self {
        self.fix_diacritics = Some(enabled);
        self
    }

    /// Compile all string patterns into regexes and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let defaults = ParsingConfig::default();
        Ok(ParsingConfig {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            citation_threshold: self.citation_threshold.or(defaults.citation_threshold),
            entity_density: self.entity_density.unwrap_or(defaults.entity_density),
            lookahead_blocks: self.lookahead_blocks.unwrap_or(defaults.lookahead_blocks),
            key_pattern: self.key_pattern.map(|p| Regex::new(&p)).transpose()?,
            min_key_occurrences: self
                .min_key_occurrences
                .unwrap_or(defaults.min_key_occurrences),
            key_excluded_pos: self.key_excluded_pos,
            strip_leading_keys: self
                .strip_leading_keys
                .unwrap_or(defaults.strip_leading_keys),
            org_after_person: self.org_after_person.unwrap_or(defaults.org_after_person),
            remove_line_numbers: self
                .remove_line_numbers
                .unwrap_or(defaults.remove_line_numbers),
            fix_diacritics: self.fix_diacritics.unwrap_or(defaults.fix_diacritics),
        })
    }
}
