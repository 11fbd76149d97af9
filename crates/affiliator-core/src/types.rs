use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Classifier category for blocks that positively look like affiliations.
pub const AFFILIATION: &str = "AFFILIATION";
/// Classifier category for blocks that clearly are not affiliations.
pub const NOT_AFFILIATION: &str = "NOT_AFFILIATION";
/// Classifier category for bibliography-style blocks.
pub const CITATION: &str = "CITATION";

/// Category label → probability, as returned by a block classifier.
pub type Categories = BTreeMap<String, f64>;

/// Probability for `label`, treating a missing category as 0.
pub fn category_score(cats: &Categories, label: &str) -> f64 {
    cats.get(label).copied().unwrap_or(0.0)
}

/// A line-level run of text on a page, with its classifier decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position within its page.
    pub index: usize,
    /// 0-based page number.
    pub page: usize,
    pub text: String,
    pub is_affiliation: bool,
    pub cats: Categories,
}

/// Entity labels the affiliation parsers understand.
///
/// `Key` is never produced by the tagger; it marks footnote-style markers
/// linking authors to affiliations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Person,
    Org,
    Gpe,
    Key,
}

impl EntityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Person => "PERSON",
            EntityLabel::Org => "ORG",
            EntityLabel::Gpe => "GPE",
            EntityLabel::Key => "KEY",
        }
    }

    /// Map a tagger label onto the labels kept for parsing.
    ///
    /// `KEY` is deliberately not accepted: keys are synthesized, not tagged.
    pub fn from_tagger(label: &str) -> Option<Self> {
        match label {
            "PERSON" => Some(EntityLabel::Person),
            "ORG" => Some(EntityLabel::Org),
            "GPE" => Some(EntityLabel::Gpe),
            _ => None,
        }
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed span over the tokens of a tagged document (`end` is exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Entity {
    pub fn new(label: EntityLabel, start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            label,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

fn default_ws() -> bool {
    true
}

/// A single token from the tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Coarse part-of-speech tag (`DET`, `PROPN`, `NUM`, ...), if the tagger provides one.
    #[serde(default)]
    pub pos: Option<String>,
    /// Whether the token is followed by whitespace in the source text.
    #[serde(default = "default_ws")]
    pub ws: bool,
}

/// An entity span exactly as the tagger reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntity {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Tokenized and tagged text, the output of an [`crate::EntityTagger`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedDoc {
    pub text: String,
    pub tokens: Vec<Token>,
    #[serde(rename = "ents", default)]
    pub entities: Vec<RawEntity>,
}

impl TaggedDoc {
    /// Build a document from whitespace-separated words with no entities.
    pub fn from_words(words: &[&str]) -> Self {
        let tokens: Vec<Token> = words
            .iter()
            .map(|w| Token {
                text: (*w).to_string(),
                pos: None,
                ws: true,
            })
            .collect();
        Self {
            text: words.join(" "),
            tokens,
            entities: Vec::new(),
        }
    }

    /// Attach a tagger entity covering tokens `start..end`.
    pub fn with_entity(mut self, label: &str, start: usize, end: usize) -> Self {
        self.entities.push(RawEntity {
            label: label.to_string(),
            start,
            end,
        });
        self
    }

    /// Set the part-of-speech tag of one token.
    pub fn with_pos(mut self, index: usize, pos: &str) -> Self {
        if let Some(token) = self.tokens.get_mut(index) {
            token.pos = Some(pos.to_string());
        }
        self
    }

    /// Reconstruct the text of tokens `start..end`, honoring token spacing.
    pub fn span_text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        if start >= end {
            return String::new();
        }
        let mut out = String::new();
        for token in &self.tokens[start..end] {
            out.push_str(&token.text);
            if token.ws {
                out.push(' ');
            }
        }
        out.trim_end().to_string()
    }
}
