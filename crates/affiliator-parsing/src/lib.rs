pub mod blocks;
pub mod config;
pub mod extractor;
pub mod graph;
pub mod normalize;
pub mod parser;
pub mod projection;
pub mod region;
pub mod text_processing;

pub use blocks::{
    AffiliationPredicate, CitationGuard, EntityDensityPredicate, ThresholdPredicate, analyze,
    analyze_with,
};
pub use config::{ListOverride, OrgAfterPerson, ParsingConfig, ParsingConfigBuilder};
pub use extractor::{AffiliationExtractor, Extraction, Models};
pub use graph::{AffiliationGraph, EdgeView, GraphExport, Node, NodeKind, Relation};
pub use normalize::{KEY_PATTERN, normalize_entities};
pub use parser::{Strategy, build_graph, choose_strategy};
pub use projection::{AffiliationMap, affiliation_pairs, project, to_document};
pub use region::{AffiliationRegion, select_region};
pub use text_processing::normalize_text;
// Re-export domain types from core (canonical definitions live there)
pub use affiliator_core::{AffiliationError, Block, Document, Entity, EntityLabel, ModelError};

use affiliator_core::BlockClassifier;

/// Locate the affiliation region of `text` with default settings and return
/// its text.
///
/// Pipeline:
/// 1. Normalize the text (line numbers, diacritics, Unicode, whitespace)
/// 2. Split into pages and blocks and classify each block
/// 3. Select the flagged region, following spillover onto later pages
/// 4. Join the region's blocks
pub fn affiliation_text(
    text: &str,
    classifier: &dyn BlockClassifier,
) -> Result<String, AffiliationError> {
    let config = ParsingConfig::default();
    let text = text_processing::normalize_text_with_config(text, &config);
    let pages = analyze(&text, classifier, config.threshold())?;
    Ok(select_region(&pages, config.lookahead_blocks)?.text())
}

/// Run the whole pipeline with default settings, degrading documents without
/// affiliations to an empty author list.
pub fn extract_affiliations(text: &str, models: Models<'_>) -> Result<Document, ModelError> {
    AffiliationExtractor::new().extract_document(text, models)
}
