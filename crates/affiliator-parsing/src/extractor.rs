use affiliator_core::{
    AffiliationError, Block, BlockClassifier, Document, Entity, EntityTagger, ModelError,
    TaggedDoc,
};

use crate::blocks::{analyze_with, predicate_for};
use crate::config::ParsingConfig;
use crate::graph::AffiliationGraph;
use crate::normalize::normalize_entities_with_config;
use crate::parser::{Strategy, build_graph, choose_strategy};
use crate::projection::{AffiliationMap, project, to_document};
use crate::region::{AffiliationRegion, select_region};
use crate::text_processing::normalize_text_with_config;

/// The external models a document is run through.
///
/// Both are borrowed: loading and caching them is the caller's job.
#[derive(Clone, Copy)]
pub struct Models<'a> {
    pub classifier: &'a dyn BlockClassifier,
    pub tagger: &'a dyn EntityTagger,
}

impl<'a> Models<'a> {
    pub fn new(classifier: &'a dyn BlockClassifier, tagger: &'a dyn EntityTagger) -> Self {
        Self { classifier, tagger }
    }
}

/// Everything produced while extracting one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub region: AffiliationRegion,
    pub entities: Vec<Entity>,
    pub strategy: Strategy,
    pub graph: AffiliationGraph,
}

impl Extraction {
    pub fn mapping(&self) -> AffiliationMap {
        project(&self.graph)
    }

    pub fn document(&self) -> Document {
        to_document(&self.graph)
    }
}

/// A configurable affiliation extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use
/// [`AffiliationExtractor::with_config`] to supply custom thresholds and
/// patterns. The extractor keeps no state between documents.
#[derive(Debug, Clone, Default)]
pub struct AffiliationExtractor {
    config: ParsingConfig,
}

impl AffiliationExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Clean raw document text (step 1).
    pub fn normalize_text(&self, text: &str) -> String {
        normalize_text_with_config(text, &self.config)
    }

    /// Split normalized text into pages and blocks and classify them (step 2).
    ///
    /// The tagger is consulted only when the entity-density rule is enabled.
    pub fn analyze_blocks(
        &self,
        text: &str,
        models: Models<'_>,
    ) -> Result<Vec<Vec<Block>>, ModelError> {
        let tagger = self.config.entity_density.then_some(models.tagger);
        let predicate = predicate_for(self.config.threshold, self.config.citation_threshold, tagger);
        analyze_with(text, models.classifier, predicate.as_ref())
    }

    /// Locate the affiliation region among analyzed pages (step 3).
    pub fn select_region(&self, pages: &[Vec<Block>]) -> Result<AffiliationRegion, AffiliationError> {
        select_region(pages, self.config.lookahead_blocks)
    }

    /// Normalize, analyze and select in one go, returning the region text.
    pub fn affiliation_text(&self, text: &str, models: Models<'_>) -> Result<String, AffiliationError> {
        let text = self.normalize_text(text);
        let pages = self.analyze_blocks(&text, models)?;
        Ok(self.select_region(&pages)?.text())
    }

    /// Filter tagger output and add key entities (step 4).
    pub fn normalize_entities(&self, doc: &TaggedDoc) -> Vec<Entity> {
        normalize_entities_with_config(doc, &self.config)
    }

    /// Build the affiliation graph from normalized entities (step 5).
    pub fn build_graph(&self, entities: &[Entity]) -> Result<AffiliationGraph, AffiliationError> {
        build_graph(entities, self.config.org_after_person)
    }

    /// Run the full pipeline on raw document text.
    pub fn extract(&self, text: &str, models: Models<'_>) -> Result<Extraction, AffiliationError> {
        let text = self.normalize_text(text);
        let pages = self.analyze_blocks(&text, models)?;
        let region = self.select_region(&pages)?;

        let doc = models.tagger.tag(&region.text())?;
        let entities = self.normalize_entities(&doc);
        let strategy = choose_strategy(&entities);
        let graph = self.build_graph(&entities)?;

        Ok(Extraction {
            region,
            entities,
            strategy,
            graph,
        })
    }

    /// Run the full pipeline and produce the API document.
    ///
    /// A document without an affiliation region, or a keyed document without
    /// any organization, yields an empty author list. Model failures propagate.
    pub fn extract_document(&self, text: &str, models: Models<'_>) -> Result<Document, ModelError> {
        match self.extract(text, models) {
            Ok(extraction) => Ok(extraction.document()),
            Err(AffiliationError::Model(e)) => Err(e),
            Err(e) => {
                tracing::info!(reason = %e, "no affiliations extracted");
                Ok(Document::empty())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParsingConfigBuilder;
    use affiliator_core::{AFFILIATION, Categories, NOT_AFFILIATION};

    struct FlagAll(f64);

    impl BlockClassifier for FlagAll {
        fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Categories>, ModelError> {
            Ok(texts
                .iter()
                .map(|_| {
                    let mut cats = Categories::new();
                    cats.insert(AFFILIATION.to_string(), self.0);
                    cats.insert(NOT_AFFILIATION.to_string(), 1.0 - self.0);
                    cats
                })
                .collect())
        }
    }

    struct Broken;

    impl BlockClassifier for Broken {
        fn classify_batch(&self, _texts: &[&str]) -> Result<Vec<Categories>, ModelError> {
            Err(ModelError::Transport("connection refused".into()))
        }
    }

    impl EntityTagger for Broken {
        fn tag(&self, _text: &str) -> Result<TaggedDoc, ModelError> {
            Err(ModelError::Transport("connection refused".into()))
        }
    }

    struct Tagger(TaggedDoc);

    impl EntityTagger for Tagger {
        fn tag(&self, _text: &str) -> Result<TaggedDoc, ModelError> {
            Ok(self.0.clone())
        }
    }

    fn jane_doc() -> TaggedDoc {
        TaggedDoc::from_words(&["Jane", "Doe", "x", "Physics", "MIT", "John", "Roe"])
            .with_entity("PERSON", 0, 2)
            .with_entity("ORG", 2, 3)
            .with_entity("ORG", 3, 4)
            .with_entity("ORG", 4, 5)
            .with_entity("PERSON", 5, 7)
    }

    #[test]
    fn test_extract_non_keyed() {
        let classifier = FlagAll(0.9);
        let tagger = Tagger(jane_doc());
        let models = Models::new(&classifier, &tagger);
        let extraction = AffiliationExtractor::new()
            .extract("Jane Doe\nPhysics, MIT", models)
            .unwrap();
        assert_eq!(extraction.strategy, Strategy::NonKeyed);
        assert_eq!(extraction.region.text(), "Jane Doe Physics, MIT");
        assert_eq!(
            extraction.mapping(),
            vec![(
                "Jane Doe".to_string(),
                vec!["Physics, MIT".to_string()]
            )]
        );
    }

    #[test]
    fn test_extract_document_degrades_without_region() {
        let classifier = FlagAll(0.1);
        let tagger = Tagger(jane_doc());
        let models = Models::new(&classifier, &tagger);
        let doc = AffiliationExtractor::new()
            .extract_document("Jane Doe\nMIT", models)
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_extract_document_empty_input() {
        let classifier = FlagAll(0.9);
        let tagger = Tagger(TaggedDoc::default());
        let models = Models::new(&classifier, &tagger);
        let doc = AffiliationExtractor::new()
            .extract_document("   ", models)
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_model_errors_propagate() {
        let broken = Broken;
        let models = Models::new(&broken, &broken);
        let result = AffiliationExtractor::new().extract_document("Jane Doe", models);
        assert!(matches!(result, Err(ModelError::Transport(_))));
    }

    #[test]
    fn test_threshold_from_config() {
        let classifier = FlagAll(0.6);
        let tagger = Tagger(jane_doc());
        let models = Models::new(&classifier, &tagger);
        let strict = AffiliationExtractor::new();
        assert!(matches!(
            strict.affiliation_text("Jane Doe", models),
            Err(AffiliationError::RegionNotFound)
        ));

        let lenient = AffiliationExtractor::with_config(
            ParsingConfigBuilder::new().threshold(0.5).build().unwrap(),
        );
        assert_eq!(lenient.affiliation_text("Jane Doe", models).unwrap(), "Jane Doe");
    }

    #[test]
    fn test_entity_density_uses_tagger() {
        let dense = TaggedDoc::from_words(&["MIT"]).with_entity("ORG", 0, 1);
        let classifier = FlagAll(0.0);
        let tagger = Tagger(dense);
        let models = Models::new(&classifier, &tagger);
        let extractor = AffiliationExtractor::with_config(
            ParsingConfigBuilder::new().entity_density(true).build().unwrap(),
        );
        let pages = extractor.analyze_blocks("MIT", models).unwrap();
        assert!(pages[0][0].is_affiliation);
    }
}
