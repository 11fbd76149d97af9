//! End-to-end tests for the affiliation pipeline.
//!
//! The classifier and tagger are in-memory fakes: the classifier flags blocks
//! containing any of a set of markers, and the tagger tags phrases from a
//! fixed lexicon, so each test controls exactly which entities appear.

use affiliator_core::{
    AFFILIATION, AffiliationError, BlockClassifier, Categories, EntityLabel, EntityTagger,
    ModelError, NOT_AFFILIATION, TaggedDoc, Token,
};
use affiliator_parsing::{
    AffiliationExtractor, Models, OrgAfterPerson, ParsingConfigBuilder, Relation, Strategy,
    affiliation_pairs, affiliation_text, extract_affiliations,
};

/// Flags every block containing one of `markers`.
struct MarkerClassifier {
    markers: Vec<&'static str>,
}

impl MarkerClassifier {
    fn new(markers: &[&'static str]) -> Self {
        Self {
            markers: markers.to_vec(),
        }
    }
}

impl BlockClassifier for MarkerClassifier {
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Categories>, ModelError> {
        Ok(texts
            .iter()
            .map(|text| {
                let hit = self.markers.iter().any(|m| text.contains(m));
                let score = if hit { 0.95 } else { 0.02 };
                let mut cats = Categories::new();
                cats.insert(AFFILIATION.to_string(), score);
                cats.insert(NOT_AFFILIATION.to_string(), 1.0 - score);
                cats
            })
            .collect())
    }
}

/// Tags the longest lexicon phrase starting at each token.
struct LexiconTagger {
    phrases: Vec<(&'static str, &'static str)>,
}

impl LexiconTagger {
    fn new(phrases: &[(&'static str, &'static str)]) -> Self {
        Self {
            phrases: phrases.to_vec(),
        }
    }

    fn tokenize(text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            match word.strip_suffix(',') {
                Some(stem) if !stem.is_empty() => {
                    tokens.push(Token {
                        text: stem.to_string(),
                        pos: None,
                        ws: false,
                    });
                    tokens.push(Token {
                        text: ",".to_string(),
                        pos: None,
                        ws: true,
                    });
                }
                _ => tokens.push(Token {
                    text: word.to_string(),
                    pos: None,
                    ws: true,
                }),
            }
        }
        tokens
    }
}

impl EntityTagger for LexiconTagger {
    fn tag(&self, text: &str) -> Result<TaggedDoc, ModelError> {
        let mut doc = TaggedDoc {
            text: text.to_string(),
            tokens: Self::tokenize(text),
            entities: Vec::new(),
        };

        let mut i = 0;
        while i < doc.tokens.len() {
            let best = self
                .phrases
                .iter()
                .filter_map(|(phrase, label)| {
                    let words: Vec<&str> = phrase.split_whitespace().collect();
                    let end = i + words.len();
                    let matches = end <= doc.tokens.len()
                        && doc.tokens[i..end]
                            .iter()
                            .zip(&words)
                            .all(|(t, w)| t.text == *w);
                    matches.then_some((words.len(), *label))
                })
                .max_by_key(|(len, _)| *len);
            match best {
                Some((len, label)) => {
                    doc = doc.with_entity(label, i, i + len);
                    i += len;
                }
                None => i += 1,
            }
        }
        Ok(doc)
    }
}

fn author(name: &str, affiliations: &[&str]) -> (String, Vec<String>) {
    (
        name.to_string(),
        affiliations.iter().map(|a| a.to_string()).collect(),
    )
}

const NON_KEYED_TEXT: &str = "A Study of Things\n\
    Jane Doe, Dept of Physics, MIT, Cambridge\n\
    John Roe, Stanford University\n\
    \n\
    Abstract\n\
    We study things.";

fn non_keyed_tagger() -> LexiconTagger {
    LexiconTagger::new(&[
        ("Jane Doe", "PERSON"),
        ("John Roe", "PERSON"),
        ("Dept of Physics", "ORG"),
        ("MIT", "ORG"),
        ("Cambridge", "GPE"),
        ("Stanford University", "ORG"),
    ])
}

#[test]
fn non_keyed_drops_org_directly_after_person() {
    let classifier = MarkerClassifier::new(&["MIT", "University"]);
    let tagger = non_keyed_tagger();
    let models = Models::new(&classifier, &tagger);

    let extraction = AffiliationExtractor::new()
        .extract(NON_KEYED_TEXT, models)
        .unwrap();

    assert_eq!(
        extraction.region.text(),
        "Jane Doe, Dept of Physics, MIT, Cambridge John Roe, Stanford University"
    );
    assert_eq!(extraction.strategy, Strategy::NonKeyed);
    // "Dept of Physics" follows a PERSON and is dropped; John Roe's trailing
    // affiliation is never flushed.
    assert_eq!(
        extraction.mapping(),
        vec![author("Jane Doe", &["MIT, Cambridge"])]
    );
}

#[test]
fn non_keyed_append_policy_keeps_department() {
    let classifier = MarkerClassifier::new(&["MIT", "University"]);
    let tagger = non_keyed_tagger();
    let models = Models::new(&classifier, &tagger);
    let extractor = AffiliationExtractor::with_config(
        ParsingConfigBuilder::new()
            .org_after_person(OrgAfterPerson::Append)
            .build()
            .unwrap(),
    );

    let extraction = extractor.extract(NON_KEYED_TEXT, models).unwrap();
    let graph = &extraction.graph;

    assert_eq!(
        extraction.mapping(),
        vec![author("Jane Doe", &["Dept of Physics, MIT, Cambridge"])]
    );
    assert_eq!(
        graph.relation("Dept of Physics, MIT, Cambridge", "MIT, Cambridge"),
        Some(Relation::PartOf)
    );
    assert_eq!(
        graph.relation("MIT, Cambridge", "Cambridge"),
        Some(Relation::LocatedIn)
    );
}

const KEYED_TEXT: &str = "Title of Paper\n\
    Ann Lee 1 , Bob Ray 1 2\n\
    1 Stanford University , Stanford\n\
    2 MIT\n\
    \n\
    Introduction";

fn keyed_tagger() -> LexiconTagger {
    LexiconTagger::new(&[
        ("Ann Lee", "PERSON"),
        ("Bob Ray", "PERSON"),
        ("Cy Mo", "PERSON"),
        ("Stanford University", "ORG"),
        ("Stanford", "GPE"),
        ("MIT", "ORG"),
    ])
}

#[test]
fn keyed_document_resolves_shared_and_distinct_keys() {
    let classifier = MarkerClassifier::new(&["Lee", "Stanford", "MIT"]);
    let tagger = keyed_tagger();
    let models = Models::new(&classifier, &tagger);

    let extraction = AffiliationExtractor::new()
        .extract(KEYED_TEXT, models)
        .unwrap();

    assert_eq!(extraction.strategy, Strategy::Keyed);
    let keys = extraction
        .entities
        .iter()
        .filter(|e| e.label == EntityLabel::Key)
        .count();
    assert_eq!(keys, 5);
    assert_eq!(
        extraction.mapping(),
        vec![
            author("Ann Lee", &["Stanford University, Stanford"]),
            author("Bob Ray", &["Stanford University, Stanford", "MIT"]),
        ]
    );
    assert_eq!(
        affiliation_pairs(&extraction.graph),
        vec![
            (
                "Ann Lee".to_string(),
                "Stanford University, Stanford".to_string()
            ),
            (
                "Bob Ray".to_string(),
                "Stanford University, Stanford".to_string()
            ),
            ("Bob Ray".to_string(), "MIT".to_string()),
        ]
    );
}

#[test]
fn keyed_document_serializes_to_api_shape() {
    let classifier = MarkerClassifier::new(&["Lee", "Stanford", "MIT"]);
    let tagger = keyed_tagger();
    let doc = extract_affiliations(KEYED_TEXT, Models::new(&classifier, &tagger)).unwrap();

    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "authors": [
                { "name": "Ann Lee", "affiliations": [ { "name": "Stanford University, Stanford" } ] },
                { "name": "Bob Ray", "affiliations": [
                    { "name": "Stanford University, Stanford" },
                    { "name": "MIT" }
                ] }
            ]
        })
    );
}

#[test]
fn keyed_author_without_affiliation_maps_to_empty_list() {
    // "2" occurs once, so it is not a key and Bob Ray stays unresolved.
    let text = "Ann Lee 1 , Bob Ray 2 , Cy Mo 1\n1 MIT\n\nBody";
    let classifier = MarkerClassifier::new(&["Lee", "MIT"]);
    let tagger = keyed_tagger();
    let models = Models::new(&classifier, &tagger);

    let extraction = AffiliationExtractor::new().extract(text, models).unwrap();
    assert_eq!(
        extraction.mapping(),
        vec![
            author("Ann Lee", &["MIT"]),
            author("Bob Ray", &[]),
            author("Cy Mo", &["MIT"]),
        ]
    );

    let doc = extraction.document();
    assert_eq!(doc.authors.len(), 3);
    assert!(doc.authors[1].affiliations.is_empty());
}

#[test]
fn affiliations_spill_onto_next_page() {
    let text = "Shared Suffixes\n\
        Ann Lee, Lab A, Univ X\n\
        \n\
        Bob Ray, Lab B, Univ X\n\
        Cy Mo\n\
        Introduction\n\
        \n\
        References\n\
        one\n\
        two\n\
        Zed Park, Univ X";
    let classifier = MarkerClassifier::new(&["Univ", "Cy Mo"]);
    let tagger = LexiconTagger::new(&[
        ("Ann Lee", "PERSON"),
        ("Bob Ray", "PERSON"),
        ("Cy Mo", "PERSON"),
        ("Zed Park", "PERSON"),
        ("Lab A", "ORG"),
        ("Lab B", "ORG"),
        ("Univ X", "ORG"),
    ]);
    let models = Models::new(&classifier, &tagger);
    let extractor = AffiliationExtractor::with_config(
        ParsingConfigBuilder::new()
            .org_after_person(OrgAfterPerson::Append)
            .build()
            .unwrap(),
    );

    let extraction = extractor.extract(text, models).unwrap();

    assert_eq!(extraction.region.pages, vec![0, 1]);
    assert_eq!(
        extraction.region.text(),
        "Ann Lee, Lab A, Univ X Bob Ray, Lab B, Univ X Cy Mo"
    );
    assert_eq!(
        extraction.mapping(),
        vec![
            author("Ann Lee", &["Lab A, Univ X"]),
            author("Bob Ray", &["Lab B, Univ X"]),
        ]
    );

    let graph = &extraction.graph;
    let univ_nodes = graph.nodes().filter(|n| n.id == "Univ X").count();
    assert_eq!(univ_nodes, 1);
    assert_eq!(graph.in_degree("Univ X"), 2);
    assert_eq!(graph.relation("Lab A, Univ X", "Univ X"), Some(Relation::PartOf));
    assert_eq!(graph.relation("Lab B, Univ X", "Univ X"), Some(Relation::PartOf));
    assert!(!graph.contains("Zed Park"));
}

#[test]
fn no_affiliation_block_yields_empty_document() {
    let classifier = MarkerClassifier::new(&[]);
    let tagger = non_keyed_tagger();
    let models = Models::new(&classifier, &tagger);
    let extractor = AffiliationExtractor::new();

    assert!(matches!(
        extractor.extract(NON_KEYED_TEXT, models),
        Err(AffiliationError::RegionNotFound)
    ));
    assert!(matches!(
        affiliation_text(NON_KEYED_TEXT, &classifier),
        Err(AffiliationError::RegionNotFound)
    ));
    let doc = extractor.extract_document(NON_KEYED_TEXT, models).unwrap();
    assert!(doc.authors.is_empty());
}

#[test]
fn keyed_document_without_org_yields_empty_document() {
    let text = "Ann Lee 1 Bob Ray 1\n\nBody";
    let classifier = MarkerClassifier::new(&["Lee"]);
    let tagger = keyed_tagger();
    let models = Models::new(&classifier, &tagger);
    let extractor = AffiliationExtractor::new();

    assert!(matches!(
        extractor.extract(text, models),
        Err(AffiliationError::NoOrganizationEntity)
    ));
    assert!(extractor.extract_document(text, models).unwrap().is_empty());
}

#[test]
fn extraction_is_deterministic() {
    let classifier = MarkerClassifier::new(&["Lee", "Stanford", "MIT"]);
    let tagger = keyed_tagger();
    let models = Models::new(&classifier, &tagger);
    let extractor = AffiliationExtractor::new();

    let first = extractor.extract(KEYED_TEXT, models).unwrap();
    let second = extractor.extract(KEYED_TEXT, models).unwrap();
    assert_eq!(first.graph.export(), second.graph.export());
    assert_eq!(first.entities, second.entities);
}

#[test]
fn keys_always_occur_at_least_twice() {
    let tagger = keyed_tagger();
    let extractor = AffiliationExtractor::new();
    let samples = [
        "Ann Lee 1 , Bob Ray 2 MIT",
        "Ann Lee a b a MIT b c",
        "1 2 3 4 5 6 7 8 9 1",
        "Ann Lee * † ‡ MIT * MIT",
        KEYED_TEXT,
    ];

    for sample in samples {
        let doc = tagger.tag(sample).unwrap();
        let entities = extractor.normalize_entities(&doc);
        for key in entities.iter().filter(|e| e.label == EntityLabel::Key) {
            let occurrences = entities
                .iter()
                .filter(|e| e.label == EntityLabel::Key && e.text == key.text)
                .count();
            assert!(
                occurrences >= 2,
                "key {:?} occurs {} time(s) in {:?}",
                key.text,
                occurrences,
                sample
            );
        }
    }
}

#[test]
fn line_numbers_and_diacritics_are_cleaned_before_analysis() {
    let text = "1\nJos\u{00B4}e M\u{00A8}uller, Lab A, Univ X\n2\nAnn Lee\n\nBody";
    let classifier = MarkerClassifier::new(&["Univ"]);
    let tagger = LexiconTagger::new(&[]);
    let models = Models::new(&classifier, &tagger);

    let region = AffiliationExtractor::new()
        .affiliation_text(text, models)
        .unwrap();
    assert_eq!(region, "José Müller, Lab A, Univ X");
}
