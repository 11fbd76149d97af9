use std::collections::HashSet;

use affiliator_core::{
    AFFILIATION, Block, BlockClassifier, CITATION, Categories, EntityTagger, ModelError,
    NOT_AFFILIATION, category_score,
};

/// Decides whether a classified block reads as an affiliation.
///
/// Closures of the form `Fn(&str, &Categories) -> bool` implement this trait,
/// so ad-hoc rules can be passed straight to [`analyze_with`].
pub trait AffiliationPredicate {
    fn is_affiliation(&self, text: &str, cats: &Categories) -> Result<bool, ModelError>;
}

impl<F> AffiliationPredicate for F
where
    F: Fn(&str, &Categories) -> bool,
{
    fn is_affiliation(&self, text: &str, cats: &Categories) -> Result<bool, ModelError> {
        Ok(self(text, cats))
    }
}

/// The base rule: AFFILIATION above `threshold` and NOT_AFFILIATION below
/// `1 - threshold`. Both must hold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPredicate {
    pub threshold: f64,
}

impl ThresholdPredicate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl AffiliationPredicate for ThresholdPredicate {
    fn is_affiliation(&self, _text: &str, cats: &Categories) -> Result<bool, ModelError> {
        Ok(category_score(cats, AFFILIATION) > self.threshold
            && category_score(cats, NOT_AFFILIATION) < 1.0 - self.threshold)
    }
}

/// Rejects blocks scoring at or above `threshold` on CITATION, otherwise defers
/// to the wrapped predicate.
#[derive(Debug, Clone, Copy)]
pub struct CitationGuard<P> {
    pub inner: P,
    pub threshold: f64,
}

impl<P: AffiliationPredicate> AffiliationPredicate for CitationGuard<P> {
    fn is_affiliation(&self, text: &str, cats: &Categories) -> Result<bool, ModelError> {
        if category_score(cats, CITATION) >= self.threshold {
            return Ok(false);
        }
        self.inner.is_affiliation(text, cats)
    }
}

/// Accepts whatever the wrapped predicate accepts, plus blocks made up only of
/// ORG/PERSON/GPE/CARDINAL entities, punctuation and digits.
///
/// At least one non-CARDINAL entity is required, so a bare page number or a
/// row of dots is never affiliation-like.
pub struct EntityDensityPredicate<'a, P> {
    pub inner: P,
    pub tagger: &'a dyn EntityTagger,
}

impl<P: AffiliationPredicate> AffiliationPredicate for EntityDensityPredicate<'_, P> {
    fn is_affiliation(&self, text: &str, cats: &Categories) -> Result<bool, ModelError> {
        if self.inner.is_affiliation(text, cats)? {
            return Ok(true);
        }
        is_entity_dense(text, self.tagger)
    }
}

fn is_entity_dense(text: &str, tagger: &dyn EntityTagger) -> Result<bool, ModelError> {
    const DENSE_LABELS: &[&str] = &["ORG", "PERSON", "GPE", "CARDINAL"];

    let doc = tagger.tag(text)?;
    if doc.tokens.is_empty() {
        return Ok(false);
    }

    let mut covered = HashSet::new();
    let mut has_named = false;
    for ent in &doc.entities {
        if !DENSE_LABELS.contains(&ent.label.as_str()) {
            continue;
        }
        if ent.label != "CARDINAL" {
            has_named = true;
        }
        covered.extend(ent.start..ent.end);
    }

    let all_covered = doc.tokens.iter().enumerate().all(|(i, token)| {
        covered.contains(&i)
            || token.text.chars().all(|c| c.is_ascii_punctuation())
            || token.text.chars().all(|c| c.is_ascii_digit())
    });
    Ok(has_named && all_covered)
}

/// Build the predicate chain described by the threshold and optional guards.
pub(crate) fn predicate_for<'a>(
    threshold: f64,
    citation_threshold: Option<f64>,
    tagger: Option<&'a dyn EntityTagger>,
) -> Box<dyn AffiliationPredicate + 'a> {
    let base = ThresholdPredicate::new(threshold);
    match (citation_threshold, tagger) {
        (None, None) => Box::new(base),
        (Some(t), None) => Box::new(CitationGuard {
            inner: base,
            threshold: t,
        }),
        (None, Some(tagger)) => Box::new(EntityDensityPredicate {
            inner: base,
            tagger,
        }),
        (Some(t), Some(tagger)) => Box::new(CitationGuard {
            inner: EntityDensityPredicate {
                inner: base,
                tagger,
            },
            threshold: t,
        }),
    }
}

/// Split `text` into pages (on `\n\n`) and blocks (on `\n`), classify every
/// block and flag the affiliation-like ones with the threshold rule.
pub fn analyze(
    text: &str,
    classifier: &dyn BlockClassifier,
    threshold: f64,
) -> Result<Vec<Vec<Block>>, ModelError> {
    analyze_with(text, classifier, &ThresholdPredicate::new(threshold))
}

/// [`analyze`] with an arbitrary affiliation predicate.
///
/// Blank blocks keep their position but are neither classified nor flagged.
/// Empty or whitespace-only input yields no pages at all.
pub fn analyze_with(
    text: &str,
    classifier: &dyn BlockClassifier,
    predicate: &dyn AffiliationPredicate,
) -> Result<Vec<Vec<Block>>, ModelError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut pages: Vec<Vec<Block>> = text
        .split("\n\n")
        .enumerate()
        .map(|(page, page_text)| {
            page_text
                .split('\n')
                .enumerate()
                .map(|(index, block_text)| Block {
                    index,
                    page,
                    text: block_text.to_string(),
                    is_affiliation: false,
                    cats: Categories::new(),
                })
                .collect()
        })
        .collect();

    let to_classify: Vec<(usize, usize)> = pages
        .iter()
        .enumerate()
        .flat_map(|(p, blocks)| {
            blocks
                .iter()
                .enumerate()
                .filter(|(_, b)| !b.text.trim().is_empty())
                .map(move |(i, _)| (p, i))
        })
        .collect();

    if to_classify.is_empty() {
        return Ok(pages);
    }

    let texts: Vec<&str> = to_classify
        .iter()
        .map(|&(p, i)| pages[p][i].text.as_str())
        .collect();
    let scores = classifier.classify_batch(&texts)?;
    if scores.len() != texts.len() {
        return Err(ModelError::BatchMismatch {
            expected: texts.len(),
            got: scores.len(),
        });
    }

    for ((p, i), cats) in to_classify.into_iter().zip(scores) {
        let block = &mut pages[p][i];
        block.is_affiliation = predicate.is_affiliation(&block.text, &cats)?;
        block.cats = cats;
    }

    let flagged = pages.iter().flatten().filter(|b| b.is_affiliation).count();
    tracing::debug!(
        pages = pages.len(),
        blocks = pages.iter().map(Vec::len).sum::<usize>(),
        flagged,
        "analyzed blocks"
    );

    Ok(pages)
}
