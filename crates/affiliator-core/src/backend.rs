use crate::types::{Categories, TaggedDoc};
use crate::ModelError;

/// Trait for block classifiers scoring text as affiliation-like.
///
/// Implementors wrap an external text-classification model; the block
/// analysis and region selection live in `affiliator_parsing`.
pub trait BlockClassifier: Send + Sync {
    /// Score a batch of blocks. Must return exactly one mapping per input, in order.
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Categories>, ModelError>;

    /// Score a single block.
    fn classify(&self, text: &str) -> Result<Categories, ModelError> {
        let mut cats = self.classify_batch(&[text])?;
        if cats.len() != 1 {
            return Err(ModelError::BatchMismatch {
                expected: 1,
                got: cats.len(),
            });
        }
        cats.pop().ok_or(ModelError::BatchMismatch {
            expected: 1,
            got: 0,
        })
    }
}

/// Trait for named-entity taggers producing PERSON/ORG/GPE spans.
pub trait EntityTagger: Send + Sync {
    /// Tokenize and tag `text`.
    fn tag(&self, text: &str) -> Result<TaggedDoc, ModelError>;
}
