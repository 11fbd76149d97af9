use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod corpus;
pub mod document;
pub mod types;

// Re-export for convenience
pub use backend::{BlockClassifier, EntityTagger};
pub use corpus::{CorpusError, PreprintCorpus};
pub use document::{Author, Document, Organization};
pub use types::{
    AFFILIATION, Block, CITATION, Categories, Entity, EntityLabel, NOT_AFFILIATION, RawEntity,
    TaggedDoc, Token, category_score,
};

/// Failure of an external model collaborator (classifier or tagger).
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
    #[error("classifier returned {got} results for {expected} blocks")]
    BatchMismatch { expected: usize, got: usize },
}

/// Errors raised while locating and parsing affiliations in a document.
///
/// `RegionNotFound` and `NoOrganizationEntity` are recoverable: the API
/// boundary turns them into an empty author list. `Model` is an
/// infrastructure failure and propagates.
#[derive(Error, Debug)]
pub enum AffiliationError {
    #[error("no block was classified as an affiliation")]
    RegionNotFound,
    #[error("keyed affiliations require at least one ORG entity")]
    NoOrganizationEntity,
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl AffiliationError {
    /// Whether this error means "the document has no usable affiliations"
    /// rather than a failure of the pipeline itself.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            AffiliationError::RegionNotFound | AffiliationError::NoOrganizationEntity
        )
    }
}
