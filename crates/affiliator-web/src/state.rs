use std::sync::Arc;

use affiliator_core::{BlockClassifier, EntityTagger};
use affiliator_parsing::{AffiliationExtractor, Models};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub classifier: Arc<dyn BlockClassifier>,
    pub tagger: Arc<dyn EntityTagger>,
    pub extractor: AffiliationExtractor,
}

impl AppState {
    pub fn models(&self) -> Models<'_> {
        Models::new(self.classifier.as_ref(), self.tagger.as_ref())
    }
}
