use std::time::Duration;

use affiliator_core::ModelError;
use affiliator_core::config_file::ModelsConfig;

use crate::{DEFAULT_TIMEOUT, RemoteClassifier, RemoteTagger};

pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8080/classify";
pub const DEFAULT_TAGGER_URL: &str = "http://127.0.0.1:8080/tag";

pub const CLASSIFIER_URL_ENV: &str = "AFFILIATOR_CLASSIFIER_URL";
pub const TAGGER_URL_ENV: &str = "AFFILIATOR_TAGGER_URL";

/// Resolved locations of the model sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEndpoints {
    pub classifier_url: String,
    pub tagger_url: String,
    pub timeout: Duration,
}

impl Default for ModelEndpoints {
    fn default() -> Self {
        Self {
            classifier_url: DEFAULT_CLASSIFIER_URL.to_string(),
            tagger_url: DEFAULT_TAGGER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ModelEndpoints {
    /// Resolve configuration: explicit values > config file > env vars > defaults.
    pub fn resolve(
        classifier_url: Option<String>,
        tagger_url: Option<String>,
        file: Option<&ModelsConfig>,
    ) -> Self {
        Self::resolve_with_env(classifier_url, tagger_url, file, |key| {
            std::env::var(key).ok()
        })
    }

    fn resolve_with_env(
        classifier_url: Option<String>,
        tagger_url: Option<String>,
        file: Option<&ModelsConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();
        let classifier_url = classifier_url
            .or_else(|| file.and_then(|m| m.classifier_url.clone()))
            .or_else(|| env(CLASSIFIER_URL_ENV))
            .unwrap_or(defaults.classifier_url);
        let tagger_url = tagger_url
            .or_else(|| file.and_then(|m| m.tagger_url.clone()))
            .or_else(|| env(TAGGER_URL_ENV))
            .unwrap_or(defaults.tagger_url);
        let timeout = file
            .and_then(|m| m.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            classifier_url,
            tagger_url,
            timeout,
        }
    }

    /// Build the blocking HTTP clients for both models.
    ///
    /// Must be called outside an async runtime.
    pub fn connect(&self) -> Result<(RemoteClassifier, RemoteTagger), ModelError> {
        Ok((
            RemoteClassifier::new(self.classifier_url.clone(), self.timeout)?,
            RemoteTagger::new(self.tagger_url.clone(), self.timeout)?,
        ))
    }
}
