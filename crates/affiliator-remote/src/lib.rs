//! HTTP-backed model collaborators.
//!
//! The classifier and tagger are served by an external model sidecar. Both
//! clients are blocking: the core pipeline is synchronous, and async callers
//! run it on a blocking thread.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};

use affiliator_core::{BlockClassifier, Categories, EntityTagger, ModelError, TaggedDoc};

mod endpoints;

pub use endpoints::{
    CLASSIFIER_URL_ENV, DEFAULT_CLASSIFIER_URL, DEFAULT_TAGGER_URL, ModelEndpoints, TAGGER_URL_ENV,
};

/// Default per-request timeout for model calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("affiliator/", env!("CARGO_PKG_VERSION"));

fn build_client(timeout: Duration) -> Result<Client, ModelError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ModelError::Transport(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> ModelError {
    if e.is_decode() {
        ModelError::Malformed(e.to_string())
    } else {
        ModelError::Transport(e.to_string())
    }
}

/// Turn a non-2xx response into [`ModelError::Status`].
fn check_status(resp: Response) -> Result<Response, ModelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ModelError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    cats: Vec<Categories>,
}

/// Decode a classifier response body, checking one result per input.
pub fn decode_classification(body: &str, expected: usize) -> Result<Vec<Categories>, ModelError> {
    let parsed: ClassifyResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;
    if parsed.cats.len() != expected {
        return Err(ModelError::BatchMismatch {
            expected,
            got: parsed.cats.len(),
        });
    }
    Ok(parsed.cats)
}

/// Block classifier served at `POST {url}` with body `{"texts": [...]}`.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    url: String,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl BlockClassifier for RemoteClassifier {
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Categories>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(url = %self.url, blocks = texts.len(), "classifying blocks");

        let resp = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { texts })
            .send()
            .map_err(transport_error)?;
        let body = check_status(resp)?.text().map_err(transport_error)?;
        decode_classification(&body, texts.len())
    }
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

/// Decode a tagger response body.
///
/// Entity spans reaching past the token list are rejected.
pub fn decode_tagged(body: &str) -> Result<TaggedDoc, ModelError> {
    let doc: TaggedDoc =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;
    if let Some(bad) = doc
        .entities
        .iter()
        .find(|e| e.start > e.end || e.end > doc.tokens.len())
    {
        return Err(ModelError::Malformed(format!(
            "entity {} spans tokens {}..{} of {}",
            bad.label,
            bad.start,
            bad.end,
            doc.tokens.len()
        )));
    }
    Ok(doc)
}

/// Entity tagger served at `POST {url}` with body `{"text": "..."}`.
#[derive(Debug, Clone)]
pub struct RemoteTagger {
    client: Client,
    url: String,
}

impl RemoteTagger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EntityTagger for RemoteTagger {
    fn tag(&self, text: &str) -> Result<TaggedDoc, ModelError> {
        tracing::debug!(url = %self.url, chars = text.len(), "tagging text");

        let resp = self
            .client
            .post(&self.url)
            .json(&TagRequest { text })
            .send()
            .map_err(transport_error)?;
        let body = check_status(resp)?.text().map_err(transport_error)?;
        decode_tagged(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_classification() {
        let body = r#"{"cats":[{"AFFILIATION":0.9,"NOT_AFFILIATION":0.05},{"AFFILIATION":0.1}]}"#;
        let cats = decode_classification(body, 2).unwrap();
        assert_eq!(cats[0]["AFFILIATION"], 0.9);
        assert_eq!(cats[1].len(), 1);
    }

    #[test]
    fn test_decode_classification_length_mismatch() {
        let body = r#"{"cats":[{"AFFILIATION":0.9}]}"#;
        assert!(matches!(
            decode_classification(body, 3),
            Err(ModelError::BatchMismatch {
                expected: 3,
                got: 1
            })
        ));
    }

    #[test]
    fn test_decode_classification_malformed() {
        assert!(matches!(
            decode_classification(r#"{"scores":[]}"#, 0),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_tagged() {
        let body = r#"{
            "text": "Jane Doe, MIT",
            "tokens": [
                {"text": "Jane", "pos": "PROPN"},
                {"text": "Doe", "pos": "PROPN", "ws": false},
                {"text": ",", "pos": "PUNCT"},
                {"text": "MIT", "pos": "PROPN", "ws": false}
            ],
            "ents": [
                {"label": "PERSON", "start": 0, "end": 2},
                {"label": "ORG", "start": 3, "end": 4}
            ]
        }"#;
        let doc = decode_tagged(body).unwrap();
        assert_eq!(doc.tokens.len(), 4);
        assert_eq!(doc.span_text(0, 2), "Jane Doe");
        assert_eq!(doc.entities[1].label, "ORG");
    }

    #[test]
    fn test_decode_tagged_rejects_out_of_range_entity() {
        let body = r#"{"text":"x","tokens":[{"text":"x"}],"ents":[{"label":"ORG","start":0,"end":2}]}"#;
        assert!(matches!(decode_tagged(body), Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_empty_batch_skips_request() {
        let classifier =
            RemoteClassifier::new("http://127.0.0.1:9/classify", Duration::from_millis(50)).unwrap();
        assert!(classifier.classify_batch(&[]).unwrap().is_empty());
        assert_eq!(classifier.url(), "http://127.0.0.1:9/classify");
    }

    #[test]
    fn test_unreachable_service_is_transport_error() {
        let tagger = RemoteTagger::new("http://127.0.0.1:9/tag", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            tagger.tag("Jane Doe"),
            Err(ModelError::Transport(_))
        ));
    }
}
