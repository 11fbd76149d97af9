use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::models::AnalyzeRequest;
use crate::state::AppState;

/// `POST /analyze`: authors and affiliations of the posted document text.
///
/// Blank text yields an empty author list. The model clients block, so
/// extraction runs on the blocking pool.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let worker = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        worker.extractor.extract_document(&req.text, worker.models())
    })
    .await;

    match result {
        Ok(Ok(document)) => {
            tracing::debug!(authors = document.authors.len(), "analyzed document");
            Json(document).into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "model service failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "extraction task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Extraction failed" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use affiliator_core::{
        AFFILIATION, BlockClassifier, Categories, EntityTagger, ModelError, TaggedDoc,
    };
    use affiliator_parsing::AffiliationExtractor;

    use crate::app;
    use crate::state::AppState;

    struct Flag(f64);

    impl BlockClassifier for Flag {
        fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Categories>, ModelError> {
            Ok(texts
                .iter()
                .map(|_| Categories::from([(AFFILIATION.to_string(), self.0)]))
                .collect())
        }
    }

    struct Fixed(TaggedDoc);

    impl EntityTagger for Fixed {
        fn tag(&self, _text: &str) -> Result<TaggedDoc, ModelError> {
            Ok(self.0.clone())
        }
    }

    struct Down;

    impl EntityTagger for Down {
        fn tag(&self, _text: &str) -> Result<TaggedDoc, ModelError> {
            Err(ModelError::Status {
                status: 503,
                body: "loading".to_string(),
            })
        }
    }

    fn tagged() -> TaggedDoc {
        TaggedDoc::from_words(&["Jane", "Doe", "x", "Physics", "MIT", "John", "Roe"])
            .with_entity("PERSON", 0, 2)
            .with_entity("ORG", 2, 3)
            .with_entity("ORG", 3, 4)
            .with_entity("ORG", 4, 5)
            .with_entity("PERSON", 5, 7)
    }

    fn state(score: f64, tagger: Arc<dyn EntityTagger>) -> Arc<AppState> {
        Arc::new(AppState {
            classifier: Arc::new(Flag(score)),
            tagger,
            extractor: AffiliationExtractor::new(),
        })
    }

    async fn post(state: Arc<AppState>, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn returns_authors_and_affiliations() {
        let (status, body) = post(
            state(0.9, Arc::new(Fixed(tagged()))),
            r#"{"text": "Jane Doe x\nPhysics, MIT\nJohn Roe"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "authors": [
                    { "name": "Jane Doe", "affiliations": [ { "name": "Physics, MIT" } ] }
                ]
            })
        );
    }

    #[tokio::test]
    async fn document_without_region_has_no_authors() {
        let (status, body) = post(
            state(0.1, Arc::new(Fixed(tagged()))),
            r#"{"text": "Introduction\n\nWe study things."}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "authors": [] }));
    }

    #[tokio::test]
    async fn blank_text_has_no_authors() {
        let (status, body) = post(state(0.9, Arc::new(Down)), r#"{"text": "  \n\n "}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "authors": [] }));
    }

    #[tokio::test]
    async fn missing_text_has_no_authors() {
        let (status, body) = post(state(0.9, Arc::new(Down)), "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "authors": [] }));
    }

    #[tokio::test]
    async fn model_failure_is_bad_gateway() {
        let (status, body) = post(state(0.9, Arc::new(Down)), r#"{"text": "Jane Doe, MIT"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(state(0.9, Arc::new(Down))).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
