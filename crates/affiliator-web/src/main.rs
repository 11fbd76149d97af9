use std::net::SocketAddr;
use std::sync::Arc;

use affiliator_core::config_file;
use affiliator_parsing::{AffiliationExtractor, ParsingConfigBuilder};
use affiliator_remote::ModelEndpoints;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod handlers;
mod models;
mod state;

use state::AppState;

fn app(state: Arc<AppState>) -> axum::Router {
    // Preprint texts are small; refuse anything larger than 10MB
    let body_limit = axum::extract::DefaultBodyLimit::max(10 * 1024 * 1024);

    axum::Router::new()
        .route("/analyze", axum::routing::post(handlers::analyze::analyze))
        .route("/health", axum::routing::get(handlers::health::health))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("affiliator=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Resolve configuration: config file > env vars > defaults
    let file = config_file::load_config();
    let config = file
        .parsing
        .as_ref()
        .map(ParsingConfigBuilder::from_section)
        .unwrap_or_default()
        .build()?;
    let endpoints = ModelEndpoints::resolve(None, None, file.models.as_ref());

    // Blocking clients run their own runtime; build them before ours starts.
    let (classifier, tagger) = endpoints.connect()?;
    tracing::info!(
        classifier = %endpoints.classifier_url,
        tagger = %endpoints.tagger_url,
        "using model services"
    );

    let state = Arc::new(AppState {
        classifier: Arc::new(classifier),
        tagger: Arc::new(tagger),
        extractor: AffiliationExtractor::with_config(config),
    });

    let addr = std::env::var("AFFILIATOR_ADDR")
        .ok()
        .and_then(|v| v.parse::<SocketAddr>().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5001)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(app(Arc::clone(&state)), addr))?;
    drop(runtime);

    // Last reference: the clients must be dropped outside the runtime.
    drop(state);
    Ok(())
}

async fn serve(app: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
