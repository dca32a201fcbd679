use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::Router;
use axum::response::Html;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::app::firestore::FirestoreSavedRecipeStore;
use crate::app::routes;
use crate::app::saved_store::{LocalFsSavedRecipeStore, SavedRecipeStore};
use crate::auth::{FirebaseIdentityVerifier, IdentityVerifier, UnconfiguredVerifier};
use crate::catalog::CatalogClient;
use crate::cli::ServeArgs;
use crate::config::{self, FirebaseWebConfig};

const PLACEHOLDER_PAGE: &str = r#"<!doctype html>
<html>
  <head><meta charset="utf-8"><title>Dish Recommender</title></head>
  <body>
    <h1>Dish Recommender</h1>
    <p>web client not found. Point <code>--web-dir</code> at a directory containing <code>index.html</code>.</p>
  </body>
</html>
"#;

pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let firebase_config = FirebaseWebConfig::from_env();
    let upstream_timeout = Duration::from_secs(args.upstream_timeout_secs.max(1));

    let verifier: Arc<dyn IdentityVerifier> = match &firebase_config.api_key {
        Some(api_key) => {
            tracing::info!("using firebase identity verifier");
            Arc::new(
                FirebaseIdentityVerifier::new(
                    api_key.clone(),
                    config::identity_base_url(),
                    upstream_timeout,
                )
                .context("identity verifier")?,
            )
        }
        None => {
            tracing::warn!("FIREBASE_API_KEY is not set; authenticated endpoints will answer 503");
            Arc::new(UnconfiguredVerifier)
        }
    };

    let store: Arc<dyn SavedRecipeStore> =
        match (&firebase_config.project_id, config::firestore_emulator_host()) {
            (Some(project_id), Some(host)) => {
                tracing::info!(project_id = %project_id, host = %host, "using firestore emulator store");
                Arc::new(
                    FirestoreSavedRecipeStore::with_emulator(
                        project_id.clone(),
                        &host,
                        upstream_timeout,
                    )
                    .context("firestore emulator store")?,
                )
            }
            (Some(project_id), None) => {
                tracing::info!(project_id = %project_id, "using firestore store");
                Arc::new(
                    FirestoreSavedRecipeStore::new(project_id.clone(), upstream_timeout)
                        .context("firestore store")?,
                )
            }
            (None, _) => {
                tracing::info!(data_dir = %args.data_dir.display(), "using local filesystem store");
                Arc::new(LocalFsSavedRecipeStore::new(args.data_dir.clone()))
            }
        };

    let catalog = CatalogClient::from_args(&args.catalog).context("catalog client")?;
    let state = AppState {
        catalog,
        verifier,
        store,
        firebase_config: Arc::new(firebase_config),
    };

    let app = routes::router(state)
        .merge(web_client(&args.web_dir))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve http")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Pages and assets of the browser client, or a placeholder page when it is not built.
fn web_client(web_dir: &Path) -> Router {
    let index = web_dir.join("index.html");
    if !index.exists() {
        tracing::warn!(web_dir = %web_dir.display(), "web client not found; serving placeholder");
        return Router::new()
            .route("/", get(|| async { Html(PLACEHOLDER_PAGE) }))
            .route("/saved", get(|| async { Html(PLACEHOLDER_PAGE) }));
    }

    Router::new()
        .route_service("/", ServeFile::new(index))
        .route_service("/saved", ServeFile::new(web_dir.join("saved_recipes.html")))
        .nest_service("/static", ServeDir::new(web_dir.join("static")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(?err, "install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(err) => {
                tracing::error!(?err, "install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
