use std::sync::Arc;

use note_core::GitContentStore;
use note_core::NoteCoordinator;
use note_core::SqliteMetadataStore;
use note_core::TantivySearchIndex;
use note_server::config::Settings;
use note_server::routes;
use tower_http::trace::TraceLayer;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;
    tracing::info!(data_dir = %settings.data_dir.display(), "loaded configuration");

    let content_store = Arc::new(GitContentStore::open_or_init(settings.content_store_root())?);
    let metadata_store = Arc::new(SqliteMetadataStore::open(&settings.metadata_store_path()).await?);
    let search_index = Arc::new(TantivySearchIndex::open_or_create(
        &settings.search_index_dir(),
        settings.synonyms.clone(),
    )?);

    let coordinator = Arc::new(NoteCoordinator::new(content_store, metadata_store, search_index));

    tracing::info!("running startup reconciliation");
    coordinator.reconcile().await?;

    let app = routes::router(coordinator).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "note-server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
}
