//! Quill server entry point.

use std::sync::Arc;
use std::time::Duration;

use quill_common::{Config, LocalStorage};
use quill_web::{AppState, PageCache, router};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve on SIGINT or, on Unix, SIGTERM.
///
/// A signal that cannot be listened for never fires; the other still can.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    info!(signal = received, "Shutting down gracefully");
}

/// Install the global subscriber. `QUILL_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill=debug,tower_http=debug".into());
    let json = std::env::var("QUILL_LOG_FORMAT").is_ok_and(|format| format == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Drop expired index pages once per cache lifetime.
fn spawn_cache_sweeper(cache: PageCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cache.ttl().max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            cache.purge_expired().await;
            let entries = cache.len().await;
            debug!(entries, "Swept page cache");
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting quill server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = quill_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    quill_db::migrate(&db).await?;
    info!("Migrations completed");

    // Media storage
    tokio::fs::create_dir_all(&config.storage.media_root).await?;
    let storage = Arc::new(LocalStorage::new(
        config.storage.media_root.clone(),
        config.storage.media_url.clone(),
    ));
    info!(root = %storage.root().display(), "Using local media storage");

    let state = AppState::new(Arc::new(db), storage, &config);
    spawn_cache_sweeper(state.page_cache.clone());

    // Build router
    let media_url = format!("/{}", config.storage.media_url.trim_matches('/'));
    let app = router(state)
        .nest_service(&media_url, ServeDir::new(&config.storage.media_root))
        .layer(RequestBodyLimitLayer::new(config.server.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
