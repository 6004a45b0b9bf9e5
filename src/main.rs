use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use versefind::{
    api::{build_router, AppState},
    catalog::{SpotifyCatalog, TrackFetcher},
    config::{Config, StoreBackend},
    indexing::{DocumentIndexer, IndexWorker, ProgressReporter, SessionCoordinator},
    lyrics::{default_sources, LyricResolver},
    search::SearchService,
    session::{cleanup_task, SessionRegistry},
    store::create_store,
};

#[derive(Parser)]
#[command(name = "versefind")]
#[command(version, about = "Lyric-aware search over a music streaming library", long_about = None)]
struct Args {
    /// Configuration file (overrides VERSEFIND_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, host:port
    #[arg(short, long)]
    listen: Option<String>,

    /// Elasticsearch base URL; selects the elasticsearch backend
    #[arg(short, long)]
    elastic: Option<String>,

    /// Log level filter, e.g. "debug" or "versefind=trace"
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args)?;

    init_tracing(&config, args.log_level.as_deref());

    tracing::info!("Starting versefind v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = versefind::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Initialize storage backend
    tracing::info!("Storage backend: {:?}", config.store.backend);
    let store = create_store(&config.store).context("Failed to create document store")?;
    store
        .ping()
        .await
        .context("Document store is not reachable")?;
    tracing::info!("Storage backend initialized");

    // Indexing pipeline
    let catalog = Arc::new(SpotifyCatalog::new(&config.catalog)?);
    let fetcher = TrackFetcher::new(catalog, config.catalog.page_size as usize);
    let resolver = Arc::new(LyricResolver::new(
        default_sources(&config.lyrics)?,
        config.lyrics.timeout(),
    ));
    let indexer = Arc::new(DocumentIndexer::new(
        store.clone(),
        resolver,
        config.store.timeout(),
    ));
    let coordinator = SessionCoordinator::new(
        IndexWorker::new(fetcher, indexer),
        ProgressReporter::new(
            config.indexing.progress_interval(),
            config.indexing.send_timeout(),
        ),
        config.server.handshake_timeout(),
    );

    let registry = Arc::new(SessionRegistry::new());
    if config.server.session_ttl_secs > 0 {
        let ttl = Duration::from_secs(config.server.session_ttl_secs);
        let every = Duration::from_secs(config.server.cleanup_interval_secs.max(1));
        tokio::spawn(cleanup_task(registry.clone(), ttl, every));
        tracing::info!(ttl_secs = config.server.session_ttl_secs, "Session cleanup task started");
    }

    let search = Arc::new(SearchService::new(store.clone(), &config.search));
    let app_state = AppState::new(registry, coordinator, search, store)
        .with_metrics(config.observability.prometheus_enabled);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = config.server.listen_addr();
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Progress stream: ws://{}/ws", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(listen) = &args.listen {
        let (host, port) = listen
            .rsplit_once(':')
            .with_context(|| format!("--listen expects host:port, got {}", listen))?;
        config.server.host = host.to_string();
        config.server.port = port
            .parse()
            .with_context(|| format!("invalid port in --listen: {}", port))?;
    }
    if let Some(elastic) = &args.elastic {
        config.store.backend = StoreBackend::Elasticsearch;
        config.store.elastic_url = elastic.clone();
    }
    Ok(())
}

fn init_tracing(config: &Config, log_level: Option<&str>) {
    let filter = log_level
        .and_then(|level| tracing_subscriber::EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::new(format!(
                "versefind={},tower_http=info",
                config.observability.log_level
            ))
        });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
