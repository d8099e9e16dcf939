//! Wildfire Tracker — Binary Entrypoint
//! Boots the Axum HTTP server, wiring adapters, pollers, shared state, and
//! middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wildfire_tracker::api::{create_router, AppState};
use wildfire_tracker::config::AppConfig;
use wildfire_tracker::forum::ForumBoard;
use wildfire_tracker::metrics::Metrics;
use wildfire_tracker::poller::{DomainState, Poller};
use wildfire_tracker::sources::air_quality::AirQualityFeed;
use wildfire_tracker::sources::fires::FireFeed;
use wildfire_tracker::sources::incidents::IncidentScraper;
use wildfire_tracker::sources::news::NewsFeed;
use wildfire_tracker::sources::social::SocialFeed;
use wildfire_tracker::sources::{self};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wildfire_tracker=info,poll=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables the
    // API keys and WILDFIRE_CONFIG_PATH before config load.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;
    sources::ensure_metrics_described();
    let metrics = Metrics::init(cfg.news.cache_ttl_secs, cfg.social.cache_ttl_secs);

    let client = reqwest::Client::builder()
        .user_agent(concat!("wildfire-tracker/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(std::time::Duration::from_secs(4))
        .timeout(std::time::Duration::from_secs(15))
        .build()
        .context("building http client")?;

    let fire_feed = Arc::new(FireFeed::new(client.clone(), cfg.fires.clone()));
    let fires = Arc::new(DomainState::new("fires"));
    let stats = Arc::new(DomainState::new("stats"));

    let mut poller = Poller::new();
    poller.spawn_fires(fires.clone(), fire_feed, cfg.fires.poll_interval());

    let state = AppState {
        forum: Arc::new(ForumBoard::new()),
        fires,
        stats,
        incidents: Arc::new(IncidentScraper::new(client.clone(), cfg.incidents.clone())),
        air: Arc::new(AirQualityFeed::new(client.clone(), cfg.air.clone())),
        news: Arc::new(NewsFeed::new(client.clone(), cfg.news.clone())),
        social: Arc::new(SocialFeed::new(client, cfg.social.clone())),
        stats_max_age: cfg.incidents.max_age(),
    };

    let app = create_router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "wildfire tracker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    poller.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
