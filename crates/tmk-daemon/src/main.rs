//! tmk-daemon entry point.
//!
//! Sets up tracing, loads optional layered config, builds the shared state,
//! wires middleware, and starts the HTTP server. Handlers live in
//! `routes.rs`; shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tmk_config::{report_unused_keys, ConfigMode, LoadedConfig, UnusedKeyPolicy};
use tmk_daemon::{routes, state};
use tmk_ledger::ReplayOptions;
use tmk_md::{PricingService, RestTransactionFeed, StoreClient};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const DEFAULT_ADDR: &str = "127.0.0.1:8899";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let mut app_state = state::AppState::new();
    let mut config_addr = None;

    if let Some(paths) = config_paths_from_env() {
        let loaded = load_config(&paths)?;
        let market = loaded.market()?;
        let secrets = tmk_config::resolve_secrets(&loaded.config_json)?;
        info!(config_hash = %loaded.config_hash, "config loaded");

        let options = ReplayOptions::from_names(
            &market.ledger.oversell_policy,
            &market.ledger.coercion_policy,
        )
        .context("invalid /ledger section")?;
        app_state = app_state.with_options(options);

        if !market.assets.is_empty() {
            let pricing = PricingService::from_config(&market, secrets.store_api_key.as_deref())
                .context("failed to build asset registry")?;
            app_state = app_state.with_pricing(pricing);
        }

        if let (Some(store), Some(key)) = (&market.store, secrets.store_api_key.as_ref()) {
            let client = StoreClient::new(store.base_url.clone(), key.clone());
            app_state = app_state.with_feed(Arc::new(RestTransactionFeed::new(client)));
        }

        config_addr = Some(market.daemon.addr);
    }

    let shared = Arc::new(app_state);
    info!(
        oversell = shared.options.oversell.as_str(),
        coercion = shared.options.coercion.as_str(),
        pricing = shared.pricing.is_some(),
        feed = shared.feed.is_some(),
        "daemon state ready"
    );

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = resolve_addr(config_addr.as_deref())?;
    info!("tmk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `TMK_CONFIG_PATHS`: comma-separated, base first.
fn config_paths_from_env() -> Option<Vec<String>> {
    let raw = std::env::var("TMK_CONFIG_PATHS").ok()?;
    let paths: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (!paths.is_empty()).then_some(paths)
}

fn load_config(paths: &[String]) -> anyhow::Result<LoadedConfig> {
    let loaded = tmk_config::load_layered_yaml(paths)?;
    let report = report_unused_keys(
        ConfigMode::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys tmk-daemon does not read");
    }
    Ok(loaded)
}

/// `TMK_DAEMON_ADDR` wins over `/daemon/addr`.
fn resolve_addr(config_addr: Option<&str>) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var("TMK_DAEMON_ADDR")
        .ok()
        .or_else(|| config_addr.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    raw.parse()
        .with_context(|| format!("invalid listen address '{raw}'"))
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
