//! farecal: flight price-calendar service.
//!
//! Single-binary Tokio application that:
//! 1. Loads configuration and Amadeus credentials
//! 2. Samples cheapest fares across a month, normalized to USD
//! 3. Interpolates the uncovered days
//! 4. Serves the calendar over HTTP behind a stale-while-revalidate cache

mod config;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use amadeus_client::AmadeusClient;
use calendar::{CalendarConfig, FareSampler, PriceCalendar};
use common::FareSource;
use fx_client::FxConverter;
use routes::AppState;

/// Flight price-calendar service
#[derive(Parser)]
#[command(name = "farecal", about = "Flight price-calendar service")]
struct Cli {
    /// Just test Amadeus credentials and exit.
    #[arg(long)]
    check_auth: bool,
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farecal=info,amadeus_client=info,fx_client=info,calendar=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("✈️  farecal starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let env_label = if cfg.amadeus.use_test { "TEST" } else { "PRODUCTION" };
    info!("Amadeus environment: {}", env_label);
    info!(
        "Cache: fresh={}s stale={}s cap={} lookup_timeout={}s",
        cfg.cache.fresh_secs,
        cfg.cache.stale_secs,
        cfg.cache.max_entries,
        cfg.cache.lookup_timeout_secs,
    );

    let amadeus = Arc::new(AmadeusClient::new(
        cfg.amadeus.api_key.clone(),
        cfg.amadeus.api_secret.clone(),
        cfg.amadeus.use_test,
    ));

    if cli.check_auth {
        match amadeus.check_auth().await {
            Ok(()) => {
                info!("Amadeus credentials OK");
                return;
            }
            Err(e) => {
                error!("Auth check failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let fx = Arc::new(FxConverter::new());
    let sampler = FareSampler::new(amadeus as Arc<dyn FareSource>, fx)
        .with_lookup_timeout(Duration::from_secs(cfg.cache.lookup_timeout_secs));

    let calendar = PriceCalendar::new(
        sampler,
        CalendarConfig {
            fresh_ttl: Duration::from_secs(cfg.cache.fresh_secs),
            stale_ttl: Duration::from_secs(cfg.cache.stale_secs),
            max_entries: cfg.cache.max_entries,
        },
    );

    let state = AppState {
        calendar,
        cache_control: format!(
            "public, max-age=0, s-maxage={}, stale-while-revalidate={}",
            cfg.cache.fresh_secs, cfg.cache.stale_secs
        ),
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
