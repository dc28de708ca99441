use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod chain;
mod config;
mod constants;
mod error;
mod fees;
mod models;
mod services;

use config::Config;
use constants::API_VERSION;
use services::{DuelPlatformService, OracleService, ResultFeedClient, ResultSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duel_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Duel Platform Backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!("Contract: {}", config.contract_address);

    // Contract reader with its read-through cache
    let contract = chain::build_read_contract(&config)?;
    let duel = Arc::new(DuelPlatformService::new(contract));

    // Oracle settlement service
    let feed: Arc<dyn ResultSource> = Arc::new(ResultFeedClient::from_config(&config));
    let oracle = Arc::new(OracleService::from_config(&config, feed, duel.clone())?);

    if config.oracle_autostart {
        tracing::info!("Autostarting oracle service");
        oracle.clone().start();
    }

    let app_state = api::AppState {
        duel,
        oracle,
        config: config.clone(),
    };

    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Matches
        .route(
            "/api/matches",
            get(api::matches::list_matches).post(api::matches::match_webhook),
        )
        .route("/api/matches/{id}", get(api::matches::get_match))
        // Stats
        .route("/api/stats/platform", get(api::stats::platform_stats))
        .route("/api/stats/recent", get(api::stats::recent_matches))
        // Users
        .route("/api/users/{address}/stats", get(api::users::user_stats))
        .route(
            "/api/users/{address}/matches",
            get(api::users::user_matches),
        )
        // Oracle
        .route("/api/oracle/status", get(api::oracle::status))
        .route("/api/oracle/start", post(api::oracle::start))
        .route("/api/oracle/stop", post(api::oracle::stop))
        .route("/api/oracle/settle", post(api::oracle::settle))
        .route("/api/oracle/submit", post(api::oracle::submit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
