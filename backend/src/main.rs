mod api;
mod auth;
mod config;
mod database;
mod errors;
mod middleware;
mod services;
mod state;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::database::Db;
use crate::middleware::{IpRateLimiter, RateLimitLayer};
use crate::services::seeder;
use crate::state::AppState;

const RATE_WINDOW: Duration = Duration::from_secs(15 * 60);
const API_QUOTA: u32 = 100;
const LOGIN_QUOTA: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load();
    let db = Db::connect(&config).await?;
    db.ensure_indexes().await?;
    seeder::seed_admin(&db, &config).await?;

    let api_limiter = IpRateLimiter::new(API_QUOTA, RATE_WINDOW);
    api_limiter.spawn_cleanup(RATE_WINDOW);
    let login_limiter = IpRateLimiter::new(LOGIN_QUOTA, RATE_WINDOW);
    login_limiter.spawn_cleanup(RATE_WINDOW);

    let cors = CorsLayer::new()
        .allow_origin(config.client_url.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let port = config.port;
    let state = Arc::new(AppState::new(config, db));

    let app = Router::new()
        .nest("/api", api::router(login_limiter))
        .layer(RateLimitLayer::new(api_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    info!(%port, "server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
