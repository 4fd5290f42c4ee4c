//! Profiles API - User profiles, login tokens, a status feed, and message
//! sentiment analysis over HTTP.
//!
//! This crate provides:
//! - Profile registration, search, and owner-only updates
//! - JWT login tokens (`Authorization: Token <jwt>` or `Bearer <jwt>`)
//! - An authenticated status feed
//! - Sentiment analysis of free text via `profiles-sentiment`
//! - SQLite persistence
//!
//! ## Request flow
//!
//! ```text
//! Client → CORS → timeout → trace → auth (optional) → handler → store / analyzer
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod auth;
pub mod feed;
pub mod message;
pub mod permissions;
pub mod profile;
pub mod routes;
pub mod store;

pub use auth::{AuthState, AuthUser};
pub use routes::{build_all_routes, build_all_routes_with_db, AppState, ErrorResponse};

use axum::{middleware, Router};
use profiles_common::config::Config;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Wrap application routes with the shared middleware stack.
pub fn with_middleware(router: Router, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Layers applied innermost-first; equivalent to a ServiceBuilder with
    // cors outermost, but lets axum re-box the body between layers.
    router
        .layer(middleware::from_fn(profiles_common::logging::trace_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.network.request_timeout_secs,
        )))
        .layer(cors)
}

/// Build the service router with all routes and middleware.
pub fn build_router(config: &Config) -> anyhow::Result<Router> {
    Ok(with_middleware(routes::build_all_routes(config)?, config))
}

/// Start the HTTP server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.network.bind.parse::<std::net::IpAddr>()?,
        config.network.port,
    ));

    let router = build_router(config)?;

    tracing::info!("Starting profiles API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
