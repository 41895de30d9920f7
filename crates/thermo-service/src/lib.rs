//! HTTP and WebSocket service for 2-byte temperature telemetry.
//!
//! This crate provides a service that:
//! - Reads the frame stream from a measuring process or a synthetic generator
//! - Aggregates per-sensor statistics in memory
//! - Exposes a REST API for querying snapshots
//! - Pushes live readings to WebSocket subscribers, optionally per sensor
//!
//! # REST API Endpoints
//!
//! - `GET /health`, `GET /api/health` - Service health check
//! - `GET /api/stats` - Active sensor count and readings in the last minute
//! - `GET /api/sensors` - Per-sensor summaries
//! - `GET /api/sensors/{id}` - One sensor with its last 100 readings
//! - `WS /ws` - Real-time readings stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/thermo/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [source]
//! mode = "process"
//! command = "measure_temp"
//! args = []
//!
//! [source.mock]
//! sensor_count = 10
//! interval_ms = 2000
//! noise_ratio = 0.1
//! ```

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod collector;
pub mod config;
pub mod state;
pub mod ws;

pub use collector::{Collector, CollectorExit, open_source, start_collector};
pub use config::{
    Config, ConfigError, MockConfig, ServerConfig, SourceConfig, SourceMode, ValidationError,
};
pub use state::{AppState, CollectorState};

/// Build the full application router: REST API, WebSocket, tracing and CORS.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_app_serves_api_with_cors() {
        let app = app(AppState::new(Config::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sensors")
                    .header(header::ORIGIN, "http://localhost:4200")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_serves_stats_when_source_fails_to_start() {
        let config = Config {
            source: SourceConfig {
                mode: SourceMode::Process,
                command: "thermo-no-such-command-xyz".to_string(),
                ..SourceConfig::default()
            },
            ..Config::default()
        };
        let state = AppState::new(config);
        assert!(start_collector(Arc::clone(&state)).is_none());

        let response = app(state)
            .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app(AppState::new(Config::default()));

        let response = app
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
