//! REST API endpoints for thermo-service.
//!
//! Every handler takes the aggregator lock for the duration of one query, so
//! a response never reflects a partially ingested chunk.
//!
//! # Endpoints
//!
//! - `GET /health`, `GET /api/health` - Service health check
//! - `GET /api/stats` - Active sensor count and throughput
//! - `GET /api/sensors` - Summaries of every sensor, sorted by id
//! - `GET /api/sensors/{id}` - One sensor's summary and retained history
//!
//! ## Error Handling
//!
//! Client errors are returned as [`AppError`], which renders as
//! `{"error": "<message>"}` with a 4xx status.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;

use thermo_core::{SensorDetail, SensorStats, SensorSummary};
use thermo_types::MAX_SENSOR_ID;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/api/sensors", get(list_sensors))
        .route("/api/sensors/{id}", get(get_sensor))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub collector: CollectorHealth,
}

/// Collector status reported by the health check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorHealth {
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub bytes_ingested: u64,
}

/// Health check endpoint.
///
/// The service stays healthy while the collector is stopped; the
/// `collector` object says whether data is still flowing.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let collector = &state.collector;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        collector: CollectorHealth {
            running: collector.is_running(),
            started_at: collector.started_at(),
            bytes_ingested: collector.bytes_ingested(),
        },
    })
}

/// Aggregate statistics across all sensors.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<SensorStats> {
    Json(state.aggregator.lock().await.stats())
}

/// Summaries of all sensors seen so far.
async fn list_sensors(State(state): State<Arc<AppState>>) -> Json<Vec<SensorSummary>> {
    Json(state.aggregator.lock().await.all_sensors())
}

/// One sensor's summary and retained readings.
///
/// # Errors
///
/// - [`AppError::BadRequest`] if `id` is not an integer in 0-63.
/// - [`AppError::NotFound`] if no reading has been seen for the sensor.
async fn get_sensor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SensorDetail>, AppError> {
    let sensor_id = parse_sensor_id(&id)?;
    state
        .aggregator
        .lock()
        .await
        .sensor(sensor_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Sensor {} not found", sensor_id)))
}

fn parse_sensor_id(raw: &str) -> Result<u8, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|id| u8::try_from(id).ok())
        .filter(|id| *id <= MAX_SENSOR_ID)
        .ok_or_else(|| {
            AppError::BadRequest("Invalid sensor ID. Must be between 0 and 63.".to_string())
        })
}

/// API error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use thermo_core::ManualClock;

    use crate::config::Config;

    fn create_test_state() -> (Arc<AppState>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let state = AppState::with_clock(Config::default(), clock.clone());
        (state, clock)
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (state, _) = create_test_state();

        for uri in ["/health", "/api/health"] {
            let (status, json) = get_json(Arc::clone(&state), uri).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["status"], "ok");
            assert!(json["version"].is_string());
            assert!(json["timestamp"].is_string());
            assert_eq!(json["collector"]["running"], false);
            assert!(json["collector"]["startedAt"].is_null());
            assert_eq!(json["collector"]["bytesIngested"], 0);
        }
    }

    #[tokio::test]
    async fn test_health_reports_collector_progress() {
        let (state, _) = create_test_state();
        state.collector.set_running(true);
        state.collector.add_bytes(6);

        let (status, json) = get_json(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["collector"]["running"], true);
        assert!(json["collector"]["startedAt"].is_string());
        assert_eq!(json["collector"]["bytesIngested"], 6);
    }

    #[tokio::test]
    async fn test_stats_empty() {
        let (state, _) = create_test_state();

        let (status, json) = get_json(state, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["activeSensorCount"], 0);
        assert_eq!(json["averageMessagesPerMinute"], 0.0);
    }

    #[tokio::test]
    async fn test_stats_counts_trailing_minute() {
        let (state, clock) = create_test_state();
        state.aggregator.lock().await.ingest(&[0x80, 0x14, 0x82, 0x1E]);
        clock.advance(61_000);
        state.aggregator.lock().await.ingest(&[0x85, 0x20]);

        let (_, json) = get_json(state, "/api/stats").await;
        assert_eq!(json["activeSensorCount"], 3);
        assert_eq!(json["averageMessagesPerMinute"], 1.0);
    }

    #[tokio::test]
    async fn test_list_sensors_sorted() {
        let (state, _) = create_test_state();
        state
            .aggregator
            .lock()
            .await
            .ingest(&[0x89, 0x10, 0x82, 0x14, 0x89, 0x11]);

        let (status, json) = get_json(state, "/api/sensors").await;
        assert_eq!(status, StatusCode::OK);

        let sensors = json.as_array().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0]["sensorId"], 2);
        assert_eq!(sensors[1]["sensorId"], 9);
        assert_eq!(sensors[1]["averageTemperature"], 16.5);
        assert_eq!(sensors[1]["readingCount"], 2);
        assert_eq!(sensors[1]["lastReading"], 17);
        assert_eq!(sensors[1]["lastTimestamp"], 1_700_000_000_000u64);
    }

    #[tokio::test]
    async fn test_get_sensor_detail() {
        let (state, _) = create_test_state();
        state.aggregator.lock().await.ingest(&[0xA1, 0x10]);

        let (status, json) = get_json(state, "/api/sensors/33").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sensorId"], 33);
        assert_eq!(json["readingCount"], 1);
        assert_eq!(json["lastReading"], 16);

        let readings = json["readings"].as_array().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0]["temperature"], 16);
    }

    #[tokio::test]
    async fn test_get_sensor_not_found() {
        let (state, _) = create_test_state();

        let (status, json) = get_json(state, "/api/sensors/12").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Sensor 12 not found");
    }

    #[tokio::test]
    async fn test_get_sensor_invalid_ids() {
        let (state, _) = create_test_state();

        for id in ["64", "-1", "abc", "1.5", "99999999999999999999"] {
            let (status, json) = get_json(Arc::clone(&state), &format!("/api/sensors/{id}")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "id {id}");
            assert_eq!(json["error"], "Invalid sensor ID. Must be between 0 and 63.");
        }
    }

    #[test]
    fn test_parse_sensor_id_bounds() {
        assert_eq!(parse_sensor_id("0").unwrap(), 0);
        assert_eq!(parse_sensor_id("63").unwrap(), 63);
        assert!(parse_sensor_id("64").is_err());
        assert!(parse_sensor_id("").is_err());
    }

    #[tokio::test]
    async fn test_app_error_response() {
        let response = AppError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"error": "nope"}));
    }
}
