//! Health-Check-Endpunkt
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und DB-Verbindungsstatus.
//! Den DB-Status setzt der Server periodisch ueber `db_status_setzen`.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub db_connected: bool,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub db_connected: Arc<std::sync::atomic::AtomicBool>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db_connected: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn db_verbunden(&self) -> bool {
        self.db_connected.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn db_status_setzen(&self, verbunden: bool) {
        self.db_connected
            .store(verbunden, std::sync::atomic::Ordering::Relaxed);
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let db_connected = state.db_verbunden();
    let status = if db_connected {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let http_status = match status {
        HealthStatus::Healthy => StatusCode::OK,
        // 200 auch bei degraded, Live-Zustellung laeuft ohne DB weiter
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        db_connected,
    };

    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    async fn abfragen(state: HealthState) -> (StatusCode, HealthResponse) {
        let antwort = health_router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = antwort.status();
        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn health_state_db_standard_verbunden() {
        let state = HealthState::neu();
        assert!(state.db_verbunden());
        assert!(state.uptime_seconds() < 5);
    }

    #[test]
    fn health_state_db_status_umschalten() {
        let state = HealthState::neu();
        let kopie = state.clone();
        state.db_status_setzen(false);
        assert!(!kopie.db_verbunden());
        state.db_status_setzen(true);
        assert!(kopie.db_verbunden());
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Degraded,
            version: "0.1.0".to_string(),
            uptime_seconds: 120,
            db_connected: false,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(json.contains("\"uptime_seconds\":120"));
        assert!(json.contains("\"db_connected\":false"));
    }

    #[tokio::test]
    async fn endpunkt_gesund() {
        let (status, antwort) = abfragen(HealthState::neu()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert!(antwort.db_connected);
    }

    #[tokio::test]
    async fn endpunkt_degraded_ohne_db() {
        let state = HealthState::neu();
        state.db_status_setzen(false);
        let (status, antwort) = abfragen(state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(antwort.status, HealthStatus::Degraded);
        assert!(!antwort.db_connected);
    }
}
