//! # nachhilfe-observability
//!
//! Observability fuer die Echtzeit-Schicht:
//! - Prometheus-kompatible Metriken (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber (text oder JSON)

pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;

pub use error::{ObservabilityError, ObservabilityResult};
pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, NachhilfeMetriken};

use std::net::SocketAddr;

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
///
/// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: NachhilfeMetriken,
    health: HealthState,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> ObservabilityResult<()> {
    let app = axum::Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;

    tracing::info!("Observability-Server gestoppt");
    Ok(())
}
