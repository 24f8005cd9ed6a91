//! Prometheus-kompatible Metriken der Echtzeit-Schicht
//!
//! Registrierte Metriken:
//! - `nachhilfe_connected_clients` – Gauge: Aktuell gebundene Identitaeten
//! - `nachhilfe_messages_persisted_total` – Counter: Persistierte Chat-Nachrichten
//! - `nachhilfe_live_deliveries_total` – Counter: Live zugestellte Ereignisse (event)
//! - `nachhilfe_active_call_sessions` – Gauge: Laufende Anruf-Sitzungen
//! - `nachhilfe_call_outcomes_total` – Counter: Anruf-Ausgaenge (outcome)

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::error::ObservabilityResult;

/// Alle Prometheus-Metriken der Echtzeit-Schicht
#[derive(Clone)]
pub struct NachhilfeMetriken {
    pub registry: Arc<Registry>,

    // Verbindungen
    pub connected_clients: IntGauge,

    // Chat
    pub messages_persisted_total: IntCounter,
    pub live_deliveries_total: IntCounterVec,

    // Anrufe
    pub active_call_sessions: IntGauge,
    pub call_outcomes_total: IntCounterVec,
}

impl NachhilfeMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> ObservabilityResult<Self> {
        let registry = Registry::new();

        let connected_clients = IntGauge::with_opts(Opts::new(
            "nachhilfe_connected_clients",
            "Anzahl aktuell gebundener Identitaeten",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let messages_persisted_total = IntCounter::with_opts(Opts::new(
            "nachhilfe_messages_persisted_total",
            "Gesamtanzahl persistierter Chat-Nachrichten",
        ))?;
        registry.register(Box::new(messages_persisted_total.clone()))?;

        let live_deliveries_total = IntCounterVec::new(
            Opts::new(
                "nachhilfe_live_deliveries_total",
                "Live zugestellte Ereignisse nach Ereignisname",
            ),
            &["event"],
        )?;
        registry.register(Box::new(live_deliveries_total.clone()))?;

        let active_call_sessions = IntGauge::with_opts(Opts::new(
            "nachhilfe_active_call_sessions",
            "Anzahl laufender Anruf-Sitzungen",
        ))?;
        registry.register(Box::new(active_call_sessions.clone()))?;

        let call_outcomes_total = IntCounterVec::new(
            Opts::new("nachhilfe_call_outcomes_total", "Anruf-Ausgaenge nach Art"),
            &["outcome"],
        )?;
        registry.register(Box::new(call_outcomes_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            messages_persisted_total,
            live_deliveries_total,
            active_call_sessions,
            call_outcomes_total,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> ObservabilityResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: NachhilfeMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<NachhilfeMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = NachhilfeMetriken::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn gauge_connected_clients_setzen() {
        let metriken = NachhilfeMetriken::neu().unwrap();
        metriken.connected_clients.set(3);
        assert_eq!(metriken.connected_clients.get(), 3);
    }

    #[test]
    fn zustellungen_nach_event_gezaehlt() {
        let metriken = NachhilfeMetriken::neu().unwrap();
        let zaehler = &metriken.live_deliveries_total;
        zaehler.with_label_values(&["chat-message-delivered"]).inc();
        zaehler.with_label_values(&["chat-message-delivered"]).inc();
        zaehler.with_label_values(&["typing"]).inc();

        assert_eq!(zaehler.with_label_values(&["chat-message-delivered"]).get(), 2);
        assert_eq!(zaehler.with_label_values(&["typing"]).get(), 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = NachhilfeMetriken::neu().unwrap();
        metriken.messages_persisted_total.inc();
        metriken
            .call_outcomes_total
            .with_label_values(&["timeout"])
            .inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("nachhilfe_messages_persisted_total 1"));
        assert!(output.contains("nachhilfe_call_outcomes_total{outcome=\"timeout\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn getrennte_instanzen_teilen_keine_werte() {
        let a = NachhilfeMetriken::neu().unwrap();
        let b = NachhilfeMetriken::neu().unwrap();
        a.active_call_sessions.set(2);
        assert_eq!(b.active_call_sessions.get(), 0);
    }

    #[tokio::test]
    async fn metrics_endpunkt_liefert_textformat() {
        let metriken = NachhilfeMetriken::neu().unwrap();
        metriken.connected_clients.set(7);

        let antwort = metrics_router(metriken)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("nachhilfe_connected_clients 7"));
    }
}
