//! nachhilfe-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und verdrahtet die Subsysteme der
//! Echtzeit-Schicht.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use config::ServerConfig;
use nachhilfe_db::SqliteDb;
use nachhilfe_observability::{observability_server_starten, HealthState, NachhilfeMetriken};
use nachhilfe_signaling::{SignalingServer, SignalingState};
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbankverbindung herstellen (inkl. Migrationen)
    /// 2. Metriken und Signaling-Zustand aufbauen
    /// 3. Observability-Server und DB-Pruefung starten
    /// 4. TCP-Listener samt Anruf-Timeout-Sweeper starten
    /// 5. Auf Ctrl-C warten, dann alle Subsysteme ueber `watch` stoppen
    pub async fn starten(self) -> Result<()> {
        let tcp_addr = self.config.tcp_bind_adresse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %tcp_addr,
            "Server startet"
        );

        let db = Arc::new(SqliteDb::oeffnen(&self.config.datenbank_config()).await?);
        let metriken = NachhilfeMetriken::neu()?;

        let state = SignalingState::neu(
            self.config.signaling_config(),
            self.config.chat.clone(),
            Arc::clone(&db),
            metriken.clone(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        if self.config.observability.aktiviert {
            let obs_addr = self.config.observability_bind_adresse()?;
            let health = HealthState::neu();

            tokio::spawn(db_pruefen(
                Arc::clone(&db),
                health.clone(),
                Duration::from_secs(self.config.observability.db_pruef_intervall_sek.max(1)),
                shutdown_rx.clone(),
            ));

            let obs_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, metriken, health, obs_rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        let signaling = SignalingServer::binden(state, tcp_addr).await?;
        let signaling = signaling.starten(shutdown_rx);
        tokio::pin!(signaling);

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");

        tokio::select! {
            ergebnis = &mut signaling => {
                ergebnis?;
                tracing::warn!("Signaling-Server unerwartet beendet");
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
                signaling.await?;
            }
        }

        db.schliessen().await;
        Ok(())
    }
}

/// Setzt den DB-Status fuer `/health` periodisch
async fn db_pruefen(
    db: Arc<SqliteDb>,
    health: HealthState,
    intervall: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(intervall);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let erreichbar = db.erreichbar().await;
                if erreichbar != health.db_verbunden() {
                    tracing::warn!(erreichbar, "DB-Status geaendert");
                }
                health.db_status_setzen(erreichbar);
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
