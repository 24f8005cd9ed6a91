//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen Task mit einer `ClientConnection`.
//!
//! ## Concurrency-Modell
//! Die Repository-Traits verwenden async fn ohne Send-Garantie
//! (async_fn_in_trait). Alle Verbindungs-Tasks und der Anruf-Timeout-Sweeper
//! laufen deshalb in einer `tokio::task::LocalSet`.
//!
//! ## Shutdown
//! Nach dem Shutdown-Signal nimmt der Listener nichts mehr an und wartet
//! bis zu [`ABSCHIEDS_FRIST`] auf die offenen Verbindungen. Jede sendet
//! ihren Abschied und raeumt ihre Bindung ab; was danach noch laeuft,
//! wird abgebrochen.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinSet, LocalSet};

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::{Datenbank, SignalingState};

/// Wie lange offene Verbindungen beim Shutdown Zeit zum Abschied haben
pub const ABSCHIEDS_FRIST: Duration = Duration::from_secs(5);

/// TCP-Signaling-Server
///
/// Der Socket wird in `binden` geoeffnet, damit Aufrufer (und Tests) die
/// tatsaechliche Adresse kennen bevor Verbindungen angenommen werden.
pub struct SignalingServer<D: Datenbank> {
    state: Arc<SignalingState<D>>,
    listener: TcpListener,
}

impl<D: Datenbank> SignalingServer<D> {
    /// Bindet den TCP-Socket
    pub async fn binden(state: Arc<SignalingState<D>>, addr: SocketAddr) -> SignalingResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { state, listener })
    }

    /// Tatsaechlich gebundene Adresse (relevant bei Port 0)
    pub fn lokale_addr(&self) -> SignalingResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Startet Accept-Loop und Timeout-Sweeper in einer eigenen `LocalSet`
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: tokio::sync::watch::Receiver<bool>) -> SignalingResult<()> {
        let local = LocalSet::new();
        local
            .run_until(async move {
                let sweeper = Arc::clone(&self.state).timeout_sweeper(shutdown_rx.clone());
                tokio::task::spawn_local(sweeper);
                self.verbindungen_annehmen(shutdown_rx).await
            })
            .await
    }

    /// Accept-Loop; muss innerhalb einer `LocalSet` laufen
    ///
    /// `max_clients` begrenzt die offenen Sockets, unabhaengig davon ob
    /// schon eine Identitaet angekuendigt wurde.
    pub async fn verbindungen_annehmen(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        tracing::info!(
            adresse = %self.lokale_addr()?,
            server = %self.state.config.server_name,
            "TCP Signaling-Server gestartet"
        );

        let mut verbindungen = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let offen = verbindungen.len();
                            if offen >= self.state.config.max_clients as usize {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_clients,
                                    "Server voll – Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let verbindung = ClientConnection::neu(Arc::clone(&self.state), peer_addr);
                            let shutdown_rx_clone = shutdown_rx.clone();

                            // Lokaler Task – kein Send erforderlich
                            verbindungen.spawn_local(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Some(beendet) = verbindungen.join_next(), if !verbindungen.is_empty() => {
                    if let Err(e) = beendet {
                        tracing::error!(fehler = %e, "Verbindungs-Task abgebrochen");
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        verbindungen_abwarten(&mut verbindungen).await;

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }
}

/// Wartet bis alle Verbindungs-Tasks beendet sind, hoechstens `ABSCHIEDS_FRIST`
async fn verbindungen_abwarten(verbindungen: &mut JoinSet<()>) {
    if verbindungen.is_empty() {
        return;
    }
    tracing::info!(offen = verbindungen.len(), "Warte auf offene Verbindungen");

    let alle_beendet = async {
        while verbindungen.join_next().await.is_some() {}
    };
    let abgelaufen = tokio::time::timeout(ABSCHIEDS_FRIST, alle_beendet)
        .await
        .is_err();

    if abgelaufen {
        tracing::warn!(
            verbleibend = verbindungen.len(),
            "Abschieds-Frist abgelaufen – Verbindungen werden abgebrochen"
        );
        verbindungen.shutdown().await;
    }
}
