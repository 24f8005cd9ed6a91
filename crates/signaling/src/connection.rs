//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! lokalen Task. Eingehende Frames werden strikt nacheinander verarbeitet;
//! damit bleibt die Reihenfolge pro Client erhalten.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` ein `ping`
//! - Jeder eingehende Frame zaehlt als Lebenszeichen
//! - Ohne Frame innerhalb von `verbindungs_timeout_sek` wird getrennt
//!
//! ## Cleanup
//! Beim Verbindungsende wird die Bindung abgemeldet (Presence offline) und
//! eine laufende Anruf-Sitzung beendet, bevor der Task endet.

use futures_util::{SinkExt, StreamExt};
use nachhilfe_protocol::events::FehlerCode;
use nachhilfe_protocol::{ClientEvent, FrameCodec, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::{Datenbank, SignalingState};

/// Frames werden erst als JSON-Wert gelesen; ein unbekanntes Ereignis
/// beendet so nicht den ganzen Stream.
type ClientFrames = Framed<TcpStream, FrameCodec<serde_json::Value>>;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection<D: Datenbank> {
    state: Arc<SignalingState<D>>,
    peer_addr: SocketAddr,
}

impl<D: Datenbank> ClientConnection<D> {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<D>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Raeumt danach die Bindung ab.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::<serde_json::Value>::new());

        // Ausgehende Ereignisse anderer Verbindungen (Register -> TCP)
        let (sende_tx, mut sende_rx) =
            mpsc::channel::<ServerEvent>(self.state.config.sende_queue_groesse);

        let mut ctx = DispatcherContext::neu(peer_addr, sende_tx);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        let ergebnis = self
            .schleife(&mut framed, &mut sende_rx, &mut ctx, &dispatcher, shutdown_rx)
            .await;

        match ergebnis {
            Ok(()) => tracing::info!(peer = %peer_addr, "Verbindung geschlossen"),
            Err(SignalingError::VerbindungGetrennt) => {
                tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt")
            }
            Err(SignalingError::Timeout) => tracing::warn!(peer = %peer_addr, "Verbindungs-Timeout"),
            Err(e) => tracing::warn!(peer = %peer_addr, fehler = %e, "Verbindung abgebrochen"),
        }

        // Cleanup beim Verbindungsende
        dispatcher.client_cleanup(&mut ctx);

        tracing::debug!(peer = %peer_addr, "Verbindungs-Task beendet");
    }

    async fn schleife(
        &self,
        framed: &mut ClientFrames,
        sende_rx: &mut mpsc::Receiver<ServerEvent>,
        ctx: &mut DispatcherContext,
        dispatcher: &MessageDispatcher<D>,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek.max(1));

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        // Zeitpunkt des naechsten Ping
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                return Err(SignalingError::Timeout);
            }

            let ping_verzoegerung = naechster_ping
                .saturating_duration_since(jetzt)
                .max(Duration::from_millis(1));

            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(wert)) => {
                            letzter_empfang = Instant::now();
                            match serde_json::from_value::<ClientEvent>(wert) {
                                Ok(event) => {
                                    if let Some(antwort) = dispatcher.dispatch(event, ctx).await {
                                        senden(framed, antwort).await?;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(peer = %ctx.peer_addr, fehler = %e, "Ungueltiges Ereignis");
                                    let antwort = ServerEvent::fehler(
                                        FehlerCode::InvalidRequest,
                                        format!("Ungueltiges Ereignis: {e}"),
                                    );
                                    senden(framed, antwort).await?;
                                }
                            }
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(SignalingError::VerbindungGetrennt),
                    }
                }

                // Ausgehendes Ereignis aus dem Register
                Some(ausgehend) = sende_rx.recv() => {
                    senden(framed, ausgehend).await?;
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        let ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                        senden(framed, ServerEvent::ping(ts)).await?;
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %ctx.peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = ServerEvent::fehler(
                            FehlerCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn senden(framed: &mut ClientFrames, event: ServerEvent) -> SignalingResult<()> {
    tracing::trace!(event = event.name(), "Ereignis senden");
    framed.send(event).await.map_err(SignalingError::from)
}
