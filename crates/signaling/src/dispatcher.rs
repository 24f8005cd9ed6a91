//! Ereignis-Dispatcher – Routet ClientEvents an die richtigen Handler
//!
//! Der Dispatcher empfaengt ClientEvents von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt eine direkte Antwort zurueck.
//! Ereignisse an andere Clients laufen ueber das Register.
//!
//! ## Zustandspruefung
//! - `announce-identity` und `pong` sind immer erlaubt
//! - Alle anderen Ereignisse erst nach angekuendigter Identitaet

use nachhilfe_core::types::UserId;
use nachhilfe_protocol::events::FehlerCode;
use nachhilfe_protocol::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::handlers::{call_handler, chat_handler, notification_handler, typing_handler};
use crate::registry::{Bindung, ClientSender};
use crate::server_state::{Datenbank, SignalingState};

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    pub peer_addr: SocketAddr,
    /// Aktuelle Bindung (None bis `announce-identity`)
    pub bindung: Option<Bindung>,
    /// Send-Queue dieser Verbindung, wird beim Registrieren geteilt
    sende_tx: mpsc::Sender<ServerEvent>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr, sende_tx: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            peer_addr,
            bindung: None,
            sende_tx,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.bindung.as_ref().map(|b| &b.user_id)
    }
}

/// Zentraler Ereignis-Dispatcher
pub struct MessageDispatcher<D: Datenbank> {
    state: Arc<SignalingState<D>>,
}

impl<D: Datenbank> MessageDispatcher<D> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<D>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Ereignis und gibt die direkte Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort an den Absender geht.
    pub async fn dispatch(
        &self,
        event: ClientEvent,
        ctx: &mut DispatcherContext,
    ) -> Option<ServerEvent> {
        let name = event.name();

        let user_id = match event {
            ClientEvent::AnnounceIdentity(user_id) => {
                return self.identitaet_ankuendigen(user_id, ctx)
            }
            ClientEvent::Pong(_) => return None,
            _ => match ctx.user_id() {
                Some(uid) => uid.clone(),
                None => {
                    tracing::debug!(
                        peer = %ctx.peer_addr,
                        event = name,
                        "Ereignis vor announce-identity"
                    );
                    return Some(ServerEvent::fehler(
                        FehlerCode::NotAnnounced,
                        "Identitaet muss zuerst angekuendigt werden",
                    ));
                }
            },
        };

        tracing::trace!(user_id = %user_id, event = name, "Ereignis empfangen");

        match event {
            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientEvent::SendChatMessage(req) => {
                Some(chat_handler::handle_chat_send(req, &user_id, &self.state).await)
            }
            ClientEvent::ReadReceipt(req) => {
                chat_handler::handle_read_receipt(req, &user_id, &self.state).await
            }
            ClientEvent::FetchHistory(req) => {
                Some(chat_handler::handle_history(req, &user_id, &self.state).await)
            }
            ClientEvent::FetchConversations => {
                Some(chat_handler::handle_conversations(&user_id, &self.state).await)
            }

            // -------------------------------------------------------------------
            // Tipp-Signale
            // -------------------------------------------------------------------
            ClientEvent::Typing(signal) => {
                typing_handler::handle_typing(signal, false, &user_id, &self.state);
                None
            }
            ClientEvent::StopTyping(signal) => {
                typing_handler::handle_typing(signal, true, &user_id, &self.state);
                None
            }

            // -------------------------------------------------------------------
            // Anrufe
            // -------------------------------------------------------------------
            ClientEvent::CallInitiate(req) => {
                call_handler::handle_call_initiate(req, &user_id, &self.state);
                None
            }
            ClientEvent::CallAccept(req) => {
                call_handler::handle_call_accept(req, &user_id, &self.state);
                None
            }
            ClientEvent::CallReject(req) => {
                call_handler::handle_call_reject(req, &user_id, &self.state);
                None
            }
            ClientEvent::IceCandidate(req) => {
                call_handler::handle_ice_candidate(req, &user_id, &self.state);
                None
            }
            ClientEvent::CallEnd(req) => {
                call_handler::handle_call_end(req, &user_id, &self.state);
                None
            }

            // -------------------------------------------------------------------
            // Benachrichtigungen
            // -------------------------------------------------------------------
            ClientEvent::FetchNotifications => {
                Some(notification_handler::handle_fetch_notifications(&user_id, &self.state).await)
            }

            ClientEvent::AnnounceIdentity(_) | ClientEvent::Pong(_) => None,
        }
    }

    /// Bindet die Verbindung an `user_id`
    ///
    /// Erneutes Ankuendigen registriert neu. Wechselt die Verbindung die
    /// Identitaet, wird die alte Bindung vorher vollstaendig abgeraeumt.
    fn identitaet_ankuendigen(
        &self,
        user_id: UserId,
        ctx: &mut DispatcherContext,
    ) -> Option<ServerEvent> {
        if user_id.ist_leer() {
            return Some(ServerEvent::fehler(
                FehlerCode::InvalidRequest,
                "userId darf nicht leer sein",
            ));
        }

        if let Some(alt) = ctx.bindung.take() {
            if alt.user_id != user_id {
                self.state.verbindung_beenden(&alt);
            }
        }

        let sender = ClientSender::neu(user_id.clone(), ctx.sende_tx.clone());
        let bindung = self.state.register.registrieren(user_id, sender);
        tracing::info!(
            peer = %ctx.peer_addr,
            user_id = %bindung.user_id,
            epoche = bindung.epoche,
            "Identitaet angekuendigt"
        );
        ctx.bindung = Some(bindung);
        None
    }

    /// Cleanup beim Verbindungsende
    pub fn client_cleanup(&self, ctx: &mut DispatcherContext) {
        if let Some(bindung) = ctx.bindung.take() {
            self.state.verbindung_beenden(&bindung);
        }
    }
}
