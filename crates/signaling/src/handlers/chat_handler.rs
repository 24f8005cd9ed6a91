//! Chat-Handler – Nachrichten senden, Lesebestaetigungen, Verlauf
//!
//! Routet Chat-Ereignisse ueber den ChatService. Persistenz kommt immer
//! zuerst; die Live-Zustellung an den Empfaenger ist nachrangig und faellt
//! still weg wenn er nicht verbunden ist.

use nachhilfe_chat::{
    ChatError, ChatNachricht, Gespraech, NachrichtSenden, Profil, VerlaufAnfrage,
};
use nachhilfe_core::types::UserId;
use nachhilfe_protocol::events::{
    ChatFehler, ChatSendenAnfrage, FehlerCode, GelesenMeldung, GespraechAnsicht,
    LesebestaetigungAnfrage, NachrichtAnsicht, TeilnehmerProfil, VerlaufAnfrage as VerlaufEvent,
    VerlaufAntwort,
};
use nachhilfe_protocol::ServerEvent;
use std::sync::Arc;

use crate::server_state::{Datenbank, SignalingState};

/// Verarbeitet `send-chat-message`
///
/// Antwortet dem Sender mit `chat-message-sent-ack` oder
/// `chat-message-error`. Der Sender ist immer die angekuendigte Identitaet.
pub async fn handle_chat_send<D: Datenbank>(
    request: ChatSendenAnfrage,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) -> ServerEvent {
    if &request.sender_id != user_id {
        tracing::debug!(
            user_id = %user_id,
            angegeben = %request.sender_id,
            "Abweichende senderId ignoriert"
        );
    }

    let auftrag = NachrichtSenden {
        sender_id: user_id.clone(),
        sender_art: request.sender_kind,
        receiver_id: request.receiver_id,
        receiver_art: request.receiver_kind,
        body: request.body,
        art: request.kind,
    };

    match state.chat_service.nachricht_senden(auftrag).await {
        Ok(nachricht) => {
            state.metriken.messages_persisted_total.inc();
            let ansicht = nachricht_ansicht(nachricht);

            let live = state.zustellen(
                &ansicht.receiver_id,
                ServerEvent::ChatMessageDelivered(ansicht.clone()),
            );

            tracing::debug!(
                user_id = %user_id,
                empfaenger = %ansicht.receiver_id,
                message_id = %ansicht.id,
                live,
                "Chat-Nachricht gesendet"
            );

            ServerEvent::ChatMessageSentAck(ansicht)
        }
        Err(e) => {
            if e.ist_persistenz() {
                tracing::error!(user_id = %user_id, fehler = %e, "Nachricht nicht persistiert");
            } else {
                tracing::debug!(user_id = %user_id, fehler = %e, "Nachricht abgelehnt");
            }
            ServerEvent::ChatMessageError(ChatFehler {
                error: e.to_string(),
            })
        }
    }
}

/// Verarbeitet `read-receipt`
///
/// Die Bestaetigung geht an den persistierten Sender, und nur wenn sich
/// `read` tatsaechlich geaendert hat. Fehler gehen als `error` an den Leser.
pub async fn handle_read_receipt<D: Datenbank>(
    request: LesebestaetigungAnfrage,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) -> Option<ServerEvent> {
    match state
        .chat_service
        .als_gelesen_markieren(request.message_id, user_id)
        .await
    {
        Ok(bestaetigung) => {
            if bestaetigung.geaendert {
                state.zustellen(
                    &bestaetigung.sender_id,
                    ServerEvent::MessageRead(GelesenMeldung {
                        message_id: bestaetigung.nachricht_id,
                    }),
                );
            }
            None
        }
        Err(e) => {
            tracing::debug!(user_id = %user_id, fehler = %e, "Lesebestaetigung abgelehnt");
            Some(fehler_event(&e))
        }
    }
}

/// Verarbeitet `fetch-history`
pub async fn handle_history<D: Datenbank>(
    request: VerlaufEvent,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) -> ServerEvent {
    let mit = request.with.clone();
    let anfrage = VerlaufAnfrage {
        user_id: user_id.clone(),
        mit: request.with,
        before: request.before,
        limit: request.limit,
    };

    match state.chat_service.verlauf_laden(anfrage).await {
        Ok(nachrichten) => ServerEvent::History(VerlaufAntwort {
            with: mit,
            messages: nachrichten.into_iter().map(nachricht_ansicht).collect(),
        }),
        Err(e) => {
            tracing::warn!(user_id = %user_id, fehler = %e, "Verlauf laden fehlgeschlagen");
            fehler_event(&e)
        }
    }
}

/// Verarbeitet `fetch-conversations`
pub async fn handle_conversations<D: Datenbank>(
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) -> ServerEvent {
    match state.chat_service.gespraeche_laden(user_id).await {
        Ok(gespraeche) => {
            ServerEvent::Conversations(gespraeche.into_iter().map(gespraech_ansicht).collect())
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, fehler = %e, "Gespraeche laden fehlgeschlagen");
            fehler_event(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// Konvertierung Domain -> Protokoll
// ---------------------------------------------------------------------------

pub fn nachricht_ansicht(n: ChatNachricht) -> NachrichtAnsicht {
    NachrichtAnsicht {
        id: n.id,
        sender_id: n.sender_id,
        sender_kind: n.sender_art,
        receiver_id: n.receiver_id,
        receiver_kind: n.receiver_art,
        sender: n.sender.map(profil_ansicht),
        receiver: n.receiver.map(profil_ansicht),
        body: n.body,
        kind: n.art,
        read: n.read,
        created_at: n.created_at,
    }
}

fn profil_ansicht(p: Profil) -> TeilnehmerProfil {
    TeilnehmerProfil {
        name: p.name,
        photo: p.photo,
    }
}

fn gespraech_ansicht(g: Gespraech) -> GespraechAnsicht {
    GespraechAnsicht {
        with: g.mit,
        last_message: nachricht_ansicht(g.letzte_nachricht),
        unread_count: g.ungelesen,
    }
}

/// Bildet Chat-Fehler auf `error`-Ereignisse ab
pub(crate) fn fehler_event(e: &ChatError) -> ServerEvent {
    let code = match e {
        ChatError::UngueltigeEingabe(_) => FehlerCode::InvalidRequest,
        ChatError::NachrichtNichtGefunden(_) => FehlerCode::NotFound,
        ChatError::NichtEmpfaenger(_) => FehlerCode::Forbidden,
        ChatError::Persistenz(_) => FehlerCode::InternalError,
    };
    ServerEvent::fehler(code, e.to_string())
}
