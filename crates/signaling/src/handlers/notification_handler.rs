//! Benachrichtigungs-Handler – Anlegen, live zustellen, abrufen
//!
//! `benachrichtigen` ist der Einstiegspunkt fuer den (externen)
//! Buchungsablauf. Die Benachrichtigung wird persistiert und, falls der
//! Empfaenger verbunden ist, ueber dieselbe Zustell-Primitive wie
//! Chat-Nachrichten gepusht.

use nachhilfe_chat::{Benachrichtigung, ChatResult, NeueBenachrichtigungDaten};
use nachhilfe_core::types::UserId;
use nachhilfe_protocol::events::BenachrichtigungAnsicht;
use nachhilfe_protocol::ServerEvent;
use std::sync::Arc;

use crate::handlers::chat_handler::fehler_event;
use crate::server_state::{Datenbank, SignalingState};

/// Persistiert eine Benachrichtigung und pusht sie live wenn moeglich
pub async fn benachrichtigen<D: Datenbank>(
    state: &Arc<SignalingState<D>>,
    daten: NeueBenachrichtigungDaten,
) -> ChatResult<Benachrichtigung> {
    let benachrichtigung = state.benachrichtigungen.benachrichtigen(daten).await?;

    let live = state.zustellen(
        &benachrichtigung.recipient,
        ServerEvent::Notification(benachrichtigung_ansicht(benachrichtigung.clone())),
    );
    tracing::debug!(
        empfaenger = %benachrichtigung.recipient,
        live,
        "Benachrichtigung angelegt"
    );

    Ok(benachrichtigung)
}

/// Verarbeitet `fetch-notifications`
pub async fn handle_fetch_notifications<D: Datenbank>(
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) -> ServerEvent {
    match state.benachrichtigungen.ungelesene(user_id).await {
        Ok(liste) => {
            ServerEvent::Notifications(liste.into_iter().map(benachrichtigung_ansicht).collect())
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, fehler = %e, "Benachrichtigungen laden fehlgeschlagen");
            fehler_event(&e)
        }
    }
}

pub fn benachrichtigung_ansicht(b: Benachrichtigung) -> BenachrichtigungAnsicht {
    BenachrichtigungAnsicht {
        id: b.id,
        recipient: b.recipient,
        message: b.message,
        typ: b.typ,
        read: b.read,
        related_booking_id: b.related_booking_id,
        created_at: b.created_at,
    }
}
