//! Typing-Handler – fluechtige Tipp-Signale
//!
//! Reine Weiterleitung ueber das Register: keine Persistenz, keine
//! Warteschlange, keine Bestaetigung. Ist der Empfaenger nicht verbunden,
//! faellt das Signal weg.

use nachhilfe_core::types::UserId;
use nachhilfe_protocol::events::{TippSignal, TippWeiterleitung};
use nachhilfe_protocol::ServerEvent;
use std::sync::Arc;

use crate::server_state::{Datenbank, SignalingState};

/// Leitet `typing` bzw. `stop-typing` an `signal.receiver_id` weiter
pub fn handle_typing<D: Datenbank>(
    signal: TippSignal,
    stop: bool,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    let empfaenger = signal.receiver_id.clone();
    let mut extra = signal.extra;
    // Der Sender ist immer die angekuendigte Identitaet
    extra.remove("senderId");
    let weiterleitung = TippWeiterleitung {
        sender_id: user_id.clone(),
        receiver_id: signal.receiver_id,
        extra,
    };
    let event = if stop {
        ServerEvent::StopTyping(weiterleitung)
    } else {
        ServerEvent::Typing(weiterleitung)
    };

    if !state.zustellen(&empfaenger, event) {
        tracing::trace!(user_id = %user_id, empfaenger = %empfaenger, "Tipp-Signal verworfen");
    }
}
