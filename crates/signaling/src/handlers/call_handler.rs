//! Call-Handler – Anruf-Signalisierung ueber die AnrufVerwaltung
//!
//! Unzulaessige Uebergaenge werden geloggt und verworfen. Der Client
//! bekommt dafuer kein Ereignis.

use nachhilfe_core::types::UserId;
use nachhilfe_protocol::events::{AnrufAnnehmen, AnrufStarten, AnrufZiel, KandidatSenden};
use std::sync::Arc;

use crate::call::{AnrufFehler, Uebergang};
use crate::server_state::{Datenbank, SignalingState};

pub fn handle_call_initiate<D: Datenbank>(
    request: AnrufStarten,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    if let Some(from) = request.from.as_ref().filter(|f| *f != user_id) {
        tracing::debug!(user_id = %user_id, angegeben = %from, "Abweichendes from ignoriert");
    }
    let erreichbar = state.register.aufloesen(&request.to).is_some();
    let ergebnis = state.anrufe.starten(user_id, request, erreichbar);
    anwenden(state, user_id, "call-initiate", ergebnis);
}

pub fn handle_call_accept<D: Datenbank>(
    request: AnrufAnnehmen,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    let ergebnis = state.anrufe.annehmen(user_id, request);
    anwenden(state, user_id, "call-accept", ergebnis);
}

pub fn handle_call_reject<D: Datenbank>(
    request: AnrufZiel,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    let ergebnis = state.anrufe.ablehnen(user_id, &request.to);
    anwenden(state, user_id, "call-reject", ergebnis);
}

pub fn handle_ice_candidate<D: Datenbank>(
    request: KandidatSenden,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    let ergebnis = state.anrufe.kandidat(user_id, request);
    anwenden(state, user_id, "ice-candidate", ergebnis);
}

pub fn handle_call_end<D: Datenbank>(
    request: AnrufZiel,
    user_id: &UserId,
    state: &Arc<SignalingState<D>>,
) {
    let ergebnis = state.anrufe.beenden(user_id, &request.to);
    anwenden(state, user_id, "call-end", ergebnis);
}

fn anwenden<D: Datenbank>(
    state: &Arc<SignalingState<D>>,
    user_id: &UserId,
    event: &'static str,
    ergebnis: Result<Uebergang, AnrufFehler>,
) {
    match ergebnis {
        Ok(uebergang) => state.uebergang_anwenden(uebergang),
        Err(e) => tracing::warn!(
            user_id = %user_id,
            event,
            fehler = %e,
            "Unzulaessiger Anruf-Uebergang verworfen"
        ),
    }
}
