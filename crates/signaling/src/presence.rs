//! Presence-Broadcaster – Online/Offline aus Register-Mutationen
//!
//! Kein eigener Zustand: Presence ist reine Mitgliedschaft im Register.
//! Jede Registrierung wird als `presence-online`, jede Abmeldung der
//! aktuellen Bindung als `presence-offline` an alle anderen Clients
//! verteilt. Die Sendungen sind `try_send`; eine volle Queue verliert das
//! Ereignis, blockiert aber nie die Mutation des Registers.

use nachhilfe_core::types::UserId;
use nachhilfe_protocol::ServerEvent;

use crate::registry::{RegisterBeobachter, Verbindungsregister};

#[derive(Debug, Default, Clone, Copy)]
pub struct PresenceBroadcaster;

impl PresenceBroadcaster {
    pub fn neu() -> Self {
        Self
    }
}

impl RegisterBeobachter for PresenceBroadcaster {
    fn online(&self, user_id: &UserId, register: &dyn Verbindungsregister) {
        let n = register.an_alle_ausser_senden(user_id, ServerEvent::PresenceOnline(user_id.clone()));
        tracing::debug!(user_id = %user_id, empfaenger = n, "Presence online verteilt");
    }

    fn offline(&self, user_id: &UserId, register: &dyn Verbindungsregister) {
        let n =
            register.an_alle_ausser_senden(user_id, ServerEvent::PresenceOffline(user_id.clone()));
        tracing::debug!(user_id = %user_id, empfaenger = n, "Presence offline verteilt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClientSender, SpeicherRegister};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn register() -> SpeicherRegister {
        let presence: Arc<dyn RegisterBeobachter> = Arc::new(PresenceBroadcaster::neu());
        SpeicherRegister::mit_beobachtern(vec![presence])
    }

    fn verbinden(
        register: &SpeicherRegister,
        uid: &str,
    ) -> (crate::registry::Bindung, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let b = register.registrieren(UserId::neu(uid), ClientSender::neu(UserId::neu(uid), tx));
        (b, rx)
    }

    #[test]
    fn online_geht_an_alle_anderen() {
        let register = register();
        let (_b1, mut rx1) = verbinden(&register, "u1");
        let (_b2, mut rx2) = verbinden(&register, "u2");

        assert_eq!(
            rx1.try_recv().unwrap(),
            ServerEvent::PresenceOnline(UserId::neu("u2"))
        );
        // Eigenes Online-Ereignis wird nicht zurueckgespiegelt
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn offline_nur_fuer_aktuelle_bindung() {
        let register = register();
        let (_b1, mut rx1) = verbinden(&register, "u1");
        let (alt, _rx_alt) = verbinden(&register, "u2");
        let (neu, _rx_neu) = verbinden(&register, "u2");
        while rx1.try_recv().is_ok() {}

        register.abmelden(&alt);
        assert!(rx1.try_recv().is_err(), "veraltete Abmeldung darf nichts melden");

        register.abmelden(&neu);
        assert_eq!(
            rx1.try_recv().unwrap(),
            ServerEvent::PresenceOffline(UserId::neu("u2"))
        );
    }
}
