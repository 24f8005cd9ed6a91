//! Verbindungsregister – Wer ist gerade erreichbar?
//!
//! Das Register bindet eine Identitaet an genau eine Send-Queue. Eine neue
//! Registrierung ersetzt die alte bedingungslos (letzte gewinnt). Jede
//! Registrierung erhaelt eine monoton steigende Epoche; `abmelden` entfernt
//! nur die Bindung mit derselben Epoche. Ein spaet geschlossener alter
//! Socket kann so keine neuere Verbindung desselben Users verdraengen.
//!
//! ## Beobachter
//! `RegisterBeobachter` werden synchron nach jeder Mutation aufgerufen,
//! nachdem alle internen Locks freigegeben sind. Sie duerfen nicht
//! blockieren; Sendungen laufen ueber `try_send`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nachhilfe_core::types::UserId;
use nachhilfe_protocol::ServerEvent;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub user_id: UserId,
    tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    pub fn neu(user_id: UserId, tx: mpsc::Sender<ServerEvent>) -> Self {
        Self { user_id, tx }
    }

    /// Sendet ein Ereignis nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(ev)) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    event = ev.name(),
                    "Send-Queue voll – Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.user_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }

    /// Ob beide Handles in dieselbe Queue schreiben
    pub fn gleiche_queue(&self, andere: &ClientSender) -> bool {
        self.tx.same_channel(&andere.tx)
    }
}

// ---------------------------------------------------------------------------
// Bindung
// ---------------------------------------------------------------------------

/// Versionierte Bindung einer Identitaet an eine Verbindung
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bindung {
    pub user_id: UserId,
    pub epoche: u64,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Reagiert auf Registrierungen und Abmeldungen
pub trait RegisterBeobachter: Send + Sync {
    fn online(&self, user_id: &UserId, register: &dyn Verbindungsregister);

    /// Wird nur aufgerufen wenn die entfernte Bindung die aktuelle war
    fn offline(&self, user_id: &UserId, register: &dyn Verbindungsregister);
}

/// Abstraktion ueber die Zuordnung Identitaet -> Verbindung
///
/// Keine Operation schlaegt fehl; Abwesenheit ist ein normales Ergebnis.
pub trait Verbindungsregister: Send + Sync {
    /// Bindet `user_id` an `sender` und ersetzt eine vorherige Bindung
    fn registrieren(&self, user_id: UserId, sender: ClientSender) -> Bindung;

    fn aufloesen(&self, user_id: &UserId) -> Option<ClientSender>;

    /// Entfernt die Bindung nur wenn ihre Epoche noch aktuell ist
    fn abmelden(&self, bindung: &Bindung) -> Option<UserId>;

    /// Momentaufnahme aller gebundenen Sender
    fn alle_sender(&self) -> Vec<ClientSender>;

    fn anzahl(&self) -> usize;

    /// Sendet an einen einzelnen User; `false` wenn nicht erreichbar
    fn an_user_senden(&self, user_id: &UserId, event: ServerEvent) -> bool {
        match self.aufloesen(user_id) {
            Some(sender) => sender.senden(event),
            None => {
                tracing::debug!(user_id = %user_id, event = event.name(), "Empfaenger nicht verbunden");
                false
            }
        }
    }

    /// Sendet an alle ausser `ausgenommen` und gibt die Anzahl zurueck
    fn an_alle_ausser_senden(&self, ausgenommen: &UserId, event: ServerEvent) -> usize {
        self.alle_sender()
            .into_iter()
            .filter(|s| &s.user_id != ausgenommen)
            .filter(|s| s.senden(event.clone()))
            .count()
    }
}

// ---------------------------------------------------------------------------
// SpeicherRegister
// ---------------------------------------------------------------------------

struct Eintrag {
    epoche: u64,
    sender: ClientSender,
}

/// In-Memory-Register fuer einen einzelnen Prozess
///
/// Thread-safe via DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SpeicherRegister {
    inner: Arc<SpeicherRegisterInner>,
}

struct SpeicherRegisterInner {
    eintraege: DashMap<UserId, Eintrag>,
    naechste_epoche: AtomicU64,
    beobachter: Vec<Arc<dyn RegisterBeobachter>>,
}

impl SpeicherRegister {
    pub fn neu() -> Self {
        Self::mit_beobachtern(Vec::new())
    }

    pub fn mit_beobachtern(beobachter: Vec<Arc<dyn RegisterBeobachter>>) -> Self {
        Self {
            inner: Arc::new(SpeicherRegisterInner {
                eintraege: DashMap::new(),
                naechste_epoche: AtomicU64::new(1),
                beobachter,
            }),
        }
    }
}

impl Default for SpeicherRegister {
    fn default() -> Self {
        Self::neu()
    }
}

impl Verbindungsregister for SpeicherRegister {
    fn registrieren(&self, user_id: UserId, sender: ClientSender) -> Bindung {
        let epoche = self.inner.naechste_epoche.fetch_add(1, Ordering::Relaxed);
        let ersetzt = self
            .inner
            .eintraege
            .insert(user_id.clone(), Eintrag { epoche, sender })
            .is_some();

        tracing::debug!(user_id = %user_id, epoche, ersetzt, "Verbindung registriert");

        for b in &self.inner.beobachter {
            b.online(&user_id, self);
        }

        Bindung { user_id, epoche }
    }

    fn aufloesen(&self, user_id: &UserId) -> Option<ClientSender> {
        self.inner.eintraege.get(user_id).map(|e| e.sender.clone())
    }

    fn abmelden(&self, bindung: &Bindung) -> Option<UserId> {
        let entfernt = self
            .inner
            .eintraege
            .remove_if(&bindung.user_id, |_, e| e.epoche == bindung.epoche);

        match entfernt {
            Some((user_id, _)) => {
                tracing::debug!(user_id = %user_id, epoche = bindung.epoche, "Verbindung abgemeldet");
                for b in &self.inner.beobachter {
                    b.offline(&user_id, self);
                }
                Some(user_id)
            }
            None => {
                tracing::debug!(
                    user_id = %bindung.user_id,
                    epoche = bindung.epoche,
                    "Veraltete Bindung – Abmeldung ignoriert"
                );
                None
            }
        }
    }

    fn alle_sender(&self) -> Vec<ClientSender> {
        self.inner
            .eintraege
            .iter()
            .map(|e| e.value().sender.clone())
            .collect()
    }

    fn anzahl(&self) -> usize {
        self.inner.eintraege.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn sender(uid: &str) -> (ClientSender, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientSender::neu(UserId::neu(uid), tx), rx)
    }

    #[derive(Default)]
    struct Protokoll {
        ereignisse: Mutex<Vec<String>>,
    }

    impl RegisterBeobachter for Protokoll {
        fn online(&self, user_id: &UserId, _: &dyn Verbindungsregister) {
            self.ereignisse.lock().push(format!("online:{user_id}"));
        }
        fn offline(&self, user_id: &UserId, _: &dyn Verbindungsregister) {
            self.ereignisse.lock().push(format!("offline:{user_id}"));
        }
    }

    #[test]
    fn registrieren_und_aufloesen() {
        let register = SpeicherRegister::neu();
        let (s, _rx) = sender("u1");

        register.registrieren(UserId::neu("u1"), s.clone());

        let gefunden = register.aufloesen(&UserId::neu("u1")).unwrap();
        assert!(gefunden.gleiche_queue(&s));
        assert!(register.aufloesen(&UserId::neu("u2")).is_none());
        assert_eq!(register.anzahl(), 1);
    }

    #[test]
    fn neuere_bindung_gewinnt_alte_abmeldung_ist_noop() {
        let protokoll = Arc::new(Protokoll::default());
        let register =
            SpeicherRegister::mit_beobachtern(vec![protokoll.clone() as Arc<dyn RegisterBeobachter>]);
        let (h1, _rx1) = sender("u");
        let (h2, _rx2) = sender("u");

        let b1 = register.registrieren(UserId::neu("u"), h1);
        let b2 = register.registrieren(UserId::neu("u"), h2.clone());
        assert!(b2.epoche > b1.epoche);

        assert!(register.aufloesen(&UserId::neu("u")).unwrap().gleiche_queue(&h2));
        assert_eq!(register.abmelden(&b1), None);
        assert!(register.aufloesen(&UserId::neu("u")).unwrap().gleiche_queue(&h2));
        assert_eq!(
            *protokoll.ereignisse.lock(),
            vec!["online:u".to_string(), "online:u".to_string()]
        );

        assert_eq!(register.abmelden(&b2), Some(UserId::neu("u")));
        assert!(register.aufloesen(&UserId::neu("u")).is_none());
        assert_eq!(protokoll.ereignisse.lock().last().unwrap(), "offline:u");
    }

    #[test]
    fn doppelte_abmeldung_meldet_nur_einmal_offline() {
        let protokoll = Arc::new(Protokoll::default());
        let register =
            SpeicherRegister::mit_beobachtern(vec![protokoll.clone() as Arc<dyn RegisterBeobachter>]);
        let (s, _rx) = sender("u1");

        let b = register.registrieren(UserId::neu("u1"), s);
        register.abmelden(&b);
        register.abmelden(&b);

        let offline = protokoll
            .ereignisse
            .lock()
            .iter()
            .filter(|e| e.starts_with("offline"))
            .count();
        assert_eq!(offline, 1);
    }

    #[tokio::test]
    async fn an_alle_ausser_senden() {
        let register = SpeicherRegister::neu();
        let (s1, mut rx1) = sender("u1");
        let (s2, mut rx2) = sender("u2");
        let (s3, mut rx3) = sender("u3");
        register.registrieren(UserId::neu("u1"), s1);
        register.registrieren(UserId::neu("u2"), s2);
        register.registrieren(UserId::neu("u3"), s3);

        let n = register.an_alle_ausser_senden(
            &UserId::neu("u1"),
            ServerEvent::PresenceOnline(UserId::neu("u1")),
        );

        assert_eq!(n, 2);
        assert!(rx1.try_recv().is_err(), "Ausloeser darf nichts empfangen");
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
    }

    #[test]
    fn volle_queue_verwirft_ohne_zu_blockieren() {
        let (tx, _rx) = mpsc::channel(1);
        let s = ClientSender::neu(UserId::neu("u1"), tx);

        assert!(s.senden(ServerEvent::ping(1)));
        assert!(!s.senden(ServerEvent::ping(2)));
    }

    #[test]
    fn geschlossene_queue_meldet_false() {
        let (s, rx) = sender("u1");
        drop(rx);
        assert!(!s.senden(ServerEvent::ping(1)));
    }
}
