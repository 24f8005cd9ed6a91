//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Services und Zustands-Manager als Arc-Referenzen.
//! Alle Mutationen von Register und Anruf-Tabelle passieren synchron
//! innerhalb eines Ereignisschritts; nur die Persistenz suspendiert.

use std::sync::Arc;
use std::time::Duration;

use nachhilfe_chat::{BenachrichtigungsService, ChatConfig, ChatService};
use nachhilfe_core::types::UserId;
use nachhilfe_db::{BenachrichtigungsRepository, NachrichtenRepository, Verzeichnis};
use nachhilfe_observability::NachhilfeMetriken;
use nachhilfe_protocol::ServerEvent;

use crate::call::{AnrufConfig, AnrufVerwaltung, Uebergang};
use crate::presence::PresenceBroadcaster;
use crate::registry::{Bindung, RegisterBeobachter, SpeicherRegister, Verbindungsregister};

/// Alle Kollaborateure die die Echtzeit-Schicht von der Datenbank braucht
pub trait Datenbank:
    NachrichtenRepository + BenachrichtigungsRepository + Verzeichnis + 'static
{
}

impl<T> Datenbank for T where
    T: NachrichtenRepository + BenachrichtigungsRepository + Verzeichnis + 'static
{
}

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Wie lange ein Anruf klingeln darf
    pub klingel_timeout_sek: u64,
    /// Intervall des Timeout-Sweepers
    pub timeout_intervall_sek: u64,
    /// Gepufferte ICE-Kandidaten pro Richtung
    pub max_ausstehende_kandidaten: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Nachhilfe Echtzeit".to_string(),
            max_clients: 1024,
            keepalive_sek: 25,
            verbindungs_timeout_sek: 60,
            sende_queue_groesse: 64,
            klingel_timeout_sek: 45,
            timeout_intervall_sek: 1,
            max_ausstehende_kandidaten: 32,
        }
    }
}

impl SignalingConfig {
    pub fn anruf_config(&self) -> AnrufConfig {
        AnrufConfig {
            klingel_timeout: Duration::from_secs(self.klingel_timeout_sek),
            max_ausstehende_kandidaten: self.max_ausstehende_kandidaten,
        }
    }
}

/// Aktualisiert die Verbindungs-Gauge bei jeder Register-Mutation
struct VerbindungsZaehler(NachhilfeMetriken);

impl RegisterBeobachter for VerbindungsZaehler {
    fn online(&self, _: &UserId, register: &dyn Verbindungsregister) {
        self.0.connected_clients.set(register.anzahl() as i64);
    }

    fn offline(&self, _: &UserId, register: &dyn Verbindungsregister) {
        self.0.connected_clients.set(register.anzahl() as i64);
    }
}

/// Gemeinsamer Server-Zustand (Arc-geteilt)
pub struct SignalingState<D: Datenbank> {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Wer ist gerade erreichbar
    pub register: Arc<dyn Verbindungsregister>,
    /// Nachrichten-Relay
    pub chat_service: Arc<ChatService<D, D>>,
    pub benachrichtigungen: Arc<BenachrichtigungsService<D>>,
    /// Laufende Anruf-Sitzungen (nur im Speicher)
    pub anrufe: AnrufVerwaltung,
    pub metriken: NachhilfeMetriken,
}

impl<D: Datenbank> SignalingState<D> {
    /// Erstellt den Zustand mit einem In-Memory-Register samt Presence
    pub fn neu(
        config: SignalingConfig,
        chat_config: ChatConfig,
        db: Arc<D>,
        metriken: NachhilfeMetriken,
    ) -> Arc<Self> {
        let beobachter: Vec<Arc<dyn RegisterBeobachter>> = vec![
            Arc::new(PresenceBroadcaster::neu()),
            Arc::new(VerbindungsZaehler(metriken.clone())),
        ];
        let register = Arc::new(SpeicherRegister::mit_beobachtern(beobachter));
        Self::mit_register(config, chat_config, db, register, metriken)
    }

    /// Erstellt den Zustand mit einem beliebigen Register
    ///
    /// Presence-Beobachter muss der Aufrufer selbst am Register anmelden.
    pub fn mit_register(
        config: SignalingConfig,
        chat_config: ChatConfig,
        db: Arc<D>,
        register: Arc<dyn Verbindungsregister>,
        metriken: NachhilfeMetriken,
    ) -> Arc<Self> {
        let anrufe = AnrufVerwaltung::neu(config.anruf_config());
        Arc::new(Self {
            config: Arc::new(config),
            register,
            chat_service: ChatService::neu(db.clone(), db.clone(), chat_config),
            benachrichtigungen: BenachrichtigungsService::neu(db),
            anrufe,
            metriken,
        })
    }

    /// Live-Zustellung an einen User; `false` wenn nicht erreichbar
    pub fn zustellen(&self, an: &UserId, event: ServerEvent) -> bool {
        let name = event.name();
        let zugestellt = self.register.an_user_senden(an, event);
        if zugestellt {
            self.metriken
                .live_deliveries_total
                .with_label_values(&[name])
                .inc();
        }
        zugestellt
    }

    /// Sendet die Zustellungen eines Anruf-Uebergangs und zaehlt den Ausgang
    pub fn uebergang_anwenden(&self, uebergang: Uebergang) {
        for z in uebergang.zustellungen {
            self.zustellen(&z.an, z.event);
        }
        if let Some(ausgang) = uebergang.ausgang {
            self.metriken
                .call_outcomes_total
                .with_label_values(&[ausgang.als_str()])
                .inc();
        }
        self.metriken
            .active_call_sessions
            .set(self.anrufe.aktive_sitzungen() as i64);
    }

    /// Raeumt eine Verbindung ab
    ///
    /// Entfernt die Bindung aus dem Register (Presence offline) und beendet
    /// eine laufende Anruf-Sitzung, aber nur wenn die Bindung noch die
    /// aktuelle war. Eine veraltete Bindung nach einem Reconnect aendert
    /// nichts.
    pub fn verbindung_beenden(&self, bindung: &Bindung) {
        if self.register.abmelden(bindung).is_none() {
            return;
        }
        let uebergang = self.anrufe.verbindung_getrennt(&bindung.user_id);
        self.uebergang_anwenden(uebergang);
        tracing::info!(user_id = %bindung.user_id, "Verbindung abgeraeumt");
    }

    /// Beendet alle Anrufe deren Klingel-Timeout abgelaufen ist
    pub fn anruf_timeouts_pruefen(&self) {
        for uebergang in self.anrufe.abgelaufene_beenden(tokio::time::Instant::now()) {
            self.uebergang_anwenden(uebergang);
        }
    }

    /// Periodischer Timeout-Sweeper; laeuft bis zum Shutdown-Signal
    pub async fn timeout_sweeper(
        self: Arc<Self>,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let intervall = Duration::from_secs(self.config.timeout_intervall_sek.max(1));
        let mut ticker = tokio::time::interval(intervall);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.anruf_timeouts_pruefen(),
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Timeout-Sweeper beendet");
    }
}
