//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use anyhow::{bail, Context};
use nachhilfe_chat::ChatConfig;
use nachhilfe_db::DatabaseConfig;
use nachhilfe_observability::logging::{log_format_gueltig, log_level_gueltig};
use nachhilfe_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Verbindungen, Keepalive und Anruf-Timeouts
    pub signaling: SignalingEinstellungen,
    /// Nachrichten-Relay
    pub chat: ChatConfig,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Nachhilfe Echtzeit".into(),
            max_clients: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer alle Listener
    pub bind_adresse: String,
    /// Port der Echtzeitverbindung
    pub tcp_port: u16,
    /// Port fuer Metriken und Health
    pub observability_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9870,
            observability_port: 9300,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// WAL-Modus fuer SQLite
    pub wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://nachhilfe.db".into(),
            max_verbindungen: 5,
            wal: true,
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    pub keepalive_sek: u64,
    /// Ohne eingehenden Frame wird nach dieser Zeit getrennt
    pub verbindungs_timeout_sek: u64,
    pub sende_queue_groesse: usize,
    /// Wie lange ein Anruf klingeln darf
    pub klingel_timeout_sek: u64,
    pub timeout_intervall_sek: u64,
    /// Gepufferte ICE-Kandidaten pro Richtung waehrend es klingelt
    pub max_ausstehende_kandidaten: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let s = SignalingConfig::default();
        Self {
            keepalive_sek: s.keepalive_sek,
            verbindungs_timeout_sek: s.verbindungs_timeout_sek,
            sende_queue_groesse: s.sende_queue_groesse,
            klingel_timeout_sek: s.klingel_timeout_sek,
            timeout_intervall_sek: s.timeout_intervall_sek,
            max_ausstehende_kandidaten: s.max_ausstehende_kandidaten,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Intervall der DB-Erreichbarkeitspruefung fuer `/health`
    pub db_pruef_intervall_sek: u64,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            db_pruef_intervall_sek: 15,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"))
            }
        };
        config.pruefen()?;
        Ok(config)
    }

    /// Prueft Werte die TOML allein nicht ausschliessen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.server.max_clients == 0 {
            bail!("server.max_clients muss groesser als 0 sein");
        }
        if self.signaling.sende_queue_groesse == 0 {
            bail!("signaling.sende_queue_groesse muss groesser als 0 sein");
        }
        if self.signaling.keepalive_sek >= self.signaling.verbindungs_timeout_sek {
            bail!(
                "signaling.keepalive_sek ({}) muss kleiner als verbindungs_timeout_sek ({}) sein",
                self.signaling.keepalive_sek,
                self.signaling.verbindungs_timeout_sek
            );
        }
        if self.chat.max_body_laenge == 0 {
            bail!("chat.max_body_laenge muss groesser als 0 sein");
        }
        if self.chat.max_verlauf_limit < 1 {
            bail!("chat.max_verlauf_limit muss mindestens 1 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Bind-Adresse der Echtzeitverbindung
    pub fn tcp_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.adresse(self.netzwerk.tcp_port)
    }

    /// Bind-Adresse des Observability-Servers
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        self.adresse(self.netzwerk.observability_port)
    }

    fn adresse(&self, port: u16) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.netzwerk.bind_adresse, port);
        text.parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{text}'"))
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.wal,
        }
    }

    pub fn signaling_config(&self) -> SignalingConfig {
        let s = &self.signaling;
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_clients: self.server.max_clients,
            keepalive_sek: s.keepalive_sek,
            verbindungs_timeout_sek: s.verbindungs_timeout_sek,
            sende_queue_groesse: s.sende_queue_groesse,
            klingel_timeout_sek: s.klingel_timeout_sek,
            timeout_intervall_sek: s.timeout_intervall_sek,
            max_ausstehende_kandidaten: s.max_ausstehende_kandidaten,
        }
    }
}
