//! Oeffentliche Typen fuer den Chat-Service

use chrono::{DateTime, Utc};
use nachhilfe_core::types::{
    BenachrichtigungsId, BenachrichtigungsTyp, NachrichtId, NachrichtenArt, TeilnehmerArt, UserId,
};
use serde::{Deserialize, Serialize};

/// Konfiguration des Relays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximale Laenge eines Nachrichtentexts in Zeichen
    pub max_body_laenge: usize,
    /// Obergrenze fuer eine Verlaufsseite
    pub max_verlauf_limit: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_body_laenge: 4096,
            max_verlauf_limit: 200,
        }
    }
}

/// Anzeigefelder aus dem Verzeichnis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profil {
    pub name: String,
    pub photo: Option<String>,
}

/// Sendeauftrag
#[derive(Debug, Clone)]
pub struct NachrichtSenden {
    pub sender_id: UserId,
    pub sender_art: TeilnehmerArt,
    pub receiver_id: UserId,
    pub receiver_art: TeilnehmerArt,
    pub body: String,
    pub art: NachrichtenArt,
}

/// Eine Chat-Nachricht (Domain-Typ, nicht DB-Record)
#[derive(Debug, Clone, PartialEq)]
pub struct ChatNachricht {
    pub id: NachrichtId,
    pub sender_id: UserId,
    pub sender_art: TeilnehmerArt,
    pub receiver_id: UserId,
    pub receiver_art: TeilnehmerArt,
    pub sender: Option<Profil>,
    pub receiver: Option<Profil>,
    pub body: String,
    pub art: NachrichtenArt,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Ergebnis von `als_gelesen_markieren`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesebestaetigung {
    pub nachricht_id: NachrichtId,
    /// Persistierter Sender, an den die Bestaetigung geht
    pub sender_id: UserId,
    /// `false` wenn die Nachricht bereits gelesen war
    pub geaendert: bool,
}

/// Cursor-basierte Paginierung fuer den Verlauf
#[derive(Debug, Clone)]
pub struct VerlaufAnfrage {
    pub user_id: UserId,
    pub mit: UserId,
    /// Lade Nachrichten vor diesem Zeitstempel
    pub before: Option<DateTime<Utc>>,
    /// Maximale Anzahl (Default: 50)
    pub limit: Option<i64>,
}

/// Gespraechs-Zusammenfassung pro Gegenueber
#[derive(Debug, Clone, PartialEq)]
pub struct Gespraech {
    pub mit: UserId,
    pub letzte_nachricht: ChatNachricht,
    pub ungelesen: i64,
}

/// Eingabe des (externen) Buchungsablaufs
#[derive(Debug, Clone)]
pub struct NeueBenachrichtigungDaten {
    pub recipient: UserId,
    pub message: String,
    pub typ: BenachrichtigungsTyp,
    pub related_booking_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Benachrichtigung {
    pub id: BenachrichtigungsId,
    pub recipient: UserId,
    pub message: String,
    pub typ: BenachrichtigungsTyp,
    pub read: bool,
    pub related_booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
