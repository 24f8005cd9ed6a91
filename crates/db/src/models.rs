//! Datenbank-Records und Eingabe-Strukturen

use chrono::{DateTime, Utc};
use nachhilfe_core::types::{
    BenachrichtigungsId, BenachrichtigungsTyp, NachrichtId, NachrichtenArt, TeilnehmerArt, UserId,
};

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Persistierte Chat-Nachricht
#[derive(Debug, Clone, PartialEq)]
pub struct NachrichtRecord {
    pub id: NachrichtId,
    pub sender_id: UserId,
    pub sender_art: TeilnehmerArt,
    pub receiver_id: UserId,
    pub receiver_art: TeilnehmerArt,
    pub body: String,
    pub art: NachrichtenArt,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Eingabe fuer eine neue Nachricht
///
/// `created_at` wird vom Relay vergeben, damit die Reihenfolge pro Instanz
/// streng monoton bleibt.
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub sender_id: &'a UserId,
    pub sender_art: TeilnehmerArt,
    pub receiver_id: &'a UserId,
    pub receiver_art: TeilnehmerArt,
    pub body: &'a str,
    pub art: NachrichtenArt,
    pub created_at: DateTime<Utc>,
}

/// Filter fuer den Verlauf zwischen zwei Teilnehmern
#[derive(Debug, Clone)]
pub struct VerlaufFilter<'a> {
    pub teilnehmer_a: &'a UserId,
    pub teilnehmer_b: &'a UserId,
    /// Nur Nachrichten vor diesem Zeitpunkt
    pub before: Option<DateTime<Utc>>,
    /// Maximale Anzahl (Default: 50)
    pub limit: Option<i64>,
}

/// Aus dem Log berechnete Gespraechs-Zusammenfassung
#[derive(Debug, Clone, PartialEq)]
pub struct GespraechRecord {
    /// Das Gegenueber
    pub partner: UserId,
    pub letzte_nachricht: NachrichtRecord,
    /// Ungelesene Nachrichten vom Partner an den Abfragenden
    pub ungelesen: i64,
}

// ---------------------------------------------------------------------------
// Benachrichtigungen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BenachrichtigungRecord {
    pub id: BenachrichtigungsId,
    pub recipient: UserId,
    pub message: String,
    pub typ: BenachrichtigungsTyp,
    pub read: bool,
    pub related_booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NeueBenachrichtigung<'a> {
    pub recipient: &'a UserId,
    pub message: &'a str,
    pub typ: BenachrichtigungsTyp,
    pub related_booking_id: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Verzeichnis
// ---------------------------------------------------------------------------

/// Anzeigefelder eines Teilnehmers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerzeichnisEintrag {
    pub id: UserId,
    pub art: TeilnehmerArt,
    pub name: String,
    pub photo: Option<String>,
}
