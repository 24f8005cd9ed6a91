//! Fehlertypen fuer nachhilfe-core
//!
//! Nur Parse- und Validierungsfehler der Grundtypen. Die Fachcrates
//! definieren eigene Fehler und konvertieren bei Bedarf via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer nachhilfe-core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Fehler beim Umgang mit den Grundtypen
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Leere Benutzer-ID")]
    LeereUserId,

    #[error("Unbekannte Teilnehmer-Art: {0}")]
    UnbekannteTeilnehmerArt(String),

    #[error("Unbekannte Nachrichtenart: {0}")]
    UnbekannteNachrichtenArt(String),

    #[error("Unbekannter Benachrichtigungs-Typ: {0}")]
    UnbekannterBenachrichtigungsTyp(String),

    #[error("Ungueltige ID '{wert}': {grund}")]
    UngueltigeId { wert: String, grund: String },
}
