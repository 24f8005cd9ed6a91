//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Nachricht nicht gefunden: {0}")]
    NachrichtNichtGefunden(String),

    /// Nur der Empfaenger darf eine Nachricht als gelesen markieren
    #[error("Nicht Empfaenger der Nachricht {0}")]
    NichtEmpfaenger(String),

    /// Speicher nicht verfuegbar; die Nachricht wurde nicht angelegt
    #[error("Persistenz-Fehler: {0}")]
    Persistenz(#[from] nachhilfe_db::DbError),
}

impl ChatError {
    pub fn ist_persistenz(&self) -> bool {
        matches!(self, Self::Persistenz(_))
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
