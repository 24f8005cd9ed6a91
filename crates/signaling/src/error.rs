//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;

/// Warum eine Verbindung endet
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket, ungueltiger Frame)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Client hat die Verbindung geschlossen
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Kein Frame innerhalb des Verbindungs-Timeouts
    #[error("Timeout")]
    Timeout,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
