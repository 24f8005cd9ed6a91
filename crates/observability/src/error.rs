//! Fehlertypen fuer nachhilfe-observability

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Prometheus-Fehler: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metriken-Export ist kein UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type ObservabilityResult<T> = std::result::Result<T, ObservabilityError>;
