//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod benachrichtigungen;
pub mod nachrichten;
pub mod pool;
pub mod verzeichnis;

pub use pool::SqliteDb;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;
use crate::repository::DbResult;

/// Zeitstempel-Format der Tabellen (UTC, Mikrosekunden, lexikografisch sortierbar)
pub(crate) fn zeit_formatieren(zeit: &DateTime<Utc>) -> String {
    zeit.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn zeit_parsen(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::UngueltigeDaten(format!("Ungueltige Zeitangabe '{s}': {e}")))
}
