//! nachhilfe-db – Persistenz-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern fuer die Kollaborateure der
//! Echtzeit-Schicht bereit:
//! - `NachrichtenRepository`: dauerhaftes Nachrichten-Log
//! - `BenachrichtigungsRepository`: Benachrichtigungen aus dem Buchungsablauf
//! - `Verzeichnis`: Anzeigefelder von Schuelern und Lehrkraeften
//!
//! Die SQLite-Implementierung (`SqliteDb`) nutzt sqlx mit eingebetteten
//! Migrationen.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    BenachrichtigungsRepository, DatabaseConfig, DbResult, NachrichtenRepository, Verzeichnis,
};
pub use sqlite::SqliteDb;
