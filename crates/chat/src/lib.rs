//! nachhilfe-chat – Nachrichten-Relay und Benachrichtigungen
//!
//! Dieses Crate implementiert:
//! - ChatService: Nachrichten validieren, persistieren und mit Profilen
//!   anreichern, Lesebestaetigungen, Verlauf und Gespraechslisten
//! - BenachrichtigungsService: Benachrichtigungen anlegen und abrufen
//!
//! Die Live-Zustellung uebernimmt die Signaling-Schicht; dieses Crate
//! liefert nur die fertig befuellten Domain-Objekte.
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use nachhilfe_chat::{ChatConfig, ChatService};
//! use nachhilfe_db::SqliteDb;
//!
//! #[tokio::main]
//! async fn main() {
//!     let db = Arc::new(SqliteDb::in_memory().await.unwrap());
//!     let chat = ChatService::neu(db.clone(), db, ChatConfig::default());
//! }
//! ```

pub mod benachrichtigung;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use benachrichtigung::BenachrichtigungsService;
pub use error::{ChatError, ChatResult};
pub use service::ChatService;
pub use types::{
    Benachrichtigung, ChatConfig, ChatNachricht, Gespraech, Lesebestaetigung, NachrichtSenden,
    NeueBenachrichtigungDaten, Profil, VerlaufAnfrage,
};
