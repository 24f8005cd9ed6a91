//! nachhilfe-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Nachhilfe-Crates gemeinsam genutzt werden: Identitaeten,
//! Teilnehmer-Rollen und Nachrichtenarten.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{CoreError, Result};
pub use types::{
    AnrufId, BenachrichtigungsId, BenachrichtigungsTyp, NachrichtenArt, NachrichtId,
    TeilnehmerArt, UserId,
};
