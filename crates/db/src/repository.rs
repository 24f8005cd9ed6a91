//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Echtzeit-Logik von der konkreten
//! Datenbank-Implementierung. Die Traits verwenden `async fn` ohne
//! Send-Garantie; Aufrufer laufen auf einem single-threaded Executor.

use nachhilfe_core::types::{NachrichtId, TeilnehmerArt, UserId};

use crate::error::DbError;
use crate::models::{
    BenachrichtigungRecord, GespraechRecord, NachrichtRecord, NeueBenachrichtigung,
    NeueNachricht, VerlaufFilter, VerzeichnisEintrag,
};

pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://nachhilfe.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://nachhilfe.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Dauerhaftes Nachrichten-Log
#[allow(async_fn_in_trait)]
pub trait NachrichtenRepository: Send + Sync {
    /// Nachricht mit `read = false` anlegen
    async fn create(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;

    async fn get_by_id(&self, id: NachrichtId) -> DbResult<Option<NachrichtRecord>>;

    /// Setzt `read` auf true
    ///
    /// Gibt `true` zurueck wenn sich der Wert geaendert hat, `false` wenn die
    /// Nachricht bereits gelesen war. Unbekannte IDs sind `NichtGefunden`.
    async fn als_gelesen_markieren(&self, id: NachrichtId) -> DbResult<bool>;

    /// Verlauf zwischen zwei Teilnehmern, aelteste zuerst
    async fn verlauf(&self, filter: VerlaufFilter<'_>) -> DbResult<Vec<NachrichtRecord>>;

    /// Eine Zusammenfassung pro Gegenueber, neuestes Gespraech zuerst
    async fn gespraeche(&self, user_id: &UserId) -> DbResult<Vec<GespraechRecord>>;
}

/// Benachrichtigungen aus dem (externen) Buchungsablauf
#[allow(async_fn_in_trait)]
pub trait BenachrichtigungsRepository: Send + Sync {
    async fn create(&self, data: NeueBenachrichtigung<'_>) -> DbResult<BenachrichtigungRecord>;

    /// Ungelesene Benachrichtigungen, neueste zuerst
    async fn ungelesene(&self, recipient: &UserId) -> DbResult<Vec<BenachrichtigungRecord>>;
}

/// Lesender Zugriff auf das Schueler-/Lehrer-Verzeichnis
#[allow(async_fn_in_trait)]
pub trait Verzeichnis: Send + Sync {
    async fn profil(
        &self,
        id: &UserId,
        art: TeilnehmerArt,
    ) -> DbResult<Option<VerzeichnisEintrag>>;
}
