//! Gemeinsame Identifikationstypen und Aufzaehlungen
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Opake Benutzer-Identitaet (Schueler oder Lehrkraft)
///
/// Wird vom Verzeichnis vergeben und hier nicht interpretiert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Erstellt eine UserId aus einem beliebigen String
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Erstellt eine UserId und lehnt leere Werte ab
    pub fn pruefen(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::LeereUserId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ist_leer(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::neu(s)
    }
}

// ---------------------------------------------------------------------------
// NachrichtId
// ---------------------------------------------------------------------------

/// Eindeutige ID einer persistierten Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NachrichtId(pub Uuid);

impl NachrichtId {
    /// Erstellt eine neue zufaellige NachrichtId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for NachrichtId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NachrichtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NachrichtId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::UngueltigeId {
                wert: s.to_string(),
                grund: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// BenachrichtigungsId
// ---------------------------------------------------------------------------

/// Eindeutige ID einer Benachrichtigung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenachrichtigungsId(pub Uuid);

impl BenachrichtigungsId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for BenachrichtigungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BenachrichtigungsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BenachrichtigungsId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::UngueltigeId {
                wert: s.to_string(),
                grund: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// AnrufId
// ---------------------------------------------------------------------------

/// ID einer ephemeren Anruf-Sitzung (nur im Speicher)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnrufId(pub Uuid);

impl AnrufId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnrufId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnrufId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Aufzaehlungen
// ---------------------------------------------------------------------------

/// Geschlossene Menge der Teilnehmer-Rollen
///
/// Die Wire-Namen entsprechen den Sammlungen des Verzeichnisses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeilnehmerArt {
    User,
    Teacher,
}

impl TeilnehmerArt {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Teacher => "Teacher",
        }
    }
}

impl FromStr for TeilnehmerArt {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "User" => Ok(Self::User),
            "Teacher" => Ok(Self::Teacher),
            andere => Err(CoreError::UnbekannteTeilnehmerArt(andere.to_string())),
        }
    }
}

/// Art einer Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenArt {
    #[default]
    Text,
    Media,
}

impl NachrichtenArt {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Media => "media",
        }
    }
}

impl FromStr for NachrichtenArt {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "media" => Ok(Self::Media),
            andere => Err(CoreError::UnbekannteNachrichtenArt(andere.to_string())),
        }
    }
}

/// Schweregrad einer Benachrichtigung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenachrichtigungsTyp {
    #[default]
    Info,
    Success,
    Error,
    Warning,
}

impl BenachrichtigungsTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl FromStr for BenachrichtigungsTyp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            andere => Err(CoreError::UnbekannterBenachrichtigungsTyp(
                andere.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nachricht_id_eindeutig() {
        let a = NachrichtId::new();
        let b = NachrichtId::new();
        assert_ne!(a, b, "Zwei neue NachrichtIds muessen verschieden sein");
    }

    #[test]
    fn user_id_ist_transparent() {
        let uid = UserId::neu("u1");
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"u1\"");
        let zurueck: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, uid);
    }

    #[test]
    fn leere_user_id_abgelehnt() {
        assert_eq!(UserId::pruefen("  "), Err(CoreError::LeereUserId));
        assert!(UserId::pruefen("u2").is_ok());
    }

    #[test]
    fn teilnehmer_art_wire_namen() {
        assert_eq!(
            serde_json::to_string(&TeilnehmerArt::Teacher).unwrap(),
            "\"Teacher\""
        );
        assert_eq!("User".parse::<TeilnehmerArt>(), Ok(TeilnehmerArt::User));
        assert!("Admin".parse::<TeilnehmerArt>().is_err());
    }

    #[test]
    fn nachrichten_art_standard_ist_text() {
        assert_eq!(NachrichtenArt::default(), NachrichtenArt::Text);
        assert_eq!("media".parse::<NachrichtenArt>(), Ok(NachrichtenArt::Media));
    }

    #[test]
    fn nachricht_id_parse_fehler() {
        let e = "keine-uuid".parse::<NachrichtId>().unwrap_err();
        assert!(matches!(e, CoreError::UngueltigeId { .. }));
    }
}
