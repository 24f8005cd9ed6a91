//! Ereignis-Vertrag der Echtzeitverbindung
//!
//! Jeder Frame traegt genau ein Ereignis im Format
//! `{"event": "<name>", "data": <payload>}`. Die Ereignisnamen sind
//! kebab-case, die Felder der Payloads camelCase.
//!
//! ## Richtungen
//! - [`ClientEvent`]: Client -> Server
//! - [`ServerEvent`]: Server -> Client
//!
//! Verhandlungsdaten von Anrufen (Offer, Answer, ICE-Kandidaten) werden als
//! opake JSON-Werte transportiert und nie interpretiert.

use chrono::{DateTime, Utc};
use nachhilfe_core::types::{
    BenachrichtigungsId, BenachrichtigungsTyp, NachrichtId, NachrichtenArt, TeilnehmerArt, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer `error`-Ereignisse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FehlerCode {
    /// Identitaet wurde noch nicht angekuendigt
    NotAnnounced,
    InvalidRequest,
    NotFound,
    Forbidden,
    InternalError,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Anfrage zum Senden einer Chat-Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendenAnfrage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(alias = "message")]
    pub body: String,
    #[serde(default, alias = "messageType")]
    pub kind: NachrichtenArt,
    pub sender_kind: TeilnehmerArt,
    pub receiver_kind: TeilnehmerArt,
}

/// Anzeigefelder eines Teilnehmers aus dem Verzeichnis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeilnehmerProfil {
    pub name: String,
    pub photo: Option<String>,
}

/// Vollstaendig befuellte Nachricht wie sie an Clients ausgeliefert wird
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtAnsicht {
    pub id: NachrichtId,
    pub sender_id: UserId,
    pub sender_kind: TeilnehmerArt,
    pub receiver_id: UserId,
    pub receiver_kind: TeilnehmerArt,
    /// Profil des Senders (fehlt wenn das Verzeichnis nichts liefert)
    pub sender: Option<TeilnehmerProfil>,
    pub receiver: Option<TeilnehmerProfil>,
    pub body: String,
    pub kind: NachrichtenArt,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fehler beim Senden einer Chat-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFehler {
    pub error: String,
}

/// Lesebestaetigung vom Empfaenger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LesebestaetigungAnfrage {
    pub message_id: NachrichtId,
    /// Vom Client angegebener Sender; massgeblich ist der persistierte Sender
    #[serde(default)]
    pub sender_id: Option<UserId>,
}

/// Meldung an den urspruenglichen Sender: Nachricht wurde gelesen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GelesenMeldung {
    pub message_id: NachrichtId,
}

/// Anfrage nach dem Verlauf mit einem Gegenueber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerlaufAnfrage {
    pub with: UserId,
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerlaufAntwort {
    pub with: UserId,
    pub messages: Vec<NachrichtAnsicht>,
}

/// Zusammenfassung eines Gespraechs aus Sicht eines Teilnehmers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GespraechAnsicht {
    pub with: UserId,
    pub last_message: NachrichtAnsicht,
    pub unread_count: i64,
}

// ---------------------------------------------------------------------------
// Tipp-Signale
// ---------------------------------------------------------------------------

/// Tipp-Signal vom Client; weitere Felder werden unveraendert weitergereicht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TippSignal {
    pub receiver_id: UserId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Weitergeleitetes Tipp-Signal mit serverseitig gesetztem Sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TippWeiterleitung {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Anruf-Signalisierung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufStarten {
    pub to: UserId,
    pub offer: Value,
    /// Wird ignoriert wenn abweichend von der angekuendigten Identitaet
    #[serde(default)]
    pub from: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufAnnehmen {
    pub to: UserId,
    pub answer: Value,
}

/// Payload fuer `call-reject` und `call-end`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufZiel {
    pub to: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KandidatSenden {
    pub to: UserId,
    pub candidate: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EingehenderAnruf {
    pub from: UserId,
    pub name: Option<String>,
    pub offer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufAngenommen {
    pub from: UserId,
    pub answer: Value,
}

/// Warum ein Anruf abgelehnt wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AblehnungsGrund {
    /// Gegenueber hat aktiv abgelehnt
    Rejected,
    /// Gegenueber ist bereits in einer Sitzung
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufAbgelehnt {
    pub from: UserId,
    pub reason: AblehnungsGrund,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KandidatWeiterleitung {
    pub from: UserId,
    pub candidate: Value,
}

/// Warum eine Anruf-Sitzung endete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeendigungsGrund {
    /// Explizites Auflegen
    Hangup,
    /// Verbindung des Gegenuebers getrennt
    Disconnect,
    /// Klingel-Timeout abgelaufen
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnrufBeendet {
    pub from: UserId,
    pub reason: BeendigungsGrund,
}

// ---------------------------------------------------------------------------
// Benachrichtigungen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenachrichtigungAnsicht {
    pub id: BenachrichtigungsId,
    pub recipient: UserId,
    pub message: String,
    #[serde(rename = "type")]
    pub typ: BenachrichtigungsTyp,
    pub read: bool,
    pub related_booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Allgemein
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FehlerMeldung {
    pub code: FehlerCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zeitstempel {
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Ereignis-Enums
// ---------------------------------------------------------------------------

/// Alle Ereignisse die ein Client senden darf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Bindet die Verbindung an eine Identitaet (erneutes Senden registriert neu)
    AnnounceIdentity(UserId),
    SendChatMessage(ChatSendenAnfrage),
    Typing(TippSignal),
    StopTyping(TippSignal),
    ReadReceipt(LesebestaetigungAnfrage),
    CallInitiate(AnrufStarten),
    CallAccept(AnrufAnnehmen),
    CallReject(AnrufZiel),
    IceCandidate(KandidatSenden),
    CallEnd(AnrufZiel),
    FetchHistory(VerlaufAnfrage),
    FetchConversations,
    FetchNotifications,
    Pong(Zeitstempel),
}

impl ClientEvent {
    /// Ereignisname fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AnnounceIdentity(_) => "announce-identity",
            Self::SendChatMessage(_) => "send-chat-message",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop-typing",
            Self::ReadReceipt(_) => "read-receipt",
            Self::CallInitiate(_) => "call-initiate",
            Self::CallAccept(_) => "call-accept",
            Self::CallReject(_) => "call-reject",
            Self::IceCandidate(_) => "ice-candidate",
            Self::CallEnd(_) => "call-end",
            Self::FetchHistory(_) => "fetch-history",
            Self::FetchConversations => "fetch-conversations",
            Self::FetchNotifications => "fetch-notifications",
            Self::Pong(_) => "pong",
        }
    }
}

/// Alle Ereignisse die der Server an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ChatMessageDelivered(NachrichtAnsicht),
    ChatMessageSentAck(NachrichtAnsicht),
    ChatMessageError(ChatFehler),
    Typing(TippWeiterleitung),
    StopTyping(TippWeiterleitung),
    MessageRead(GelesenMeldung),
    CallIncoming(EingehenderAnruf),
    CallAccepted(AnrufAngenommen),
    CallRejected(AnrufAbgelehnt),
    IceCandidate(KandidatWeiterleitung),
    CallEnded(AnrufBeendet),
    PresenceOnline(UserId),
    PresenceOffline(UserId),
    Notification(BenachrichtigungAnsicht),
    History(VerlaufAntwort),
    Conversations(Vec<GespraechAnsicht>),
    Notifications(Vec<BenachrichtigungAnsicht>),
    Error(FehlerMeldung),
    Ping(Zeitstempel),
}

impl ServerEvent {
    /// Erstellt ein `error`-Ereignis
    pub fn fehler(code: FehlerCode, message: impl Into<String>) -> Self {
        Self::Error(FehlerMeldung {
            code,
            message: message.into(),
        })
    }

    /// Erstellt ein Keepalive-Ping
    pub fn ping(timestamp_ms: u64) -> Self {
        Self::Ping(Zeitstempel { timestamp_ms })
    }

    /// Ereignisname fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatMessageDelivered(_) => "chat-message-delivered",
            Self::ChatMessageSentAck(_) => "chat-message-sent-ack",
            Self::ChatMessageError(_) => "chat-message-error",
            Self::Typing(_) => "typing",
            Self::StopTyping(_) => "stop-typing",
            Self::MessageRead(_) => "message-read",
            Self::CallIncoming(_) => "call-incoming",
            Self::CallAccepted(_) => "call-accepted",
            Self::CallRejected(_) => "call-rejected",
            Self::IceCandidate(_) => "ice-candidate",
            Self::CallEnded(_) => "call-ended",
            Self::PresenceOnline(_) => "presence-online",
            Self::PresenceOffline(_) => "presence-offline",
            Self::Notification(_) => "notification",
            Self::History(_) => "history",
            Self::Conversations(_) => "conversations",
            Self::Notifications(_) => "notifications",
            Self::Error(_) => "error",
            Self::Ping(_) => "ping",
        }
    }
}
