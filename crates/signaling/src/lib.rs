//! nachhilfe-signaling – Echtzeit-Schicht der Nachhilfe-Plattform
//!
//! Dieser Crate haelt die persistenten Client-Verbindungen, kennt die
//! erreichbaren User, leitet Chat-Nachrichten und Tipp-Signale weiter und
//! vermittelt WebRTC-Anrufe zwischen zwei Teilnehmern.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein lokaler Task)
//!     |  announce-identity bindet die Verbindung an eine userId
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- ChatHandler          (Senden, Lesebestaetigung, Verlauf)
//!     +-- TypingHandler        (typing / stop-typing)
//!     +-- CallHandler          (Initiate, Accept, Reject, ICE, End)
//!     +-- NotificationHandler  (Abruf, Live-Push)
//!
//! Verbindungsregister – userId -> aktuelle Send-Queue
//! PresenceBroadcaster  – online/offline an alle anderen
//! AnrufVerwaltung      – Zustandsmaschine der Anruf-Sitzungen
//! ```

pub mod call;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use call::{AnrufConfig, AnrufFehler, AnrufVerwaltung, AnrufZustand};
pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use presence::PresenceBroadcaster;
pub use registry::{Bindung, ClientSender, RegisterBeobachter, SpeicherRegister, Verbindungsregister};
pub use server_state::{Datenbank, SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
