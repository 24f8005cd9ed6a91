//! Handler fuer alle Client-Ereignisse
//!
//! Jeder Handler ist fuer eine Gruppe von Ereignissen zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod call_handler;
pub mod chat_handler;
pub mod notification_handler;
pub mod typing_handler;
