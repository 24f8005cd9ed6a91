//! nachhilfe-protocol – Ereignis-Protokoll der Echtzeitverbindung
//!
//! Dieses Crate definiert alle Ereignisse die ueber die persistente
//! Verbindung zwischen Client und Server ausgetauscht werden, sowie das
//! frame-basierte Wire-Format.

pub mod events;
pub mod wire;

pub use events::{ClientEvent, FehlerCode, ServerEvent};
pub use wire::FrameCodec;
