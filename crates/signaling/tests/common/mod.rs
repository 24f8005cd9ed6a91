//! Gemeinsame Helfer fuer die Szenario-Tests
//!
//! Ein `TestClient` ersetzt die TCP-Verbindung: er treibt den Dispatcher
//! direkt und liest die Send-Queue seiner Verbindung aus.

#![allow(dead_code)]

use std::sync::Arc;

use nachhilfe_chat::ChatConfig;
use nachhilfe_core::types::{TeilnehmerArt, UserId};
use nachhilfe_db::{models::VerzeichnisEintrag, SqliteDb};
use nachhilfe_observability::NachhilfeMetriken;
use nachhilfe_protocol::events::ChatSendenAnfrage;
use nachhilfe_protocol::{ClientEvent, ServerEvent};
use nachhilfe_signaling::{DispatcherContext, MessageDispatcher, SignalingConfig, SignalingState};
use tokio::sync::mpsc;

pub type TestState = Arc<SignalingState<SqliteDb>>;

pub fn uid(s: &str) -> UserId {
    UserId::neu(s)
}

/// Zustand mit In-Memory-DB und Verzeichnis-Eintraegen fuer u1, u2 und t1
pub async fn zustand() -> (TestState, Arc<SqliteDb>) {
    zustand_mit(SignalingConfig::default()).await
}

pub async fn zustand_mit(config: SignalingConfig) -> (TestState, Arc<SqliteDb>) {
    let db = Arc::new(
        SqliteDb::in_memory()
            .await
            .expect("In-Memory-DB konnte nicht geoeffnet werden"),
    );
    for (id, art, name) in [
        ("u1", TeilnehmerArt::User, "Lena"),
        ("u2", TeilnehmerArt::User, "Jonas"),
        ("t1", TeilnehmerArt::Teacher, "Frau Becker"),
    ] {
        db.profil_eintragen(&VerzeichnisEintrag {
            id: uid(id),
            art,
            name: name.into(),
            photo: None,
        })
        .await
        .expect("Profil anlegen fehlgeschlagen");
    }

    let metriken = NachhilfeMetriken::neu().expect("Metriken");
    let state = SignalingState::neu(config, ChatConfig::default(), db.clone(), metriken);
    (state, db)
}

pub struct TestClient {
    pub ctx: DispatcherContext,
    rx: mpsc::Receiver<ServerEvent>,
    dispatcher: MessageDispatcher<SqliteDb>,
}

impl TestClient {
    /// Neue Verbindung ohne angekuendigte Identitaet
    pub fn neu(state: &TestState) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let peer = "127.0.0.1:40000".parse().expect("Adresse");
        Self {
            ctx: DispatcherContext::neu(peer, tx),
            rx,
            dispatcher: MessageDispatcher::neu(Arc::clone(state)),
        }
    }

    /// Neue Verbindung die sofort `announce-identity` sendet
    pub async fn verbinden(state: &TestState, user: &str) -> Self {
        let mut client = Self::neu(state);
        let antwort = client.senden(ClientEvent::AnnounceIdentity(uid(user))).await;
        assert_eq!(antwort, None);
        client
    }

    pub async fn senden(&mut self, event: ClientEvent) -> Option<ServerEvent> {
        self.dispatcher.dispatch(event, &mut self.ctx).await
    }

    /// Alle bisher zugestellten Ereignisse
    pub fn empfangen(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Verwirft alles was bisher zugestellt wurde
    pub fn leeren(&mut self) {
        self.empfangen();
    }

    /// Verbindungsende wie in der ClientConnection
    pub fn trennen(mut self) {
        self.dispatcher.client_cleanup(&mut self.ctx);
    }
}

pub fn chat(von: &str, an: &str, body: &str) -> ClientEvent {
    ClientEvent::SendChatMessage(ChatSendenAnfrage {
        sender_id: uid(von),
        receiver_id: uid(an),
        body: body.into(),
        kind: Default::default(),
        sender_kind: TeilnehmerArt::User,
        receiver_kind: TeilnehmerArt::User,
    })
}
