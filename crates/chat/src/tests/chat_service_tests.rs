//! Unit-Tests fuer den ChatService

use std::sync::Arc;

use nachhilfe_core::types::{NachrichtId, NachrichtenArt, TeilnehmerArt, UserId};
use nachhilfe_db::{models::VerzeichnisEintrag, SqliteDb};

use crate::{
    error::ChatError,
    service::ChatService,
    types::{ChatConfig, NachrichtSenden, Profil, VerlaufAnfrage},
};

async fn test_db() -> Arc<SqliteDb> {
    Arc::new(
        SqliteDb::in_memory()
            .await
            .expect("In-Memory-DB konnte nicht geoeffnet werden"),
    )
}

async fn setup_verzeichnis(db: &SqliteDb) {
    db.profil_eintragen(&VerzeichnisEintrag {
        id: UserId::neu("u1"),
        art: TeilnehmerArt::User,
        name: "Lena".into(),
        photo: None,
    })
    .await
    .expect("Profil anlegen fehlgeschlagen");

    db.profil_eintragen(&VerzeichnisEintrag {
        id: UserId::neu("t1"),
        art: TeilnehmerArt::Teacher,
        name: "Frau Becker".into(),
        photo: Some("/uploads/becker.png".into()),
    })
    .await
    .expect("Profil anlegen fehlgeschlagen");
}

fn auftrag(von: &str, an: &str, body: &str) -> NachrichtSenden {
    NachrichtSenden {
        sender_id: UserId::neu(von),
        sender_art: TeilnehmerArt::User,
        receiver_id: UserId::neu(an),
        receiver_art: TeilnehmerArt::Teacher,
        body: body.into(),
        art: NachrichtenArt::Text,
    }
}

fn service(db: &Arc<SqliteDb>) -> Arc<ChatService<SqliteDb, SqliteDb>> {
    ChatService::neu(db.clone(), db.clone(), ChatConfig::default())
}

#[tokio::test]
async fn test_nachricht_senden_erfolgreich() {
    let db = test_db().await;
    setup_verzeichnis(&db).await;
    let service = service(&db);

    let nachricht = service
        .nachricht_senden(auftrag("u1", "t1", "Hallo!"))
        .await
        .expect("Nachricht senden fehlgeschlagen");

    assert_eq!(nachricht.body, "Hallo!");
    assert!(!nachricht.read);
    assert_eq!(nachricht.art, NachrichtenArt::Text);
    assert_eq!(
        nachricht.sender,
        Some(Profil {
            name: "Lena".into(),
            photo: None
        })
    );
    assert_eq!(nachricht.receiver.as_ref().map(|p| p.name.as_str()), Some("Frau Becker"));
}

#[tokio::test]
async fn test_unbekanntes_profil_blockiert_nicht() {
    let db = test_db().await;
    let service = service(&db);

    let nachricht = service
        .nachricht_senden(auftrag("x", "y", "Hallo"))
        .await
        .expect("Nachricht senden fehlgeschlagen");

    assert!(nachricht.sender.is_none());
    assert!(nachricht.receiver.is_none());
}

#[tokio::test]
async fn test_leere_nachricht_abgelehnt() {
    let db = test_db().await;
    let service = service(&db);

    let result = service.nachricht_senden(auftrag("u1", "t1", "   ")).await;
    assert!(matches!(result, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn test_zu_lange_nachricht_abgelehnt() {
    let db = test_db().await;
    let service = ChatService::neu(
        db.clone(),
        db.clone(),
        ChatConfig {
            max_body_laenge: 10,
            ..Default::default()
        },
    );

    let result = service
        .nachricht_senden(auftrag("u1", "t1", &"x".repeat(11)))
        .await;
    assert!(matches!(result, Err(ChatError::UngueltigeEingabe(_))));

    // Grenze zaehlt Zeichen, nicht Bytes
    let result = service.nachricht_senden(auftrag("u1", "t1", &"ü".repeat(10))).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_leerer_empfaenger_abgelehnt() {
    let db = test_db().await;
    let service = service(&db);

    let result = service.nachricht_senden(auftrag("u1", "", "Hallo")).await;
    assert!(matches!(result, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn test_created_at_streng_monoton() {
    let db = test_db().await;
    let service = service(&db);

    let mut vorher = None;
    for i in 0..20 {
        let n = service
            .nachricht_senden(auftrag("u1", "t1", &format!("n{i}")))
            .await
            .unwrap();
        if let Some(v) = vorher {
            assert!(n.created_at > v, "created_at muss streng steigen");
        }
        vorher = Some(n.created_at);
    }
}

#[tokio::test]
async fn test_persistenzfehler_legt_nichts_an() {
    let db = test_db().await;
    let service = service(&db);
    db.schliessen().await;

    let result = service.nachricht_senden(auftrag("u1", "t1", "Hallo")).await;
    match result {
        Err(e) => assert!(e.ist_persistenz(), "unerwarteter Fehler: {e}"),
        Ok(_) => panic!("Senden darf bei geschlossenem Speicher nicht gelingen"),
    }
}

#[tokio::test]
async fn test_als_gelesen_markieren_idempotent() {
    let db = test_db().await;
    let service = service(&db);

    let nachricht = service
        .nachricht_senden(auftrag("u1", "t1", "Hallo"))
        .await
        .unwrap();

    let erste = service
        .als_gelesen_markieren(nachricht.id, &UserId::neu("t1"))
        .await
        .unwrap();
    assert!(erste.geaendert);
    assert_eq!(erste.sender_id, UserId::neu("u1"));

    let zweite = service
        .als_gelesen_markieren(nachricht.id, &UserId::neu("t1"))
        .await
        .unwrap();
    assert!(!zweite.geaendert);
}

#[tokio::test]
async fn test_nur_empfaenger_darf_markieren() {
    let db = test_db().await;
    let service = service(&db);

    let nachricht = service
        .nachricht_senden(auftrag("u1", "t1", "Hallo"))
        .await
        .unwrap();

    let result = service
        .als_gelesen_markieren(nachricht.id, &UserId::neu("u1"))
        .await;
    assert!(matches!(result, Err(ChatError::NichtEmpfaenger(_))));

    let verlauf = service
        .verlauf_laden(VerlaufAnfrage {
            user_id: UserId::neu("u1"),
            mit: UserId::neu("t1"),
            before: None,
            limit: None,
        })
        .await
        .unwrap();
    assert!(!verlauf[0].read);
}

#[tokio::test]
async fn test_unbekannte_nachricht_markieren() {
    let db = test_db().await;
    let service = service(&db);

    let result = service
        .als_gelesen_markieren(NachrichtId::new(), &UserId::neu("t1"))
        .await;
    assert!(matches!(result, Err(ChatError::NachrichtNichtGefunden(_))));
}

#[tokio::test]
async fn test_verlauf_reihenfolge_und_limit() {
    let db = test_db().await;
    let service = service(&db);

    for i in 0..5 {
        service
            .nachricht_senden(auftrag("u1", "t1", &format!("n{i}")))
            .await
            .unwrap();
    }

    let verlauf = service
        .verlauf_laden(VerlaufAnfrage {
            user_id: UserId::neu("t1"),
            mit: UserId::neu("u1"),
            before: None,
            limit: Some(3),
        })
        .await
        .unwrap();

    let bodies: Vec<_> = verlauf.iter().map(|n| n.body.as_str()).collect();
    assert_eq!(bodies, vec!["n2", "n3", "n4"]);
}

#[tokio::test]
async fn test_verlauf_limit_null_liefert_eine_nachricht() {
    let db = test_db().await;
    let service = ChatService::neu(
        db.clone(),
        db.clone(),
        ChatConfig {
            max_verlauf_limit: 0,
            ..ChatConfig::default()
        },
    );

    for i in 0..2 {
        service
            .nachricht_senden(auftrag("u1", "t1", &format!("n{i}")))
            .await
            .unwrap();
    }

    let verlauf = service
        .verlauf_laden(VerlaufAnfrage {
            user_id: UserId::neu("u1"),
            mit: UserId::neu("t1"),
            before: None,
            limit: None,
        })
        .await
        .unwrap();

    let bodies: Vec<_> = verlauf.iter().map(|n| n.body.as_str()).collect();
    assert_eq!(bodies, vec!["n1"]);
}

#[tokio::test]
async fn test_gespraeche_aus_log() {
    let db = test_db().await;
    setup_verzeichnis(&db).await;
    let service = service(&db);

    service
        .nachricht_senden(auftrag("u1", "t1", "erste"))
        .await
        .unwrap();
    service
        .nachricht_senden(auftrag("u1", "t1", "zweite"))
        .await
        .unwrap();

    let gespraeche = service.gespraeche_laden(&UserId::neu("t1")).await.unwrap();
    assert_eq!(gespraeche.len(), 1);
    assert_eq!(gespraeche[0].mit, UserId::neu("u1"));
    assert_eq!(gespraeche[0].letzte_nachricht.body, "zweite");
    assert_eq!(gespraeche[0].ungelesen, 2);
    assert!(gespraeche[0].letzte_nachricht.sender.is_some());

    // Aus Sicht des Senders gibt es nichts Ungelesenes
    let gespraeche = service.gespraeche_laden(&UserId::neu("u1")).await.unwrap();
    assert_eq!(gespraeche[0].ungelesen, 0);
}
