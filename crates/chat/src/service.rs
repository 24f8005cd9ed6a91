//! ChatService – Nachrichten senden, als gelesen markieren, Verlauf laden
//!
//! Die Persistenz ist die einzige Wahrheit: eine Nachricht gilt erst als
//! gesendet, wenn das Repository sie angelegt hat. Die Live-Zustellung ist
//! Sache des Aufrufers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use nachhilfe_core::types::{NachrichtId, TeilnehmerArt, UserId};
use nachhilfe_db::{
    models::{NachrichtRecord, NeueNachricht, VerlaufFilter},
    DbError, NachrichtenRepository, Verzeichnis,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{
        ChatConfig, ChatNachricht, Gespraech, Lesebestaetigung, NachrichtSenden, Profil,
        VerlaufAnfrage,
    },
};

const STANDARD_VERLAUF_LIMIT: i64 = 50;

/// ChatService verwaltet Direktnachrichten zwischen zwei Teilnehmern
pub struct ChatService<R: NachrichtenRepository, V: Verzeichnis> {
    repo: Arc<R>,
    verzeichnis: Arc<V>,
    config: ChatConfig,
    /// Zuletzt vergebener `created_at`-Wert dieser Instanz
    letzter_zeitstempel: Mutex<Option<DateTime<Utc>>>,
}

impl<R: NachrichtenRepository, V: Verzeichnis> ChatService<R, V> {
    /// Erstellt einen neuen ChatService
    pub fn neu(repo: Arc<R>, verzeichnis: Arc<V>, config: ChatConfig) -> Arc<Self> {
        Arc::new(Self {
            repo,
            verzeichnis,
            config,
            letzter_zeitstempel: Mutex::new(None),
        })
    }

    /// Nachricht validieren, persistieren und mit Profilen anreichern
    ///
    /// Schlaegt mit [`ChatError::Persistenz`] fehl wenn der Speicher nicht
    /// verfuegbar ist; die Nachricht existiert dann nicht.
    pub async fn nachricht_senden(&self, auftrag: NachrichtSenden) -> ChatResult<ChatNachricht> {
        if auftrag.sender_id.ist_leer() || auftrag.receiver_id.ist_leer() {
            return Err(ChatError::UngueltigeEingabe(
                "Sender und Empfaenger muessen gesetzt sein".into(),
            ));
        }

        if auftrag.body.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }

        let laenge = auftrag.body.chars().count();
        if laenge > self.config.max_body_laenge {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Nachricht zu lang: {} Zeichen (Maximum: {})",
                laenge, self.config.max_body_laenge
            )));
        }

        let created_at = self.naechster_zeitstempel();

        let record = NachrichtenRepository::create(
            self.repo.as_ref(),
            NeueNachricht {
                sender_id: &auftrag.sender_id,
                sender_art: auftrag.sender_art,
                receiver_id: &auftrag.receiver_id,
                receiver_art: auftrag.receiver_art,
                body: &auftrag.body,
                art: auftrag.art,
                created_at,
            },
        )
        .await?;

        debug!(
            nachricht_id = %record.id,
            sender = %record.sender_id,
            empfaenger = %record.receiver_id,
            "Nachricht persistiert"
        );

        let mut cache = ProfilCache::default();
        Ok(self.anreichern(record, &mut cache).await)
    }

    /// Markiert eine Nachricht als gelesen
    ///
    /// Nur der persistierte Empfaenger darf das. Idempotent: ein zweiter
    /// Aufruf liefert `geaendert = false`.
    pub async fn als_gelesen_markieren(
        &self,
        nachricht_id: NachrichtId,
        leser: &UserId,
    ) -> ChatResult<Lesebestaetigung> {
        let record = self
            .repo
            .get_by_id(nachricht_id)
            .await?
            .ok_or_else(|| ChatError::NachrichtNichtGefunden(nachricht_id.to_string()))?;

        if &record.receiver_id != leser {
            return Err(ChatError::NichtEmpfaenger(nachricht_id.to_string()));
        }

        let geaendert = match self.repo.als_gelesen_markieren(nachricht_id).await {
            Ok(geaendert) => geaendert,
            Err(DbError::NichtGefunden(_)) => {
                return Err(ChatError::NachrichtNichtGefunden(nachricht_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Lesebestaetigung {
            nachricht_id,
            sender_id: record.sender_id,
            geaendert,
        })
    }

    /// Verlauf zwischen zwei Teilnehmern laden, aelteste zuerst
    pub async fn verlauf_laden(&self, anfrage: VerlaufAnfrage) -> ChatResult<Vec<ChatNachricht>> {
        if anfrage.mit.ist_leer() {
            return Err(ChatError::UngueltigeEingabe(
                "Gegenueber darf nicht leer sein".into(),
            ));
        }

        let limit = anfrage
            .limit
            .unwrap_or(STANDARD_VERLAUF_LIMIT)
            .clamp(1, self.config.max_verlauf_limit.max(1));

        let records = self
            .repo
            .verlauf(VerlaufFilter {
                teilnehmer_a: &anfrage.user_id,
                teilnehmer_b: &anfrage.mit,
                before: anfrage.before,
                limit: Some(limit),
            })
            .await?;

        let mut cache = ProfilCache::default();
        let mut nachrichten = Vec::with_capacity(records.len());
        for record in records {
            nachrichten.push(self.anreichern(record, &mut cache).await);
        }
        Ok(nachrichten)
    }

    /// Gespraechsliste aus dem Log neu berechnen
    pub async fn gespraeche_laden(&self, user_id: &UserId) -> ChatResult<Vec<Gespraech>> {
        let records = self.repo.gespraeche(user_id).await?;

        let mut cache = ProfilCache::default();
        let mut gespraeche = Vec::with_capacity(records.len());
        for record in records {
            gespraeche.push(Gespraech {
                mit: record.partner,
                letzte_nachricht: self.anreichern(record.letzte_nachricht, &mut cache).await,
                ungelesen: record.ungelesen,
            });
        }
        Ok(gespraeche)
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Streng monoton steigender Zeitstempel: max(jetzt, letzter + 1µs)
    ///
    /// Auf Mikrosekunden gekuerzt, der Aufloesung des Speichers.
    fn naechster_zeitstempel(&self) -> DateTime<Utc> {
        let mut letzter = self.letzter_zeitstempel.lock();
        let jetzt = Utc::now().trunc_subsecs(6);
        let naechster = match *letzter {
            Some(vorher) if jetzt <= vorher => vorher + Duration::microseconds(1),
            _ => jetzt,
        };
        *letzter = Some(naechster);
        naechster
    }

    async fn anreichern(&self, record: NachrichtRecord, cache: &mut ProfilCache) -> ChatNachricht {
        let sender = self
            .profil_laden(&record.sender_id, record.sender_art, cache)
            .await;
        let receiver = self
            .profil_laden(&record.receiver_id, record.receiver_art, cache)
            .await;

        ChatNachricht {
            id: record.id,
            sender_id: record.sender_id,
            sender_art: record.sender_art,
            receiver_id: record.receiver_id,
            receiver_art: record.receiver_art,
            sender,
            receiver,
            body: record.body,
            art: record.art,
            read: record.read,
            created_at: record.created_at,
        }
    }

    /// Verzeichnisfehler blockieren die Zustellung nicht; das Profil fehlt dann
    async fn profil_laden(
        &self,
        id: &UserId,
        art: TeilnehmerArt,
        cache: &mut ProfilCache,
    ) -> Option<Profil> {
        let schluessel = (id.clone(), art);
        if let Some(profil) = cache.get(&schluessel) {
            return profil.clone();
        }

        let profil = match self.verzeichnis.profil(id, art).await {
            Ok(eintrag) => eintrag.map(|e| Profil {
                name: e.name,
                photo: e.photo,
            }),
            Err(e) => {
                warn!(user_id = %id, fehler = %e, "Verzeichnis-Abfrage fehlgeschlagen");
                None
            }
        };

        cache.insert(schluessel, profil.clone());
        profil
    }
}

type ProfilCache = HashMap<(UserId, TeilnehmerArt), Option<Profil>>;
