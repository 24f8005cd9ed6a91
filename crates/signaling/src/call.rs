//! Anruf-Signalisierung – Zustandsmaschine pro Anruf-Sitzung
//!
//! Die Verwaltung haelt nur ephemeren Zustand und persistiert nichts. Jede
//! Operation prueft den Uebergang unter einem Lock und gibt die daraus
//! folgenden Zustellungen zurueck; gesendet wird erst nach Freigabe des
//! Locks. Verhandlungsdaten (Offer, Answer, ICE) bleiben opak.
//!
//! ## Zustaende aus Sicht eines Teilnehmers
//! ```text
//!            initiate                accept
//! Idle ──────────────> Calling ─────────────────> Connected
//!   │                  (Anrufer)                     │
//!   │                                                │
//!   └─────────────────> Incoming ────────────────────┘
//!                      (Angerufener)
//!
//! reject / end / disconnect / timeout: Sitzung endet, beide wieder Idle
//! ```
//!
//! ## ICE-Kandidaten
//! Solange die Sitzung klingelt, werden Kandidaten pro Richtung gepuffert
//! (begrenzt, aelteste fallen heraus) und direkt nach `accept` in
//! Reihenfolge ausgeliefert. Im Zustand Connected werden sie sofort
//! weitergeleitet.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use nachhilfe_core::types::{AnrufId, UserId};
use nachhilfe_protocol::events::{
    AblehnungsGrund, AnrufAbgelehnt, AnrufAngenommen, AnrufAnnehmen, AnrufBeendet, AnrufStarten,
    BeendigungsGrund, EingehenderAnruf, KandidatSenden, KandidatWeiterleitung,
};
use nachhilfe_protocol::ServerEvent;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Oeffentliche Typen
// ---------------------------------------------------------------------------

/// Zustand eines Teilnehmers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnrufZustand {
    Idle,
    /// Hat angerufen, wartet auf Antwort
    Calling,
    /// Wird angerufen
    Incoming,
    Connected,
}

/// Wie eine Operation eine Sitzung abgeschlossen oder weitergefuehrt hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnrufAusgang {
    Angenommen,
    Abgelehnt,
    Besetzt,
    Aufgelegt,
    Getrennt,
    Timeout,
}

impl AnrufAusgang {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Angenommen => "accepted",
            Self::Abgelehnt => "rejected",
            Self::Besetzt => "busy",
            Self::Aufgelegt => "hangup",
            Self::Getrennt => "disconnect",
            Self::Timeout => "timeout",
        }
    }
}

/// Ein Ereignis fuer einen bestimmten Empfaenger
#[derive(Debug, Clone, PartialEq)]
pub struct Zustellung {
    pub an: UserId,
    pub event: ServerEvent,
}

impl Zustellung {
    fn neu(an: &UserId, event: ServerEvent) -> Self {
        Self {
            an: an.clone(),
            event,
        }
    }
}

/// Ergebnis eines erlaubten Uebergangs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uebergang {
    pub zustellungen: Vec<Zustellung>,
    /// Gesetzt wenn der Uebergang einen Anruf angenommen oder beendet hat
    pub ausgang: Option<AnrufAusgang>,
}

/// Unzulaessiger Uebergang; wird geloggt und verworfen, nie an Clients gemeldet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnrufFehler {
    #[error("{0} kann sich nicht selbst anrufen")]
    SelbstAnruf(UserId),

    #[error("{user} ist nicht Idle (Zustand: {zustand:?})")]
    NichtIdle { user: UserId, zustand: AnrufZustand },

    #[error("{user} hat keinen eingehenden Anruf von {von}")]
    KeinEingehenderAnruf { user: UserId, von: UserId },

    #[error("{user} hat keine Sitzung mit {mit}")]
    KeineSitzung { user: UserId, mit: UserId },
}

/// Einstellungen der Anruf-Verwaltung
#[derive(Debug, Clone)]
pub struct AnrufConfig {
    /// Wie lange eine Sitzung klingeln darf
    pub klingel_timeout: Duration,
    /// Maximale gepufferte ICE-Kandidaten pro Richtung
    pub max_ausstehende_kandidaten: usize,
}

impl Default for AnrufConfig {
    fn default() -> Self {
        Self {
            klingel_timeout: Duration::from_secs(45),
            max_ausstehende_kandidaten: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// Interner Zustand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Klingelt,
    Verbunden,
}

#[derive(Debug)]
struct AnrufSitzung {
    id: AnrufId,
    anrufer: UserId,
    angerufener: UserId,
    phase: Phase,
    /// Angerufener war beim Start erreichbar und hat das Angebot erhalten
    angerufener_gebunden: bool,
    gestartet: Instant,
    /// Kandidaten vom Angerufenen an den Anrufer
    an_anrufer: VecDeque<Value>,
    /// Kandidaten vom Anrufer an den Angerufenen
    an_angerufenen: VecDeque<Value>,
}

impl AnrufSitzung {
    fn gegenueber(&self, user: &UserId) -> &UserId {
        if user == &self.anrufer {
            &self.angerufener
        } else {
            &self.anrufer
        }
    }

    /// Ob `user` Ereignisse zu dieser Sitzung bekommt
    fn beteiligt(&self, user: &UserId) -> bool {
        user == &self.anrufer || (user == &self.angerufener && self.angerufener_gebunden)
    }

    fn zustand_fuer(&self, user: &UserId) -> AnrufZustand {
        match self.phase {
            Phase::Verbunden => AnrufZustand::Connected,
            Phase::Klingelt if user == &self.anrufer => AnrufZustand::Calling,
            Phase::Klingelt => AnrufZustand::Incoming,
        }
    }
}

#[derive(Debug, Default)]
struct Tabelle {
    sitzungen: HashMap<AnrufId, AnrufSitzung>,
    /// Jeder Teilnehmer ist in hoechstens einer Sitzung
    teilnehmer: HashMap<UserId, AnrufId>,
}

impl Tabelle {
    fn sitzung_von(&self, user: &UserId) -> Option<&AnrufSitzung> {
        self.teilnehmer.get(user).and_then(|id| self.sitzungen.get(id))
    }

    fn zustand(&self, user: &UserId) -> AnrufZustand {
        self.sitzung_von(user)
            .map(|s| s.zustand_fuer(user))
            .unwrap_or(AnrufZustand::Idle)
    }

    fn entfernen(&mut self, id: &AnrufId) -> Option<AnrufSitzung> {
        let sitzung = self.sitzungen.remove(id)?;
        for user in [&sitzung.anrufer, &sitzung.angerufener] {
            if self.teilnehmer.get(user) == Some(id) {
                self.teilnehmer.remove(user);
            }
        }
        Some(sitzung)
    }

    /// Sitzung von `user` mit genau `mit` als Gegenueber
    fn sitzung_mit(&mut self, user: &UserId, mit: &UserId) -> Option<&mut AnrufSitzung> {
        let id = self.teilnehmer.get(user)?;
        self.sitzungen
            .get_mut(id)
            .filter(|s| s.gegenueber(user) == mit)
    }
}

// ---------------------------------------------------------------------------
// AnrufVerwaltung
// ---------------------------------------------------------------------------

/// Verwaltet alle laufenden Anruf-Sitzungen
pub struct AnrufVerwaltung {
    config: AnrufConfig,
    tabelle: Mutex<Tabelle>,
}

impl AnrufVerwaltung {
    pub fn neu(config: AnrufConfig) -> Self {
        Self {
            config,
            tabelle: Mutex::new(Tabelle::default()),
        }
    }

    pub fn zustand(&self, user: &UserId) -> AnrufZustand {
        self.tabelle.lock().zustand(user)
    }

    pub fn aktive_sitzungen(&self) -> usize {
        self.tabelle.lock().sitzungen.len()
    }

    /// Startet einen Anruf von `anrufer` an `anfrage.to`
    ///
    /// Ist der Angerufene bereits in einer Sitzung, entsteht keine Sitzung
    /// und der Anrufer erhaelt `call-rejected` mit Grund `busy`. Ist er nicht
    /// `erreichbar`, geht nur der Anrufer in Calling; der Angerufene bleibt
    /// Idle und die Sitzung laeuft in den Klingel-Timeout.
    pub fn starten(
        &self,
        anrufer: &UserId,
        anfrage: AnrufStarten,
        erreichbar: bool,
    ) -> Result<Uebergang, AnrufFehler> {
        let angerufener = anfrage.to;
        if &angerufener == anrufer {
            return Err(AnrufFehler::SelbstAnruf(anrufer.clone()));
        }

        let mut tabelle = self.tabelle.lock();

        let zustand = tabelle.zustand(anrufer);
        if zustand != AnrufZustand::Idle {
            return Err(AnrufFehler::NichtIdle {
                user: anrufer.clone(),
                zustand,
            });
        }

        if tabelle.zustand(&angerufener) != AnrufZustand::Idle {
            tracing::debug!(anrufer = %anrufer, angerufener = %angerufener, "Angerufener besetzt");
            return Ok(Uebergang {
                zustellungen: vec![Zustellung::neu(
                    anrufer,
                    ServerEvent::CallRejected(AnrufAbgelehnt {
                        from: angerufener,
                        reason: AblehnungsGrund::Busy,
                    }),
                )],
                ausgang: Some(AnrufAusgang::Besetzt),
            });
        }

        let id = AnrufId::new();
        tabelle.teilnehmer.insert(anrufer.clone(), id);
        if erreichbar {
            tabelle.teilnehmer.insert(angerufener.clone(), id);
        }
        tabelle.sitzungen.insert(
            id,
            AnrufSitzung {
                id,
                anrufer: anrufer.clone(),
                angerufener: angerufener.clone(),
                phase: Phase::Klingelt,
                angerufener_gebunden: erreichbar,
                gestartet: Instant::now(),
                an_anrufer: VecDeque::new(),
                an_angerufenen: VecDeque::new(),
            },
        );

        tracing::debug!(anruf = %id, anrufer = %anrufer, angerufener = %angerufener, erreichbar, "Anruf gestartet");

        if !erreichbar {
            return Ok(Uebergang::default());
        }

        Ok(Uebergang {
            zustellungen: vec![Zustellung::neu(
                &angerufener,
                ServerEvent::CallIncoming(EingehenderAnruf {
                    from: anrufer.clone(),
                    name: anfrage.name,
                    offer: anfrage.offer,
                }),
            )],
            ausgang: None,
        })
    }

    /// Angerufener nimmt an; gepufferte Kandidaten folgen der Answer
    pub fn annehmen(
        &self,
        angerufener: &UserId,
        anfrage: AnrufAnnehmen,
    ) -> Result<Uebergang, AnrufFehler> {
        let mut tabelle = self.tabelle.lock();
        let anrufer = anfrage.to;

        let sitzung = tabelle
            .sitzung_mit(angerufener, &anrufer)
            .filter(|s| s.phase == Phase::Klingelt && &s.angerufener == angerufener)
            .ok_or_else(|| AnrufFehler::KeinEingehenderAnruf {
                user: angerufener.clone(),
                von: anrufer.clone(),
            })?;

        sitzung.phase = Phase::Verbunden;

        let mut zustellungen = vec![Zustellung::neu(
            &anrufer,
            ServerEvent::CallAccepted(AnrufAngenommen {
                from: angerufener.clone(),
                answer: anfrage.answer,
            }),
        )];
        zustellungen.extend(sitzung.an_angerufenen.drain(..).map(|candidate| {
            Zustellung::neu(
                angerufener,
                ServerEvent::IceCandidate(KandidatWeiterleitung {
                    from: anrufer.clone(),
                    candidate,
                }),
            )
        }));
        zustellungen.extend(sitzung.an_anrufer.drain(..).map(|candidate| {
            Zustellung::neu(
                &anrufer,
                ServerEvent::IceCandidate(KandidatWeiterleitung {
                    from: angerufener.clone(),
                    candidate,
                }),
            )
        }));

        tracing::debug!(anruf = %sitzung.id, "Anruf angenommen");

        Ok(Uebergang {
            zustellungen,
            ausgang: Some(AnrufAusgang::Angenommen),
        })
    }

    /// Angerufener lehnt ab; beide wieder Idle
    pub fn ablehnen(&self, angerufener: &UserId, anrufer: &UserId) -> Result<Uebergang, AnrufFehler> {
        let mut tabelle = self.tabelle.lock();

        let id = tabelle
            .sitzung_mit(angerufener, anrufer)
            .filter(|s| s.phase == Phase::Klingelt && &s.angerufener == angerufener)
            .map(|s| s.id)
            .ok_or_else(|| AnrufFehler::KeinEingehenderAnruf {
                user: angerufener.clone(),
                von: anrufer.clone(),
            })?;
        tabelle.entfernen(&id);

        tracing::debug!(anruf = %id, "Anruf abgelehnt");

        Ok(Uebergang {
            zustellungen: vec![Zustellung::neu(
                anrufer,
                ServerEvent::CallRejected(AnrufAbgelehnt {
                    from: angerufener.clone(),
                    reason: AblehnungsGrund::Rejected,
                }),
            )],
            ausgang: Some(AnrufAusgang::Abgelehnt),
        })
    }

    /// ICE-Kandidat von `von` an `anfrage.to`
    pub fn kandidat(&self, von: &UserId, anfrage: KandidatSenden) -> Result<Uebergang, AnrufFehler> {
        let max = self.config.max_ausstehende_kandidaten;
        let mut tabelle = self.tabelle.lock();
        let an = anfrage.to;

        let sitzung = tabelle
            .sitzung_mit(von, &an)
            .ok_or_else(|| AnrufFehler::KeineSitzung {
                user: von.clone(),
                mit: an.clone(),
            })?;

        if sitzung.phase == Phase::Verbunden {
            return Ok(Uebergang {
                zustellungen: vec![Zustellung::neu(
                    &an,
                    ServerEvent::IceCandidate(KandidatWeiterleitung {
                        from: von.clone(),
                        candidate: anfrage.candidate,
                    }),
                )],
                ausgang: None,
            });
        }

        let puffer = if &sitzung.anrufer == von {
            &mut sitzung.an_angerufenen
        } else {
            &mut sitzung.an_anrufer
        };
        if puffer.len() >= max {
            puffer.pop_front();
            tracing::warn!(anruf = %sitzung.id, von = %von, "ICE-Puffer voll – aeltester Kandidat verworfen");
        }
        puffer.push_back(anfrage.candidate);

        Ok(Uebergang::default())
    }

    /// Explizites Auflegen durch einen der beiden Teilnehmer
    pub fn beenden(&self, von: &UserId, an: &UserId) -> Result<Uebergang, AnrufFehler> {
        let mut tabelle = self.tabelle.lock();

        let (id, an_beteiligt) = tabelle
            .sitzung_mit(von, an)
            .map(|s| (s.id, s.beteiligt(an)))
            .ok_or_else(|| AnrufFehler::KeineSitzung {
                user: von.clone(),
                mit: an.clone(),
            })?;
        tabelle.entfernen(&id);

        tracing::debug!(anruf = %id, von = %von, "Anruf beendet");

        let zustellungen = if an_beteiligt {
            vec![Zustellung::neu(
                an,
                ServerEvent::CallEnded(AnrufBeendet {
                    from: von.clone(),
                    reason: BeendigungsGrund::Hangup,
                }),
            )]
        } else {
            Vec::new()
        };

        Ok(Uebergang {
            zustellungen,
            ausgang: Some(AnrufAusgang::Aufgelegt),
        })
    }

    /// Implizites Auflegen beim Verbindungsende von `user`
    pub fn verbindung_getrennt(&self, user: &UserId) -> Uebergang {
        let mut tabelle = self.tabelle.lock();

        let Some(id) = tabelle.teilnehmer.get(user).copied() else {
            return Uebergang::default();
        };
        let Some(sitzung) = tabelle.entfernen(&id) else {
            return Uebergang::default();
        };

        tracing::debug!(anruf = %id, user = %user, "Anruf durch Trennung beendet");

        let gegenueber = sitzung.gegenueber(user);
        let zustellungen = if sitzung.beteiligt(gegenueber) {
            vec![Zustellung::neu(
                gegenueber,
                ServerEvent::CallEnded(AnrufBeendet {
                    from: user.clone(),
                    reason: BeendigungsGrund::Disconnect,
                }),
            )]
        } else {
            Vec::new()
        };

        Uebergang {
            zustellungen,
            ausgang: Some(AnrufAusgang::Getrennt),
        }
    }

    /// Beendet alle Sitzungen die laenger als der Klingel-Timeout klingeln
    ///
    /// Gibt pro abgelaufener Sitzung einen Uebergang zurueck.
    pub fn abgelaufene_beenden(&self, jetzt: Instant) -> Vec<Uebergang> {
        let mut tabelle = self.tabelle.lock();
        let timeout = self.config.klingel_timeout;

        let abgelaufen: Vec<AnrufId> = tabelle
            .sitzungen
            .values()
            .filter(|s| s.phase == Phase::Klingelt && jetzt.duration_since(s.gestartet) >= timeout)
            .map(|s| s.id)
            .collect();

        abgelaufen
            .into_iter()
            .filter_map(|id| tabelle.entfernen(&id))
            .map(|s| {
                tracing::debug!(anruf = %s.id, anrufer = %s.anrufer, "Klingel-Timeout");
                let mut zustellungen = vec![Zustellung::neu(
                    &s.anrufer,
                    ServerEvent::CallEnded(AnrufBeendet {
                        from: s.angerufener.clone(),
                        reason: BeendigungsGrund::Timeout,
                    }),
                )];
                if s.angerufener_gebunden {
                    zustellungen.push(Zustellung::neu(
                        &s.angerufener,
                        ServerEvent::CallEnded(AnrufBeendet {
                            from: s.anrufer.clone(),
                            reason: BeendigungsGrund::Timeout,
                        }),
                    ));
                }
                Uebergang {
                    zustellungen,
                    ausgang: Some(AnrufAusgang::Timeout),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uid(s: &str) -> UserId {
        UserId::neu(s)
    }

    fn verwaltung() -> AnrufVerwaltung {
        AnrufVerwaltung::neu(AnrufConfig {
            klingel_timeout: Duration::from_secs(30),
            max_ausstehende_kandidaten: 2,
        })
    }

    fn starten(v: &AnrufVerwaltung, von: &str, an: &str) -> Result<Uebergang, AnrufFehler> {
        v.starten(
            &uid(von),
            AnrufStarten {
                to: uid(an),
                offer: json!({"sdp": "O"}),
                from: None,
                name: Some("Lena".into()),
            },
            true,
        )
    }

    fn kandidat(v: &AnrufVerwaltung, von: &str, an: &str, c: u32) -> Result<Uebergang, AnrufFehler> {
        v.kandidat(
            &uid(von),
            KandidatSenden {
                to: uid(an),
                candidate: json!(c),
            },
        )
    }

    #[test]
    fn starten_setzt_calling_und_incoming() {
        let v = verwaltung();
        let u = starten(&v, "a", "b").unwrap();

        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Calling);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Incoming);
        assert_eq!(u.zustellungen.len(), 1);
        assert_eq!(u.zustellungen[0].an, uid("b"));
        assert_eq!(
            u.zustellungen[0].event,
            ServerEvent::CallIncoming(EingehenderAnruf {
                from: uid("a"),
                name: Some("Lena".into()),
                offer: json!({"sdp": "O"}),
            })
        );
    }

    #[test]
    fn zweiter_start_ist_noop() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let err = starten(&v, "a", "c").unwrap_err();
        assert!(matches!(err, AnrufFehler::NichtIdle { .. }));
        assert_eq!(v.aktive_sitzungen(), 1);
        assert_eq!(v.zustand(&uid("c")), AnrufZustand::Idle);
    }

    #[test]
    fn selbstanruf_abgelehnt() {
        let v = verwaltung();
        assert_eq!(
            starten(&v, "a", "a").unwrap_err(),
            AnrufFehler::SelbstAnruf(uid("a"))
        );
    }

    #[test]
    fn besetzter_angerufener() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let u = starten(&v, "c", "b").unwrap();
        assert_eq!(u.ausgang, Some(AnrufAusgang::Besetzt));
        assert_eq!(
            u.zustellungen,
            vec![Zustellung::neu(
                &uid("c"),
                ServerEvent::CallRejected(AnrufAbgelehnt {
                    from: uid("b"),
                    reason: AblehnungsGrund::Busy,
                })
            )]
        );
        assert_eq!(v.zustand(&uid("c")), AnrufZustand::Idle);
        assert_eq!(v.aktive_sitzungen(), 1);
    }

    #[test]
    fn annehmen_verbindet_beide() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let u = v
            .annehmen(
                &uid("b"),
                AnrufAnnehmen {
                    to: uid("a"),
                    answer: json!("R"),
                },
            )
            .unwrap();

        assert_eq!(u.ausgang, Some(AnrufAusgang::Angenommen));
        assert_eq!(u.zustellungen[0].an, uid("a"));
        assert_eq!(
            u.zustellungen[0].event,
            ServerEvent::CallAccepted(AnrufAngenommen {
                from: uid("b"),
                answer: json!("R"),
            })
        );
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Connected);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Connected);
    }

    #[test]
    fn anrufer_kann_nicht_selbst_annehmen() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let err = v
            .annehmen(
                &uid("a"),
                AnrufAnnehmen {
                    to: uid("b"),
                    answer: json!("R"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AnrufFehler::KeinEingehenderAnruf { .. }));
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Calling);
    }

    #[test]
    fn annehmen_fuer_falschen_anrufer_abgelehnt() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let err = v
            .annehmen(
                &uid("b"),
                AnrufAnnehmen {
                    to: uid("x"),
                    answer: json!("R"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AnrufFehler::KeinEingehenderAnruf { .. }));
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Incoming);
    }

    #[test]
    fn ablehnen_setzt_beide_idle() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        let u = v.ablehnen(&uid("b"), &uid("a")).unwrap();
        assert_eq!(u.ausgang, Some(AnrufAusgang::Abgelehnt));
        assert_eq!(u.zustellungen[0].an, uid("a"));
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Idle);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Idle);
        assert_eq!(v.aktive_sitzungen(), 0);
    }

    #[test]
    fn kandidaten_werden_gepuffert_und_nach_annahme_geliefert() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        // Puffer fasst 2: der erste Kandidat faellt heraus
        for c in 1..=3 {
            let u = kandidat(&v, "a", "b", c).unwrap();
            assert!(u.zustellungen.is_empty());
        }
        kandidat(&v, "b", "a", 9).unwrap();

        let u = v
            .annehmen(
                &uid("b"),
                AnrufAnnehmen {
                    to: uid("a"),
                    answer: json!("R"),
                },
            )
            .unwrap();

        let an_b: Vec<_> = u
            .zustellungen
            .iter()
            .filter(|z| z.an == uid("b"))
            .map(|z| z.event.clone())
            .collect();
        assert_eq!(
            an_b,
            vec![
                ServerEvent::IceCandidate(KandidatWeiterleitung {
                    from: uid("a"),
                    candidate: json!(2)
                }),
                ServerEvent::IceCandidate(KandidatWeiterleitung {
                    from: uid("a"),
                    candidate: json!(3)
                }),
            ]
        );
        // Answer vor den gepufferten Kandidaten des Angerufenen
        assert!(matches!(u.zustellungen[0].event, ServerEvent::CallAccepted(_)));
        assert_eq!(u.zustellungen.last().unwrap().an, uid("a"));
    }

    #[test]
    fn kandidat_im_gespraech_sofort() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();
        v.annehmen(
            &uid("b"),
            AnrufAnnehmen {
                to: uid("a"),
                answer: json!("R"),
            },
        )
        .unwrap();

        let u = kandidat(&v, "b", "a", 7).unwrap();
        assert_eq!(u.zustellungen.len(), 1);
        assert_eq!(u.zustellungen[0].an, uid("a"));
    }

    #[test]
    fn kandidat_ohne_sitzung_abgelehnt() {
        let v = verwaltung();
        assert!(matches!(
            kandidat(&v, "a", "b", 1),
            Err(AnrufFehler::KeineSitzung { .. })
        ));
    }

    #[test]
    fn beenden_aus_jedem_aktiven_zustand() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();

        // Anrufer legt waehrend des Klingelns auf
        let u = v.beenden(&uid("a"), &uid("b")).unwrap();
        assert_eq!(u.ausgang, Some(AnrufAusgang::Aufgelegt));
        assert_eq!(
            u.zustellungen[0].event,
            ServerEvent::CallEnded(AnrufBeendet {
                from: uid("a"),
                reason: BeendigungsGrund::Hangup,
            })
        );
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Idle);

        // Fremde koennen keine Sitzung beenden
        starten(&v, "a", "b").unwrap();
        assert!(v.beenden(&uid("c"), &uid("b")).is_err());
        assert_eq!(v.aktive_sitzungen(), 1);
    }

    #[test]
    fn trennung_beendet_sitzung() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();
        v.annehmen(
            &uid("b"),
            AnrufAnnehmen {
                to: uid("a"),
                answer: json!("R"),
            },
        )
        .unwrap();

        let u = v.verbindung_getrennt(&uid("a"));
        assert_eq!(u.ausgang, Some(AnrufAusgang::Getrennt));
        assert_eq!(
            u.zustellungen,
            vec![Zustellung::neu(
                &uid("b"),
                ServerEvent::CallEnded(AnrufBeendet {
                    from: uid("a"),
                    reason: BeendigungsGrund::Disconnect,
                })
            )]
        );
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Idle);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Idle);

        // Ohne Sitzung passiert nichts
        assert_eq!(v.verbindung_getrennt(&uid("a")), Uebergang::default());
    }

    #[test]
    fn unerreichbarer_angerufener_bleibt_idle() {
        let v = verwaltung();
        let u = v
            .starten(
                &uid("a"),
                AnrufStarten {
                    to: uid("b"),
                    offer: json!("O"),
                    from: None,
                    name: None,
                },
                false,
            )
            .unwrap();

        assert!(u.zustellungen.is_empty());
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Calling);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Idle);

        // b kann selbst anrufen und wird von Dritten nicht als besetzt gemeldet
        let eigener = starten(&v, "b", "c").unwrap();
        assert_eq!(eigener.zustellungen[0].an, uid("c"));
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Calling);

        // Auflegen durch a meldet b nichts und laesst b's Sitzung stehen
        let aufgelegt = v.beenden(&uid("a"), &uid("b")).unwrap();
        assert!(aufgelegt.zustellungen.is_empty());
        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Idle);
        assert_eq!(v.zustand(&uid("b")), AnrufZustand::Calling);
        assert_eq!(v.aktive_sitzungen(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn klingel_timeout_ohne_erreichbaren_angerufenen_meldet_nur_anrufer() {
        let v = verwaltung();
        v.starten(
            &uid("a"),
            AnrufStarten {
                to: uid("b"),
                offer: json!("O"),
                from: None,
                name: None,
            },
            false,
        )
        .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        let uebergaenge = v.abgelaufene_beenden(Instant::now());

        assert_eq!(uebergaenge.len(), 1);
        let empfaenger: Vec<_> = uebergaenge[0].zustellungen.iter().map(|z| z.an.clone()).collect();
        assert_eq!(empfaenger, vec![uid("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn klingel_timeout_beendet_nur_klingelnde_sitzungen() {
        let v = verwaltung();
        starten(&v, "a", "b").unwrap();
        starten(&v, "c", "d").unwrap();
        v.annehmen(
            &uid("d"),
            AnrufAnnehmen {
                to: uid("c"),
                answer: json!("R"),
            },
        )
        .unwrap();

        assert!(v.abgelaufene_beenden(Instant::now()).is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        let uebergaenge = v.abgelaufene_beenden(Instant::now());

        assert_eq!(uebergaenge.len(), 1);
        assert_eq!(uebergaenge[0].ausgang, Some(AnrufAusgang::Timeout));
        let empfaenger: Vec<_> = uebergaenge[0].zustellungen.iter().map(|z| z.an.clone()).collect();
        assert_eq!(empfaenger, vec![uid("a"), uid("b")]);

        assert_eq!(v.zustand(&uid("a")), AnrufZustand::Idle);
        assert_eq!(v.zustand(&uid("c")), AnrufZustand::Connected);
    }
}
