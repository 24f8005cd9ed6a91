//! BenachrichtigungsService – Benachrichtigungen aus dem Buchungsablauf
//!
//! Der Buchungs- und Zahlungsablauf selbst liegt ausserhalb dieses Systems;
//! er ruft nur `benachrichtigen` auf. Die Live-Zustellung uebernimmt der
//! Aufrufer ueber dieselbe Zustell-Primitive wie fuer Chat-Nachrichten.

use std::sync::Arc;

use tracing::debug;

use nachhilfe_core::types::UserId;
use nachhilfe_db::{
    models::{BenachrichtigungRecord, NeueBenachrichtigung},
    BenachrichtigungsRepository,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{Benachrichtigung, NeueBenachrichtigungDaten},
};

pub struct BenachrichtigungsService<B: BenachrichtigungsRepository> {
    repo: Arc<B>,
}

impl<B: BenachrichtigungsRepository> BenachrichtigungsService<B> {
    pub fn neu(repo: Arc<B>) -> Arc<Self> {
        Arc::new(Self { repo })
    }

    /// Legt eine ungelesene Benachrichtigung an
    pub async fn benachrichtigen(
        &self,
        daten: NeueBenachrichtigungDaten,
    ) -> ChatResult<Benachrichtigung> {
        if daten.recipient.ist_leer() {
            return Err(ChatError::UngueltigeEingabe(
                "Empfaenger darf nicht leer sein".into(),
            ));
        }
        if daten.message.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Benachrichtigungstext darf nicht leer sein".into(),
            ));
        }

        let record = BenachrichtigungsRepository::create(
            self.repo.as_ref(),
            NeueBenachrichtigung {
                recipient: &daten.recipient,
                message: &daten.message,
                typ: daten.typ,
                related_booking_id: daten.related_booking_id.as_deref(),
            },
        )
        .await?;

        debug!(
            benachrichtigung_id = %record.id,
            empfaenger = %record.recipient,
            typ = record.typ.als_str(),
            "Benachrichtigung angelegt"
        );

        Ok(record_to_benachrichtigung(record))
    }

    /// Ungelesene Benachrichtigungen, neueste zuerst
    pub async fn ungelesene(&self, recipient: &UserId) -> ChatResult<Vec<Benachrichtigung>> {
        let records = self.repo.ungelesene(recipient).await?;
        Ok(records.into_iter().map(record_to_benachrichtigung).collect())
    }
}

fn record_to_benachrichtigung(record: BenachrichtigungRecord) -> Benachrichtigung {
    Benachrichtigung {
        id: record.id,
        recipient: record.recipient,
        message: record.message,
        typ: record.typ,
        read: record.read,
        related_booking_id: record.related_booking_id,
        created_at: record.created_at,
    }
}
