//! SQLite-Implementierung des NachrichtenRepository

use std::collections::HashMap;

use nachhilfe_core::types::{NachrichtId, UserId};

use crate::error::DbError;
use crate::models::{GespraechRecord, NachrichtRecord, NeueNachricht, VerlaufFilter};
use crate::repository::{DbResult, NachrichtenRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

const SPALTEN: &str = "id, sender_id, sender_kind, receiver_id, receiver_kind, body, kind, read, created_at";

impl NachrichtenRepository for SqliteDb {
    async fn create(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = NachrichtId::new();

        sqlx::query(
            "INSERT INTO messages
             (id, sender_id, sender_kind, receiver_id, receiver_kind, body, kind, read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id.to_string())
        .bind(data.sender_id.as_str())
        .bind(data.sender_art.als_str())
        .bind(data.receiver_id.as_str())
        .bind(data.receiver_art.als_str())
        .bind(data.body)
        .bind(data.art.als_str())
        .bind(zeit_formatieren(&data.created_at))
        .execute(&self.pool)
        .await?;

        Ok(NachrichtRecord {
            id,
            sender_id: data.sender_id.clone(),
            sender_art: data.sender_art,
            receiver_id: data.receiver_id.clone(),
            receiver_art: data.receiver_art,
            body: data.body.to_string(),
            art: data.art,
            read: false,
            created_at: data.created_at,
        })
    }

    async fn get_by_id(&self, id: NachrichtId) -> DbResult<Option<NachrichtRecord>> {
        let row = sqlx::query(&format!("SELECT {SPALTEN} FROM messages WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_nachricht(&r)).transpose()
    }

    async fn als_gelesen_markieren(&self, id: NachrichtId) -> DbResult<bool> {
        let affected = sqlx::query("UPDATE messages SET read = 1 WHERE id = ? AND read = 0")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected > 0 {
            return Ok(true);
        }

        // Bereits gelesen oder unbekannt
        match self.get_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(DbError::nicht_gefunden(format!("Nachricht {id}"))),
        }
    }

    async fn verlauf(&self, filter: VerlaufFilter<'_>) -> DbResult<Vec<NachrichtRecord>> {
        let limit = filter.limit.unwrap_or(50);
        let a = filter.teilnehmer_a.as_str();
        let b = filter.teilnehmer_b.as_str();

        let rows = if let Some(before) = filter.before {
            sqlx::query(&format!(
                "SELECT {SPALTEN} FROM messages
                 WHERE ((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))
                   AND created_at < ?
                 ORDER BY created_at DESC
                 LIMIT ?"
            ))
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .bind(zeit_formatieren(&before))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {SPALTEN} FROM messages
                 WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
                 ORDER BY created_at DESC
                 LIMIT ?"
            ))
            .bind(a)
            .bind(b)
            .bind(b)
            .bind(a)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        // Chronologisch sortieren (aelteste zuerst)
        let mut records: Vec<NachrichtRecord> =
            rows.iter().map(row_to_nachricht).collect::<DbResult<_>>()?;
        records.reverse();
        Ok(records)
    }

    async fn gespraeche(&self, user_id: &UserId) -> DbResult<Vec<GespraechRecord>> {
        let uid = user_id.as_str();

        // Neueste Nachricht pro Gegenueber
        let rows = sqlx::query(&format!(
            "SELECT {SPALTEN} FROM (
                 SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY CASE WHEN sender_id = ? THEN receiver_id ELSE sender_id END
                     ORDER BY created_at DESC
                 ) AS rang
                 FROM messages
                 WHERE sender_id = ? OR receiver_id = ?
             )
             WHERE rang = 1
             ORDER BY created_at DESC"
        ))
        .bind(uid)
        .bind(uid)
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;

        let ungelesen_rows = sqlx::query(
            "SELECT sender_id, COUNT(*) AS anzahl FROM messages
             WHERE receiver_id = ? AND read = 0
             GROUP BY sender_id",
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;

        let mut ungelesen: HashMap<String, i64> = HashMap::new();
        for row in &ungelesen_rows {
            use sqlx::Row as _;
            ungelesen.insert(row.try_get("sender_id")?, row.try_get("anzahl")?);
        }

        rows.iter()
            .map(|row| -> DbResult<GespraechRecord> {
                let letzte = row_to_nachricht(row)?;
                let partner = if &letzte.sender_id == user_id {
                    letzte.receiver_id.clone()
                } else {
                    letzte.sender_id.clone()
                };
                Ok(GespraechRecord {
                    ungelesen: ungelesen.get(partner.as_str()).copied().unwrap_or(0),
                    partner,
                    letzte_nachricht: letzte,
                })
            })
            .collect()
    }
}

pub(crate) fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let sender_kind: String = row.try_get("sender_kind")?;
    let receiver_kind: String = row.try_get("receiver_kind")?;
    let kind: String = row.try_get("kind")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(NachrichtRecord {
        id: id_str.parse()?,
        sender_id: UserId::neu(row.try_get::<String, _>("sender_id")?),
        sender_art: sender_kind.parse()?,
        receiver_id: UserId::neu(row.try_get::<String, _>("receiver_id")?),
        receiver_art: receiver_kind.parse()?,
        body: row.try_get("body")?,
        art: kind.parse()?,
        read: row.try_get("read")?,
        created_at: zeit_parsen(&created_at)?,
    })
}
