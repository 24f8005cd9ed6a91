//! SQLite-Implementierung des BenachrichtigungsRepository

use chrono::{SubsecRound, Utc};
use nachhilfe_core::types::{BenachrichtigungsId, UserId};

use crate::models::{BenachrichtigungRecord, NeueBenachrichtigung};
use crate::repository::{BenachrichtigungsRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{zeit_formatieren, zeit_parsen};

impl BenachrichtigungsRepository for SqliteDb {
    async fn create(&self, data: NeueBenachrichtigung<'_>) -> DbResult<BenachrichtigungRecord> {
        let id = BenachrichtigungsId::new();
        let now = Utc::now().trunc_subsecs(6);

        sqlx::query(
            "INSERT INTO notifications
             (id, recipient, message, type, read, related_booking_id, created_at)
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(data.recipient.as_str())
        .bind(data.message)
        .bind(data.typ.als_str())
        .bind(data.related_booking_id)
        .bind(zeit_formatieren(&now))
        .execute(&self.pool)
        .await?;

        Ok(BenachrichtigungRecord {
            id,
            recipient: data.recipient.clone(),
            message: data.message.to_string(),
            typ: data.typ,
            read: false,
            related_booking_id: data.related_booking_id.map(str::to_string),
            created_at: now,
        })
    }

    async fn ungelesene(&self, recipient: &UserId) -> DbResult<Vec<BenachrichtigungRecord>> {
        let rows = sqlx::query(
            "SELECT id, recipient, message, type, read, related_booking_id, created_at
             FROM notifications
             WHERE recipient = ? AND read = 0
             ORDER BY created_at DESC",
        )
        .bind(recipient.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_benachrichtigung).collect()
    }
}

fn row_to_benachrichtigung(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenachrichtigungRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let typ_str: String = row.try_get("type")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(BenachrichtigungRecord {
        id: id_str.parse()?,
        recipient: UserId::neu(row.try_get::<String, _>("recipient")?),
        message: row.try_get("message")?,
        typ: typ_str.parse()?,
        read: row.try_get("read")?,
        related_booking_id: row.try_get("related_booking_id")?,
        created_at: zeit_parsen(&created_at)?,
    })
}
