//! SQLite-Ausschnitt des Schueler-/Lehrer-Verzeichnisses
//!
//! Das Verzeichnis gehoert einem externen Dienst; hier wird nur gelesen.
//! `profil_eintragen` dient dem Befuellen (Seeds, Tests).

use nachhilfe_core::types::{TeilnehmerArt, UserId};

use crate::models::VerzeichnisEintrag;
use crate::repository::{DbResult, Verzeichnis};
use crate::sqlite::pool::SqliteDb;

impl Verzeichnis for SqliteDb {
    async fn profil(
        &self,
        id: &UserId,
        art: TeilnehmerArt,
    ) -> DbResult<Option<VerzeichnisEintrag>> {
        use sqlx::Row as _;

        let row = sqlx::query("SELECT name, photo FROM directory WHERE id = ? AND kind = ?")
            .bind(id.as_str())
            .bind(art.als_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| -> DbResult<VerzeichnisEintrag> {
            Ok(VerzeichnisEintrag {
                id: id.clone(),
                art,
                name: r.try_get("name")?,
                photo: r.try_get("photo")?,
            })
        })
        .transpose()
    }
}

impl SqliteDb {
    /// Legt einen Verzeichniseintrag an oder ersetzt ihn
    pub async fn profil_eintragen(&self, eintrag: &VerzeichnisEintrag) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO directory (id, kind, name, photo) VALUES (?, ?, ?, ?)
             ON CONFLICT (id, kind) DO UPDATE SET name = excluded.name, photo = excluded.photo",
        )
        .bind(eintrag.id.as_str())
        .bind(eintrag.art.als_str())
        .bind(&eintrag.name)
        .bind(&eintrag.photo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
