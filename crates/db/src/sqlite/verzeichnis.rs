//! SQLite-Implementierung von `PublicKeyDirectory`

use async_trait::async_trait;
use chrono::Utc;
use hushline_core::BenutzerHash;
use sqlx::Row;

use crate::error::{DirectoryError, DirectoryResult};
use crate::repository::PublicKeyDirectory;
use crate::sqlite::pool::SqliteVerzeichnis;

fn ist_unique_verletzung(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl PublicKeyDirectory for SqliteVerzeichnis {
    async fn get(&self, hash: &BenutzerHash) -> DirectoryResult<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT public_key FROM verzeichnis WHERE benutzer_hash = ?")
            .bind(hash.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_get::<Vec<u8>, _>("public_key"))
            .transpose()
            .map_err(DirectoryError::from)
    }

    async fn put(&self, hash: &BenutzerHash, public_key: &[u8]) -> DirectoryResult<()> {
        if public_key.is_empty() {
            return Err(DirectoryError::UngueltigeDaten("Leerer Public Key".into()));
        }

        // PRIMARY KEY und UNIQUE(public_key) machen Pruefung und Insert atomar
        sqlx::query(
            "INSERT INTO verzeichnis (benutzer_hash, public_key, registriert_am)
             VALUES (?, ?, ?)",
        )
        .bind(hash.as_str())
        .bind(public_key)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if ist_unique_verletzung(&e) {
                DirectoryError::konflikt("Benutzer oder Public Key bereits registriert")
            } else {
                DirectoryError::Sqlx(e)
            }
        })?;

        tracing::debug!(hash = %hash, "Verzeichnis-Eintrag angelegt");
        Ok(())
    }

    async fn anzahl(&self) -> DirectoryResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS anzahl FROM verzeichnis")
            .fetch_one(&self.pool)
            .await?;
        let anzahl: i64 = row.try_get("anzahl")?;
        Ok(anzahl as usize)
    }
}
