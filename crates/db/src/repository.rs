//! Verzeichnis-Schnittstelle
//!
//! Der Server kennt nur diesen Trait. `async-trait` sorgt dafuer, dass die
//! Futures `Send` sind und Verbindungs-Tasks per `tokio::spawn` laufen
//! koennen.

use async_trait::async_trait;
use hushline_core::BenutzerHash;

use crate::error::DirectoryResult;

/// Konfiguration fuer das SQLite-Backend
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://hushline.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://hushline.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Persistentes Verzeichnis: gehashter Benutzername -> RSA-Modulus
#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    /// Public Key zu einem Hash, `None` wenn nicht registriert
    async fn get(&self, hash: &BenutzerHash) -> DirectoryResult<Option<Vec<u8>>>;

    /// Neuen Eintrag anlegen
    ///
    /// Schlaegt mit `Konflikt` fehl, wenn der Hash oder der Public Key schon
    /// existiert. Bestehende Eintraege werden nie ueberschrieben.
    async fn put(&self, hash: &BenutzerHash, public_key: &[u8]) -> DirectoryResult<()>;

    /// Anzahl registrierter Eintraege
    async fn anzahl(&self) -> DirectoryResult<usize>;
}
