//! Fehlertypen fuer das Verzeichnis-Crate

use hushline_core::{Fehlerklasse, Klassifiziert};
use thiserror::Error;

/// Verzeichnis-Fehlertypen
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Hash oder Public Key ist bereits registriert
    #[error("Konflikt: {0}")]
    Konflikt(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DirectoryError {
    pub fn konflikt(msg: impl Into<String>) -> Self {
        Self::Konflikt(msg.into())
    }

    /// Gibt true zurueck wenn es sich um einen Eindeutigkeitskonflikt handelt
    pub fn ist_konflikt(&self) -> bool {
        matches!(self, Self::Konflikt(_))
    }
}

impl Klassifiziert for DirectoryError {
    fn klasse(&self) -> Fehlerklasse {
        Fehlerklasse::Directory
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
