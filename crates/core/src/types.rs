//! Gemeinsame Identifikationstypen fuer Hushline
//!
//! Newtypes verhindern Verwechslungen zwischen Klartext-Benutzernamen,
//! gehashten Verzeichnis-Schluesseln und Verbindungs-IDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Server-Verbindung
///
/// Der Benutzername ist erst nach dem Login bekannt, die Verbindung
/// existiert aber schon vorher. Die Registry raeumt daher ueber diese ID
/// auf und nicht ueber den Namen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

/// Gehashter Benutzername, Schluessel im Public-Key-Verzeichnis
///
/// Der Klartextname wird nie gespeichert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenutzerHash(pub String);

impl BenutzerHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BenutzerHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
