//! hushline-core – Gemeinsame Typen und Fehlerklassen
//!
//! Dieses Crate stellt die Bausteine bereit, die Server und Client
//! gemeinsam nutzen: die Fehler-Taxonomie des Protokolls und die
//! Newtype-IDs fuer Verbindungen und Verzeichnis-Eintraege.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Fehlerklasse, Klassifiziert};
pub use types::{BenutzerHash, VerbindungsId};
