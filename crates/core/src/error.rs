//! Fehler-Taxonomie fuer Hushline
//!
//! Jedes Crate definiert eigene Fehlertypen (thiserror). Ueber
//! [`Klassifiziert`] ordnet sich jeder Fehler genau einer
//! [`Fehlerklasse`] zu. Die Klasse entscheidet, ob eine Verbindung den
//! Fehler ueberlebt.

use thiserror::Error;

/// Protokollweite Fehlerklassen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Fehlerklasse {
    /// Fehlerhafte oder abgeschnittene Bytes auf dem Draht
    #[error("Framing")]
    Framing,

    /// Unerwarteter Status fuer den aktuellen Zustand des Ablaufs
    #[error("Protokoll")]
    Protokoll,

    /// Login- oder Handshake-Verifikation fehlgeschlagen
    #[error("Authentifizierung")]
    Auth,

    /// Verzeichnis-Lookup oder -Insert fehlgeschlagen
    #[error("Verzeichnis")]
    Directory,

    /// IO-Fehler der Verbindung
    #[error("Transport")]
    Transport,
}

impl Fehlerklasse {
    /// Gibt true zurueck wenn die Verbindung nach diesem Fehler beendet wird
    pub fn ist_fatal(&self) -> bool {
        matches!(self, Self::Framing | Self::Transport)
    }
}

/// Ordnet einen Fehler seiner [`Fehlerklasse`] zu
pub trait Klassifiziert {
    fn klasse(&self) -> Fehlerklasse;

    /// Kurzform fuer `self.klasse().ist_fatal()`
    fn ist_fatal(&self) -> bool {
        self.klasse().ist_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatale_klassen() {
        assert!(Fehlerklasse::Framing.ist_fatal());
        assert!(Fehlerklasse::Transport.ist_fatal());
        assert!(!Fehlerklasse::Protokoll.ist_fatal());
        assert!(!Fehlerklasse::Auth.ist_fatal());
        assert!(!Fehlerklasse::Directory.ist_fatal());
    }

    #[test]
    fn klassen_anzeige() {
        assert_eq!(Fehlerklasse::Directory.to_string(), "Verzeichnis");
        assert_eq!(Fehlerklasse::Auth.to_string(), "Authentifizierung");
    }
}
