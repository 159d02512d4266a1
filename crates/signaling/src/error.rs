//! Fehlertypen fuer den Signaling-Service
//!
//! Protokollverletzungen und fehlende Anmeldung beantworten die Handler
//! direkt mit einem Status-Envelope; hier landen nur Fehler, die einen
//! Ablauf intern abbrechen.

use hushline_core::{Fehlerklasse, Klassifiziert};
use hushline_crypto::CryptoError;
use hushline_db::DirectoryError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Kryptografie-Fehler (Schluessel, Verschluesselung)
    #[error("Kryptografie-Fehler: {0}")]
    Krypto(#[from] CryptoError),

    /// Verzeichnis-Fehler
    #[error("Verzeichnis-Fehler: {0}")]
    Verzeichnis(#[from] DirectoryError),

    /// Kein Verzeichniseintrag fuer diesen Namen
    #[error("Unbekannter Benutzer: {0}")]
    UnbekannterBenutzer(String),

    /// Ausgehende Queue des Empfaengers ist voll
    #[error("Send-Queue voll")]
    QueueVoll,

    /// Verbindung des Empfaengers ist bereits beendet
    #[error("Verbindung geschlossen")]
    VerbindungGeschlossen,
}

impl Klassifiziert for SignalingError {
    fn klasse(&self) -> Fehlerklasse {
        match self {
            Self::Krypto(e) => e.klasse(),
            Self::Verzeichnis(_) => Fehlerklasse::Directory,
            Self::UnbekannterBenutzer(_) => Fehlerklasse::Auth,
            Self::QueueVoll | Self::VerbindungGeschlossen => Fehlerklasse::Transport,
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
