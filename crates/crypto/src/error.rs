//! Fehlertypen fuer das Kryptografie-Subsystem

use hushline_core::{Fehlerklasse, Klassifiziert};
use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),

    #[error("Ungueltiger Schluessel: {0}")]
    UngueltigerSchluessel(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Klartext zu lang: maximal {maximum} Bytes, erhalten {erhalten}")]
    KlartextZuLang { maximum: usize, erhalten: usize },

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Zertifikat-Generierung fehlgeschlagen: {0}")]
    ZertifikatGenerierung(String),

    #[error("TLS-Fehler: {0}")]
    Tls(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl Klassifiziert for CryptoError {
    fn klasse(&self) -> Fehlerklasse {
        match self {
            Self::Entschluesselung(_) | Self::UngueltigeDaten(_) => Fehlerklasse::Auth,
            Self::Tls(_) | Self::Io(_) => Fehlerklasse::Transport,
            _ => Fehlerklasse::Protokoll,
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
