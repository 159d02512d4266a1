//! Fehlertypen fuer den Client

use hushline_core::{Fehlerklasse, Klassifiziert};
use hushline_crypto::CryptoError;
use hushline_protocol::FramingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport beendet, enthaelt den Grund
    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing-Fehler: {0}")]
    Framing(#[from] FramingError),

    #[error("Kryptografie-Fehler: {0}")]
    Krypto(#[from] CryptoError),

    /// Keine Antwort innerhalb des Zeitlimits
    #[error("Zeitlimit ueberschritten: {0}")]
    Timeout(&'static str),

    /// Server hat mit `*_FAILED` bzw. `ERROR` geantwortet
    #[error("Abgelehnt: {0}")]
    Abgelehnt(String),

    /// Unerwarteter Status fuer den aktuellen Ablauf
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Schluesselaustausch vom Peer oder Server abgebrochen
    #[error("Schluesselaustausch abgebrochen: {0}")]
    HandshakeAbgebrochen(String),

    /// Fuer diesen Peer existiert noch kein Sitzungsschluessel
    #[error("Keine Sitzung mit {0}")]
    KeineSitzung(String),
}

impl ClientError {
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

impl Klassifiziert for ClientError {
    fn klasse(&self) -> Fehlerklasse {
        match self {
            Self::Getrennt(_) | Self::Io(_) => Fehlerklasse::Transport,
            Self::Framing(e) => e.klasse(),
            Self::Krypto(e) => e.klasse(),
            Self::Abgelehnt(_) | Self::HandshakeAbgebrochen(_) => Fehlerklasse::Auth,
            Self::Timeout(_) | Self::Protokoll(_) | Self::KeineSitzung(_) => Fehlerklasse::Protokoll,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getrennt_ist_fatal() {
        assert!(ClientError::Getrennt("eof".into()).ist_fatal());
        assert!(!ClientError::Abgelehnt("login".into()).ist_fatal());
        assert_eq!(
            ClientError::HandshakeAbgebrochen("bob".into()).klasse(),
            Fehlerklasse::Auth
        );
    }
}
