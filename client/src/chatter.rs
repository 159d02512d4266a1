//! Chatter – kryptografischer Zustand pro Peer
//!
//! Ein Eintrag entsteht beim ersten Kontakt mit einem Peer und lebt so
//! lange wie der Client. Der oeffentliche Schluessel kommt immer aus dem
//! Verzeichnis des Servers, der Sitzungsschluessel aus einem Handshake.

use hushline_crypto::{RsaPublicKey, SecretBytes, SitzungsCipher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

use crate::error::ClientResult;

pub struct Chatter {
    pub benutzername: String,
    public_key: Option<RsaPublicKey>,
    sitzung: Option<(SecretBytes, SitzungsCipher)>,
}

// Schluesselmaterial erscheint nie in Logs
impl fmt::Debug for Chatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chatter")
            .field("benutzername", &self.benutzername)
            .field("public_key", &self.public_key.is_some())
            .field("sitzung", &self.sitzung.is_some())
            .finish()
    }
}

impl Chatter {
    fn neu(benutzername: &str) -> Self {
        Self {
            benutzername: benutzername.to_string(),
            public_key: None,
            sitzung: None,
        }
    }
}

/// Alle bekannten Peers
#[derive(Debug, Default)]
pub struct Chatterliste {
    eintraege: Mutex<HashMap<String, Chatter>>,
}

impl Chatterliste {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen Eintrag an, falls noch keiner existiert
    pub fn sicherstellen(&self, peer: &str) {
        self.eintraege
            .lock()
            .entry(peer.to_string())
            .or_insert_with(|| Chatter::neu(peer));
    }

    pub fn public_key_setzen(&self, peer: &str, key: RsaPublicKey) {
        self.eintraege
            .lock()
            .entry(peer.to_string())
            .or_insert_with(|| Chatter::neu(peer))
            .public_key = Some(key);
    }

    /// Installiert einen Sitzungsschluessel und baut den Cipher
    pub fn sitzung_setzen(&self, peer: &str, schluessel: SecretBytes) -> ClientResult<()> {
        let cipher = SitzungsCipher::neu(schluessel.as_bytes())?;
        self.eintraege
            .lock()
            .entry(peer.to_string())
            .or_insert_with(|| Chatter::neu(peer))
            .sitzung = Some((schluessel, cipher));
        tracing::debug!(peer = %peer, "Sitzungsschluessel installiert");
        Ok(())
    }

    pub fn hat_sitzung(&self, peer: &str) -> bool {
        self.eintraege
            .lock()
            .get(peer)
            .is_some_and(|c| c.sitzung.is_some())
    }

    pub fn cipher(&self, peer: &str) -> Option<SitzungsCipher> {
        self.eintraege
            .lock()
            .get(peer)
            .and_then(|c| c.sitzung.as_ref().map(|(_, cipher)| cipher.clone()))
    }

    pub fn sitzungsschluessel(&self, peer: &str) -> Option<SecretBytes> {
        self.eintraege
            .lock()
            .get(peer)
            .and_then(|c| c.sitzung.as_ref().map(|(key, _)| key.clone()))
    }
}
