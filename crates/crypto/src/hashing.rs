//! Geschluesselter Hash des Benutzernamens
//!
//! Das Verzeichnis speichert nie den Klartextnamen, nur
//! `base64(HMAC-SHA256(geheimnis, benutzername || salz))`. Der Hash ist
//! eine reine Funktion seiner Eingaben, Login und Handshake berechnen
//! denselben Schluessel wie die Registrierung.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hushline_core::BenutzerHash;
use ring::hmac;

#[derive(Clone)]
pub struct BenutzernamenHasher {
    schluessel: hmac::Key,
    salz: Vec<u8>,
}

impl BenutzernamenHasher {
    pub fn neu(geheimnis: &[u8], salz: &[u8]) -> Self {
        Self {
            schluessel: hmac::Key::new(hmac::HMAC_SHA256, geheimnis),
            salz: salz.to_vec(),
        }
    }

    pub fn hash(&self, benutzername: &str) -> BenutzerHash {
        let mut ctx = hmac::Context::with_key(&self.schluessel);
        ctx.update(benutzername.as_bytes());
        ctx.update(&self.salz);
        BenutzerHash::new(STANDARD.encode(ctx.sign().as_ref()))
    }
}

impl std::fmt::Debug for BenutzernamenHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BenutzernamenHasher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ist_deterministisch() {
        let a = BenutzernamenHasher::neu(b"geheim", b"salz");
        let b = BenutzernamenHasher::neu(b"geheim", b"salz");
        assert_eq!(a.hash("alice"), b.hash("alice"));
        // 32 Bytes HMAC-SHA256 -> 44 Zeichen Base64
        assert_eq!(a.hash("alice").as_str().len(), 44);
    }

    #[test]
    fn hash_haengt_von_allen_eingaben_ab() {
        let basis = BenutzernamenHasher::neu(b"geheim", b"salz").hash("alice");
        assert_ne!(basis, BenutzernamenHasher::neu(b"anders", b"salz").hash("alice"));
        assert_ne!(basis, BenutzernamenHasher::neu(b"geheim", b"pfeffer").hash("alice"));
        assert_ne!(basis, BenutzernamenHasher::neu(b"geheim", b"salz").hash("bob"));
    }

    #[test]
    fn klartext_ist_nicht_im_hash() {
        let h = BenutzernamenHasher::neu(b"geheim", b"salz").hash("alice");
        assert!(!h.as_str().contains("alice"));
    }
}
