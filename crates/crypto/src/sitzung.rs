//! AES-256-GCM Sitzungs-Cipher
//!
//! Ein Cipher pro Chat-Paar. Jede Nachricht bekommt eine frische
//! Zufalls-Nonce, die dem Chiffrat vorangestellt wird:
//!
//! ```text
//! [nonce (12)] [ciphertext + tag (16)]
//! ```
//!
//! Absender und Empfaenger gehen als AAD ein, damit ein Chiffrat nicht
//! in einen anderen Chat umgeleitet werden kann.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Laenge eines Sitzungsschluessels (AES-256)
pub const SITZUNGSSCHLUESSEL_LAENGE: usize = 32;

/// Laenge der GCM-Nonce
pub const NONCE_LAENGE: usize = 12;

const TAG_LAENGE: usize = 16;

/// Erzeugt einen frischen 256-Bit Sitzungsschluessel
pub fn sitzungsschluessel_erzeugen() -> SecretBytes {
    let mut schluessel = vec![0u8; SITZUNGSSCHLUESSEL_LAENGE];
    OsRng.fill_bytes(&mut schluessel);
    SecretBytes::new(schluessel)
}

/// AAD fuer eine Chat-Nachricht: `von 0x00 an`
pub fn chat_aad(von: &str, an: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(von.len() + an.len() + 1);
    aad.extend_from_slice(von.as_bytes());
    aad.push(0);
    aad.extend_from_slice(an.as_bytes());
    aad
}

/// AES-256-GCM Cipher fuer einen Chat-Partner
#[derive(Clone)]
pub struct SitzungsCipher {
    cipher: Aes256Gcm,
}

impl SitzungsCipher {
    /// Erstellt einen Cipher aus einem 32-Byte-Schluessel
    pub fn neu(schluessel: &[u8]) -> CryptoResult<Self> {
        if schluessel.len() != SITZUNGSSCHLUESSEL_LAENGE {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: SITZUNGSSCHLUESSEL_LAENGE,
                erhalten: schluessel.len(),
            });
        }
        let key = Key::<Aes256Gcm>::from_slice(schluessel);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    pub fn verschluesseln(&self, klartext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LAENGE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let chiffrat = self
            .cipher
            .encrypt(nonce, Payload { msg: klartext, aad })
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        let mut ausgabe = Vec::with_capacity(NONCE_LAENGE + chiffrat.len());
        ausgabe.extend_from_slice(&nonce_bytes);
        ausgabe.extend_from_slice(&chiffrat);
        Ok(ausgabe)
    }

    pub fn entschluesseln(&self, daten: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        if daten.len() < NONCE_LAENGE + TAG_LAENGE {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Chiffrat zu kurz: {} Bytes",
                daten.len()
            )));
        }
        let (nonce_bytes, chiffrat) = daten.split_at(NONCE_LAENGE);

        self.cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload { msg: chiffrat, aad },
            )
            .map_err(|_| CryptoError::Entschluesselung("Authentifizierung fehlgeschlagen".into()))
    }
}

impl std::fmt::Debug for SitzungsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SitzungsCipher([REDACTED])")
    }
}
