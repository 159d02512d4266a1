//! RSA-OAEP (SHA-256)
//!
//! Oeffentliche Schluessel reisen als roher Modulus (big-endian) ueber den
//! Draht, der Exponent ist fest 65537. Mit einem `k` Byte langen Modulus
//! passen hoechstens `k - 2*32 - 2` Bytes Klartext in einen OAEP-Block.

use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep};
use sha2::Sha256;

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

/// Fester oeffentlicher Exponent
pub const OEFFENTLICHER_EXPONENT: u32 = 65537;

/// Kleinster akzeptierter Modulus (1024 Bit)
pub const MIN_MODULUS_BYTES: usize = 128;

/// Laenge des SHA-256-Digests
const HASH_LAENGE: usize = 32;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Baut einen oeffentlichen Schluessel aus einem rohen Modulus
pub fn public_key_aus_modulus(modulus: &[u8]) -> CryptoResult<RsaPublicKey> {
    let n = BigUint::from_bytes_be(modulus);
    let key = RsaPublicKey::new(n, BigUint::from(OEFFENTLICHER_EXPONENT))
        .map_err(|e| CryptoError::UngueltigerSchluessel(e.to_string()))?;

    if key.size() < MIN_MODULUS_BYTES {
        return Err(CryptoError::UngueltigerSchluessel(format!(
            "Modulus zu kurz: {} Bytes (Minimum: {} Bytes)",
            key.size(),
            MIN_MODULUS_BYTES
        )));
    }
    Ok(key)
}

/// Roher Modulus eines oeffentlichen Schluessels
pub fn modulus_bytes(key: &RsaPublicKey) -> Vec<u8> {
    key.n().to_bytes_be()
}

/// Maximale OAEP-Klartextlaenge fuer diesen Schluessel
pub fn oaep_max_klartext(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * HASH_LAENGE + 2)
}

/// Verschluesselt `klartext` mit RSA-OAEP
pub fn verschluesseln(key: &RsaPublicKey, klartext: &[u8]) -> CryptoResult<Vec<u8>> {
    let maximum = oaep_max_klartext(key);
    if klartext.len() > maximum {
        return Err(CryptoError::KlartextZuLang {
            maximum,
            erhalten: klartext.len(),
        });
    }
    key.encrypt(&mut OsRng, oaep(), klartext)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

/// Entschluesselt ein RSA-OAEP-Chiffrat
pub fn entschluesseln(key: &RsaPrivateKey, chiffrat: &[u8]) -> CryptoResult<Vec<u8>> {
    key.decrypt(oaep(), chiffrat)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}

/// Zufaelliges Login-Token mit maximal moeglicher Laenge fuer `key`
pub fn zufallstoken(key: &RsaPublicKey) -> SecretBytes {
    let mut token = vec![0u8; oaep_max_klartext(key)];
    OsRng.fill_bytes(&mut token);
    SecretBytes::new(token)
}

/// Erzeugt ein neues RSA-Schluesselpaar
pub fn schluesselpaar_erzeugen(bits: usize) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::SchluesselGenerierung(e.to_string()))
}

/// Laedt einen privaten Schluessel aus PEM (PKCS#8 oder PKCS#1)
pub fn private_key_aus_pem(pem: &str) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| CryptoError::UngueltigerSchluessel(format!("PEM nicht lesbar: {e}")))
}
