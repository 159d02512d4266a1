//! # hushline-crypto
//!
//! Kryptografie-Bausteine fuer Hushline.
//!
//! ## Module
//! - `asymmetrisch` - RSA-OAEP (SHA-256) fuer Login-Challenge und Handshake
//! - `sitzung` - AES-256-GCM Sitzungs-Cipher pro Chat-Paar
//! - `hashing` - Geschluesselter Hash des Benutzernamens (Verzeichnis-Schluessel)
//! - `tls` - TLS-Acceptor/Connector und selbstsignierte Dev-Zertifikate
//! - `types` - `SecretBytes`
//! - `error` - Fehlertypen

pub mod asymmetrisch;
pub mod error;
pub mod hashing;
pub mod sitzung;
pub mod tls;
pub mod types;

// Bequeme Re-Exports
pub use asymmetrisch::{
    entschluesseln, modulus_bytes, oaep_max_klartext, private_key_aus_pem, public_key_aus_modulus,
    schluesselpaar_erzeugen, verschluesseln, zufallstoken, RsaPrivateKey, RsaPublicKey,
};
pub use error::{CryptoError, CryptoResult};
pub use hashing::BenutzernamenHasher;
pub use sitzung::{chat_aad, sitzungsschluessel_erzeugen, SitzungsCipher};
pub use tls::{client_connector, selbstsigniertes_zertifikat, server_acceptor, server_name, TlsMaterial};
pub use types::SecretBytes;
