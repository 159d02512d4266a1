//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use subtle::ConstantTimeEq;

/// Sicherer Byte-Container (wird beim Drop genullt)
///
/// Fuer Login-Tokens und Sitzungsschluessel. `Debug` gibt nur die Laenge aus.
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Vergleich in konstanter Zeit
    ///
    /// Unterschiedliche Laengen ergeben sofort `false`; die Laenge selbst
    /// ist nicht geheim.
    pub fn gleich(&self, andere: &[u8]) -> bool {
        self.0.len() == andere.len() && bool::from(self.0.as_slice().ct_eq(andere))
    }
}
