//! In-Memory-Verzeichnis
//!
//! Haelt zwei Indizes unter einem gemeinsamen Lock, damit die Pruefung auf
//! doppelte Hashes und doppelte Keys zusammen mit dem Insert atomar ist.

use async_trait::async_trait;
use hushline_core::BenutzerHash;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{DirectoryError, DirectoryResult};
use crate::repository::PublicKeyDirectory;

#[derive(Debug, Default)]
struct Indizes {
    nach_hash: HashMap<BenutzerHash, Vec<u8>>,
    nach_key: HashMap<Vec<u8>, BenutzerHash>,
}

#[derive(Debug, Default)]
pub struct SpeicherVerzeichnis {
    indizes: RwLock<Indizes>,
}

impl SpeicherVerzeichnis {
    pub fn neu() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublicKeyDirectory for SpeicherVerzeichnis {
    async fn get(&self, hash: &BenutzerHash) -> DirectoryResult<Option<Vec<u8>>> {
        Ok(self.indizes.read().nach_hash.get(hash).cloned())
    }

    async fn put(&self, hash: &BenutzerHash, public_key: &[u8]) -> DirectoryResult<()> {
        if public_key.is_empty() {
            return Err(DirectoryError::UngueltigeDaten("Leerer Public Key".into()));
        }

        let mut indizes = self.indizes.write();
        if indizes.nach_hash.contains_key(hash) {
            return Err(DirectoryError::konflikt("Benutzer bereits registriert"));
        }
        if indizes.nach_key.contains_key(public_key) {
            return Err(DirectoryError::konflikt("Public Key bereits vergeben"));
        }
        indizes.nach_hash.insert(hash.clone(), public_key.to_vec());
        indizes.nach_key.insert(public_key.to_vec(), hash.clone());
        Ok(())
    }

    async fn anzahl(&self) -> DirectoryResult<usize> {
        Ok(self.indizes.read().nach_hash.len())
    }
}
