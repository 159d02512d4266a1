//! Gemeinsamer Server-Zustand
//!
//! Wird einmal konstruiert und per `Arc` in jeden Verbindungs-Task
//! gereicht. Es gibt keinen prozessweiten Singleton.

use hushline_crypto::BenutzernamenHasher;
use hushline_db::PublicKeyDirectory;
use hushline_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::Arc;

use crate::registry::VerbindungsRegistry;

/// Konfiguration des Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
    /// Tiefe der ausgehenden Queue pro Verbindung
    pub sende_puffer: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            sende_puffer: 64,
        }
    }
}

/// Zustand, den sich alle Verbindungen teilen
pub struct SignalingState {
    pub config: SignalingConfig,
    pub verzeichnis: Arc<dyn PublicKeyDirectory>,
    pub hasher: BenutzernamenHasher,
    pub registry: VerbindungsRegistry,
}

impl SignalingState {
    pub fn neu(
        config: SignalingConfig,
        verzeichnis: Arc<dyn PublicKeyDirectory>,
        hasher: BenutzernamenHasher,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            verzeichnis,
            hasher,
            registry: VerbindungsRegistry::neu(),
        })
    }
}

impl std::fmt::Debug for SignalingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingState")
            .field("config", &self.config)
            .field("angemeldet", &self.registry.anzahl())
            .finish_non_exhaustive()
    }
}
