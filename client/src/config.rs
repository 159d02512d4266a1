//! Client-Konfiguration

use hushline_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::time::Duration;

/// Zeitlimits und Puffergroessen des Clients
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Tiefe jedes logischen Kanals im Dispatcher
    pub kanal_tiefe: usize,
    /// Wie lange der Dispatcher auf einen Abnehmer wartet, bevor er den
    /// Envelope verwirft
    pub zustell_timeout: Duration,
    /// Gesamtdauer eines Schluesselaustauschs
    pub handshake_timeout: Duration,
    /// Wartezeit auf Login-, Registrierungs- und Listen-Antworten
    pub antwort_timeout: Duration,
    pub max_frame_groesse: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            kanal_tiefe: 1,
            zustell_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
            antwort_timeout: Duration::from_secs(10),
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}
