//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Die Lese-Schleife ist sequentiell: Frame lesen, an den
//! Dispatcher geben, genau eine Antwort senden oder weiterleiten.
//!
//! ## Login-Zustand
//! ```text
//! Leerlauf -> WartetAufEntschluesselung -> Authentifiziert
//!    ^                  |
//!    |                  v
//!    +-------- Fehlgeschlagen
//! ```
//!
//! Frame-Fehler und IO-Fehler beenden nur diese Verbindung. Beim Ende
//! werden alle Registry-Eintraege der Verbindung entfernt.

use futures_util::{SinkExt, StreamExt};
use hushline_crypto::SecretBytes;
use hushline_protocol::{Envelope, EnvelopeCodec};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::dispatcher::{Ausgang, MessageDispatcher};
use crate::error::SignalingError;
use crate::registry::VerbindungsHandle;
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Zustand des Challenge-Response-Logins einer Verbindung
#[derive(Debug, Default)]
pub enum LoginZustand {
    /// Kein Login begonnen
    #[default]
    Leerlauf,
    /// Token verschluesselt verschickt, Klartext liegt hier
    WartetAufEntschluesselung {
        benutzername: String,
        token: SecretBytes,
    },
    /// Erfolgreich angemeldet
    Authentifiziert,
    /// Letzter Versuch gescheitert, neuer `REQUEST_TO_LOGIN` erlaubt
    Fehlgeschlagen,
}

/// Fluechtiger Zustand einer Verbindung, lebt so lange wie der Task
#[derive(Debug)]
pub struct VerbindungsKontext {
    /// Peer-Bezeichnung fuer Logs
    pub peer: String,
    /// Eigene ausgehende Queue, wird beim Login in der Registry eingetragen
    pub handle: VerbindungsHandle,
    pub login: LoginZustand,
    /// Authentifizierter Benutzername
    pub benutzer: Option<String>,
}

impl VerbindungsKontext {
    pub fn neu(peer: impl Into<String>, handle: VerbindungsHandle) -> Self {
        Self {
            peer: peer.into(),
            handle,
            login: LoginZustand::Leerlauf,
            benutzer: None,
        }
    }

    pub fn ist_angemeldet(&self) -> bool {
        self.benutzer.is_some()
    }
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Verbindung
///
/// Generisch ueber den Stream, damit TLS, TCP und In-Memory-Duplex-Streams
/// denselben Pfad nehmen.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer: String,
}

impl ClientConnection {
    pub fn neu(state: Arc<SignalingState>, peer: impl Into<String>) -> Self {
        Self {
            state,
            peer: peer.into(),
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird, ein Frame-Fehler auftritt
    /// oder ein Shutdown-Signal eingeht.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: tokio::sync::watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let peer = self.peer.clone();
        tracing::info!(peer = %peer, "Neue Verbindung");

        let codec = EnvelopeCodec::with_max_size(self.state.config.max_frame_groesse);
        let mut framed = Framed::new(stream, codec);

        // Ausgehende Queue: Weiterleitungen anderer Verbindungen landen hier
        let (sende_tx, mut sende_rx) = mpsc::channel::<Envelope>(self.state.config.sende_puffer);
        let handle = VerbindungsHandle::neu(sende_tx);
        let verbindungs_id = handle.id();

        let mut ctx = VerbindungsKontext::neu(peer.clone(), handle);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                // Eingehender Envelope vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(envelope)) => {
                            tracing::trace!(
                                peer = %peer,
                                art = envelope.payload.art(),
                                "Envelope empfangen"
                            );

                            let ausgang = dispatcher.dispatch(envelope, &mut ctx).await;
                            if let Some(antwort) = self.zustellen(ausgang, &ctx) {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(peer = %peer, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Weitergeleiteter Envelope aus einer anderen Verbindung
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %peer, fehler = %e, "Weiterleitung fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        let entfernt = self.state.registry.abmelden(verbindungs_id);
        if !entfernt.is_empty() {
            tracing::info!(peer = %peer, benutzer = ?entfernt, "Abgemeldet");
        }
        tracing::info!(peer = %peer, "Verbindungs-Task beendet");
    }

    /// Fuehrt einen Dispatcher-Ausgang aus
    ///
    /// Gibt den Envelope zurueck, der auf dieser Verbindung gesendet werden
    /// muss. Die Registry wird nur fuer den Lookup gesperrt.
    fn zustellen(&self, ausgang: Ausgang, ctx: &VerbindungsKontext) -> Option<Envelope> {
        match ausgang {
            Ausgang::Antwort(envelope) => Some(envelope),
            Ausgang::Keine => None,
            Ausgang::Weiterleiten {
                ziel,
                envelope,
                bei_fehler,
            } => {
                let Some(handle) = self.state.registry.nachschlagen(&ziel) else {
                    tracing::info!(peer = %ctx.peer, ziel = %ziel, "Empfaenger nicht angemeldet");
                    return bei_fehler;
                };
                match handle.senden(envelope) {
                    Ok(()) => {
                        tracing::debug!(peer = %ctx.peer, ziel = %ziel, "Envelope weitergeleitet");
                        None
                    }
                    Err(SignalingError::QueueVoll) => {
                        tracing::warn!(
                            peer = %ctx.peer,
                            ziel = %ziel,
                            verbindung = %handle.id(),
                            "Send-Queue des Empfaengers voll, Envelope verworfen"
                        );
                        bei_fehler
                    }
                    Err(e) => {
                        tracing::info!(peer = %ctx.peer, ziel = %ziel, grund = %e, "Empfaenger nicht erreichbar");
                        bei_fehler
                    }
                }
            }
        }
    }
}
