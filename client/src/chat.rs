//! Chat – Senden und Empfangen verschluesselter Nachrichten
//!
//! Nachrichten werden mit dem Sitzungs-Cipher des Peers verschluesselt,
//! Absender und Empfaenger gehen als AAD ein. Die Empfangsschleife laeuft
//! bis zum Abbruch und schliesst dann ihren Ausgabekanal.

use hushline_crypto::chat_aad;
use hushline_protocol::{ChatPacket, ChatStatus, Envelope, Paket};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::dispatcher::Route;
use crate::error::{ClientError, ClientResult};

/// Ereignis fuer die Anzeige-Schicht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Entschluesselte Nachricht eines Peers
    Nachricht { von: String, text: String },
    /// Der Server konnte eine eigene Nachricht nicht zustellen
    NichtZustellbar { an: String },
}

impl Client {
    /// Verschluesselt `text` fuer `peer` und sendet ihn
    pub async fn nachricht_senden(&self, peer: &str, text: &str) -> ClientResult<()> {
        let cipher = self
            .inner
            .chatter
            .cipher(peer)
            .ok_or_else(|| ClientError::KeineSitzung(peer.to_string()))?;
        let aad = chat_aad(&self.inner.benutzername, peer);
        let chiffrat = cipher.verschluesseln(text.as_bytes(), &aad)?;
        self.senden(self.eigener_envelope(ChatPacket::nachricht(peer, chiffrat).into()))
            .await
    }

    /// Startet die Empfangsschleife
    ///
    /// Nicht entschluesselbare Nachrichten werden geloggt und verworfen,
    /// die Schleife laeuft weiter.
    pub fn nachrichten_empfangen(&self, abbruch: CancellationToken) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(16);
        let client = self.clone();
        tokio::spawn(async move {
            let mut postfach = client.inner.dispatcher.postfach(Route::Chat).sperren().await;
            loop {
                let envelope = tokio::select! {
                    _ = abbruch.cancelled() => break,
                    envelope = postfach.empfangen() => envelope,
                };
                let envelope = match envelope {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::info!(grund = %e, "Chat-Empfang beendet");
                        break;
                    }
                };
                let Some(event) = client.chat_event(envelope) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            tracing::debug!("Chat-Empfangsschleife geschlossen");
        });
        rx
    }

    fn chat_event(&self, envelope: Envelope) -> Option<ChatEvent> {
        let Paket::Chat(paket) = envelope.payload else {
            return None;
        };
        match paket.status {
            ChatStatus::DeliveryFailed => Some(ChatEvent::NichtZustellbar {
                an: paket.to_username,
            }),
            ChatStatus::Message => {
                let Some(von) = envelope.from_username else {
                    tracing::warn!("Chat-Nachricht ohne Absender verworfen");
                    return None;
                };
                let Some(cipher) = self.inner.chatter.cipher(&von) else {
                    tracing::warn!(peer = %von, "Nachricht ohne Sitzungsschluessel verworfen");
                    return None;
                };
                let aad = chat_aad(&von, &self.inner.benutzername);
                match cipher
                    .entschluesseln(&paket.message, &aad)
                    .map(String::from_utf8)
                {
                    Ok(Ok(text)) => Some(ChatEvent::Nachricht { von, text }),
                    Ok(Err(_)) => {
                        tracing::warn!(peer = %von, "Nachricht ist kein UTF-8 – verworfen");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(peer = %von, fehler = %e, "Nachricht nicht entschluesselbar");
                        None
                    }
                }
            }
        }
    }
}
