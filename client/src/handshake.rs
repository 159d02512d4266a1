//! Schluesselaustausch – Initiator und Responder
//!
//! Der Server vermittelt nur. Jeder oeffentliche Schluessel kommt frisch
//! aus seinem Verzeichnis, den Sitzungsschluessel erzeugt immer der
//! Responder.
//!
//! ```text
//! Initiator (I)                  Server                  Responder (R)
//!  REQUEST_FOR_USER_PUBLIC_KEY(R) ->
//!                    <- PUB_KEY_FROM_SERVER(key R)
//!  REQ_FOR_SYM_KEY(RSA_R(I)) ----> relay ---------------->
//!                                  <- REQUEST_FOR_USER_PUBLIC_KEY_PASSIVE(I)
//!                                  PUB_KEY_FROM_SERVER_PASSIVE(key I) ->
//!                    <------------ relay <- REPLY_WITH_SYM_KEY(RSA_I(k))
//! ```
//!
//! Jeder Fehler bricht nur den laufenden Ablauf ab. Der Initiator wartet
//! hoechstens `handshake_timeout`, der Responder verwirft offene Anfragen
//! nach derselben Zeit.
//!
//! Starten beide Seiten gleichzeitig, kreuzen sich zwei Handshakes. Dann
//! gilt der Schluessel, den der Responder mit dem lexikografisch kleineren
//! Namen erzeugt: der andere Responder schweigt, und der Initiator auf der
//! kleineren Seite endet mit dem Schluessel seines eigenen Responders.

use hushline_crypto::{
    entschluesseln, public_key_aus_modulus, sitzungsschluessel_erzeugen, verschluesseln,
    SecretBytes,
};
use hushline_protocol::{Envelope, ExchangeKeyPacket, ExchangeKeyStatus, Paket, Quelle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::chatter::Chatterliste;
use crate::client::Client;
use crate::dispatcher::{PostfachSperre, Route};
use crate::error::{ClientError, ClientResult};

struct Initiierung {
    /// Der eigene Responder hat einen vorrangigen Schluessel installiert
    uebernommen: bool,
    signal: Arc<Notify>,
}

/// Laufende Initiierungen pro Peer
///
/// Initiator und Responder installieren Sitzungsschluessel nur unter
/// dieser Sperre, damit ein kreuzender Handshake nicht dazwischenfunkt.
#[derive(Default)]
pub(crate) struct Initiierungen {
    laufend: Mutex<HashMap<String, Initiierung>>,
}

/// Haelt die Initiierung fuer `peer` offen, bis sie verworfen wird
pub(crate) struct InitiierungsSperre<'a> {
    initiierungen: &'a Initiierungen,
    peer: String,
    signal: Arc<Notify>,
}

impl Drop for InitiierungsSperre<'_> {
    fn drop(&mut self) {
        self.initiierungen.laufend.lock().remove(&self.peer);
    }
}

impl Initiierungen {
    fn beginnen(&self, peer: &str) -> InitiierungsSperre<'_> {
        let signal = Arc::new(Notify::new());
        self.laufend.lock().insert(
            peer.to_string(),
            Initiierung {
                uebernommen: false,
                signal: Arc::clone(&signal),
            },
        );
        InitiierungsSperre {
            initiierungen: self,
            peer: peer.to_string(),
            signal,
        }
    }

    fn laeuft(&self, peer: &str) -> bool {
        self.laufend.lock().contains_key(peer)
    }

    /// Schluessel aus REPLY_WITH_SYM_KEY; `false`, wenn der eigene
    /// Responder inzwischen den vorrangigen Schluessel gesetzt hat
    fn initiator_setzen(
        &self,
        chatter: &Chatterliste,
        peer: &str,
        schluessel: SecretBytes,
    ) -> ClientResult<bool> {
        let laufend = self.laufend.lock();
        if laufend.get(peer).is_some_and(|i| i.uebernommen) {
            return Ok(false);
        }
        chatter.sitzung_setzen(peer, schluessel)?;
        Ok(true)
    }

    /// Selbst erzeugter Schluessel; `false`, wenn ein kreuzender Handshake
    /// dem Peer den Vorrang gibt
    fn responder_setzen(
        &self,
        chatter: &Chatterliste,
        peer: &str,
        schluessel: SecretBytes,
        vorrang: bool,
    ) -> ClientResult<bool> {
        let mut laufend = self.laufend.lock();
        match laufend.get_mut(peer) {
            Some(_) if !vorrang => return Ok(false),
            Some(initiierung) => {
                chatter.sitzung_setzen(peer, schluessel)?;
                initiierung.uebernommen = true;
                initiierung.signal.notify_one();
            }
            None => chatter.sitzung_setzen(peer, schluessel)?,
        }
        Ok(true)
    }
}

/// Naechste Antwort fuer den Initiator, `None` nach Uebernahme durch den Responder
async fn naechste_antwort(
    postfach: &mut PostfachSperre<'_>,
    signal: &Notify,
) -> ClientResult<Option<Envelope>> {
    tokio::select! {
        biased;
        _ = signal.notified() => Ok(None),
        envelope = postfach.empfangen() => envelope.map(Some),
    }
}

fn exchange_paket(envelope: Envelope) -> Option<(Quelle, Option<String>, ExchangeKeyPacket)> {
    match envelope.payload {
        Paket::ExchangeKey(p) => Some((envelope.source, envelope.from_username, p)),
        _ => None,
    }
}

impl Client {
    // -----------------------------------------------------------------------
    // Initiator
    // -----------------------------------------------------------------------

    /// Stellt eine Sitzung mit `peer` her
    ///
    /// Ein bereits abgeschlossener Handshake wird nicht wiederholt.
    pub async fn chat_starten(&self, peer: &str) -> ClientResult<()> {
        if self.inner.chatter.hat_sitzung(peer) {
            tracing::debug!(peer = %peer, "Sitzung besteht bereits");
            return Ok(());
        }

        let mut postfach = self
            .inner
            .dispatcher
            .postfach(Route::SchluesselAktiv)
            .sperren()
            .await;
        postfach.leeren();

        let initiierung = self.inner.initiierungen.beginnen(peer);
        if self.inner.chatter.hat_sitzung(peer) {
            tracing::debug!(peer = %peer, "Sitzung waehrend des Wartens entstanden");
            return Ok(());
        }

        let dauer = self.inner.config.handshake_timeout;
        let ablauf = self.handshake_initiieren(peer, &mut postfach, &initiierung.signal);
        match tokio::time::timeout(dauer, ablauf).await {
            Ok(ergebnis) => ergebnis,
            Err(_) => {
                tracing::warn!(peer = %peer, "Schluesselaustausch: Zeitlimit ueberschritten");
                Err(ClientError::Timeout("Schluesselaustausch"))
            }
        }
    }

    async fn handshake_initiieren(
        &self,
        peer: &str,
        postfach: &mut PostfachSperre<'_>,
        uebernahme: &Notify,
    ) -> ClientResult<()> {
        self.inner.chatter.sicherstellen(peer);

        // Schritt 1-2: Schluessel des Peers vom Server
        self.senden(self.eigener_envelope(
            ExchangeKeyPacket::neu(ExchangeKeyStatus::RequestForUserPublicKey, peer).into(),
        ))
        .await?;

        let modulus = loop {
            let Some(envelope) = naechste_antwort(postfach, uebernahme).await? else {
                tracing::info!(peer = %peer, "Kreuzender Handshake: Schluessel vom eigenen Responder");
                return Ok(());
            };
            let Some((quelle, von, p)) = exchange_paket(envelope) else {
                continue;
            };
            match p.status {
                ExchangeKeyStatus::PubKeyFromServer
                    if quelle == Quelle::Server && p.to_username == peer =>
                {
                    break p.key;
                }
                ExchangeKeyStatus::Error if p.to_username == peer || von.as_deref() == Some(peer) => {
                    return Err(ClientError::HandshakeAbgebrochen(format!(
                        "Kein Schluessel fuer {peer}"
                    )));
                }
                status => {
                    tracing::debug!(peer = %peer, status = ?status, "Fremde Schluesselantwort verworfen");
                }
            }
        };

        // Schritt 3: eigenen Namen fuer den Peer verschluesseln
        let peer_key = public_key_aus_modulus(&modulus)?;
        self.inner.chatter.public_key_setzen(peer, peer_key.clone());
        let beweis = verschluesseln(&peer_key, self.inner.benutzername.as_bytes())?;
        self.senden(self.eigener_envelope(
            ExchangeKeyPacket::neu(ExchangeKeyStatus::ReqForSymKey, peer)
                .mit_nachricht(beweis)
                .into(),
        ))
        .await?;

        // Schritt 7: Sitzungsschluessel vom Responder
        loop {
            let Some(envelope) = naechste_antwort(postfach, uebernahme).await? else {
                tracing::info!(peer = %peer, "Kreuzender Handshake: Schluessel vom eigenen Responder");
                return Ok(());
            };
            let Some((quelle, von, p)) = exchange_paket(envelope) else {
                continue;
            };
            let vom_peer = von.as_deref() == Some(peer);
            match p.status {
                ExchangeKeyStatus::ReplyWithSymKey if quelle == Quelle::Client && vom_peer => {
                    let schluessel =
                        SecretBytes::new(entschluesseln(&self.inner.private_key, &p.encrypted_message)?);
                    if self.inner.initiierungen.initiator_setzen(&self.inner.chatter, peer, schluessel)? {
                        tracing::info!(peer = %peer, "Schluesselaustausch abgeschlossen (Initiator)");
                    } else {
                        tracing::debug!(peer = %peer, "Schluessel des Peers verworfen, eigener Responder hat Vorrang");
                    }
                    return Ok(());
                }
                ExchangeKeyStatus::Error if vom_peer || p.to_username == peer => {
                    return Err(ClientError::HandshakeAbgebrochen(format!(
                        "{peer} hat den Schluesselaustausch abgelehnt"
                    )));
                }
                status => {
                    tracing::debug!(peer = %peer, status = ?status, "Fremde Schluesselantwort verworfen");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Responder
    // -----------------------------------------------------------------------

    /// Startet die Schleife, die unaufgeforderte Handshake-Anfragen beantwortet
    pub fn handshake_antworten_starten(&self, abbruch: CancellationToken) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut postfach = client
                .inner
                .dispatcher
                .postfach(Route::SchluesselPassiv)
                .sperren()
                .await;
            let mut offen: HashMap<String, Instant> = HashMap::new();

            loop {
                let envelope = tokio::select! {
                    _ = abbruch.cancelled() => break,
                    envelope = postfach.empfangen() => envelope,
                };
                match envelope {
                    Ok(envelope) => {
                        if let Err(e) = client.passiv_verarbeiten(envelope, &mut offen).await {
                            tracing::warn!(fehler = %e, "Handshake-Anfrage nicht beantwortet");
                            if matches!(e, ClientError::Getrennt(_)) {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::info!(grund = %e, "Handshake-Responder beendet");
                        break;
                    }
                }
            }
        })
    }

    async fn passiv_verarbeiten(
        &self,
        envelope: Envelope,
        offen: &mut HashMap<String, Instant>,
    ) -> ClientResult<()> {
        let jetzt = Instant::now();
        offen.retain(|_, ablauf| *ablauf > jetzt);

        let Some((quelle, von, p)) = exchange_paket(envelope) else {
            return Ok(());
        };

        match p.status {
            // Schritt 4: behaupteten Absender pruefen, dann Schluessel nachladen
            ExchangeKeyStatus::ReqForSymKey => {
                let Some(von) = von else {
                    return Err(ClientError::protokoll("REQ_FOR_SYM_KEY ohne Absender"));
                };
                let behauptet = entschluesseln(&self.inner.private_key, &p.encrypted_message)
                    .ok()
                    .and_then(|klartext| String::from_utf8(klartext).ok());

                if behauptet.as_deref() != Some(von.as_str()) {
                    tracing::warn!(
                        peer = %von,
                        "Behaupteter Absender passt nicht zum Envelope – Handshake abgelehnt"
                    );
                    self.handshake_ablehnen(&von).await?;
                    return Ok(());
                }

                if !self.vorrang_als_responder(&von) && self.inner.initiierungen.laeuft(&von) {
                    tracing::debug!(peer = %von, "Kreuzender Handshake: Peer antwortet als Responder");
                    return Ok(());
                }

                self.inner.chatter.sicherstellen(&von);
                offen.insert(von.clone(), jetzt + self.inner.config.handshake_timeout);
                self.senden(self.eigener_envelope(
                    ExchangeKeyPacket::neu(ExchangeKeyStatus::RequestForUserPublicKeyPassive, &von)
                        .into(),
                ))
                .await
            }

            // Schritt 5-6: verifizierten Schluessel setzen, Sitzungsschluessel schicken
            ExchangeKeyStatus::PubKeyFromServerPassive => {
                let peer = p.to_username;
                if quelle != Quelle::Server {
                    tracing::warn!(peer = %peer, "PUB_KEY_FROM_SERVER_PASSIVE nicht vom Server – verworfen");
                    return Ok(());
                }
                if offen.remove(&peer).is_none() {
                    tracing::warn!(peer = %peer, "Kein offener Handshake fuer diesen Schluessel – verworfen");
                    return Ok(());
                }

                let peer_key = match public_key_aus_modulus(&p.key) {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(peer = %peer, fehler = %e, "Ungueltiger Schluessel vom Server");
                        self.handshake_ablehnen(&peer).await?;
                        return Ok(());
                    }
                };
                self.inner.chatter.public_key_setzen(&peer, peer_key.clone());

                let schluessel = sitzungsschluessel_erzeugen();
                let chiffrat = verschluesseln(&peer_key, schluessel.as_bytes())?;
                let vorrang = self.vorrang_als_responder(&peer);
                if !self
                    .inner
                    .initiierungen
                    .responder_setzen(&self.inner.chatter, &peer, schluessel, vorrang)?
                {
                    tracing::debug!(peer = %peer, "Kreuzender Handshake: eigener Schluessel verworfen");
                    return Ok(());
                }
                self.senden(self.eigener_envelope(
                    ExchangeKeyPacket::neu(ExchangeKeyStatus::ReplyWithSymKey, &peer)
                        .mit_nachricht(chiffrat)
                        .into(),
                ))
                .await?;
                tracing::info!(peer = %peer, "Schluesselaustausch abgeschlossen (Responder)");
                Ok(())
            }

            status => {
                tracing::debug!(status = ?status, "Unerwarteter passiver Status verworfen");
                Ok(())
            }
        }
    }

    /// Bei kreuzenden Handshakes gilt der Schluessel des kleineren Namens
    fn vorrang_als_responder(&self, peer: &str) -> bool {
        self.inner.benutzername.as_str() < peer
    }

    async fn handshake_ablehnen(&self, peer: &str) -> ClientResult<()> {
        self.senden(self.eigener_envelope(
            ExchangeKeyPacket::neu(ExchangeKeyStatus::Error, peer).into(),
        ))
        .await
    }
}
