//! Client-Dispatcher – ein Leser, mehrere logische Kanaele
//!
//! Ein Hintergrund-Task liest Envelopes vom Transport und verteilt sie nach
//! Payload-Variante (und beim Schluesselaustausch nach Status) auf sechs
//! [`Postfach`]-Kanaele. Ein zweiter Task schreibt ausgehende Envelopes.
//!
//! ```text
//!               +--> Login
//!               +--> Registrierung
//! Transport --> +--> Chat
//!  (Leser)      +--> Benutzerliste
//!               +--> SchluesselAktiv   (Antworten auf eigene Anfragen)
//!               +--> SchluesselPassiv  (unaufgeforderte Peer-Anfragen)
//! ```
//!
//! Jeder Kanal hat die Tiefe `kanal_tiefe`. Findet der Leser innerhalb von
//! `zustell_timeout` keinen Platz, wird der Envelope verworfen und geloggt,
//! damit ein haengender Abnehmer nicht alle anderen Kanaele blockiert.
//!
//! Endet der Transport, wird der Grund gespeichert und alle Kanaele werden
//! geschlossen. Jeder wartende und jeder spaetere Abnehmer bekommt
//! [`ClientError::Getrennt`].

use futures_util::{SinkExt, StreamExt};
use hushline_protocol::{Envelope, EnvelopeCodec, Paket};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Gemeinsam genutzter Trennungsgrund
type Trennungsgrund = Arc<Mutex<Option<String>>>;

fn grund_setzen(grund: &Trennungsgrund, text: impl Into<String>) {
    let mut slot = grund.lock();
    if slot.is_none() {
        *slot = Some(text.into());
    }
}

fn getrennt(grund: &Trennungsgrund) -> ClientError {
    ClientError::Getrennt(
        grund
            .lock()
            .clone()
            .unwrap_or_else(|| "Verbindung getrennt".to_string()),
    )
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Logischer Zielkanal eines eingehenden Envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Registrierung,
    Chat,
    Benutzerliste,
    SchluesselAktiv,
    SchluesselPassiv,
}

const ANZAHL_ROUTEN: usize = 6;

impl Route {
    fn index(self) -> usize {
        match self {
            Self::Login => 0,
            Self::Registrierung => 1,
            Self::Chat => 2,
            Self::Benutzerliste => 3,
            Self::SchluesselAktiv => 4,
            Self::SchluesselPassiv => 5,
        }
    }
}

/// Ordnet einen Envelope seinem logischen Kanal zu
pub fn route_fuer(envelope: &Envelope) -> Route {
    match &envelope.payload {
        Paket::Login(_) => Route::Login,
        Paket::Register(_) => Route::Registrierung,
        Paket::Chat(_) => Route::Chat,
        Paket::UserList(_) => Route::Benutzerliste,
        Paket::ExchangeKey(p) if p.status.ist_passiv() => Route::SchluesselPassiv,
        Paket::ExchangeKey(_) => Route::SchluesselAktiv,
    }
}

// ---------------------------------------------------------------------------
// Postfach
// ---------------------------------------------------------------------------

/// Empfangsseite eines logischen Kanals
///
/// Pro Kanal darf immer nur ein Ablauf lesen. Wer einen mehrstufigen
/// Ablauf faehrt, haelt mit [`Postfach::sperren`] das Postfach fuer die
/// ganze Dauer.
pub struct Postfach {
    rx: tokio::sync::Mutex<mpsc::Receiver<Envelope>>,
    grund: Trennungsgrund,
}

/// Exklusiver Zugriff auf ein Postfach
pub struct PostfachSperre<'a> {
    rx: tokio::sync::MutexGuard<'a, mpsc::Receiver<Envelope>>,
    grund: &'a Trennungsgrund,
}

impl Postfach {
    pub async fn sperren(&self) -> PostfachSperre<'_> {
        PostfachSperre {
            rx: self.rx.lock().await,
            grund: &self.grund,
        }
    }

    /// Wartet auf den naechsten Envelope
    pub async fn empfangen(&self) -> ClientResult<Envelope> {
        self.sperren().await.empfangen().await
    }
}

impl PostfachSperre<'_> {
    pub async fn empfangen(&mut self) -> ClientResult<Envelope> {
        self.rx.recv().await.ok_or_else(|| getrennt(self.grund))
    }

    pub async fn empfangen_mit_timeout(
        &mut self,
        dauer: Duration,
        was: &'static str,
    ) -> ClientResult<Envelope> {
        tokio::time::timeout(dauer, self.empfangen())
            .await
            .map_err(|_| ClientError::Timeout(was))?
    }

    /// Verwirft liegengebliebene Envelopes aus abgebrochenen Ablaeufen
    pub fn leeren(&mut self) -> usize {
        let mut anzahl = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            tracing::debug!(art = envelope.payload.art(), "Veralteten Envelope verworfen");
            anzahl += 1;
        }
        anzahl
    }
}

// ---------------------------------------------------------------------------
// Absender
// ---------------------------------------------------------------------------

/// Sendeseite: reicht Envelopes an den Schreib-Task
#[derive(Clone)]
pub struct Absender {
    tx: mpsc::Sender<Envelope>,
    grund: Trennungsgrund,
}

impl Absender {
    pub async fn senden(&self, envelope: Envelope) -> ClientResult<()> {
        self.tx.send(envelope).await.map_err(|_| getrennt(&self.grund))
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    absender: Absender,
    postfaecher: Vec<Postfach>,
    grund: Trennungsgrund,
    abbruch: CancellationToken,
}

impl Dispatcher {
    /// Startet Lese- und Schreib-Task auf `stream`
    pub fn starten<S>(stream: S, config: &ClientConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (lesen, schreiben) = tokio::io::split(stream);
        let codec = EnvelopeCodec::with_max_size(config.max_frame_groesse);
        let grund: Trennungsgrund = Arc::new(Mutex::new(None));
        let abbruch = CancellationToken::new();

        let tiefe = config.kanal_tiefe.max(1);
        let mut sender = Vec::with_capacity(ANZAHL_ROUTEN);
        let mut postfaecher = Vec::with_capacity(ANZAHL_ROUTEN);
        for _ in 0..ANZAHL_ROUTEN {
            let (tx, rx) = mpsc::channel(tiefe);
            sender.push(tx);
            postfaecher.push(Postfach {
                rx: tokio::sync::Mutex::new(rx),
                grund: Arc::clone(&grund),
            });
        }

        // Schreib-Task
        let (sende_tx, mut sende_rx) = mpsc::channel::<Envelope>(tiefe.max(16));
        let mut writer = FramedWrite::new(schreiben, codec.clone());
        let schreib_grund = Arc::clone(&grund);
        let schreib_abbruch = abbruch.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = schreib_abbruch.cancelled() => break,
                    naechster = sende_rx.recv() => {
                        let Some(envelope) = naechster else { break };
                        if let Err(e) = writer.send(envelope).await {
                            tracing::warn!(fehler = %e, "Senden an Server fehlgeschlagen");
                            grund_setzen(&schreib_grund, e.to_string());
                            schreib_abbruch.cancel();
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Schreib-Task beendet");
        });

        // Lese-Task
        let mut reader = FramedRead::new(lesen, codec);
        let lese_grund = Arc::clone(&grund);
        let lese_abbruch = abbruch.clone();
        let zustell_timeout = config.zustell_timeout;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = lese_abbruch.cancelled() => {
                        grund_setzen(&lese_grund, "vom Client getrennt");
                        break;
                    }
                    frame = reader.next() => match frame {
                        Some(Ok(envelope)) => {
                            let route = route_fuer(&envelope);
                            tracing::trace!(route = ?route, "Envelope verteilt");
                            match sender[route.index()].send_timeout(envelope, zustell_timeout).await {
                                Ok(()) => {}
                                Err(mpsc::error::SendTimeoutError::Timeout(verworfen)) => {
                                    tracing::warn!(
                                        route = ?route,
                                        art = verworfen.payload.art(),
                                        "Kein Abnehmer innerhalb des Zeitlimits – Envelope verworfen"
                                    );
                                }
                                Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                                    tracing::debug!(route = ?route, "Kanal geschlossen");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(fehler = %e, "Lesefehler – Verbindung wird beendet");
                            grund_setzen(&lese_grund, e.to_string());
                            break;
                        }
                        None => {
                            tracing::info!("Verbindung vom Server geschlossen");
                            grund_setzen(&lese_grund, "Verbindung vom Server geschlossen");
                            break;
                        }
                    }
                }
            }
            // Schreib-Task mitbeenden, danach schliessen die Kanaele
            lese_abbruch.cancel();
            drop(sender);
        });

        Self {
            absender: Absender {
                tx: sende_tx,
                grund: Arc::clone(&grund),
            },
            postfaecher,
            grund,
            abbruch,
        }
    }

    pub fn absender(&self) -> &Absender {
        &self.absender
    }

    pub fn postfach(&self, route: Route) -> &Postfach {
        &self.postfaecher[route.index()]
    }

    /// Grund der Trennung, falls der Transport beendet ist
    pub fn trennungsgrund(&self) -> Option<String> {
        self.grund.lock().clone()
    }

    /// Beendet beide Tasks
    pub fn trennen(&self) {
        self.abbruch.cancel();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.abbruch.cancel();
    }
}
