//! Client-Fassade – Registrierung, Login, Benutzerliste
//!
//! Ein [`Client`] besitzt genau einen [`Dispatcher`]. Alle Ablaeufe sind
//! Abnehmer seiner Postfaecher und duerfen nebenlaeufig laufen, solange
//! jeder Kanal nur einen offenen Ablauf hat. Schluesselaustausch und Chat
//! liegen in `handshake.rs` und `chat.rs`.

use hushline_crypto::{
    client_connector, entschluesseln, modulus_bytes, private_key_aus_pem, server_name,
    RsaPrivateKey, SecretBytes,
};
use hushline_protocol::{
    Envelope, LoginPacket, LoginStatus, Paket, RegisterPacket, RegisterStatus, UserListPacket,
    UserListStatus,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chatter::Chatterliste;
use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, Route};
use crate::error::{ClientError, ClientResult};
use crate::handshake::Initiierungen;

pub(crate) struct ClientInner {
    pub(crate) benutzername: String,
    pub(crate) private_key: RsaPrivateKey,
    pub(crate) config: ClientConfig,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) chatter: Chatterliste,
    pub(crate) initiierungen: Initiierungen,
}

/// Verbundener Hushline-Client
///
/// Billig klonbar; alle Klone teilen Verbindung und Peer-Zustand.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    /// Baut einen Client auf einem bereits verbundenen Stream auf
    pub fn neu<S>(
        stream: S,
        benutzername: impl Into<String>,
        private_key: RsaPrivateKey,
        config: ClientConfig,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let dispatcher = Dispatcher::starten(stream, &config);
        Self {
            inner: Arc::new(ClientInner {
                benutzername: benutzername.into(),
                private_key,
                config,
                dispatcher,
                chatter: Chatterliste::neu(),
                initiierungen: Initiierungen::default(),
            }),
        }
    }

    /// Verbindet per TLS; vertraut nur den Zertifikaten aus `ca_pem`
    pub async fn verbinden_tls(
        adresse: &str,
        hostname: &str,
        ca_pem: &str,
        benutzername: impl Into<String>,
        private_key: RsaPrivateKey,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        let connector = client_connector(ca_pem)?;
        let tcp = TcpStream::connect(adresse).await?;
        tcp.set_nodelay(true)?;
        let tls = connector.connect(server_name(hostname)?, tcp).await?;
        tracing::info!(adresse = %adresse, "TLS-Verbindung hergestellt");
        Ok(Self::neu(tls, benutzername, private_key, config))
    }

    pub fn benutzername(&self) -> &str {
        &self.inner.benutzername
    }

    /// Sitzungsschluessel fuer `peer`, falls ein Handshake abgeschlossen ist
    pub fn sitzungsschluessel(&self, peer: &str) -> Option<SecretBytes> {
        self.inner.chatter.sitzungsschluessel(peer)
    }

    pub fn hat_sitzung(&self, peer: &str) -> bool {
        self.inner.chatter.hat_sitzung(peer)
    }

    /// Beendet Lese- und Schreib-Task
    pub fn trennen(&self) {
        self.inner.dispatcher.trennen();
    }

    pub(crate) async fn senden(&self, envelope: Envelope) -> ClientResult<()> {
        self.inner.dispatcher.absender().senden(envelope).await
    }

    pub(crate) fn eigener_envelope(&self, paket: Paket) -> Envelope {
        Envelope::vom_client(Some(self.inner.benutzername.clone()), paket)
    }

    // -----------------------------------------------------------------------
    // Registrierung
    // -----------------------------------------------------------------------

    /// Traegt den eigenen oeffentlichen Schluessel im Verzeichnis ein
    pub async fn registrieren(&self) -> ClientResult<()> {
        let mut postfach = self
            .inner
            .dispatcher
            .postfach(Route::Registrierung)
            .sperren()
            .await;
        postfach.leeren();

        let modulus = modulus_bytes(&self.inner.private_key.to_public_key());
        self.senden(self.eigener_envelope(RegisterPacket::anfrage(modulus).into()))
            .await?;

        let antwort = postfach
            .empfangen_mit_timeout(self.inner.config.antwort_timeout, "Registrierung")
            .await?;
        match antwort.payload {
            Paket::Register(p) => match p.status {
                RegisterStatus::RegisterSuccess => {
                    tracing::info!(benutzer = %self.inner.benutzername, "Registrierung erfolgreich");
                    Ok(())
                }
                RegisterStatus::RegisterFailed => {
                    Err(ClientError::Abgelehnt("Registrierung abgelehnt".into()))
                }
                RegisterStatus::RequestToRegister => {
                    Err(ClientError::protokoll("REQUEST_TO_REGISTER vom Server"))
                }
            },
            anderes => Err(ClientError::protokoll(format!(
                "Erwartet Register-Antwort, erhalten: {}",
                anderes.art()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Challenge-Response-Login mit dem eigenen privaten Schluessel
    pub async fn anmelden(&self) -> ClientResult<()> {
        let mut postfach = self.inner.dispatcher.postfach(Route::Login).sperren().await;
        postfach.leeren();
        let timeout = self.inner.config.antwort_timeout;

        self.senden(self.eigener_envelope(LoginPacket::neu(LoginStatus::RequestToLogin).into()))
            .await?;

        let challenge = match login_paket(postfach.empfangen_mit_timeout(timeout, "Login").await?)? {
            LoginPacket {
                status: LoginStatus::EncryptedToken,
                token: Some(token),
            } => token,
            LoginPacket {
                status: LoginStatus::LoginFailed,
                ..
            } => return Err(ClientError::Abgelehnt("Login abgelehnt".into())),
            p => {
                return Err(ClientError::protokoll(format!(
                    "Unerwarteter Login-Status: {:?}",
                    p.status
                )))
            }
        };

        let klartext = SecretBytes::new(entschluesseln(&self.inner.private_key, &challenge)?);
        self.senden(self.eigener_envelope(
            LoginPacket::mit_token(LoginStatus::DecryptedToken, klartext.as_bytes().to_vec())
                .into(),
        ))
        .await?;

        match login_paket(postfach.empfangen_mit_timeout(timeout, "Login").await?)?.status {
            LoginStatus::LoginSuccess => {
                tracing::info!(benutzer = %self.inner.benutzername, "Login erfolgreich");
                Ok(())
            }
            LoginStatus::LoginFailed => Err(ClientError::Abgelehnt("Login abgelehnt".into())),
            status => Err(ClientError::protokoll(format!(
                "Unerwarteter Login-Status: {status:?}"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Benutzerliste
    // -----------------------------------------------------------------------

    /// Angemeldete Benutzer ohne den eigenen Namen
    pub async fn benutzerliste(&self) -> ClientResult<Vec<String>> {
        let mut postfach = self
            .inner
            .dispatcher
            .postfach(Route::Benutzerliste)
            .sperren()
            .await;
        postfach.leeren();

        self.senden(self.eigener_envelope(
            UserListPacket::neu(UserListStatus::RequestUserList).into(),
        ))
        .await?;

        let antwort = postfach
            .empfangen_mit_timeout(self.inner.config.antwort_timeout, "Benutzerliste")
            .await?;
        match antwort.payload {
            Paket::UserList(p) if p.status == UserListStatus::UserList => Ok(p
                .users
                .into_iter()
                .filter(|name| name != &self.inner.benutzername)
                .collect()),
            Paket::UserList(_) => Err(ClientError::Abgelehnt("Benutzerliste abgelehnt".into())),
            anderes => Err(ClientError::protokoll(format!(
                "Erwartet Benutzerliste, erhalten: {}",
                anderes.art()
            ))),
        }
    }

    /// Fragt die Benutzerliste periodisch ab
    ///
    /// Liefert jede Liste an den zurueckgegebenen Empfaenger. Endet bei
    /// Abbruch, Trennung oder wenn der Empfaenger verworfen wird.
    pub fn benutzerliste_beobachten(
        &self,
        intervall: Duration,
        abbruch: CancellationToken,
    ) -> mpsc::Receiver<Vec<String>> {
        let (tx, rx) = mpsc::channel(1);
        let client = self.clone();
        tokio::spawn(async move {
            let mut takt = tokio::time::interval(intervall);
            takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = abbruch.cancelled() => break,
                    _ = takt.tick() => {}
                }
                match client.benutzerliste().await {
                    Ok(liste) => {
                        if tx.send(liste).await.is_err() {
                            break;
                        }
                    }
                    Err(ClientError::Getrennt(grund)) => {
                        tracing::info!(grund = %grund, "Benutzerlisten-Abfrage beendet");
                        break;
                    }
                    Err(e) => tracing::warn!(fehler = %e, "Benutzerliste nicht abrufbar"),
                }
            }
        });
        rx
    }
}

/// Laedt einen privaten RSA-Schluessel aus einer PEM-Datei
pub async fn schluessel_laden(pfad: impl AsRef<Path>) -> ClientResult<RsaPrivateKey> {
    let pem = tokio::fs::read_to_string(pfad).await?;
    Ok(private_key_aus_pem(&pem)?)
}

fn login_paket(envelope: Envelope) -> ClientResult<LoginPacket> {
    match envelope.payload {
        Paket::Login(p) => Ok(p),
        anderes => Err(ClientError::protokoll(format!(
            "Erwartet Login-Paket, erhalten: {}",
            anderes.art()
        ))),
    }
}
