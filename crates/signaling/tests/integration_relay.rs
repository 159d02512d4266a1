//! Integration-Tests fuer den Relay-Server (In-Memory-Duplex, Speicher-Verzeichnis)

use futures_util::{SinkExt, StreamExt};
use hushline_crypto::{
    entschluesseln, modulus_bytes, schluesselpaar_erzeugen, BenutzernamenHasher, RsaPrivateKey,
};
use hushline_db::SpeicherVerzeichnis;
use hushline_protocol::{
    ChatPacket, ChatStatus, Envelope, EnvelopeCodec, ExchangeKeyPacket, ExchangeKeyStatus,
    LoginPacket, LoginStatus, Paket, Quelle, RegisterPacket, RegisterStatus, UserListPacket,
    UserListStatus,
};
use hushline_signaling::{ClientConnection, SignalingConfig, SignalingState};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;

const TIMEOUT: Duration = Duration::from_secs(5);

fn state() -> Arc<SignalingState> {
    SignalingState::neu(
        SignalingConfig::default(),
        Arc::new(SpeicherVerzeichnis::neu()),
        BenutzernamenHasher::neu(b"test-geheimnis", b"test-salz"),
    )
}

fn schluessel() -> RsaPrivateKey {
    schluesselpaar_erzeugen(1024).expect("Schluesselgenerierung fehlgeschlagen")
}

/// Testclient, der das Protokoll von Hand spricht
struct Roh {
    framed: Framed<DuplexStream, EnvelopeCodec>,
    _shutdown: watch::Sender<bool>,
}

impl Roh {
    fn verbinden(state: &Arc<SignalingState>) -> Self {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let verbindung = ClientConnection::neu(Arc::clone(state), "test-peer");
        tokio::spawn(verbindung.verarbeiten(server_io, shutdown_rx));
        Self {
            framed: Framed::new(client_io, EnvelopeCodec::new()),
            _shutdown: shutdown_tx,
        }
    }

    async fn senden(&mut self, envelope: Envelope) {
        self.framed.send(envelope).await.expect("Senden fehlgeschlagen");
    }

    async fn empfangen(&mut self) -> Envelope {
        tokio::time::timeout(TIMEOUT, self.framed.next())
            .await
            .expect("Timeout beim Empfangen")
            .expect("Verbindung geschlossen")
            .expect("Frame-Fehler")
    }

    async fn registrieren(&mut self, name: &str, key: &RsaPrivateKey) -> RegisterStatus {
        self.senden(Envelope::vom_client(
            Some(name.into()),
            RegisterPacket::anfrage(modulus_bytes(&key.to_public_key())).into(),
        ))
        .await;
        match self.empfangen().await.payload {
            Paket::Register(p) => p.status,
            anderes => panic!("unerwartetes Paket: {anderes:?}"),
        }
    }

    async fn anmelden(&mut self, name: &str, key: &RsaPrivateKey) -> LoginStatus {
        self.senden(Envelope::vom_client(
            Some(name.into()),
            LoginPacket::neu(LoginStatus::RequestToLogin).into(),
        ))
        .await;
        let challenge = match self.empfangen().await.payload {
            Paket::Login(p) if p.status == LoginStatus::EncryptedToken => {
                p.token.expect("Token fehlt")
            }
            Paket::Login(p) => return p.status,
            anderes => panic!("unerwartetes Paket: {anderes:?}"),
        };
        // Mit falschem Schluessel schlaegt OAEP fehl, dann geht Muell zurueck
        let antwort = entschluesseln(key, &challenge).unwrap_or_else(|_| vec![0u8; 62]);
        self.senden(Envelope::vom_client(
            Some(name.into()),
            LoginPacket::mit_token(LoginStatus::DecryptedToken, antwort).into(),
        ))
        .await;
        match self.empfangen().await.payload {
            Paket::Login(p) => p.status,
            anderes => panic!("unerwartetes Paket: {anderes:?}"),
        }
    }

    async fn benutzerliste(&mut self) -> Paket {
        self.senden(Envelope::vom_client(
            None,
            UserListPacket::neu(UserListStatus::RequestUserList).into(),
        ))
        .await;
        self.empfangen().await.payload
    }
}

async fn angemeldet(state: &Arc<SignalingState>, name: &str) -> (Roh, RsaPrivateKey) {
    let key = schluessel();
    let mut client = Roh::verbinden(state);
    assert_eq!(client.registrieren(name, &key).await, RegisterStatus::RegisterSuccess);
    assert_eq!(client.anmelden(name, &key).await, LoginStatus::LoginSuccess);
    (client, key)
}

fn namen(paket: Paket) -> HashSet<String> {
    match paket {
        Paket::UserList(p) if p.status == UserListStatus::UserList => p.users.into_iter().collect(),
        anderes => panic!("unerwartetes Paket: {anderes:?}"),
    }
}

// ---------------------------------------------------------------------------
// Login und Registrierung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_mit_richtigem_schluessel() {
    let state = state();
    let (_alice, _key) = angemeldet(&state, "alice").await;
    assert_eq!(state.registry.benutzernamen(), vec!["alice".to_string()]);
}

#[tokio::test]
async fn login_mit_falschem_schluessel_scheitert() {
    let state = state();
    let richtig = schluessel();
    let falsch = schluessel();
    let mut client = Roh::verbinden(&state);
    assert_eq!(client.registrieren("alice", &richtig).await, RegisterStatus::RegisterSuccess);
    assert_eq!(client.anmelden("alice", &falsch).await, LoginStatus::LoginFailed);
    assert_eq!(state.registry.anzahl(), 0);

    // Die Verbindung bleibt nutzbar, ein neuer Versuch gelingt
    assert_eq!(client.anmelden("alice", &richtig).await, LoginStatus::LoginSuccess);
}

#[tokio::test]
async fn login_fuer_unbekannten_benutzer() {
    let state = state();
    let mut client = Roh::verbinden(&state);
    assert_eq!(client.anmelden("niemand", &schluessel()).await, LoginStatus::LoginFailed);
}

#[tokio::test]
async fn decrypted_token_ohne_challenge() {
    let state = state();
    let mut client = Roh::verbinden(&state);
    client
        .senden(Envelope::vom_client(
            Some("alice".into()),
            LoginPacket::mit_token(LoginStatus::DecryptedToken, vec![1, 2, 3]).into(),
        ))
        .await;
    assert!(matches!(
        client.empfangen().await.payload,
        Paket::Login(LoginPacket { status: LoginStatus::LoginFailed, .. })
    ));
}

#[tokio::test]
async fn gleicher_schluessel_unter_zwei_namen_wird_abgelehnt() {
    let state = state();
    let key = schluessel();
    let mut client = Roh::verbinden(&state);
    assert_eq!(client.registrieren("alice", &key).await, RegisterStatus::RegisterSuccess);
    assert_eq!(client.registrieren("mallory", &key).await, RegisterStatus::RegisterFailed);
}

#[tokio::test]
async fn erneute_registrierung_eines_namens_wird_abgelehnt() {
    let state = state();
    let erster = schluessel();
    let zweiter = schluessel();
    let mut client = Roh::verbinden(&state);
    assert_eq!(client.registrieren("alice", &erster).await, RegisterStatus::RegisterSuccess);
    assert_eq!(client.registrieren("alice", &zweiter).await, RegisterStatus::RegisterFailed);

    // Der erste Schluessel bleibt gueltig
    assert_eq!(client.anmelden("alice", &erster).await, LoginStatus::LoginSuccess);
}

// ---------------------------------------------------------------------------
// Schluesselaustausch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn schluesselanfrage_liefert_schluessel_des_ziels() {
    let state = state();
    let (mut alice, alice_key) = angemeldet(&state, "alice").await;
    let (_bob, bob_key) = angemeldet(&state, "bob").await;

    alice
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ExchangeKeyPacket::neu(ExchangeKeyStatus::RequestForUserPublicKey, "bob").into(),
        ))
        .await;
    let antwort = alice.empfangen().await;
    assert_eq!(antwort.source, Quelle::Server);
    let Paket::ExchangeKey(p) = antwort.payload else {
        panic!("kein ExchangeKey-Paket");
    };
    assert_eq!(p.status, ExchangeKeyStatus::PubKeyFromServer);
    assert_eq!(p.to_username, "bob");
    assert_eq!(p.key, modulus_bytes(&bob_key.to_public_key()));
    assert_ne!(p.key, modulus_bytes(&alice_key.to_public_key()));
}

#[tokio::test]
async fn schluesselanfrage_fuer_unbekanntes_ziel() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    alice
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ExchangeKeyPacket::neu(ExchangeKeyStatus::RequestForUserPublicKeyPassive, "geist").into(),
        ))
        .await;
    let Paket::ExchangeKey(p) = alice.empfangen().await.payload else {
        panic!("kein ExchangeKey-Paket");
    };
    assert_eq!(p.status, ExchangeKeyStatus::Error);
    assert_eq!(p.to_username, "geist");
}

#[tokio::test]
async fn sym_key_anfrage_wird_weitergeleitet() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    let (mut bob, _) = angemeldet(&state, "bob").await;

    alice
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ExchangeKeyPacket::neu(ExchangeKeyStatus::ReqForSymKey, "bob")
                .mit_nachricht(vec![9, 8, 7])
                .into(),
        ))
        .await;

    let relay = bob.empfangen().await;
    assert_eq!(relay.from_username.as_deref(), Some("alice"));
    let Paket::ExchangeKey(p) = relay.payload else {
        panic!("kein ExchangeKey-Paket");
    };
    assert_eq!(p.status, ExchangeKeyStatus::ReqForSymKey);
    assert_eq!(p.encrypted_message, vec![9, 8, 7]);
}

#[tokio::test]
async fn server_status_vom_client_ist_fehler() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    alice
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ExchangeKeyPacket::neu(ExchangeKeyStatus::PubKeyFromServerPassive, "bob")
                .mit_key(vec![1; 128])
                .into(),
        ))
        .await;
    assert!(matches!(
        alice.empfangen().await.payload,
        Paket::ExchangeKey(ExchangeKeyPacket { status: ExchangeKeyStatus::Error, .. })
    ));
}

// ---------------------------------------------------------------------------
// Chat-Relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_an_unbekannten_meldet_fehler() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    alice
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ChatPacket::nachricht("bob", vec![1, 2, 3]).into(),
        ))
        .await;
    let Paket::Chat(p) = alice.empfangen().await.payload else {
        panic!("kein Chat-Paket");
    };
    assert_eq!(p.status, ChatStatus::DeliveryFailed);
    assert_eq!(p.to_username, "bob");
}

#[tokio::test]
async fn chat_liefert_exakte_bytes_mit_echtem_absender() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    let (mut bob, _) = angemeldet(&state, "bob").await;

    let chiffrat: Vec<u8> = (0..=255u8).collect();
    // Gefaelschter Absender wird ueberschrieben
    alice
        .senden(Envelope::vom_client(
            Some("mallory".into()),
            ChatPacket::nachricht("bob", chiffrat.clone()).into(),
        ))
        .await;

    let empfangen = bob.empfangen().await;
    assert_eq!(empfangen.from_username.as_deref(), Some("alice"));
    let Paket::Chat(p) = empfangen.payload else {
        panic!("kein Chat-Paket");
    };
    assert_eq!(p.status, ChatStatus::Message);
    assert_eq!(p.message, chiffrat);
}

#[tokio::test]
async fn ohne_login_wird_nichts_weitergeleitet() {
    let state = state();
    let (mut bob, _) = angemeldet(&state, "bob").await;
    let mut fremd = Roh::verbinden(&state);

    fremd
        .senden(Envelope::vom_client(
            Some("alice".into()),
            ChatPacket::nachricht("bob", vec![1]).into(),
        ))
        .await;
    assert!(matches!(
        fremd.empfangen().await.payload,
        Paket::Chat(ChatPacket { status: ChatStatus::DeliveryFailed, .. })
    ));
    assert!(matches!(
        fremd.benutzerliste().await,
        Paket::UserList(UserListPacket { status: UserListStatus::Error, .. })
    ));

    // Bob hat nichts bekommen
    assert!(tokio::time::timeout(Duration::from_millis(100), bob.framed.next())
        .await
        .is_err());
}

// ---------------------------------------------------------------------------
// Presence und Cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn benutzerliste_und_abmeldung_beim_trennen() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    let (bob, _) = angemeldet(&state, "bob").await;

    let erwartet: HashSet<String> = ["alice", "bob"].iter().map(|s| s.to_string()).collect();
    assert_eq!(namen(alice.benutzerliste().await), erwartet);

    drop(bob);
    for _ in 0..50 {
        if state.registry.anzahl() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let erwartet: HashSet<String> = ["alice".to_string()].into_iter().collect();
    assert_eq!(namen(alice.benutzerliste().await), erwartet);
}

#[tokio::test]
async fn frame_fehler_beendet_nur_diese_verbindung() {
    let state = state();
    let (mut alice, _) = angemeldet(&state, "alice").await;
    let (mut bob, _) = angemeldet(&state, "bob").await;

    // Laengenpraefix weit ueber dem Maximum
    bob.framed
        .get_mut()
        .write_all(&u32::MAX.to_be_bytes())
        .await
        .unwrap();
    let ende = tokio::time::timeout(TIMEOUT, bob.framed.next()).await.unwrap();
    assert!(ende.is_none() || matches!(ende, Some(Err(_))));

    for _ in 0..50 {
        if state.registry.anzahl() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let erwartet: HashSet<String> = ["alice".to_string()].into_iter().collect();
    assert_eq!(namen(alice.benutzerliste().await), erwartet);
}

#[tokio::test]
async fn shutdown_schliesst_verbindung() {
    let state = state();
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(ClientConnection::neu(Arc::clone(&state), "test").verarbeiten(server_io, shutdown_rx));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
    drop(client_io);
}
