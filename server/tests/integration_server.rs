//! Integration-Test: kompletter Server ueber TLS mit echtem Client

use hushline_client::{schluesselpaar_erzeugen, ChatEvent, Client, ClientConfig, RsaPrivateKey};
use hushline_crypto::{selbstsigniertes_zertifikat, TlsMaterial};
use hushline_server::config::{ServerConfig, VerzeichnisBackend};
use hushline_server::Server;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(10);

struct Testumgebung {
    verzeichnis: PathBuf,
    material: TlsMaterial,
}

impl Testumgebung {
    fn neu() -> Self {
        let verzeichnis = std::env::temp_dir().join(format!("hushline-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&verzeichnis).unwrap();
        let material = selbstsigniertes_zertifikat(&["localhost"]).unwrap();
        std::fs::write(verzeichnis.join("cert.pem"), &material.zertifikat_pem).unwrap();
        std::fs::write(verzeichnis.join("key.pem"), &material.schluessel_pem).unwrap();
        Self {
            verzeichnis,
            material,
        }
    }

    fn config(&self, backend: VerzeichnisBackend) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.netzwerk.tls_zertifikat = Some(self.pfad("cert.pem"));
        config.netzwerk.tls_schluessel = Some(self.pfad("key.pem"));
        config.verzeichnis.backend = backend;
        config.verzeichnis.url = format!("sqlite://{}", self.pfad("hushline.db"));
        config.sicherheit.hash_geheimnis = "test-geheimnis".into();
        config.sicherheit.hash_salz = "test-salz".into();
        config
    }

    fn pfad(&self, datei: &str) -> String {
        self.verzeichnis.join(datei).to_string_lossy().into_owned()
    }

    async fn client(&self, adresse: &str, name: &str, key: RsaPrivateKey) -> Client {
        Client::verbinden_tls(
            adresse,
            "localhost",
            &self.material.zertifikat_pem,
            name,
            key,
            ClientConfig::default(),
        )
        .await
        .expect("TLS-Verbindung fehlgeschlagen")
    }
}

impl Drop for Testumgebung {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.verzeichnis);
    }
}

struct LaufenderServer {
    adresse: String,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl LaufenderServer {
    async fn starten(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let adresse = listener.local_addr().unwrap().to_string();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Server::neu(config).ausfuehren(listener, shutdown_rx));
        Self {
            adresse,
            shutdown_tx,
            task,
        }
    }

    async fn stoppen(self) {
        self.shutdown_tx.send(true).unwrap();
        tokio::time::timeout(TIMEOUT, self.task)
            .await
            .expect("Server beendet sich nicht")
            .unwrap()
            .unwrap();
    }
}

fn schluessel() -> RsaPrivateKey {
    schluesselpaar_erzeugen(1024).expect("Schluesselgenerierung fehlgeschlagen")
}

#[tokio::test]
async fn alice_schreibt_bob_ueber_tls() {
    let umgebung = Testumgebung::neu();
    let server = LaufenderServer::starten(umgebung.config(VerzeichnisBackend::Speicher)).await;

    let alice = umgebung.client(&server.adresse, "alice", schluessel()).await;
    let bob = umgebung.client(&server.adresse, "bob", schluessel()).await;
    for client in [&alice, &bob] {
        client.registrieren().await.unwrap();
        client.anmelden().await.unwrap();
    }

    let abbruch = CancellationToken::new();
    bob.handshake_antworten_starten(abbruch.clone());
    let mut eingang = bob.nachrichten_empfangen(abbruch.clone());

    assert_eq!(alice.benutzerliste().await.unwrap(), vec!["bob".to_string()]);
    alice.chat_starten("bob").await.expect("Handshake fehlgeschlagen");
    alice.nachricht_senden("bob", "hello").await.unwrap();

    let event = tokio::time::timeout(TIMEOUT, eingang.recv())
        .await
        .expect("Timeout")
        .expect("Kanal geschlossen");
    assert_eq!(
        event,
        ChatEvent::Nachricht {
            von: "alice".into(),
            text: "hello".into()
        }
    );

    abbruch.cancel();
    alice.trennen();
    bob.trennen();
    server.stoppen().await;
}

#[tokio::test]
async fn registrierung_ueberlebt_neustart_mit_sqlite() {
    let umgebung = Testumgebung::neu();
    let key = schluessel();

    let server = LaufenderServer::starten(umgebung.config(VerzeichnisBackend::Sqlite)).await;
    let alice = umgebung.client(&server.adresse, "alice", key.clone()).await;
    alice.registrieren().await.unwrap();
    alice.trennen();
    server.stoppen().await;

    let server = LaufenderServer::starten(umgebung.config(VerzeichnisBackend::Sqlite)).await;
    let alice = umgebung.client(&server.adresse, "alice", key).await;
    alice.anmelden().await.expect("Login nach Neustart fehlgeschlagen");

    // Zweite Registrierung desselben Namens bleibt abgelehnt
    let mallory = umgebung.client(&server.adresse, "alice", schluessel()).await;
    assert!(mallory.registrieren().await.is_err());

    alice.trennen();
    mallory.trennen();
    server.stoppen().await;
}

#[tokio::test]
async fn anderes_hash_geheimnis_findet_benutzer_nicht() {
    let umgebung = Testumgebung::neu();
    let key = schluessel();

    let server = LaufenderServer::starten(umgebung.config(VerzeichnisBackend::Sqlite)).await;
    let alice = umgebung.client(&server.adresse, "alice", key.clone()).await;
    alice.registrieren().await.unwrap();
    alice.trennen();
    server.stoppen().await;

    let mut config = umgebung.config(VerzeichnisBackend::Sqlite);
    config.sicherheit.hash_geheimnis = "anderes-geheimnis".into();
    let server = LaufenderServer::starten(config).await;
    let alice = umgebung.client(&server.adresse, "alice", key).await;
    assert!(alice.anmelden().await.is_err());

    alice.trennen();
    server.stoppen().await;
}

#[tokio::test]
async fn halbe_tls_konfiguration_ist_fehler() {
    let umgebung = Testumgebung::neu();
    let mut config = umgebung.config(VerzeichnisBackend::Speicher);
    config.netzwerk.tls_schluessel = None;
    assert!(Server::neu(config).tls_material().await.is_err());
}

#[tokio::test]
async fn fehlende_zertifikatsdatei_ist_fehler() {
    let umgebung = Testumgebung::neu();
    let mut config = umgebung.config(VerzeichnisBackend::Speicher);
    config.netzwerk.tls_zertifikat = Some(umgebung.pfad("fehlt.pem"));
    assert!(Server::neu(config).vorbereiten().await.is_err());
}

#[tokio::test]
async fn ohne_tls_pfade_selbstsigniert() {
    let mut config = ServerConfig::default();
    config.verzeichnis.backend = VerzeichnisBackend::Speicher;
    let material = Server::neu(config).tls_material().await.unwrap();
    assert!(material.zertifikat_pem.contains("BEGIN CERTIFICATE"));
}
