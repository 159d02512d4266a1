//! hushline-server – Bibliotheks-Root
//!
//! Setzt Verzeichnis, Hasher, TLS und Signaling zusammen und stellt den
//! oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::{ServerConfig, VerzeichnisBackend};
use hushline_crypto::{selbstsigniertes_zertifikat, server_acceptor, BenutzernamenHasher, TlsMaterial};
use hushline_db::{PublicKeyDirectory, SpeicherVerzeichnis, SqliteVerzeichnis};
use hushline_signaling::{SignalingConfig, SignalingServer, SignalingState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

/// Nur fuer Entwicklung; ohne konfiguriertes Geheimnis sind Hashes vorhersagbar
const ENTWICKLUNGS_GEHEIMNIS: &str = "hushline-entwicklung";

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Oeffnet das konfigurierte Public-Key-Verzeichnis
    pub async fn verzeichnis_oeffnen(&self) -> Result<Arc<dyn PublicKeyDirectory>> {
        let einstellungen = &self.config.verzeichnis;
        match einstellungen.backend {
            VerzeichnisBackend::Sqlite => {
                let verzeichnis = SqliteVerzeichnis::oeffnen(&einstellungen.datenbank_config())
                    .await
                    .with_context(|| format!("Verzeichnis '{}' nicht zu oeffnen", einstellungen.url))?;
                Ok(Arc::new(verzeichnis))
            }
            VerzeichnisBackend::Speicher => {
                tracing::warn!("Fluechtiges In-Memory-Verzeichnis, Registrierungen gehen beim Neustart verloren");
                Ok(Arc::new(SpeicherVerzeichnis::neu()))
            }
        }
    }

    /// Baut den Benutzernamen-Hasher; Umgebungsvariablen haben Vorrang
    pub fn hasher(&self) -> BenutzernamenHasher {
        let sicherheit = self.config.sicherheit.clone().aus_umgebung();
        let geheimnis = if sicherheit.hash_geheimnis.is_empty() {
            tracing::warn!(
                "Kein Hash-Geheimnis konfiguriert ({}), verwende Entwicklungswert",
                config::ENV_HASH_SECRET
            );
            ENTWICKLUNGS_GEHEIMNIS.to_string()
        } else {
            sicherheit.hash_geheimnis
        };
        BenutzernamenHasher::neu(geheimnis.as_bytes(), sicherheit.hash_salz.as_bytes())
    }

    /// Laedt Zertifikat und Schluessel aus PEM-Dateien
    ///
    /// Ohne konfigurierte Pfade wird ein selbstsigniertes Zertifikat fuer
    /// `localhost` erzeugt.
    pub async fn tls_material(&self) -> Result<TlsMaterial> {
        let netzwerk = &self.config.netzwerk;
        match (&netzwerk.tls_zertifikat, &netzwerk.tls_schluessel) {
            (Some(zertifikat), Some(schluessel)) => {
                let zertifikat_pem = tokio::fs::read_to_string(zertifikat)
                    .await
                    .with_context(|| format!("TLS-Zertifikat '{zertifikat}' nicht lesbar"))?;
                let schluessel_pem = tokio::fs::read_to_string(schluessel)
                    .await
                    .with_context(|| format!("TLS-Schluessel '{schluessel}' nicht lesbar"))?;
                tracing::info!(zertifikat = %zertifikat, "TLS-Material geladen");
                Ok(TlsMaterial {
                    zertifikat_pem,
                    schluessel_pem,
                })
            }
            (None, None) => {
                tracing::warn!("Kein TLS-Zertifikat konfiguriert, erzeuge selbstsigniertes Zertifikat");
                Ok(selbstsigniertes_zertifikat(&["localhost", "127.0.0.1"])?)
            }
            _ => anyhow::bail!("tls_zertifikat und tls_schluessel muessen gemeinsam gesetzt sein"),
        }
    }

    /// Baut den geteilten Signaling-Zustand und den TLS-Acceptor
    pub async fn vorbereiten(&self) -> Result<(Arc<SignalingState>, TlsAcceptor)> {
        let verzeichnis = self.verzeichnis_oeffnen().await?;
        let state = SignalingState::neu(
            SignalingConfig::from(&self.config.signaling),
            verzeichnis,
            self.hasher(),
        );
        let acceptor = server_acceptor(&self.tls_material().await?)?;
        Ok((state, acceptor))
    }

    /// Bedient Verbindungen auf einem bereits gebundenen Listener
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn ausfuehren(
        self,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let (state, acceptor) = self.vorbereiten().await?;
        SignalingServer::neu(state, Some(acceptor))
            .an_listener(listener, shutdown_rx)
            .await?;
        Ok(())
    }

    /// Startet den Server und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.tcp_bind_adresse();
        tracing::info!(
            tcp = %adresse,
            backend = ?self.config.verzeichnis.backend,
            "Server startet"
        );

        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut server_task = tokio::spawn(self.ausfuehren(listener, shutdown_rx));

        tokio::select! {
            ergebnis = &mut server_task => {
                return ergebnis.context("Server-Task abgebrochen")?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            }
        }

        // Empfaenger kann bereits weg sein, wenn der Task gerade endet
        let _ = shutdown_tx.send(true);
        server_task.await.context("Server-Task abgebrochen")?
    }
}
