//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use hushline_db::DatabaseConfig;
use hushline_observability::LoggingConfig;
use hushline_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use hushline_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG: &str = "HUSHLINE_CONFIG";
pub const ENV_HASH_SECRET: &str = "HUSHLINE_HASH_SECRET";
pub const ENV_HASH_SALT: &str = "HUSHLINE_HASH_SALT";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub netzwerk: NetzwerkEinstellungen,
    pub verzeichnis: VerzeichnisEinstellungen,
    pub sicherheit: SicherheitsEinstellungen,
    pub signaling: SignalingEinstellungen,
    pub logging: LoggingConfig,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TLS-Verbindung
    pub bind_adresse: String,
    pub tcp_port: u16,
    /// TLS-Zertifikat-Pfad (PEM). Fehlt er, wird ein selbstsigniertes
    /// Entwicklungszertifikat erzeugt.
    pub tls_zertifikat: Option<String>,
    /// TLS-Schluessel-Pfad (PEM)
    pub tls_schluessel: Option<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 8080,
            tls_zertifikat: None,
            tls_schluessel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerzeichnisBackend {
    #[default]
    Sqlite,
    /// Fluechtig, nur fuer Entwicklung und Tests
    Speicher,
}

/// Verzeichnis-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerzeichnisEinstellungen {
    pub backend: VerzeichnisBackend,
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
}

impl Default for VerzeichnisEinstellungen {
    fn default() -> Self {
        Self {
            backend: VerzeichnisBackend::Sqlite,
            url: "sqlite://hushline.db".into(),
            max_verbindungen: 5,
        }
    }
}

impl VerzeichnisEinstellungen {
    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.url.clone(),
            max_verbindungen: self.max_verbindungen,
            ..DatabaseConfig::default()
        }
    }
}

/// Geheimnis und Salz fuer den Benutzernamen-Hash
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SicherheitsEinstellungen {
    pub hash_geheimnis: String,
    pub hash_salz: String,
}

impl std::fmt::Debug for SicherheitsEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SicherheitsEinstellungen")
            .field("hash_geheimnis", &"[REDACTED]")
            .field("hash_salz", &"[REDACTED]")
            .finish()
    }
}

impl SicherheitsEinstellungen {
    /// Wendet `HUSHLINE_HASH_SECRET` / `HUSHLINE_HASH_SALT` an
    pub fn mit_overrides(mut self, geheimnis: Option<String>, salz: Option<String>) -> Self {
        if let Some(g) = geheimnis.filter(|g| !g.is_empty()) {
            self.hash_geheimnis = g;
        }
        if let Some(s) = salz.filter(|s| !s.is_empty()) {
            self.hash_salz = s;
        }
        self
    }

    pub fn aus_umgebung(self) -> Self {
        self.mit_overrides(
            std::env::var(ENV_HASH_SECRET).ok(),
            std::env::var(ENV_HASH_SALT).ok(),
        )
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
    /// Tiefe der ausgehenden Queue pro Verbindung
    pub sende_puffer: usize,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self {
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            sende_puffer: 64,
        }
    }
}

impl From<&SignalingEinstellungen> for SignalingConfig {
    fn from(e: &SignalingEinstellungen) -> Self {
        Self {
            max_frame_groesse: e.max_frame_groesse,
            sende_puffer: e.sende_puffer.max(1),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }
}
