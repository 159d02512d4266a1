//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `HL_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `info,hushline_signaling=trace`), Standard aus der Konfiguration
//! - `HL_LOG_FORMAT`: `text` oder `json`
//!
//! Geheimes Material (Tokens, Sitzungsschluessel) wird nie geloggt.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "HL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "HL_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Ungueltige Filter-Direktive '{0}'")]
    UngueltigerFilter(String),

    #[error("Unbekanntes Log-Format '{0}' (erlaubt: text, json)")]
    UngueltigesFormat(String),

    /// Ein globaler Subscriber ist bereits gesetzt
    #[error("Logging bereits initialisiert: {0}")]
    BereitsInitialisiert(String),
}

/// Ausgabeformat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(LoggingError::UngueltigesFormat(anderes.to_string())),
        }
    }
}

/// `[logging]`-Abschnitt der Konfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Wendet die Umgebungs-Overrides an
    ///
    /// Ein ungueltiges `HL_LOG_FORMAT` ist ein Fehler, kein stiller Fallback.
    pub fn mit_overrides(
        mut self,
        level: Option<String>,
        format: Option<String>,
    ) -> Result<Self, LoggingError> {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.level = level;
        }
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            self.format = format.trim().parse()?;
        }
        Ok(self)
    }

    /// Liest `HL_LOG_LEVEL` und `HL_LOG_FORMAT`
    pub fn aus_umgebung(self) -> Result<Self, LoggingError> {
        self.mit_overrides(
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    pub fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.level).map_err(|_| LoggingError::UngueltigerFilter(self.level.clone()))
    }
}

/// Initialisiert das globale Logging
///
/// Umgebungsvariablen haben Vorrang vor `config`.
pub fn logging_initialisieren(config: &LoggingConfig) -> Result<(), LoggingError> {
    let config = config.clone().aus_umgebung()?;
    let filter = config.filter()?;

    let ergebnis = match config.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| LoggingError::BereitsInitialisiert(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialisiert");
    Ok(())
}

/// Validiert ob ein einfacher Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}
