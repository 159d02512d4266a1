//! Hushline Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use hushline_observability::logging_initialisieren;
use hushline_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = std::env::var(hushline_server::config::ENV_CONFIG)
        .unwrap_or_else(|_| "hushline.toml".into());

    let config = ServerConfig::laden(&config_pfad)?;
    logging_initialisieren(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Hushline Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
