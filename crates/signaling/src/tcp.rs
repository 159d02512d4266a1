//! TCP-Listener – akzeptiert Verbindungen
//!
//! Der `SignalingServer` bedient einen bereits gebundenen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection`. Mit einem `TlsAcceptor` laeuft der TLS-Handshake
//! ebenfalls in diesem Task, ein langsamer Client blockiert also nicht die
//! Accept-Loop.

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// TCP-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
    tls: Option<TlsAcceptor>,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    ///
    /// Ohne `tls` werden Verbindungen im Klartext bedient (nur fuer Tests).
    pub fn neu(state: Arc<SignalingState>, tls: Option<TlsAcceptor>) -> Self {
        Self { state, tls }
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn an_listener(
        self,
        listener: TcpListener,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let lokale_addr = listener.local_addr()?;
        tracing::info!(
            adresse = %lokale_addr,
            tls = self.tls.is_some(),
            "TCP Signaling-Server gestartet"
        );

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let verbindung = ClientConnection::neu(
                                Arc::clone(&self.state),
                                peer_addr.to_string(),
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();
                            let tls = self.tls.clone();

                            tokio::spawn(async move {
                                match tls {
                                    Some(acceptor) => match acceptor.accept(stream).await {
                                        Ok(tls_stream) => {
                                            verbindung.verarbeiten(tls_stream, shutdown_rx_clone).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!(peer = %peer_addr, fehler = %e, "TLS-Handshake fehlgeschlagen");
                                        }
                                    },
                                    None => verbindung.verarbeiten(stream, shutdown_rx_clone).await,
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Signaling-Server gestoppt");
        Ok(())
    }
}
