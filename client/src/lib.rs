//! hushline-client – Client-Kern fuer Hushline
//!
//! Die Anzeige-Schicht sieht nur Strings und [`ChatEvent`]s; Protokoll und
//! Kryptografie bleiben hier.
//!
//! ## Ablauf
//!
//! ```text
//! Client::verbinden_tls
//!     -> registrieren (einmalig)
//!     -> anmelden
//!     -> handshake_antworten_starten   (Responder im Hintergrund)
//!     -> nachrichten_empfangen         (Empfang im Hintergrund)
//!     -> benutzerliste_beobachten      (Presence-Polling)
//!     -> chat_starten(peer) -> nachricht_senden(peer, text)
//! ```

pub mod chat;
pub mod chatter;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handshake;

pub use chat::ChatEvent;
pub use client::{schluessel_laden, Client};
pub use config::ClientConfig;
pub use dispatcher::{route_fuer, Dispatcher, Route};
pub use error::{ClientError, ClientResult};
pub use hushline_crypto::{schluesselpaar_erzeugen, RsaPrivateKey};
