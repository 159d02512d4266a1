//! hushline-signaling – Verzeichnis- und Relay-Server
//!
//! Dieser Crate implementiert die Serverseite von Hushline: Registrierung,
//! Challenge-Response-Login, Vermittlung des Schluesselaustauschs,
//! Chat-Relay und Presence.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |  optional TLS-Handshake pro Verbindung
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  VerbindungsKontext: Login-Zustand, angemeldeter Name
//!     v
//! MessageDispatcher
//!     |
//!     +-- login        (REQUEST_TO_LOGIN, DECRYPTED_TOKEN)
//!     +-- register     (REQUEST_TO_REGISTER)
//!     +-- key_exchange (Public-Key-Lookup, Relay)
//!     +-- chat         (Relay, DELIVERY_FAILED)
//!     +-- user_list    (Momentaufnahme)
//!
//! VerbindungsRegistry – Benutzername -> ausgehende Queue
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::{ClientConnection, LoginZustand, VerbindungsKontext};
pub use dispatcher::{Ausgang, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use registry::{VerbindungsHandle, VerbindungsRegistry};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
