//! Message-Dispatcher – Routet Envelopes an die richtigen Handler
//!
//! Der Dispatcher empfaengt Envelopes von einer ClientConnection,
//! waehlt anhand der Payload-Variante den Handler und gibt einen
//! [`Ausgang`] zurueck. Gesendet wird erst in der Connection.
//!
//! ## Zustandspruefung
//! - `login` und `register` sind immer erlaubt
//! - `user_list`, `exchange_key` und `chat` erfordern einen Login
//!
//! Die Login-Pruefung fuer die uebrigen Pakete passiert in den Handlern,
//! weil jede Paketart ihre eigene Fehlerantwort hat.

use hushline_protocol::{Envelope, Paket};
use std::sync::Arc;

use crate::connection::VerbindungsKontext;
use crate::handlers::{chat, key_exchange, login, register, user_list};
use crate::server_state::SignalingState;

/// Ergebnis der Verarbeitung eines eingehenden Envelopes
#[derive(Debug, Clone, PartialEq)]
pub enum Ausgang {
    /// Direkte Antwort an den Absender
    Antwort(Envelope),
    /// Weiterleitung an einen anderen angemeldeten Benutzer
    Weiterleiten {
        ziel: String,
        envelope: Envelope,
        /// Antwort an den Absender, falls `ziel` nicht erreichbar ist
        bei_fehler: Option<Envelope>,
    },
    /// Nichts senden
    Keine,
}

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen eingehenden Envelope
    pub async fn dispatch(&self, envelope: Envelope, ctx: &mut VerbindungsKontext) -> Ausgang {
        let Envelope {
            from_username,
            payload,
            ..
        } = envelope;

        match payload {
            Paket::Login(paket) => {
                login::handle_login(paket, from_username, ctx, &self.state).await
            }
            Paket::Register(paket) => {
                register::handle_register(paket, from_username, &self.state).await
            }
            Paket::UserList(paket) => user_list::handle_user_list(paket, ctx, &self.state),
            Paket::ExchangeKey(paket) => {
                key_exchange::handle_exchange_key(paket, ctx, &self.state).await
            }
            Paket::Chat(paket) => chat::handle_chat(paket, ctx),
        }
    }
}
