//! Chat-Handler – Relay opaker Chiffrate
//!
//! Kein Store-and-Forward: ist der Empfaenger nicht angemeldet, bekommt der
//! Absender `DELIVERY_FAILED` zurueck.

use hushline_protocol::{ChatPacket, ChatStatus, Envelope};

use crate::connection::VerbindungsKontext;
use crate::dispatcher::Ausgang;

/// Verarbeitet ein Chat-Paket
pub fn handle_chat(paket: ChatPacket, ctx: &VerbindungsKontext) -> Ausgang {
    let ziel = paket.to_username.clone();
    let nicht_zustellbar = Envelope::vom_server(ChatPacket::nicht_zustellbar(&ziel).into());

    let Some(benutzer) = ctx.benutzer.clone() else {
        tracing::warn!(peer = %ctx.peer, "Chat ohne Login");
        return Ausgang::Antwort(nicht_zustellbar);
    };

    match paket.status {
        ChatStatus::Message => Ausgang::Weiterleiten {
            ziel,
            envelope: Envelope::vom_client(Some(benutzer), paket.into()),
            bei_fehler: Some(nicht_zustellbar),
        },
        ChatStatus::DeliveryFailed => {
            tracing::warn!(peer = %ctx.peer, "Protokollfehler: DELIVERY_FAILED vom Client ignoriert");
            Ausgang::Keine
        }
    }
}
