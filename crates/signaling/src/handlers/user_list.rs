//! Presence – Momentaufnahme der angemeldeten Benutzer

use hushline_protocol::{Envelope, UserListPacket, UserListStatus};

use crate::connection::VerbindungsKontext;
use crate::dispatcher::Ausgang;
use crate::server_state::SignalingState;

pub fn handle_user_list(
    paket: UserListPacket,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> Ausgang {
    if !ctx.ist_angemeldet() || paket.status != UserListStatus::RequestUserList {
        tracing::warn!(peer = %ctx.peer, status = ?paket.status, "Benutzerliste abgelehnt");
        return Ausgang::Antwort(Envelope::vom_server(
            UserListPacket::neu(UserListStatus::Error).into(),
        ));
    }
    Ausgang::Antwort(Envelope::vom_server(
        UserListPacket::liste(state.registry.benutzernamen()).into(),
    ))
}
