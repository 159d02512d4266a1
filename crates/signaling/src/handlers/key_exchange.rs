//! Schluesselaustausch-Handler – Verzeichnis-Lookup und Relay
//!
//! Der Server beantwortet nur Public-Key-Anfragen selbst. Alles andere
//! (`REQ_FOR_SYM_KEY`, `REPLY_WITH_SYM_KEY`, `ERROR`) wird unveraendert an
//! `to_username` weitergeleitet, nur `from_username` wird durch den
//! authentifizierten Namen ersetzt. Den Sitzungsschluessel sieht der
//! Server nie im Klartext.
//!
//! ```text
//! I --REQUEST_FOR_USER_PUBLIC_KEY(R)--> S --PUB_KEY_FROM_SERVER--> I
//! I --REQ_FOR_SYM_KEY----------------> S --relay--> R
//! R --REQUEST_FOR_USER_PUBLIC_KEY_PASSIVE(I)--> S --PUB_KEY_FROM_SERVER_PASSIVE--> R
//! R --REPLY_WITH_SYM_KEY-------------> S --relay--> I
//! ```

use hushline_protocol::{Envelope, ExchangeKeyPacket, ExchangeKeyStatus};

use crate::connection::VerbindungsKontext;
use crate::dispatcher::Ausgang;
use crate::server_state::SignalingState;

fn fehler(ziel: &str) -> Envelope {
    Envelope::vom_server(ExchangeKeyPacket::neu(ExchangeKeyStatus::Error, ziel).into())
}

/// Verarbeitet ein Schluesselaustausch-Paket
pub async fn handle_exchange_key(
    paket: ExchangeKeyPacket,
    ctx: &VerbindungsKontext,
    state: &SignalingState,
) -> Ausgang {
    let Some(benutzer) = ctx.benutzer.clone() else {
        tracing::warn!(peer = %ctx.peer, "Schluesselaustausch ohne Login");
        return Ausgang::Antwort(fehler(&paket.to_username));
    };

    match paket.status {
        ExchangeKeyStatus::RequestForUserPublicKey => {
            public_key_antwort(&paket.to_username, ExchangeKeyStatus::PubKeyFromServer, state).await
        }
        ExchangeKeyStatus::RequestForUserPublicKeyPassive => {
            public_key_antwort(
                &paket.to_username,
                ExchangeKeyStatus::PubKeyFromServerPassive,
                state,
            )
            .await
        }

        ExchangeKeyStatus::ReqForSymKey
        | ExchangeKeyStatus::ReplyWithSymKey
        | ExchangeKeyStatus::Error => {
            let ziel = paket.to_username.clone();
            // Ein ERROR, der nicht zugestellt werden kann, erzeugt keinen weiteren
            let bei_fehler = (paket.status != ExchangeKeyStatus::Error).then(|| fehler(&ziel));
            tracing::debug!(
                von = %benutzer,
                an = %ziel,
                status = ?paket.status,
                "Schluesselaustausch weiterleiten"
            );
            Ausgang::Weiterleiten {
                ziel,
                envelope: Envelope::vom_client(Some(benutzer), paket.into()),
                bei_fehler,
            }
        }

        ExchangeKeyStatus::PubKeyFromServer | ExchangeKeyStatus::PubKeyFromServerPassive => {
            tracing::warn!(
                peer = %ctx.peer,
                status = ?paket.status,
                "Protokollfehler: Server-Status vom Client"
            );
            Ausgang::Antwort(fehler(&paket.to_username))
        }
    }
}

/// Sucht den Schluessel des Ziels im Verzeichnis
async fn public_key_antwort(
    ziel: &str,
    status: ExchangeKeyStatus,
    state: &SignalingState,
) -> Ausgang {
    let hash = state.hasher.hash(ziel);
    match state.verzeichnis.get(&hash).await {
        Ok(Some(key)) => Ausgang::Antwort(Envelope::vom_server(
            ExchangeKeyPacket::neu(status, ziel).mit_key(key).into(),
        )),
        Ok(None) => {
            tracing::info!(ziel = %ziel, "Kein Verzeichniseintrag fuer Schluesselanfrage");
            Ausgang::Antwort(fehler(ziel))
        }
        Err(e) => {
            tracing::warn!(ziel = %ziel, fehler = %e, "Verzeichnis-Lookup fehlgeschlagen");
            Ausgang::Antwort(fehler(ziel))
        }
    }
}
