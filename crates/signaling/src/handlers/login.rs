//! Login-Handler – Challenge-Response ueber RSA-OAEP
//!
//! 1. `REQUEST_TO_LOGIN`: Zufallstoken erzeugen, mit dem hinterlegten
//!    Schluessel verschluesseln, Klartext im Verbindungskontext halten
//! 2. `DECRYPTED_TOKEN`: Token aus dem Kontext nehmen und in konstanter
//!    Zeit vergleichen
//!
//! Das Token wird beim zweiten Schritt immer aus dem Kontext entfernt,
//! egal wie der Vergleich ausgeht.

use hushline_crypto::{public_key_aus_modulus, verschluesseln, zufallstoken};
use hushline_protocol::{Envelope, LoginPacket, LoginStatus};

use crate::connection::{LoginZustand, VerbindungsKontext};
use crate::dispatcher::Ausgang;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

fn antwort(status: LoginStatus) -> Ausgang {
    Ausgang::Antwort(Envelope::vom_server(LoginPacket::neu(status).into()))
}

/// Verarbeitet ein Login-Paket
pub async fn handle_login(
    paket: LoginPacket,
    from_username: Option<String>,
    ctx: &mut VerbindungsKontext,
    state: &SignalingState,
) -> Ausgang {
    match paket.status {
        LoginStatus::RequestToLogin => {
            if matches!(ctx.login, LoginZustand::Authentifiziert) {
                tracing::warn!(peer = %ctx.peer, "Login auf bereits angemeldeter Verbindung");
                return antwort(LoginStatus::LoginFailed);
            }
            let Some(benutzername) = from_username.filter(|n| !n.is_empty()) else {
                tracing::warn!(peer = %ctx.peer, "Login ohne Benutzernamen");
                return antwort(LoginStatus::LoginFailed);
            };

            match challenge_erzeugen(&benutzername, ctx, state).await {
                Ok(chiffrat) => Ausgang::Antwort(Envelope::vom_server(
                    LoginPacket::mit_token(LoginStatus::EncryptedToken, chiffrat).into(),
                )),
                Err(e) => {
                    tracing::info!(
                        peer = %ctx.peer,
                        benutzer = %benutzername,
                        fehler = %e,
                        "Login abgelehnt"
                    );
                    ctx.login = LoginZustand::Leerlauf;
                    antwort(LoginStatus::LoginFailed)
                }
            }
        }

        LoginStatus::DecryptedToken => {
            let (benutzername, token) = match std::mem::take(&mut ctx.login) {
                LoginZustand::WartetAufEntschluesselung {
                    benutzername,
                    token,
                } => (benutzername, token),
                anderer => {
                    tracing::warn!(
                        peer = %ctx.peer,
                        "Protokollfehler: DECRYPTED_TOKEN ohne vorherigen REQUEST_TO_LOGIN"
                    );
                    // Ein bestehender Login bleibt erhalten
                    ctx.login = anderer;
                    return antwort(LoginStatus::LoginFailed);
                }
            };

            let geliefert = paket.token.unwrap_or_default();
            if token.gleich(&geliefert) {
                state.registry.registrieren(&benutzername, ctx.handle.clone());
                tracing::info!(peer = %ctx.peer, benutzer = %benutzername, "Login erfolgreich");
                ctx.benutzer = Some(benutzername);
                ctx.login = LoginZustand::Authentifiziert;
                antwort(LoginStatus::LoginSuccess)
            } else {
                tracing::warn!(peer = %ctx.peer, benutzer = %benutzername, "Token stimmt nicht ueberein");
                ctx.login = LoginZustand::Fehlgeschlagen;
                antwort(LoginStatus::LoginFailed)
            }
        }

        LoginStatus::EncryptedToken | LoginStatus::LoginSuccess | LoginStatus::LoginFailed => {
            tracing::warn!(
                peer = %ctx.peer,
                status = ?paket.status,
                "Protokollfehler: Server-Status vom Client"
            );
            antwort(LoginStatus::LoginFailed)
        }
    }
}

/// Sucht den Schluessel, erzeugt das Token und legt es im Kontext ab
async fn challenge_erzeugen(
    benutzername: &str,
    ctx: &mut VerbindungsKontext,
    state: &SignalingState,
) -> SignalingResult<Vec<u8>> {
    let hash = state.hasher.hash(benutzername);
    let modulus = state
        .verzeichnis
        .get(&hash)
        .await?
        .ok_or_else(|| SignalingError::UnbekannterBenutzer(benutzername.to_string()))?;

    let key = public_key_aus_modulus(&modulus)?;
    let token = zufallstoken(&key);
    let chiffrat = verschluesseln(&key, token.as_bytes())?;

    ctx.login = LoginZustand::WartetAufEntschluesselung {
        benutzername: benutzername.to_string(),
        token,
    };
    Ok(chiffrat)
}
