//! Registrierungs-Handler – Public-Key-Einschreibung
//!
//! Offene Einschreibung ohne vorherigen Login. Das Verzeichnis ist ueber
//! den geschluesselten Hash des Namens adressiert, der Klartextname wird
//! nie gespeichert. Doppelte Namen und doppelte Schluessel lehnt das
//! Verzeichnis als Konflikt ab.

use hushline_crypto::{modulus_bytes, public_key_aus_modulus};
use hushline_protocol::{Envelope, RegisterPacket, RegisterStatus};

use crate::dispatcher::Ausgang;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

fn antwort(status: RegisterStatus) -> Ausgang {
    Ausgang::Antwort(Envelope::vom_server(RegisterPacket::neu(status).into()))
}

/// Verarbeitet ein Registrierungs-Paket
pub async fn handle_register(
    paket: RegisterPacket,
    from_username: Option<String>,
    state: &SignalingState,
) -> Ausgang {
    if paket.status != RegisterStatus::RequestToRegister {
        tracing::warn!(status = ?paket.status, "Protokollfehler: Server-Status vom Client");
        return antwort(RegisterStatus::RegisterFailed);
    }
    let Some(benutzername) = from_username.filter(|n| !n.is_empty()) else {
        tracing::warn!("Registrierung ohne Benutzernamen");
        return antwort(RegisterStatus::RegisterFailed);
    };

    match eintragen(&benutzername, &paket.public_key, state).await {
        Ok(()) => {
            tracing::info!(benutzer = %benutzername, "Benutzer registriert");
            antwort(RegisterStatus::RegisterSuccess)
        }
        Err(e) => {
            tracing::warn!(benutzer = %benutzername, fehler = %e, "Registrierung abgelehnt");
            antwort(RegisterStatus::RegisterFailed)
        }
    }
}

async fn eintragen(benutzername: &str, modulus: &[u8], state: &SignalingState) -> SignalingResult<()> {
    // Nur Schluessel annehmen, mit denen spaeter ein Login moeglich ist.
    // Gespeichert wird die kanonische Form ohne fuehrende Nullbytes,
    // sonst greift die Eindeutigkeit der Schluessel nicht.
    let kanonisch = modulus_bytes(&public_key_aus_modulus(modulus)?);
    let hash = state.hasher.hash(benutzername);
    state.verzeichnis.put(&hash, &kanonisch).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::SignalingConfig;
    use hushline_crypto::BenutzernamenHasher;
    use hushline_db::SpeicherVerzeichnis;
    use hushline_protocol::Paket;
    use std::sync::Arc;

    fn state() -> Arc<SignalingState> {
        SignalingState::neu(
            SignalingConfig::default(),
            Arc::new(SpeicherVerzeichnis::neu()),
            BenutzernamenHasher::neu(b"geheim", b"salz"),
        )
    }

    fn status(ausgang: Ausgang) -> RegisterStatus {
        match ausgang {
            Ausgang::Antwort(Envelope {
                payload: Paket::Register(p),
                ..
            }) => p.status,
            anderes => panic!("unerwarteter Ausgang: {anderes:?}"),
        }
    }

    #[tokio::test]
    async fn zu_kurzer_modulus_wird_abgelehnt() {
        let state = state();
        let a = handle_register(RegisterPacket::anfrage(vec![0xAB; 16]), Some("alice".into()), &state).await;
        assert_eq!(status(a), RegisterStatus::RegisterFailed);
        assert_eq!(state.verzeichnis.anzahl().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fuehrende_nullbytes_umgehen_schluesseleindeutigkeit_nicht() {
        let state = state();
        let key = hushline_crypto::schluesselpaar_erzeugen(1024).unwrap();
        let modulus = modulus_bytes(&key.to_public_key());
        let mut aufgefuellt = vec![0x00];
        aufgefuellt.extend_from_slice(&modulus);

        let a = handle_register(RegisterPacket::anfrage(aufgefuellt), Some("alice".into()), &state).await;
        assert_eq!(status(a), RegisterStatus::RegisterSuccess);
        // Kanonisch gespeichert
        let hash = state.hasher.hash("alice");
        assert_eq!(state.verzeichnis.get(&hash).await.unwrap(), Some(modulus.clone()));

        let b = handle_register(RegisterPacket::anfrage(modulus), Some("mallory".into()), &state).await;
        assert_eq!(status(b), RegisterStatus::RegisterFailed);
        assert_eq!(state.verzeichnis.anzahl().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ohne_namen_wird_abgelehnt() {
        let state = state();
        let a = handle_register(RegisterPacket::anfrage(vec![0xAB; 128]), None, &state).await;
        assert_eq!(status(a), RegisterStatus::RegisterFailed);
    }
}
