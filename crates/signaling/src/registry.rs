//! Verbindungs-Registry – Benutzername -> laufende Verbindung
//!
//! Grundlage fuer Routing (Chat, Schluesselaustausch) und Presence.
//!
//! ## Lock-Disziplin
//! Der Lock wird nur fuer die Map-Operation selbst gehalten. Lookups geben
//! einen geklonten [`VerbindungsHandle`] zurueck; gesendet wird erst nach
//! dem Freigeben des Locks.

use hushline_core::VerbindungsId;
use hushline_protocol::Envelope;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// VerbindungsHandle
// ---------------------------------------------------------------------------

/// Handle auf die ausgehende Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct VerbindungsHandle {
    id: VerbindungsId,
    tx: mpsc::Sender<Envelope>,
}

impl VerbindungsHandle {
    pub fn neu(tx: mpsc::Sender<Envelope>) -> Self {
        Self {
            id: VerbindungsId::new(),
            tx,
        }
    }

    pub fn id(&self) -> VerbindungsId {
        self.id
    }

    /// Stellt einen Envelope nicht-blockierend in die Queue der Verbindung
    pub fn senden(&self, envelope: Envelope) -> SignalingResult<()> {
        match self.tx.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(SignalingError::QueueVoll)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(SignalingError::VerbindungGeschlossen)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// VerbindungsRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct VerbindungsRegistry {
    eintraege: RwLock<HashMap<String, VerbindungsHandle>>,
}

impl VerbindungsRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Meldet `benutzername` unter `handle` an
    ///
    /// Ein bestehender Eintrag fuer denselben Namen wird ersetzt (letzter
    /// Login gewinnt) und zurueckgegeben.
    pub fn registrieren(
        &self,
        benutzername: &str,
        handle: VerbindungsHandle,
    ) -> Option<VerbindungsHandle> {
        let vorher = self
            .eintraege
            .write()
            .insert(benutzername.to_string(), handle);
        if let Some(ref alt) = vorher {
            tracing::info!(
                benutzer = %benutzername,
                alte_verbindung = %alt.id(),
                "Bestehende Anmeldung ersetzt"
            );
        }
        vorher
    }

    pub fn nachschlagen(&self, benutzername: &str) -> Option<VerbindungsHandle> {
        self.eintraege.read().get(benutzername).cloned()
    }

    /// Entfernt alle Namen, die auf die Verbindung `id` zeigen
    ///
    /// Idempotent. Gibt die entfernten Namen zurueck.
    pub fn abmelden(&self, id: VerbindungsId) -> Vec<String> {
        let mut eintraege = self.eintraege.write();
        let namen: Vec<String> = eintraege
            .iter()
            .filter(|(_, h)| h.id() == id)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &namen {
            eintraege.remove(name);
        }
        namen
    }

    /// Momentaufnahme aller angemeldeten Benutzernamen (ohne Reihenfolge)
    pub fn benutzernamen(&self) -> Vec<String> {
        self.eintraege.read().keys().cloned().collect()
    }

    pub fn anzahl(&self) -> usize {
        self.eintraege.read().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hushline_protocol::{ChatPacket, Envelope};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn handle() -> (VerbindungsHandle, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(4);
        (VerbindungsHandle::neu(tx), rx)
    }

    fn als_menge(namen: Vec<String>) -> HashSet<String> {
        namen.into_iter().collect()
    }

    #[test]
    fn momentaufnahme_nach_abmeldung() {
        let registry = VerbindungsRegistry::neu();
        let (a, _ra) = handle();
        let (b, _rb) = handle();
        let (c, _rc) = handle();
        let b_id = b.id();

        registry.registrieren("a", a);
        registry.registrieren("b", b);
        registry.registrieren("c", c);
        registry.abmelden(b_id);

        let erwartet: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(als_menge(registry.benutzernamen()), erwartet);
    }

    #[test]
    fn abmelden_ist_idempotent() {
        let registry = VerbindungsRegistry::neu();
        let (a, _ra) = handle();
        let id = a.id();
        registry.registrieren("a", a);

        assert_eq!(registry.abmelden(id), vec!["a".to_string()]);
        assert!(registry.abmelden(id).is_empty());
        assert_eq!(registry.anzahl(), 0);
    }

    #[test]
    fn letzter_login_gewinnt() {
        let registry = VerbindungsRegistry::neu();
        let (alt, _r1) = handle();
        let (neu, _r2) = handle();
        let alt_id = alt.id();
        let neu_id = neu.id();

        assert!(registry.registrieren("alice", alt).is_none());
        let ersetzt = registry.registrieren("alice", neu).expect("alter Eintrag");
        assert_eq!(ersetzt.id(), alt_id);

        // Schliessen der alten Verbindung entfernt die neue Anmeldung nicht
        assert!(registry.abmelden(alt_id).is_empty());
        assert_eq!(registry.nachschlagen("alice").map(|h| h.id()), Some(neu_id));
    }

    #[test]
    fn verbindung_mit_mehreren_namen() {
        let registry = VerbindungsRegistry::neu();
        let (h, _r) = handle();
        let id = h.id();
        registry.registrieren("alice", h.clone());
        registry.registrieren("alias", h);

        let mut entfernt = registry.abmelden(id);
        entfernt.sort();
        assert_eq!(entfernt, vec!["alias".to_string(), "alice".to_string()]);
    }

    #[tokio::test]
    async fn senden_ueber_handle() {
        let registry = VerbindungsRegistry::neu();
        let (h, mut rx) = handle();
        registry.registrieren("bob", h);

        let envelope = Envelope::vom_client(
            Some("alice".into()),
            ChatPacket::nachricht("bob", vec![1, 2, 3]).into(),
        );
        registry
            .nachschlagen("bob")
            .expect("bob angemeldet")
            .senden(envelope.clone())
            .unwrap();
        assert_eq!(rx.recv().await, Some(envelope));
    }

    #[test]
    fn senden_an_geschlossene_queue_scheitert() {
        let (h, rx) = handle();
        drop(rx);
        let envelope = Envelope::vom_server(ChatPacket::nicht_zustellbar("x").into());
        assert!(matches!(h.senden(envelope), Err(SignalingError::VerbindungGeschlossen)));
    }

    #[test]
    fn volle_queue_wird_gemeldet() {
        let (h, _rx) = handle();
        for _ in 0..4 {
            h.senden(Envelope::vom_server(ChatPacket::nicht_zustellbar("x").into())).unwrap();
        }
        let envelope = Envelope::vom_server(ChatPacket::nicht_zustellbar("x").into());
        assert!(matches!(h.senden(envelope), Err(SignalingError::QueueVoll)));
    }

    #[tokio::test]
    async fn nebenlaeufige_registrierung() {
        let registry = Arc::new(VerbindungsRegistry::neu());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (h, _rx) = handle();
                let id = h.id();
                registry.registrieren(&format!("user{i}"), h);
                if i % 2 == 0 {
                    registry.abmelden(id);
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(registry.anzahl(), 16);
    }
}
