//! Integration-Tests fuer beide Verzeichnis-Backends
//!
//! Jeder Fall laeuft gegen SQLite (In-Memory) und das Speicher-Backend,
//! damit beide dieselbe Semantik behalten.

use hushline_core::BenutzerHash;
use hushline_db::{DatabaseConfig, PublicKeyDirectory, SpeicherVerzeichnis, SqliteVerzeichnis};

async fn backends() -> Vec<(&'static str, Box<dyn PublicKeyDirectory>)> {
    let sqlite = SqliteVerzeichnis::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden");
    vec![
        ("sqlite", Box::new(sqlite)),
        ("speicher", Box::new(SpeicherVerzeichnis::neu())),
    ]
}

fn hash(s: &str) -> BenutzerHash {
    BenutzerHash::new(s)
}

#[tokio::test]
async fn eintrag_anlegen_und_laden() {
    for (name, v) in backends().await {
        v.put(&hash("alice"), &[1, 2, 3]).await.expect(name);

        let key = v.get(&hash("alice")).await.expect(name);
        assert_eq!(key.as_deref(), Some(&[1u8, 2, 3][..]), "{name}");
        assert_eq!(v.anzahl().await.unwrap(), 1, "{name}");
    }
}

#[tokio::test]
async fn unbekannter_hash_liefert_none() {
    for (name, v) in backends().await {
        assert!(v.get(&hash("niemand")).await.expect(name).is_none(), "{name}");
    }
}

#[tokio::test]
async fn gleicher_key_unter_anderem_namen_ist_konflikt() {
    for (name, v) in backends().await {
        v.put(&hash("alice"), &[9; 8]).await.expect(name);

        let fehler = v
            .put(&hash("mallory"), &[9; 8])
            .await
            .expect_err("Doppelter Key muss abgelehnt werden");
        assert!(fehler.ist_konflikt(), "{name}: {fehler}");
        assert!(v.get(&hash("mallory")).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn erster_schreiber_gewinnt() {
    for (name, v) in backends().await {
        v.put(&hash("alice"), &[1; 8]).await.expect(name);

        let fehler = v
            .put(&hash("alice"), &[2; 8])
            .await
            .expect_err("Zweite Registrierung muss abgelehnt werden");
        assert!(fehler.ist_konflikt(), "{name}: {fehler}");

        // Urspruenglicher Key bleibt erhalten
        let key = v.get(&hash("alice")).await.unwrap();
        assert_eq!(key, Some(vec![1; 8]), "{name}");
        assert_eq!(v.anzahl().await.unwrap(), 1, "{name}");
    }
}

#[tokio::test]
async fn sqlite_datei_bleibt_erhalten() {
    let pfad = std::env::temp_dir().join(format!("hushline-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&pfad);
    let config = DatabaseConfig {
        url: format!("sqlite://{}", pfad.display()),
        max_verbindungen: 1,
        sqlite_wal: false,
    };

    {
        let v = SqliteVerzeichnis::oeffnen(&config).await.unwrap();
        v.put(&hash("alice"), &[5; 8]).await.unwrap();
        v.pool().close().await;
    }

    let v = SqliteVerzeichnis::oeffnen(&config).await.unwrap();
    assert_eq!(v.get(&hash("alice")).await.unwrap(), Some(vec![5; 8]));
    v.pool().close().await;
    let _ = std::fs::remove_file(&pfad);
}
