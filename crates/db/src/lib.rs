//! hushline-db – Public-Key-Verzeichnis
//!
//! Das Verzeichnis bildet gehashte Benutzernamen auf RSA-Moduli ab. Die
//! Schnittstelle ist bewusst klein (`get` / `put`), damit der Server nicht
//! am Speicher-Backend haengt.
//!
//! ## Backends
//! - [`SqliteVerzeichnis`] – persistent via sqlx
//! - [`SpeicherVerzeichnis`] – In-Memory, fuer Tests und Entwicklung
//!
//! Beide Backends haben identische Semantik: der erste Schreiber gewinnt,
//! ein bereits registrierter Hash oder ein bereits vergebener Public Key
//! fuehrt zu [`DirectoryError::Konflikt`].

pub mod error;
pub mod repository;
pub mod speicher;
pub mod sqlite;

pub use error::{DirectoryError, DirectoryResult};
pub use repository::{DatabaseConfig, PublicKeyDirectory};
pub use speicher::SpeicherVerzeichnis;
pub use sqlite::SqliteVerzeichnis;
