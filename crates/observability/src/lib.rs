//! # hushline-observability
//!
//! Structured Logging via tracing-subscriber, Text- oder JSON-Ausgabe.
//! Level und Format kommen aus der Konfiguration und koennen per
//! `HL_LOG_LEVEL` / `HL_LOG_FORMAT` ueberschrieben werden.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingConfig, LoggingError};
