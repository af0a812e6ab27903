//! # fluester-observability
//!
//! Structured Logging via tracing-subscriber (Text oder JSON), gesteuert
//! ueber Konfiguration und Umgebungsvariablen.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingEinstellungen, LoggingFehler};
