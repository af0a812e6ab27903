//! # fluester-client
//!
//! Client-Kern fuer Fluester: Konfiguration, Endpunkt (Schluessel,
//! verschluesselte Nachrichten, Anrufe) und die Loopback-Demo.

pub mod config;
pub mod demo;
pub mod endpunkt;

pub use config::ClientConfig;
pub use endpunkt::Endpunkt;
