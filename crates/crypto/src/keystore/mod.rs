//! Ablage der Sitzungsschluessel
//!
//! - `store` – `SecretStore`-Trait mit In-Memory- und JSON-Datei-Backend
//! - `cache` – serialisierter Get-or-Derive-Zugriff pro Unterhaltung

pub mod cache;
pub mod store;

pub use cache::SessionKeyCache;
pub use store::{InMemorySecretStore, JsonFileSecretStore, SecretStore};
