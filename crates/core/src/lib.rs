//! fluester-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Identifikationstypen und den globalen
//! Fehler-Enum bereit, die von allen anderen Fluester-Crates genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{FluesterError, Result};
pub use types::{ConversationId, UserId};
