//! Gemeinsame Identifikationstypen fuer Fluester
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Stabile Kennung einer Zweier-Unterhaltung
///
/// Wird aus den beiden Teilnehmern abgeleitet und ist unabhaengig von
/// deren Reihenfolge. Dient als Schluessel im Secret-Store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Leitet die Kennung aus zwei Teilnehmern ab (sortiert)
    pub fn zwischen(a: UserId, b: UserId) -> Self {
        let (erster, zweiter) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("conv:{}:{}", erster.0, zweiter.0))
    }

    /// Uebernimmt eine bereits gespeicherte Kennung
    pub fn aus_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn user_id_ist_serde_kompatibel() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        // transparent: nur der UUID-String
        assert_eq!(json, format!("\"{}\"", uid.0));
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn conversation_id_unabhaengig_von_reihenfolge() {
        let a = UserId::new();
        let b = UserId::new();
        assert_eq!(ConversationId::zwischen(a, b), ConversationId::zwischen(b, a));
    }

    #[test]
    fn conversation_id_verschieden_fuer_andere_paare() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        assert_ne!(ConversationId::zwischen(a, b), ConversationId::zwischen(a, c));
    }

    #[test]
    fn conversation_id_display() {
        let a = UserId(Uuid::nil());
        let id = ConversationId::zwischen(a, a);
        assert!(id.to_string().starts_with("conv:"));
        assert_eq!(ConversationId::aus_string(id.as_str()), id);
    }
}
