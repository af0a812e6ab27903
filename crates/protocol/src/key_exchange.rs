//! Schluesselaustausch-Nachricht
//!
//! Traegt den oeffentlichen DH-Wert eines Endpunkts ueber denselben
//! Nachrichtenkanal wie die Signaling-Frames. Der Wert wird als
//! Hex-String ohne Praefix uebertragen.
//!
//! Eine Nachricht ist entweder eine Anfrage (`inReplyTo` fehlt) oder
//! die Antwort auf genau eine Anfrage. Die Antwort nennt den
//! oeffentlichen Wert der Anfrage, damit veraltete oder doppelt
//! zugestellte Antworten erkannt werden.
//!
//! ```text
//! {"type":"dh-public","from":"<uuid>","publicKey":"a1f3..."}
//! {"type":"dh-public","from":"<uuid>","publicKey":"07be...","inReplyTo":"a1f3..."}
//! ```

use fluester_core::UserId;
use serde::{Deserialize, Serialize};

/// Wert des `type`-Feldes
pub const DH_PUBLIC_TYP: &str = "dh-public";

/// Oeffentlicher DH-Wert eines Endpunkts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "dh-public", rename_all = "camelCase")]
pub struct PublicValueMessage {
    /// Absender des Wertes
    pub from: UserId,
    /// Oeffentlicher Wert (Hex, big-endian)
    pub public_key: String,
    /// Oeffentlicher Wert der beantworteten Anfrage
    #[serde(default, rename = "inReplyTo", skip_serializing_if = "Option::is_none")]
    pub antwort_auf: Option<String>,
}

impl PublicValueMessage {
    /// Anfrage: startet eine Vereinbarung
    pub fn neu(from: UserId, public_key: impl Into<String>) -> Self {
        Self {
            from,
            public_key: public_key.into(),
            antwort_auf: None,
        }
    }

    /// Antwort auf die Anfrage mit dem oeffentlichen Wert `anfrage`
    pub fn antwort(from: UserId, public_key: impl Into<String>, anfrage: impl Into<String>) -> Self {
        Self {
            from,
            public_key: public_key.into(),
            antwort_auf: Some(anfrage.into()),
        }
    }

    pub fn ist_antwort(&self) -> bool {
        self.antwort_auf.is_some()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
