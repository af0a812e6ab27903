//! Verteilung eingehender Kanal-Texte
//!
//! Signaling-Frames und DH-Werte teilen sich einen Nachrichtenkanal.
//! Das `type`-Feld entscheidet, welcher Nachrichtentyp geparst wird.

use serde::Deserialize;

use crate::key_exchange::{PublicValueMessage, DH_PUBLIC_TYP};
use crate::signaling::SignalingFrame;

/// Eine Nachricht des gemeinsamen Kanals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kanalnachricht {
    Schluessel(PublicValueMessage),
    Signaling(SignalingFrame),
}

#[derive(Deserialize)]
struct Kopf {
    #[serde(rename = "type")]
    typ: String,
}

impl Kanalnachricht {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let kopf: Kopf = serde_json::from_str(text)?;
        if kopf.typ == DH_PUBLIC_TYP {
            PublicValueMessage::from_json(text).map(Self::Schluessel)
        } else {
            SignalingFrame::from_json(text).map(Self::Signaling)
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Schluessel(msg) => msg.to_json(),
            Self::Signaling(frame) => frame.to_json(),
        }
    }
}
