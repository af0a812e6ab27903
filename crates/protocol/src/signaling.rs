//! Signaling-Frames fuer den Anruf-Aufbau
//!
//! Tagged Union ueber das Feld `type`:
//!
//! ```text
//! {"type":"offer","sdp":"..."}
//! {"type":"answer","sdp":"..."}
//! {"type":"ice-candidate","candidate":{"candidate":"...","sdpMid":"0","sdpMLineIndex":0}}
//! {"type":"callAccepted","toUserId":"<uuid>"}
//! ```

use fluester_core::UserId;
use serde::{Deserialize, Serialize};

/// Ein vom Verbindungsaufbau gefundener Netzwerkpfad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// Kandidaten-Zeile (`candidate:...`)
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn neu(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// Signaling-Nachricht zwischen zwei Endpunkten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalingFrame {
    /// Lokale Session-Beschreibung des Anrufers
    #[serde(rename = "offer")]
    Offer { sdp: String },

    /// Antwort-Beschreibung des Angerufenen
    #[serde(rename = "answer")]
    Answer { sdp: String },

    /// Ein ICE-Kandidat der Gegenseite
    #[serde(rename = "ice-candidate")]
    IceCandidate { candidate: IceCandidate },

    /// Der Angerufene hat den Anruf angenommen
    #[serde(rename = "callAccepted", rename_all = "camelCase")]
    CallAccepted { to_user_id: UserId },
}

impl SignalingFrame {
    /// Parst einen Frame aus dem JSON-Text des Nachrichtenkanals
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialisiert den Frame fuer den Nachrichtenkanal
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wert des `type`-Feldes (fuer Logging)
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::CallAccepted { .. } => "callAccepted",
        }
    }
}
