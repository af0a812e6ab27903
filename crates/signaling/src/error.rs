//! Fehlertypen fuer das Signaling

use fluester_core::FluesterError;
use thiserror::Error;

use crate::session::CallState;

/// Fehlertyp fuer das Signaling
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Frame ohne passende Sitzung oder Peer-Connection
    #[error("Keine aktive Verbindung: {0}")]
    NoActiveConnection(String),

    /// Zugriff auf das Mikrofon verweigert
    #[error("Medienzugriff verweigert: {0}")]
    MediaAcquisitionDenied(String),

    /// Fehler der Peer-Connection (Beschreibung, Kandidat, Track)
    #[error("Peer-Connection-Fehler: {0}")]
    PeerConnection(String),

    /// Ereignis passt nicht zum aktuellen Zustand
    #[error("Ereignis '{ereignis}' im Zustand {zustand:?} nicht erlaubt")]
    UngueltigerZustand {
        zustand: CallState,
        ereignis: &'static str,
    },

    /// Protokollfehler (ungueltiges JSON, unbekannter Frame-Typ)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Eingangs-Queue der Sitzung voll
    #[error("Sitzung ueberlastet: {0}")]
    Ueberlastet(String),

    /// Ausgehende Queue geschlossen
    #[error("Senden fehlgeschlagen")]
    SendFehler,

    /// Sitzungs-Task laeuft nicht mehr
    #[error("Sitzung geschlossen")]
    Geschlossen,
}

impl SignalingError {
    pub fn peer(msg: impl Into<String>) -> Self {
        Self::PeerConnection(msg.into())
    }

    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Fehler die nur geloggt werden, der Frame wird verworfen
    pub fn ist_verwerfbar(&self) -> bool {
        matches!(
            self,
            Self::NoActiveConnection(_)
                | Self::Protokoll(_)
                | Self::UngueltigerZustand { .. }
                | Self::Ueberlastet(_)
        )
    }
}

impl From<serde_json::Error> for SignalingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protokoll(e.to_string())
    }
}

impl From<SignalingError> for FluesterError {
    fn from(e: SignalingError) -> Self {
        FluesterError::Signaling(e.to_string())
    }
}

/// Result-Typ fuer das Signaling
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verwerfbare_fehler() {
        assert!(SignalingError::NoActiveConnection("answer".into()).ist_verwerfbar());
        assert!(SignalingError::protokoll("kaputt").ist_verwerfbar());
        assert!(SignalingError::UngueltigerZustand {
            zustand: CallState::Closed,
            ereignis: "offer"
        }
        .ist_verwerfbar());
        assert!(SignalingError::Ueberlastet("peer".into()).ist_verwerfbar());
        assert!(!SignalingError::MediaAcquisitionDenied("nein".into()).ist_verwerfbar());
        assert!(!SignalingError::SendFehler.ist_verwerfbar());
    }

    #[test]
    fn zustandsfehler_anzeige() {
        let e = SignalingError::UngueltigerZustand {
            zustand: CallState::Idle,
            ereignis: "answer",
        };
        assert_eq!(e.to_string(), "Ereignis 'answer' im Zustand Idle nicht erlaubt");
    }
}
