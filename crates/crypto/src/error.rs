//! Fehlertypen fuer das Kryptografie-Subsystem

use fluester_core::FluesterError;
use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Zufallsquelle des Betriebssystems nicht verfuegbar (fatal)
    #[error("Entropiequelle nicht verfuegbar: {0}")]
    EntropyUnavailable(String),

    /// Auth-Tag stimmt nicht (manipuliert, falscher Schluessel, abgeschnitten)
    #[error("Authentifizierung fehlgeschlagen: Nachricht manipuliert oder falscher Schluessel")]
    AuthenticationFailure,

    /// Umschlag fehlerhaft aufgebaut, wird vor der Entschluesselung abgelehnt
    #[error("Ungueltiger Umschlag: {0}")]
    MalformedEnvelope(String),

    #[error("Ungueltige Domain-Parameter: {0}")]
    UngueltigeParameter(String),

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Key-Exchange fehlgeschlagen: {0}")]
    KeyExchange(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Secret-Store-Fehler: {0}")]
    SecretStore(String),

    #[error("Hex-Dekodierung fehlgeschlagen: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    pub fn umschlag(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }
}

impl From<CryptoError> for FluesterError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AuthenticationFailure => FluesterError::Manipuliert,
            andere => FluesterError::Krypto(andere.to_string()),
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentifizierungsfehler_wird_zu_manipuliert() {
        let e: FluesterError = CryptoError::AuthenticationFailure.into();
        assert!(matches!(e, FluesterError::Manipuliert));
    }

    #[test]
    fn andere_fehler_behalten_text() {
        let e: FluesterError = CryptoError::umschlag("iv fehlt").into();
        assert!(e.to_string().contains("iv fehlt"));
    }
}
