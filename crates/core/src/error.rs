//! Fehlertypen fuer Fluester
//!
//! Zentraler Fehler-Enum fuer die Endpunkt-Ebene. Die Fach-Crates
//! (Krypto, Signaling) definieren eigene Fehler und konvertieren via `From`.

use thiserror::Error;

/// Globaler Result-Alias fuer Fluester
pub type Result<T> = std::result::Result<T, FluesterError>;

/// Alle Fehler die an der Endpunkt-Schnittstelle sichtbar werden
#[derive(Debug, Error)]
pub enum FluesterError {
    // --- Kryptografie ---
    #[error("Kryptografie-Fehler: {0}")]
    Krypto(String),

    /// Nachricht wurde manipuliert oder mit falschem Schluessel verschluesselt
    #[error("Nachricht manipuliert oder nicht entschluesselbar")]
    Manipuliert,

    // --- Signaling ---
    #[error("Signaling-Fehler: {0}")]
    Signaling(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FluesterError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Kryptografische Fehler werden nie automatisch wiederholt
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::Signaling(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = FluesterError::Krypto("Schluessel fehlt".into());
        assert_eq!(e.to_string(), "Kryptografie-Fehler: Schluessel fehlt");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(FluesterError::Signaling("Kanal".into()).ist_wiederholbar());
        assert!(!FluesterError::Manipuliert.ist_wiederholbar());
        assert!(!FluesterError::Krypto("x".into()).ist_wiederholbar());
    }
}
