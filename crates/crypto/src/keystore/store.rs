//! Secret-Store – Ablage der Sitzungsschluessel pro Unterhaltung
//!
//! Der Store ist ein externer Kollaborateur: er haelt pro
//! `ConversationId` genau einen Wert, den Schluessel als Hex-Text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fluester_core::ConversationId;

use crate::error::{CryptoError, CryptoResult};

/// Schluessel-Wert-Ablage fuer Sitzungsschluessel (Hex-Text)
pub trait SecretStore: Send {
    /// Liest den Wert einer Unterhaltung
    fn laden(&self, id: &ConversationId) -> CryptoResult<Option<String>>;

    /// Schreibt (oder ersetzt) den Wert einer Unterhaltung
    fn speichern(&mut self, id: &ConversationId, wert: String) -> CryptoResult<()>;

    /// Entfernt den Wert, gibt zurueck ob einer vorhanden war
    fn entfernen(&mut self, id: &ConversationId) -> CryptoResult<bool>;

    /// Entfernt alle Werte
    fn leeren(&mut self) -> CryptoResult<()>;
}

// ---------------------------------------------------------------------------
// InMemorySecretStore
// ---------------------------------------------------------------------------

/// Fluechtiger Store (Lebensdauer = Prozess)
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    eintraege: HashMap<ConversationId, String>,
}

impl InMemorySecretStore {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }
}

impl SecretStore for InMemorySecretStore {
    fn laden(&self, id: &ConversationId) -> CryptoResult<Option<String>> {
        Ok(self.eintraege.get(id).cloned())
    }

    fn speichern(&mut self, id: &ConversationId, wert: String) -> CryptoResult<()> {
        self.eintraege.insert(id.clone(), wert);
        Ok(())
    }

    fn entfernen(&mut self, id: &ConversationId) -> CryptoResult<bool> {
        Ok(self.eintraege.remove(id).is_some())
    }

    fn leeren(&mut self) -> CryptoResult<()> {
        self.eintraege.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileSecretStore
// ---------------------------------------------------------------------------

/// Persistenter Store als JSON-Datei (`{"conv:..": "<hex>", ...}`)
///
/// Jede Aenderung schreibt die komplette Datei neu (via Temp-Datei + rename).
#[derive(Debug)]
pub struct JsonFileSecretStore {
    pfad: PathBuf,
    eintraege: HashMap<String, String>,
}

impl JsonFileSecretStore {
    /// Oeffnet den Store; eine fehlende Datei ergibt einen leeren Store
    pub fn oeffnen(pfad: impl AsRef<Path>) -> CryptoResult<Self> {
        let pfad = pfad.as_ref().to_path_buf();
        let eintraege = match std::fs::read_to_string(&pfad) {
            Ok(inhalt) => serde_json::from_str(&inhalt).map_err(|e| {
                CryptoError::SecretStore(format!("'{}' nicht lesbar: {e}", pfad.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(pfad = %pfad.display(), "Schluesseldatei fehlt, starte leer");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { pfad, eintraege })
    }

    pub fn pfad(&self) -> &Path {
        &self.pfad
    }

    fn schreiben(&self) -> CryptoResult<()> {
        let inhalt = serde_json::to_string_pretty(&self.eintraege)
            .map_err(|e| CryptoError::SecretStore(e.to_string()))?;
        let tmp = self.pfad.with_extension("tmp");
        std::fs::write(&tmp, inhalt)?;
        std::fs::rename(&tmp, &self.pfad)?;
        Ok(())
    }
}

impl SecretStore for JsonFileSecretStore {
    fn laden(&self, id: &ConversationId) -> CryptoResult<Option<String>> {
        Ok(self.eintraege.get(id.as_str()).cloned())
    }

    fn speichern(&mut self, id: &ConversationId, wert: String) -> CryptoResult<()> {
        self.eintraege.insert(id.as_str().to_string(), wert);
        self.schreiben()
    }

    fn entfernen(&mut self, id: &ConversationId) -> CryptoResult<bool> {
        let vorhanden = self.eintraege.remove(id.as_str()).is_some();
        if vorhanden {
            self.schreiben()?;
        }
        Ok(vorhanden)
    }

    fn leeren(&mut self) -> CryptoResult<()> {
        self.eintraege.clear();
        self.schreiben()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluester_core::UserId;

    fn conv() -> ConversationId {
        ConversationId::zwischen(UserId::new(), UserId::new())
    }

    #[test]
    fn in_memory_speichern_und_laden() {
        let mut store = InMemorySecretStore::neu();
        let id = conv();
        assert_eq!(store.laden(&id).unwrap(), None);
        store.speichern(&id, "abcd".into()).unwrap();
        assert_eq!(store.laden(&id).unwrap().as_deref(), Some("abcd"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn in_memory_entfernen_und_leeren() {
        let mut store = InMemorySecretStore::neu();
        let (a, b) = (conv(), conv());
        store.speichern(&a, "01".into()).unwrap();
        store.speichern(&b, "02".into()).unwrap();
        assert!(store.entfernen(&a).unwrap());
        assert!(!store.entfernen(&a).unwrap());
        store.leeren().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn datei_store_ueberlebt_neu_oeffnen() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("schluessel.json");
        let id = conv();

        {
            let mut store = JsonFileSecretStore::oeffnen(&pfad).unwrap();
            store.speichern(&id, "deadbeef".into()).unwrap();
        }

        let store = JsonFileSecretStore::oeffnen(&pfad).unwrap();
        assert_eq!(store.laden(&id).unwrap().as_deref(), Some("deadbeef"));
        assert_eq!(store.pfad(), pfad.as_path());
    }

    #[test]
    fn datei_store_fehlende_datei_ist_leer() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSecretStore::oeffnen(dir.path().join("fehlt.json")).unwrap();
        assert_eq!(store.laden(&conv()).unwrap(), None);
    }

    #[test]
    fn datei_store_kaputte_datei() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("kaputt.json");
        std::fs::write(&pfad, "kein json").unwrap();
        assert!(matches!(
            JsonFileSecretStore::oeffnen(&pfad),
            Err(CryptoError::SecretStore(_))
        ));
    }

    #[test]
    fn datei_store_leeren() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("s.json");
        let id = conv();
        let mut store = JsonFileSecretStore::oeffnen(&pfad).unwrap();
        store.speichern(&id, "01".into()).unwrap();
        store.leeren().unwrap();

        let neu = JsonFileSecretStore::oeffnen(&pfad).unwrap();
        assert_eq!(neu.laden(&id).unwrap(), None);
    }
}
