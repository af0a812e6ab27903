//! Sitzungsschluessel-Cache pro Unterhaltung
//!
//! Serialisiert alle Zugriffe auf den Secret-Store ueber einen Mutex:
//! zwei nahezu gleichzeitige Erstzugriffe leiten den Schluessel nur
//! einmal ab, der zweite erhaelt den gespeicherten Wert.

use parking_lot::Mutex;

use fluester_core::ConversationId;

use crate::error::{CryptoError, CryptoResult};
use crate::keystore::store::SecretStore;
use crate::types::SessionKey;

/// Verwaltet die Sitzungsschluessel aller Unterhaltungen
pub struct SessionKeyCache {
    store: Mutex<Box<dyn SecretStore>>,
}

impl SessionKeyCache {
    pub fn neu(store: impl SecretStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    /// Liefert den Schluessel der Unterhaltung, leitet ihn bei Bedarf ab
    ///
    /// `ableiten` wird nur aufgerufen wenn noch kein Schluessel gespeichert
    /// ist. Der Lock wird waehrend der Ableitung gehalten.
    pub fn schluessel_fuer<F>(&self, id: &ConversationId, ableiten: F) -> CryptoResult<SessionKey>
    where
        F: FnOnce() -> CryptoResult<SessionKey>,
    {
        let mut store = self.store.lock();

        if let Some(hex) = store.laden(id)? {
            return Self::dekodieren(id, &hex);
        }

        let key = ableiten()?;
        store.speichern(id, key.to_hex())?;
        tracing::debug!(conversation = %id, "Sitzungsschluessel abgeleitet und gespeichert");
        Ok(key)
    }

    /// Liefert den gespeicherten Schluessel ohne abzuleiten
    pub fn gespeichert(&self, id: &ConversationId) -> CryptoResult<Option<SessionKey>> {
        let store = self.store.lock();
        store
            .laden(id)?
            .map(|hex| Self::dekodieren(id, &hex))
            .transpose()
    }

    /// Ersetzt den Schluessel einer Unterhaltung
    pub fn setzen(&self, id: &ConversationId, key: &SessionKey) -> CryptoResult<()> {
        self.store.lock().speichern(id, key.to_hex())
    }

    /// Verwirft den Schluessel einer Unterhaltung
    pub fn invalidieren(&self, id: &ConversationId) -> CryptoResult<bool> {
        let entfernt = self.store.lock().entfernen(id)?;
        if entfernt {
            tracing::info!(conversation = %id, "Sitzungsschluessel verworfen");
        }
        Ok(entfernt)
    }

    /// Verwirft alle Schluessel
    pub fn leeren(&self) -> CryptoResult<()> {
        self.store.lock().leeren()?;
        tracing::info!("Schluessel-Cache geleert");
        Ok(())
    }

    fn dekodieren(id: &ConversationId, hex: &str) -> CryptoResult<SessionKey> {
        SessionKey::from_hex(hex).map_err(|e| {
            CryptoError::SecretStore(format!("Eintrag fuer {id} beschaedigt: {e}"))
        })
    }
}

impl std::fmt::Debug for SessionKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::store::InMemorySecretStore;
    use fluester_core::UserId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn conv() -> ConversationId {
        ConversationId::zwischen(UserId::new(), UserId::new())
    }

    fn zufalls_key() -> CryptoResult<SessionKey> {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Ok(SessionKey::new(bytes))
    }

    #[test]
    fn erster_zugriff_leitet_ab() {
        let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
        let id = conv();
        let key = cache.schluessel_fuer(&id, || Ok(SessionKey::new([1; 32]))).unwrap();
        assert_eq!(key, SessionKey::new([1; 32]));
        assert_eq!(cache.gespeichert(&id).unwrap(), Some(key));
    }

    #[test]
    fn zweiter_zugriff_leitet_nicht_erneut_ab() {
        let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
        let id = conv();
        let erster = cache.schluessel_fuer(&id, zufalls_key).unwrap();
        let zweiter = cache
            .schluessel_fuer(&id, || panic!("darf nicht erneut ableiten"))
            .unwrap();
        assert_eq!(erster, zweiter);
    }

    #[test]
    fn fehler_bei_ableitung_wird_nicht_gespeichert() {
        let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
        let id = conv();
        let result = cache.schluessel_fuer(&id, || Err(CryptoError::KeyExchange("x".into())));
        assert!(result.is_err());
        assert_eq!(cache.gespeichert(&id).unwrap(), None);
    }

    #[test]
    fn gleichzeitige_erstzugriffe_leiten_einmal_ab() {
        let cache = Arc::new(SessionKeyCache::neu(InMemorySecretStore::neu()));
        let zaehler = Arc::new(AtomicUsize::new(0));
        let id = conv();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let zaehler = Arc::clone(&zaehler);
                let id = id.clone();
                std::thread::spawn(move || {
                    cache
                        .schluessel_fuer(&id, || {
                            zaehler.fetch_add(1, Ordering::SeqCst);
                            zufalls_key()
                        })
                        .unwrap()
                })
            })
            .collect();

        let keys: Vec<SessionKey> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(zaehler.load(Ordering::SeqCst), 1);
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn invalidieren_erzwingt_neue_ableitung() {
        let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
        let id = conv();
        cache.schluessel_fuer(&id, || Ok(SessionKey::new([1; 32]))).unwrap();
        assert!(cache.invalidieren(&id).unwrap());
        let neu = cache.schluessel_fuer(&id, || Ok(SessionKey::new([2; 32]))).unwrap();
        assert_eq!(neu, SessionKey::new([2; 32]));
    }

    #[test]
    fn leeren_entfernt_alles() {
        let cache = SessionKeyCache::neu(InMemorySecretStore::neu());
        let (a, b) = (conv(), conv());
        cache.setzen(&a, &SessionKey::new([1; 32])).unwrap();
        cache.setzen(&b, &SessionKey::new([2; 32])).unwrap();
        cache.leeren().unwrap();
        assert_eq!(cache.gespeichert(&a).unwrap(), None);
        assert_eq!(cache.gespeichert(&b).unwrap(), None);
    }

    #[test]
    fn beschaedigter_eintrag_wird_gemeldet() {
        let mut store = InMemorySecretStore::neu();
        let id = conv();
        store.speichern(&id, "kein-hex".into()).unwrap();
        let cache = SessionKeyCache::neu(store);
        assert!(matches!(
            cache.gespeichert(&id),
            Err(CryptoError::SecretStore(_))
        ));
    }
}
