//! Chat-Payload Entschluesselung (AES-256-GCM)
//!
//! Der Umschlag wird vollstaendig geprueft bevor entschluesselt wird.
//! Ein ungueltiger Auth-Tag ergibt immer `AuthenticationFailure`, nie
//! einen (teilweisen) Klartext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, SessionKey};

/// Entschluesselt einen Umschlag mit dem Sitzungsschluessel
pub fn decrypt(envelope: &EncryptedEnvelope, key: &SessionKey) -> CryptoResult<String> {
    envelope.pruefen()?;

    let mut daten = Vec::with_capacity(envelope.ciphertext.len() + envelope.auth_tag.len());
    daten.extend_from_slice(&envelope.ciphertext);
    daten.extend_from_slice(&envelope.auth_tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let klartext = cipher
        .decrypt(AesNonce::from_slice(&envelope.iv), daten.as_slice())
        .map_err(|_| {
            tracing::warn!(laenge = envelope.ciphertext.len(), "Auth-Tag ungueltig – Nachricht verworfen");
            CryptoError::AuthenticationFailure
        })?;

    String::from_utf8(klartext).map_err(|_| CryptoError::umschlag("Klartext ist kein UTF-8"))
}

/// Entschluesselt direkt aus dem Wire-Format
pub fn decrypt_from_wire(wire: &str, key: &SessionKey) -> CryptoResult<String> {
    let envelope = EncryptedEnvelope::from_wire(wire)?;
    decrypt(&envelope, key)
}
