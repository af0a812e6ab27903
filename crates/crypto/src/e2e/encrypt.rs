//! Chat-Payload Verschluesselung (AES-256-GCM)
//!
//! Jeder Aufruf erzeugt eine frische 12-Byte Nonce aus dem OS-Zufall.
//! Der Auth-Tag wird vom Ciphertext getrennt im Umschlag abgelegt.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, SessionKey, IV_LAENGE, TAG_LAENGE};

/// Verschluesselt einen UTF-8 Klartext mit dem Sitzungsschluessel
pub fn encrypt(plaintext: &str, key: &SessionKey) -> CryptoResult<EncryptedEnvelope> {
    let mut iv = [0u8; IV_LAENGE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let mut ciphertext = cipher
        .encrypt(AesNonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    // aes-gcm haengt den Tag an
    let auth_tag = ciphertext.split_off(ciphertext.len() - TAG_LAENGE);

    Ok(EncryptedEnvelope {
        iv: iv.to_vec(),
        ciphertext,
        auth_tag,
    })
}

/// Verschluesselt und serialisiert direkt ins Wire-Format
pub fn encrypt_to_wire(plaintext: &str, key: &SessionKey) -> CryptoResult<String> {
    encrypt(plaintext, key)?.to_wire()
}
