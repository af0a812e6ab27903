//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// Laenge eines AES-256-GCM Schluessels
pub const SCHLUESSEL_LAENGE: usize = 32;
/// Laenge der GCM-Nonce (IV)
pub const IV_LAENGE: usize = 12;
/// Laenge des GCM Auth-Tags
pub const TAG_LAENGE: usize = 16;

/// Symmetrischer Sitzungsschluessel (32 Bytes, wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SCHLUESSEL_LAENGE]);

impl SessionKey {
    pub fn new(bytes: [u8; SCHLUESSEL_LAENGE]) -> Self {
        Self(bytes)
    }

    /// Uebernimmt Schluesselmaterial beliebiger Herkunft (Laenge wird geprueft)
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SCHLUESSEL_LAENGE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::UngueltigeSchluesselLaenge {
                    erwartet: SCHLUESSEL_LAENGE,
                    erhalten: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SCHLUESSEL_LAENGE] {
        &self.0
    }

    /// Textkodierung fuer den Secret-Store
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED] {} bytes)", self.0.len())
    }
}

/// Verschluesselter Payload: IV + Ciphertext + Auth-Tag
///
/// Wire-Format (JSON, alle Felder Base64):
/// ```text
/// {"iv":"...","ciphertext":"...","authTag":"..."}
/// ```
/// Beim Einlesen wird `encrypted` als Alias fuer `ciphertext` akzeptiert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    #[serde(with = "b64", alias = "encrypted")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub auth_tag: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Serialisiert den Umschlag als transportierbaren String
    pub fn to_wire(&self) -> CryptoResult<String> {
        serde_json::to_string(self).map_err(|e| CryptoError::Verschluesselung(e.to_string()))
    }

    /// Parst und prueft einen Umschlag aus dem Wire-Format
    pub fn from_wire(text: &str) -> CryptoResult<Self> {
        let envelope: Self =
            serde_json::from_str(text).map_err(|e| CryptoError::umschlag(e.to_string()))?;
        envelope.pruefen()?;
        Ok(envelope)
    }

    /// Prueft die Feldlaengen (vor jeder Entschluesselung)
    pub fn pruefen(&self) -> CryptoResult<()> {
        if self.iv.len() != IV_LAENGE {
            return Err(CryptoError::umschlag(format!(
                "IV-Laenge {} statt {}",
                self.iv.len(),
                IV_LAENGE
            )));
        }
        if self.auth_tag.len() != TAG_LAENGE {
            return Err(CryptoError::umschlag(format!(
                "Auth-Tag-Laenge {} statt {}",
                self.auth_tag.len(),
                TAG_LAENGE
            )));
        }
        Ok(())
    }
}

/// Base64-Felder fuer serde
mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beispiel() -> EncryptedEnvelope {
        EncryptedEnvelope {
            iv: vec![1; IV_LAENGE],
            ciphertext: b"geheim".to_vec(),
            auth_tag: vec![2; TAG_LAENGE],
        }
    }

    #[test]
    fn session_key_debug_ist_redacted() {
        let key = SessionKey::new([0xAB; 32]);
        let text = format!("{:?}", key);
        assert!(text.contains("REDACTED"));
        assert!(!text.contains("ab"));
    }

    #[test]
    fn session_key_hex() {
        let key = SessionKey::new([7; 32]);
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(SessionKey::from_hex(&hex).unwrap(), key);
    }

    #[test]
    fn session_key_falsche_laenge() {
        let result = SessionKey::from_slice(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::UngueltigeSchluesselLaenge { erwartet: 32, erhalten: 16 })
        ));
        assert!(SessionKey::from_hex("zz").is_err());
    }

    #[test]
    fn umschlag_wire_felder() {
        let wire = beispiel().to_wire().unwrap();
        let wert: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(wert["ciphertext"], "Z2VoZWlt");
        assert!(wert["iv"].is_string());
        assert!(wert["authTag"].is_string());
        assert_eq!(EncryptedEnvelope::from_wire(&wire).unwrap(), beispiel());
    }

    #[test]
    fn umschlag_akzeptiert_encrypted_alias() {
        let text = r#"{"iv":"AQEBAQEBAQEBAQEB","encrypted":"Z2VoZWlt","authTag":"AgICAgICAgICAgICAgICAg=="}"#;
        let env = EncryptedEnvelope::from_wire(text).unwrap();
        assert_eq!(env.ciphertext, b"geheim");
    }

    #[test]
    fn umschlag_fehlende_felder() {
        let result = EncryptedEnvelope::from_wire(r#"{"iv":"AQEBAQEBAQEBAQEB"}"#);
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn umschlag_falsche_laengen() {
        let mut env = beispiel();
        env.iv.pop();
        assert!(matches!(env.pruefen(), Err(CryptoError::MalformedEnvelope(_))));

        let mut env = beispiel();
        env.auth_tag.truncate(8);
        let wire = env.to_wire().unwrap();
        assert!(matches!(
            EncryptedEnvelope::from_wire(&wire),
            Err(CryptoError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn umschlag_kaputtes_base64() {
        let text = r#"{"iv":"!!!","ciphertext":"","authTag":""}"#;
        assert!(matches!(
            EncryptedEnvelope::from_wire(text),
            Err(CryptoError::MalformedEnvelope(_))
        ));
    }
}
