//! Diffie-Hellman Schluesselvereinbarung ueber einer MODP-Gruppe
//!
//! Ablauf:
//! 1. Jeder Endpunkt erzeugt mit `generate_key_pair` ein ephemeres Paar
//! 2. Die oeffentlichen Werte werden ueber den Nachrichtenkanal getauscht
//! 3. `KeyPair::compute_shared_secret` liefert auf beiden Seiten denselben Wert
//!
//! Der private Schluessel wird genau einmal verwendet und danach verworfen.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::dh::modexp::mod_exp;
use crate::dh::params::DomainParameters;
use crate::error::{CryptoError, CryptoResult};

/// Anzahl Zufallsbytes fuer den privaten Schluessel
const PRIVAT_LAENGE: usize = 32;

/// Gemeinsames Geheimnis (einmalig zur Ableitung eines SessionKeys)
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(BigUint);

impl SharedSecret {
    pub fn wert(&self) -> &BigUint {
        &self.0
    }

    /// Hex-Darstellung, links mit Nullen auf `breite` Zeichen aufgefuellt
    pub fn als_hex(&self, breite: usize) -> String {
        format!("{:0>breite$}", self.0.to_str_radix(16), breite = breite)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED] {} bits)", self.0.bits())
    }
}

/// Ephemeres DH-Schluesselpaar
pub struct KeyPair {
    private_key: Option<BigUint>,
    /// Oeffentlicher Wert `g^x mod p`
    pub public_key: BigUint,
}

impl KeyPair {
    /// Oeffentlicher Wert als Hex (fuer `PublicValueMessage`)
    pub fn public_hex(&self) -> String {
        self.public_key.to_str_radix(16)
    }

    /// Wurde der private Schluessel bereits verbraucht?
    pub fn ist_verbraucht(&self) -> bool {
        self.private_key.is_none()
    }

    /// Berechnet das gemeinsame Geheimnis und verwirft den privaten Schluessel
    pub fn compute_shared_secret(
        &mut self,
        peer_public_key: &BigUint,
        params: &DomainParameters,
    ) -> CryptoResult<SharedSecret> {
        let private_key = self
            .private_key
            .take()
            .ok_or_else(|| CryptoError::KeyExchange("Privater Schluessel bereits verwendet".to_string()))?;
        compute_shared_secret(&private_key, peer_public_key, params)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_hex())
            .finish()
    }
}

/// Erzeugt ein frisches Schluesselpaar aus 32 Bytes OS-Zufall
///
/// Schlaegt nur fehl wenn die Entropiequelle nicht verfuegbar ist. Es gibt
/// keinen Rueckfall auf eine schwaechere Quelle.
pub fn generate_key_pair(params: &DomainParameters) -> CryptoResult<KeyPair> {
    let mut zufall = [0u8; PRIVAT_LAENGE];
    OsRng
        .try_fill_bytes(&mut zufall)
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;

    let private_key = BigUint::from_bytes_be(&zufall);
    zufall.iter_mut().for_each(|b| *b = 0);

    let public_key = mod_exp(params.generator(), &private_key, params.modulus())?;
    tracing::debug!(bits = params.modulus().bits(), "DH-Schluesselpaar erzeugt");

    Ok(KeyPair {
        private_key: Some(private_key),
        public_key,
    })
}

/// `peer_public_key ^ private_key mod p`
///
/// Oeffentliche Werte ausserhalb von `[2, p-2]` werden abgelehnt.
pub fn compute_shared_secret(
    private_key: &BigUint,
    peer_public_key: &BigUint,
    params: &DomainParameters,
) -> CryptoResult<SharedSecret> {
    let p_minus_2 = params.modulus() - BigUint::from(2u8);
    if *peer_public_key < BigUint::from(2u8) || *peer_public_key > p_minus_2 {
        return Err(CryptoError::UngueltigeParameter(
            "Oeffentlicher Wert der Gegenseite ausserhalb von [2, p-2]".to_string(),
        ));
    }
    let wert = mod_exp(peer_public_key, private_key, params.modulus())?;
    Ok(SharedSecret(wert))
}

/// Parst einen oeffentlichen Wert aus seiner Hex-Darstellung
pub fn parse_public_hex(text: &str) -> CryptoResult<BigUint> {
    BigUint::parse_bytes(text.trim().as_bytes(), 16).ok_or_else(|| {
        CryptoError::KeyExchange("Oeffentlicher Wert ist kein gueltiges Hex".to_string())
    })
}
