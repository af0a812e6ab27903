//! Ableitung des symmetrischen Sitzungsschluessels
//!
//! Zwei Wege:
//! - **DH**: Geheimnis als Hex (auf Modulus-Breite aufgefuellt) -> SHA-256
//!   -> 32 Byte Schluessel.
//! - **Token**: zwei oeffentliche Tokens der Gegenseiten werden sortiert,
//!   zeichenweise permutiert, verkettet und gehasht. Die ersten 32 Zeichen
//!   des Hex-Digests bilden den Schluessel.
//!
//! Die Permutation im Token-Weg wird aus dem sortierten Token-Paar geseedet,
//! damit beide Endpunkte unabhaengig von der Aufrufreihenfolge denselben
//! Schluessel erhalten.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::dh::{DomainParameters, SharedSecret};
use crate::error::{CryptoError, CryptoResult};
use crate::types::{SessionKey, SCHLUESSEL_LAENGE};

/// DH-Weg: SHA-256 ueber die aufgefuellte Hex-Darstellung des Geheimnisses
pub fn derive_from_shared_secret(secret: &SharedSecret, params: &DomainParameters) -> SessionKey {
    let hex = secret.als_hex(params.hex_breite());
    let digest: [u8; SCHLUESSEL_LAENGE] = Sha256::digest(hex.as_bytes()).into();
    SessionKey::new(digest)
}

/// Token-Weg: reihenfolgeunabhaengig ueber zwei oeffentliche Tokens
pub fn derive_from_tokens(token_a: &str, token_b: &str) -> CryptoResult<SessionKey> {
    if token_a.is_empty() || token_b.is_empty() {
        return Err(CryptoError::KeyExchange("Leeres Token".to_string()));
    }

    let (erster, zweiter) = if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };

    let mut seed_hasher = Sha256::new();
    seed_hasher.update(erster.as_bytes());
    seed_hasher.update([0u8]);
    seed_hasher.update(zweiter.as_bytes());
    let mut rng = StdRng::from_seed(seed_hasher.finalize().into());

    let mut kombiniert = mischen(erster, &mut rng);
    kombiniert.push_str(&mischen(zweiter, &mut rng));

    let digest_hex = hex::encode(Sha256::digest(kombiniert.as_bytes()));
    SessionKey::from_slice(&digest_hex.as_bytes()[..SCHLUESSEL_LAENGE])
}

fn mischen(token: &str, rng: &mut StdRng) -> String {
    let mut zeichen: Vec<char> = token.chars().collect();
    zeichen.shuffle(rng);
    zeichen.into_iter().collect()
}
