//! Domain-Parameter (Generator g, Modulus p)
//!
//! Beide Endpunkte muessen identische Parameter verwenden, sonst weichen
//! die abgeleiteten Geheimnisse stillschweigend voneinander ab. Es gibt
//! keine Aushandlung der Parameter.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// Legacy-Modulus (128 Bit). Nur fuer Tests und Kompatibilitaet.
const KLEIN_P_HEX: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFF61";

/// RFC 3526, Gruppe 14 (2048-Bit MODP)
const MODP_2048_P_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

/// Vordefinierte DH-Gruppen (Konfigurationswert)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhGruppe {
    /// g=5, 128-Bit Modulus – kryptografisch unzureichend
    Klein,
    /// g=2, RFC 3526 Gruppe 14
    #[default]
    Modp2048,
}

impl DhGruppe {
    pub fn parameter(self) -> DomainParameters {
        match self {
            Self::Klein => DomainParameters::klein(),
            Self::Modp2048 => DomainParameters::modp_2048(),
        }
    }
}

/// Generator und Modulus einer DH-Gruppe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParameters {
    generator: BigUint,
    modulus: BigUint,
}

impl DomainParameters {
    /// Erstellt eigene Parameter (`p > 1`, `2 <= g <= p-1`)
    pub fn neu(generator: BigUint, modulus: BigUint) -> CryptoResult<Self> {
        if modulus.bits() < 2 {
            return Err(CryptoError::UngueltigeParameter(
                "Modulus muss groesser als 1 sein".to_string(),
            ));
        }
        if generator < BigUint::from(2u8) || generator >= modulus {
            return Err(CryptoError::UngueltigeParameter(
                "Generator ausserhalb von [2, p-1]".to_string(),
            ));
        }
        Ok(Self { generator, modulus })
    }

    /// Legacy-Gruppe g=5, p=0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF61
    pub fn klein() -> Self {
        Self::aus_hex(5, KLEIN_P_HEX)
    }

    /// RFC 3526 Gruppe 14, g=2
    pub fn modp_2048() -> Self {
        Self::aus_hex(2, MODP_2048_P_HEX)
    }

    fn aus_hex(generator: u32, p_hex: &str) -> Self {
        // Konstanten sind gueltiges Hex
        let modulus = BigUint::parse_bytes(p_hex.as_bytes(), 16).unwrap_or_default();
        Self {
            generator: BigUint::from(generator),
            modulus,
        }
    }

    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Anzahl Hex-Zeichen fuer Werte modulo p (Bitbreite des Modulus / 4)
    pub fn hex_breite(&self) -> usize {
        self.modulus.bits().div_ceil(4) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn klein_parameter() {
        let params = DomainParameters::klein();
        assert_eq!(params.generator(), &BigUint::from(5u8));
        assert_eq!(params.modulus().bits(), 128);
        assert_eq!(params.hex_breite(), 32);
    }

    #[test]
    fn modp_2048_parameter() {
        let params = DomainParameters::modp_2048();
        assert_eq!(params.generator(), &BigUint::from(2u8));
        assert_eq!(params.modulus().bits(), 2048);
        assert_eq!(params.hex_breite(), 512);
    }

    #[test]
    fn gruppe_aus_konfigurationswert() {
        let g: DhGruppe = serde_json::from_str("\"klein\"").unwrap();
        assert_eq!(g.parameter(), DomainParameters::klein());
        assert_eq!(DhGruppe::default().parameter(), DomainParameters::modp_2048());
    }

    #[test]
    fn ungueltige_parameter_abgelehnt() {
        let p = BigUint::from(23u8);
        assert!(DomainParameters::neu(BigUint::from(5u8), p.clone()).is_ok());
        assert!(DomainParameters::neu(BigUint::from(1u8), p.clone()).is_err());
        assert!(DomainParameters::neu(BigUint::from(23u8), p).is_err());
        assert!(DomainParameters::neu(BigUint::from(2u8), BigUint::from(1u8)).is_err());
    }
}
