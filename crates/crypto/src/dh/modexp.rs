//! Modulare Exponentiation auf beliebig grossen Ganzzahlen
//!
//! Binaeres Square-and-Multiply, Bits des Exponenten vom niederwertigsten
//! zum hoechstwertigen. Nicht konstant-zeitig: fuer produktive Sicherheit
//! sollte eine konstant-zeitige Primitive eingesetzt werden.

use num_bigint::BigUint;

use crate::error::{CryptoError, CryptoResult};

/// Berechnet `base^exponent mod modulus` (`modulus > 1`)
pub fn mod_exp(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> CryptoResult<BigUint> {
    if modulus.bits() < 2 {
        return Err(CryptoError::UngueltigeParameter(
            "Modulus muss groesser als 1 sein".to_string(),
        ));
    }

    let mut ergebnis = BigUint::from(1u8);
    let mut basis = base % modulus;
    let mut exp = exponent.clone();

    while exp.bits() > 0 {
        if exp.bit(0) {
            ergebnis = (&ergebnis * &basis) % modulus;
        }
        basis = (&basis * &basis) % modulus;
        exp >>= 1u32;
    }

    Ok(ergebnis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn kleine_bekannte_werte() {
        assert_eq!(mod_exp(&big(5), &big(3), &big(13)).unwrap(), big(8));
        assert_eq!(mod_exp(&big(2), &big(10), &big(1000)).unwrap(), big(24));
        assert_eq!(mod_exp(&big(7), &big(1), &big(5)).unwrap(), big(2));
    }

    #[test]
    fn exponent_null_ergibt_eins() {
        assert_eq!(mod_exp(&big(123), &big(0), &big(7)).unwrap(), big(1));
    }

    #[test]
    fn basis_groesser_als_modulus() {
        assert_eq!(mod_exp(&big(20), &big(2), &big(7)).unwrap(), big(1));
    }

    #[test]
    fn modulus_eins_oder_null_abgelehnt() {
        assert!(matches!(
            mod_exp(&big(2), &big(3), &big(1)),
            Err(CryptoError::UngueltigeParameter(_))
        ));
        assert!(mod_exp(&big(2), &big(3), &big(0)).is_err());
    }

    #[test]
    fn grosse_operanden() {
        // 128-Bit Modulus aus der Legacy-Gruppe
        let p = BigUint::parse_bytes(b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFF61", 16).unwrap();
        let e = BigUint::parse_bytes(b"DEADBEEFCAFEBABE0123456789ABCDEF42", 16).unwrap();
        assert_eq!(mod_exp(&big(5), &e, &p).unwrap(), big(5).modpow(&e, &p));
    }

    proptest! {
        #[test]
        fn stimmt_mit_modpow_ueberein(
            basis in proptest::collection::vec(any::<u8>(), 1..40),
            exp in proptest::collection::vec(any::<u8>(), 0..40),
            modulus in proptest::collection::vec(any::<u8>(), 1..40),
        ) {
            let b = BigUint::from_bytes_be(&basis);
            let e = BigUint::from_bytes_be(&exp);
            let m = BigUint::from_bytes_be(&modulus);
            prop_assume!(m.bits() >= 2);
            prop_assert_eq!(mod_exp(&b, &e, &m).unwrap(), b.modpow(&e, &m));
        }
    }
}
