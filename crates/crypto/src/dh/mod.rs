//! Diffie-Hellman ueber MODP-Gruppen
//!
//! - `modexp` – Square-and-Multiply auf `BigUint`
//! - `params` – Domain-Parameter und vordefinierte Gruppen
//! - `key_agreement` – Schluesselpaare und gemeinsames Geheimnis

pub mod key_agreement;
pub mod modexp;
pub mod params;

pub use key_agreement::{
    compute_shared_secret, generate_key_pair, parse_public_hex, KeyPair, SharedSecret,
};
pub use modexp::mod_exp;
pub use params::{DhGruppe, DomainParameters};
