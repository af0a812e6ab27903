//! # fluester-crypto
//!
//! Ende-zu-Ende Verschluesselung fuer Fluester-Chats.
//!
//! ## Module
//! - `dh` - Modulare Exponentiation, Domain-Parameter, DH-Schluesselvereinbarung
//! - `e2e` - Session-Key-Ableitung und AES-256-GCM Umschlaege
//! - `keystore` - Secret-Store und Sitzungsschluessel-Cache
//! - `types` - Gemeinsame Typen (SessionKey, EncryptedEnvelope)
//! - `error` - Fehlertypen

pub mod dh;
pub mod e2e;
pub mod error;
pub mod keystore;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use types::{EncryptedEnvelope, SessionKey};

pub use dh::{
    compute_shared_secret, generate_key_pair, mod_exp, parse_public_hex, DhGruppe,
    DomainParameters, KeyPair, SharedSecret,
};
pub use e2e::{
    decrypt, decrypt_from_wire, derive_from_shared_secret, derive_from_tokens, encrypt,
    encrypt_to_wire,
};
pub use keystore::{InMemorySecretStore, JsonFileSecretStore, SecretStore, SessionKeyCache};
