//! E2E Verschluesselung (End-to-End)
//!
//! Client <-> Client Verschluesselung von Chat-Nachrichten. Der
//! Nachrichtenkanal transportiert nur Umschlaege und kann den Inhalt
//! nicht lesen.
//!
//! ## Ablauf
//! 1. DH-Schluesselvereinbarung (`crate::dh`)
//! 2. Ableitung des Sitzungsschluessels (`derive`)
//! 3. Zwischenspeichern pro Unterhaltung (`crate::keystore`)
//! 4. Nachrichten mit AES-256-GCM versiegeln / oeffnen

pub mod decrypt;
pub mod derive;
pub mod encrypt;

pub use decrypt::{decrypt, decrypt_from_wire};
pub use derive::{derive_from_shared_secret, derive_from_tokens};
pub use encrypt::{encrypt, encrypt_to_wire};
