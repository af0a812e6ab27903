//! fluester-protocol – Nachrichtentypen des Nachrichtenkanals
//!
//! Dieses Crate definiert die JSON-Frames, die ueber den (externen)
//! Nachrichtenkanal zwischen zwei Endpunkten ausgetauscht werden:
//! Signaling fuer den Verbindungsaufbau eines Anrufs und die
//! oeffentlichen DH-Werte fuer die Schluesselvereinbarung.

pub mod kanal;
pub mod key_exchange;
pub mod signaling;

pub use kanal::Kanalnachricht;
pub use key_exchange::{PublicValueMessage, DH_PUBLIC_TYP};
pub use signaling::{IceCandidate, SignalingFrame};
