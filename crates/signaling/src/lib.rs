//! fluester-signaling – Verhandlung direkter Audio-Anrufe
//!
//! Zwei Endpunkte tauschen ueber den (bereits authentifizierten)
//! Nachrichtenkanal Offer, Answer und ICE-Kandidaten aus. Die Medien-Engine
//! selbst steckt hinter den Traits in `peer`.
//!
//! ## Architektur
//!
//! ```text
//! Nachrichtenkanal --Eingehend--> CallRegistry (DashMap<UserId, SessionHandle>)
//!                                     |
//!                                     v
//!                           Sitzungs-Task (pro Anruf einer)
//!                                     |  State Machine: Idle -> ... -> Connected -> Closed
//!                                     v
//!                           SignalingSession --Ausgehend--> Nachrichtenkanal
//!                                     |
//!                                     +-- MediaDevices / PeerConnection / AudioSink
//! ```

pub mod actor;
pub mod error;
pub mod loopback;
pub mod peer;
pub mod registry;
pub mod session;

// Bequeme Re-Exporte
pub use actor::{SessionConfig, SessionHandle, STANDARD_LEERLAUF_TIMEOUT};
pub use error::{SignalingError, SignalingResult};
pub use peer::{
    AudioSink, Kollaborateure, MediaDevices, MediaStream, PeerConnection, PeerConnectionFactory,
    PeerEvent,
};
pub use registry::{CallRegistry, Eingehend};
pub use session::{Ausgehend, CallState, SignalingSession};
