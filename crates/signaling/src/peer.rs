//! Externe Kollaborateure eines Anrufs
//!
//! Die eigentliche Medien-Engine (Audio-Capture, Peer-Connection, Playback)
//! liegt ausserhalb dieses Crates. Der Zustandsautomat spricht nur mit
//! diesen Traits.
//!
//! ```text
//! MediaDevices ---- audio_erfassen() ----> MediaStream (lokal)
//! PeerConnectionFactory -- erstellen(events) --> PeerConnection
//!     PeerConnection --- PeerEvent::LocalCandidate ---> Sitzung -> Frame
//!     PeerConnection --- PeerEvent::RemoteTrack ------> Sitzung -> AudioSink
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use fluester_protocol::IceCandidate;
use tokio::sync::mpsc;

use crate::error::SignalingResult;

/// Handle auf einen Medienstrom (lokal erfasst oder von der Gegenseite)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
}

impl MediaStream {
    pub fn neu(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Asynchrone Ereignisse der Peer-Connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// Ein lokal gefundener Kandidat (in Fundreihenfolge)
    LocalCandidate(IceCandidate),
    /// Die Gegenseite liefert einen Audio-Track
    RemoteTrack(MediaStream),
}

/// Zugriff auf das lokale Aufnahmegeraet
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Erfasst lokales Audio; `MediaAcquisitionDenied` wenn verweigert
    async fn audio_erfassen(&self) -> SignalingResult<MediaStream>;

    /// Stoppt den Strom und gibt das Geraet frei
    fn freigeben(&self, stream: &MediaStream);
}

/// Handle auf eine Peer-Connection der Medien-Engine
#[async_trait]
pub trait PeerConnection: Send {
    fn add_track(&mut self, stream: &MediaStream) -> SignalingResult<()>;

    async fn create_offer(&mut self) -> SignalingResult<String>;

    async fn create_answer(&mut self) -> SignalingResult<String>;

    async fn set_local_description(&mut self, sdp: &str) -> SignalingResult<()>;

    async fn set_remote_description(&mut self, sdp: &str) -> SignalingResult<()>;

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> SignalingResult<()>;

    /// Schliesst die Verbindung (wird genau einmal aufgerufen)
    fn close(&mut self);
}

/// Erzeugt Peer-Connections; Ereignisse laufen ueber `events`
pub trait PeerConnectionFactory: Send + Sync {
    fn erstellen(
        &self,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> SignalingResult<Box<dyn PeerConnection>>;
}

/// Ausgabe fuer den Audio-Strom der Gegenseite
pub trait AudioSink: Send + Sync {
    fn remote_anhaengen(&self, stream: &MediaStream);

    fn remote_entfernen(&self);
}

/// Alle Kollaborateure einer Sitzung
#[derive(Clone)]
pub struct Kollaborateure {
    pub media: Arc<dyn MediaDevices>,
    pub peers: Arc<dyn PeerConnectionFactory>,
    pub audio: Arc<dyn AudioSink>,
}

impl std::fmt::Debug for Kollaborateure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kollaborateure").finish_non_exhaustive()
    }
}
