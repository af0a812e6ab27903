//! In-Memory-Kollaborateure
//!
//! Ersetzen Mikrofon, Peer-Connection und Lautsprecher fuer Tests und die
//! Demo im Client. Jede Peer-Connection protokolliert ihre Aufrufe, damit
//! Tests Reihenfolge und Aufraeumen pruefen koennen.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fluester_protocol::IceCandidate;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::peer::{
    AudioSink, Kollaborateure, MediaDevices, MediaStream, PeerConnection, PeerConnectionFactory,
    PeerEvent,
};

// ---------------------------------------------------------------------------
// Medien
// ---------------------------------------------------------------------------

/// Simuliertes Mikrofon
#[derive(Debug, Default)]
pub struct LoopbackMedia {
    verweigern: AtomicBool,
    haengen: AtomicBool,
    erfasst: AtomicUsize,
    freigegeben: AtomicUsize,
}

impl LoopbackMedia {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Mikrofon das jeden Zugriff ablehnt
    pub fn verweigernd() -> Self {
        let media = Self::default();
        media.verweigern.store(true, Ordering::SeqCst);
        media
    }

    /// Mikrofon dessen Zugriff nie abgeschlossen wird
    pub fn haengend() -> Self {
        let media = Self::default();
        media.haengen.store(true, Ordering::SeqCst);
        media
    }

    pub fn erfasst(&self) -> usize {
        self.erfasst.load(Ordering::SeqCst)
    }

    pub fn freigegeben(&self) -> usize {
        self.freigegeben.load(Ordering::SeqCst)
    }

    /// Aktuell gehaltene Stroeme
    pub fn aktiv(&self) -> usize {
        self.erfasst().saturating_sub(self.freigegeben())
    }
}

#[async_trait]
impl MediaDevices for LoopbackMedia {
    async fn audio_erfassen(&self) -> SignalingResult<MediaStream> {
        if self.haengen.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.verweigern.load(Ordering::SeqCst) {
            return Err(SignalingError::MediaAcquisitionDenied(
                "Mikrofonzugriff abgelehnt".to_string(),
            ));
        }
        let n = self.erfasst.fetch_add(1, Ordering::SeqCst);
        Ok(MediaStream::neu(format!("mikrofon-{n}")))
    }

    fn freigeben(&self, _stream: &MediaStream) {
        self.freigegeben.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Peer-Connection
// ---------------------------------------------------------------------------

/// Aufrufprotokoll einer Loopback-Peer-Connection
#[derive(Debug, Default, Clone)]
pub struct PeerProtokoll {
    pub tracks: Vec<String>,
    pub lokal: Option<String>,
    pub remote: Option<String>,
    pub kandidaten: Vec<IceCandidate>,
    pub geschlossen: usize,
}

/// Peer-Connection ohne Netzwerk
///
/// `set_local_description` meldet einen Host-Kandidaten,
/// `set_remote_description` einen Remote-Track.
pub struct LoopbackPeerConnection {
    name: String,
    protokoll: Arc<Mutex<PeerProtokoll>>,
    events: mpsc::UnboundedSender<PeerEvent>,
    port: u16,
}

impl LoopbackPeerConnection {
    fn sdp(&self, art: &str) -> String {
        format!(
            "v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns={art}\r\nt=0 0\r\nm=audio {} UDP/TLS/RTP/SAVPF 111\r\na=rtpmap:111 opus/48000/2\r\n",
            self.name, self.port
        )
    }
}

#[async_trait]
impl PeerConnection for LoopbackPeerConnection {
    fn add_track(&mut self, stream: &MediaStream) -> SignalingResult<()> {
        self.protokoll.lock().tracks.push(stream.id.clone());
        Ok(())
    }

    async fn create_offer(&mut self) -> SignalingResult<String> {
        Ok(self.sdp("offer"))
    }

    async fn create_answer(&mut self) -> SignalingResult<String> {
        if self.protokoll.lock().remote.is_none() {
            return Err(SignalingError::peer("Antwort ohne Remote-Beschreibung"));
        }
        Ok(self.sdp("answer"))
    }

    async fn set_local_description(&mut self, sdp: &str) -> SignalingResult<()> {
        self.protokoll.lock().lokal = Some(sdp.to_string());
        let kandidat = IceCandidate {
            candidate: format!(
                "candidate:1 1 udp 2122260223 127.0.0.1 {} typ host",
                self.port
            ),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        };
        // Empfaenger weg heisst Sitzung bereits beendet
        let _ = self.events.send(PeerEvent::LocalCandidate(kandidat));
        Ok(())
    }

    async fn set_remote_description(&mut self, sdp: &str) -> SignalingResult<()> {
        if !sdp.starts_with("v=0") {
            return Err(SignalingError::peer("Ungueltige Session-Beschreibung"));
        }
        self.protokoll.lock().remote = Some(sdp.to_string());
        let _ = self
            .events
            .send(PeerEvent::RemoteTrack(MediaStream::neu(format!("remote-{}", self.name))));
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> SignalingResult<()> {
        let mut protokoll = self.protokoll.lock();
        if protokoll.remote.is_none() {
            return Err(SignalingError::peer("Kandidat vor Remote-Beschreibung"));
        }
        protokoll.kandidaten.push(candidate.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.protokoll.lock().geschlossen += 1;
    }
}

/// Erzeugt Loopback-Peer-Connections und behaelt deren Protokolle
#[derive(Debug)]
pub struct LoopbackPeerFactory {
    name: String,
    protokolle: Mutex<Vec<Arc<Mutex<PeerProtokoll>>>>,
    naechster_port: AtomicU32,
}

impl LoopbackPeerFactory {
    pub fn neu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protokolle: Mutex::new(Vec::new()),
            naechster_port: AtomicU32::new(50000),
        }
    }

    /// Schnappschuss aller bisher erstellten Verbindungen
    pub fn protokolle(&self) -> Vec<PeerProtokoll> {
        self.protokolle
            .lock()
            .iter()
            .map(|p| p.lock().clone())
            .collect()
    }

    pub fn letzte(&self) -> Option<PeerProtokoll> {
        self.protokolle.lock().last().map(|p| p.lock().clone())
    }

    pub fn anzahl(&self) -> usize {
        self.protokolle.lock().len()
    }
}

impl PeerConnectionFactory for LoopbackPeerFactory {
    fn erstellen(
        &self,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> SignalingResult<Box<dyn PeerConnection>> {
        let protokoll = Arc::new(Mutex::new(PeerProtokoll::default()));
        self.protokolle.lock().push(Arc::clone(&protokoll));
        let port = self.naechster_port.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackPeerConnection {
            name: self.name.clone(),
            protokoll,
            events,
            port: u16::try_from(port).unwrap_or(u16::MAX),
        }))
    }
}

// ---------------------------------------------------------------------------
// Audio-Ausgabe
// ---------------------------------------------------------------------------

/// Merkt sich angehaengte Remote-Stroeme
#[derive(Debug, Default)]
pub struct LoopbackAudioSink {
    angehaengt: Mutex<Vec<MediaStream>>,
    entfernt: AtomicUsize,
}

impl LoopbackAudioSink {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn angehaengt(&self) -> Vec<MediaStream> {
        self.angehaengt.lock().clone()
    }

    pub fn entfernt(&self) -> usize {
        self.entfernt.load(Ordering::SeqCst)
    }
}

impl AudioSink for LoopbackAudioSink {
    fn remote_anhaengen(&self, stream: &MediaStream) {
        self.angehaengt.lock().push(stream.clone());
    }

    fn remote_entfernen(&self) {
        self.entfernt.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Buendel
// ---------------------------------------------------------------------------

/// Konkrete Loopback-Instanzen hinter einem `Kollaborateure`-Buendel
#[derive(Debug, Clone)]
pub struct Loopback {
    pub media: Arc<LoopbackMedia>,
    pub peers: Arc<LoopbackPeerFactory>,
    pub audio: Arc<LoopbackAudioSink>,
}

impl Loopback {
    pub fn neu(name: impl Into<String>) -> Self {
        Self::mit_media(name, LoopbackMedia::neu())
    }

    pub fn mit_media(name: impl Into<String>, media: LoopbackMedia) -> Self {
        Self {
            media: Arc::new(media),
            peers: Arc::new(LoopbackPeerFactory::neu(name)),
            audio: Arc::new(LoopbackAudioSink::neu()),
        }
    }

    pub fn kollaborateure(&self) -> Kollaborateure {
        Kollaborateure {
            media: self.media.clone(),
            peers: self.peers.clone(),
            audio: self.audio.clone(),
        }
    }
}
