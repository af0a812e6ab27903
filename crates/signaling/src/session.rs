//! Signaling-Sitzung – Zustandsautomat eines Anrufs
//!
//! Eine Sitzung pro aktivem oder ausstehendem Anruf. Sie besitzt das
//! Peer-Connection-Handle und die Medienstroeme und wird nur von genau
//! einem Task (siehe `actor`) bedient.
//!
//! ## State Machine
//! ```text
//! Anrufer:     Idle -> LocalOffering -> AwaitingAnswer -> Connected -> Closed
//! Angerufener: Idle -> RemoteOffered -> Answering      -> Connected -> Closed
//! ```
//!
//! ICE-Kandidaten die eintreffen bevor eine Remote-Beschreibung gesetzt
//! ist, werden in einer begrenzten Queue gepuffert und danach angewendet.

use std::collections::VecDeque;

use fluester_core::UserId;
use fluester_protocol::{IceCandidate, SignalingFrame};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{SignalingError, SignalingResult};
use crate::peer::{Kollaborateure, MediaStream, PeerConnection, PeerEvent};

/// Standardgroesse der Queue fuer fruehe ICE-Kandidaten
pub const STANDARD_KANDIDATEN_PUFFER: usize = 32;

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Verhandlungszustand eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Noch keine Peer-Connection
    Idle,
    /// Lokales Angebot wird erstellt
    LocalOffering,
    /// Angebot gesendet, warte auf Antwort
    AwaitingAnswer,
    /// Angebot der Gegenseite empfangen
    RemoteOffered,
    /// Antwort wird erstellt
    Answering,
    /// Beide Beschreibungen gesetzt
    Connected,
    /// Beendet (terminal)
    Closed,
}

/// Ein ausgehender Frame mit Empfaenger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ausgehend {
    pub an: UserId,
    pub frame: SignalingFrame,
}

// ---------------------------------------------------------------------------
// SignalingSession
// ---------------------------------------------------------------------------

/// Zustandsautomat fuer die Verhandlung eines direkten Audio-Anrufs
pub struct SignalingSession {
    call_id: Uuid,
    peer_id: UserId,
    zustand: CallState,
    kollaborateure: Kollaborateure,
    verbindung: Option<Box<dyn PeerConnection>>,
    /// Remote-Beschreibung auf `verbindung` gesetzt
    remote_gesetzt: bool,
    lokaler_strom: Option<MediaStream>,
    remote_strom: Option<MediaStream>,
    ausgang: mpsc::Sender<Ausgehend>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    wartend: VecDeque<IceCandidate>,
    max_wartend: usize,
    verworfen: u64,
}

impl SignalingSession {
    /// Erstellt eine Sitzung im Zustand `Idle`
    ///
    /// Gibt zusaetzlich den Empfaenger fuer Ereignisse der Peer-Connection
    /// zurueck; der besitzende Task muss diese an `handle_peer_event` geben.
    pub fn neu(
        peer_id: UserId,
        kollaborateure: Kollaborateure,
        ausgang: mpsc::Sender<Ausgehend>,
        max_wartend: usize,
    ) -> (Self, mpsc::UnboundedReceiver<PeerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            call_id: Uuid::new_v4(),
            peer_id,
            zustand: CallState::Idle,
            kollaborateure,
            verbindung: None,
            remote_gesetzt: false,
            lokaler_strom: None,
            remote_strom: None,
            ausgang,
            events_tx,
            wartend: VecDeque::new(),
            max_wartend,
            verworfen: 0,
        };
        (session, events_rx)
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn peer_id(&self) -> UserId {
        self.peer_id
    }

    pub fn zustand(&self) -> CallState {
        self.zustand
    }

    pub fn hat_verbindung(&self) -> bool {
        self.verbindung.is_some()
    }

    /// Anzahl gepufferter, noch nicht angewendeter Kandidaten
    pub fn wartende_kandidaten(&self) -> usize {
        self.wartend.len()
    }

    /// Anzahl verworfener Kandidaten (Pufferueberlauf, nach Anrufende)
    pub fn verworfene_kandidaten(&self) -> u64 {
        self.verworfen
    }

    // -----------------------------------------------------------------------
    // Lokale Ereignisse
    // -----------------------------------------------------------------------

    /// Startet einen Anruf: Audio erfassen, Angebot erstellen und senden
    pub async fn start_call(&mut self) -> SignalingResult<()> {
        self.erwarte(CallState::Idle, "startCall")?;
        self.zustand = CallState::LocalOffering;

        match self.angebot_erstellen().await {
            Ok(sdp) => {
                self.zustand = CallState::AwaitingAnswer;
                tracing::info!(call_id = %self.call_id, peer = %self.peer_id, "Angebot erstellt");
                self.senden(SignalingFrame::Offer { sdp }).await
            }
            Err(e) => {
                self.zuruecksetzen();
                Err(e)
            }
        }
    }

    /// Nimmt einen angekuendigten Anruf an (sendet `callAccepted`)
    pub async fn accept_call(&mut self) -> SignalingResult<()> {
        self.erwarte(CallState::Idle, "acceptCall")?;
        self.senden(SignalingFrame::CallAccepted {
            to_user_id: self.peer_id,
        })
        .await
    }

    /// Beendet den Anruf und gibt alle Ressourcen frei (idempotent)
    pub fn end_call(&mut self) {
        if self.zustand == CallState::Closed {
            return;
        }
        self.ressourcen_freigeben();
        let verworfen = self.wartend.len();
        self.wartend.clear();
        self.verworfen += verworfen as u64;
        self.zustand = CallState::Closed;
        tracing::info!(call_id = %self.call_id, peer = %self.peer_id, "Anruf beendet");
    }

    // -----------------------------------------------------------------------
    // Eingehende Frames
    // -----------------------------------------------------------------------

    /// Verarbeitet einen Frame der Gegenseite
    pub async fn handle_frame(&mut self, frame: SignalingFrame) -> SignalingResult<()> {
        tracing::debug!(
            call_id = %self.call_id,
            typ = frame.typ(),
            zustand = ?self.zustand,
            "Frame empfangen"
        );

        match frame {
            SignalingFrame::Offer { sdp } => self.angebot_beantworten(&sdp).await,
            SignalingFrame::Answer { sdp } => self.antwort_anwenden(&sdp).await,
            SignalingFrame::IceCandidate { candidate } => self.kandidat_empfangen(candidate).await,
            SignalingFrame::CallAccepted { .. } => self.annahme_empfangen().await,
        }
    }

    /// Verarbeitet ein Ereignis der Peer-Connection
    pub async fn handle_peer_event(&mut self, event: PeerEvent) -> SignalingResult<()> {
        // Ereignisse einer bereits abgebauten Verbindung
        if matches!(self.zustand, CallState::Idle | CallState::Closed) {
            tracing::debug!(call_id = %self.call_id, ?event, "Peer-Ereignis ohne Verbindung ignoriert");
            return Ok(());
        }

        match event {
            PeerEvent::LocalCandidate(candidate) => {
                self.senden(SignalingFrame::IceCandidate { candidate }).await
            }
            PeerEvent::RemoteTrack(strom) => {
                tracing::info!(call_id = %self.call_id, stream = %strom.id, "Remote-Audio verbunden");
                self.kollaborateure.audio.remote_anhaengen(&strom);
                self.remote_strom = Some(strom);
                Ok(())
            }
        }
    }

    async fn angebot_beantworten(&mut self, angebot: &str) -> SignalingResult<()> {
        self.erwarte(CallState::Idle, "offer")?;
        self.zustand = CallState::RemoteOffered;

        match self.antwort_erstellen(angebot).await {
            Ok(sdp) => {
                self.zustand = CallState::Connected;
                tracing::info!(call_id = %self.call_id, peer = %self.peer_id, "Angebot beantwortet");
                self.senden(SignalingFrame::Answer { sdp }).await
            }
            Err(e) => {
                self.zuruecksetzen();
                Err(e)
            }
        }
    }

    async fn antwort_anwenden(&mut self, antwort: &str) -> SignalingResult<()> {
        match self.zustand {
            CallState::AwaitingAnswer => {}
            _ if self.verbindung.is_none() => {
                return Err(SignalingError::NoActiveConnection(
                    "answer ohne Peer-Connection".to_string(),
                ))
            }
            zustand => {
                return Err(SignalingError::UngueltigerZustand {
                    zustand,
                    ereignis: "answer",
                })
            }
        }

        self.verbindung()?.set_remote_description(antwort).await?;
        self.remote_gesetzt = true;
        self.zustand = CallState::Connected;
        tracing::info!(call_id = %self.call_id, peer = %self.peer_id, "Antwort angewendet");
        self.kandidaten_anwenden().await
    }

    async fn kandidat_empfangen(&mut self, candidate: IceCandidate) -> SignalingResult<()> {
        if self.zustand == CallState::Closed {
            self.verworfen += 1;
            tracing::warn!(call_id = %self.call_id, "ICE-Kandidat nach Anrufende verworfen");
            return Err(SignalingError::NoActiveConnection(
                "ice-candidate nach Anrufende".to_string(),
            ));
        }

        if self.remote_gesetzt {
            return self.verbindung()?.add_ice_candidate(&candidate).await;
        }

        self.puffern(candidate);
        Ok(())
    }

    async fn annahme_empfangen(&mut self) -> SignalingResult<()> {
        // Der Angerufene hat angenommen: Anrufer erstellt jetzt das Angebot
        if self.zustand != CallState::Idle {
            return Err(SignalingError::UngueltigerZustand {
                zustand: self.zustand,
                ereignis: "callAccepted",
            });
        }
        self.start_call().await
    }

    // -----------------------------------------------------------------------
    // Verhandlung
    // -----------------------------------------------------------------------

    async fn angebot_erstellen(&mut self) -> SignalingResult<String> {
        let strom = self.kollaborateure.media.audio_erfassen().await?;
        self.lokaler_strom = Some(strom.clone());

        let verbindung = self.kollaborateure.peers.erstellen(self.events_tx.clone())?;
        self.verbindung = Some(verbindung);

        self.verbindung()?.add_track(&strom)?;
        let sdp = self.verbindung()?.create_offer().await?;
        self.verbindung()?.set_local_description(&sdp).await?;
        Ok(sdp)
    }

    async fn antwort_erstellen(&mut self, angebot: &str) -> SignalingResult<String> {
        let verbindung = self.kollaborateure.peers.erstellen(self.events_tx.clone())?;
        self.verbindung = Some(verbindung);

        let strom = self.kollaborateure.media.audio_erfassen().await?;
        self.lokaler_strom = Some(strom.clone());

        self.verbindung()?.add_track(&strom)?;
        self.verbindung()?.set_remote_description(angebot).await?;
        self.remote_gesetzt = true;
        self.zustand = CallState::Answering;
        self.kandidaten_anwenden().await?;

        let sdp = self.verbindung()?.create_answer().await?;
        self.verbindung()?.set_local_description(&sdp).await?;
        Ok(sdp)
    }

    fn puffern(&mut self, candidate: IceCandidate) {
        if self.max_wartend == 0 {
            self.verworfen += 1;
            tracing::warn!(call_id = %self.call_id, "Kein Kandidaten-Puffer – Kandidat verworfen");
            return;
        }
        if self.wartend.len() >= self.max_wartend {
            self.wartend.pop_front();
            self.verworfen += 1;
            tracing::warn!(
                call_id = %self.call_id,
                max = self.max_wartend,
                "Kandidaten-Puffer voll – aeltester Kandidat verworfen"
            );
        }
        self.wartend.push_back(candidate);
        tracing::debug!(
            call_id = %self.call_id,
            wartend = self.wartend.len(),
            "ICE-Kandidat gepuffert"
        );
    }

    async fn kandidaten_anwenden(&mut self) -> SignalingResult<()> {
        while let Some(candidate) = self.wartend.pop_front() {
            if let Err(e) = self.verbindung()?.add_ice_candidate(&candidate).await {
                self.verworfen += 1;
                tracing::warn!(call_id = %self.call_id, fehler = %e, "Gepufferter Kandidat abgelehnt");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Hilfsfunktionen
    // -----------------------------------------------------------------------

    fn verbindung(&mut self) -> SignalingResult<&mut Box<dyn PeerConnection>> {
        self.verbindung
            .as_mut()
            .ok_or_else(|| SignalingError::NoActiveConnection("keine Peer-Connection".to_string()))
    }

    fn erwarte(&self, zustand: CallState, ereignis: &'static str) -> SignalingResult<()> {
        if self.zustand == zustand {
            Ok(())
        } else {
            Err(SignalingError::UngueltigerZustand {
                zustand: self.zustand,
                ereignis,
            })
        }
    }

    /// Borgt `self` nicht ueber den Await-Punkt (Sitzung ist nicht `Sync`)
    fn senden(
        &self,
        frame: SignalingFrame,
    ) -> impl std::future::Future<Output = SignalingResult<()>> + Send + 'static {
        tracing::debug!(call_id = %self.call_id, typ = frame.typ(), "Frame senden");
        let ausgang = self.ausgang.clone();
        let an = self.peer_id;
        async move {
            ausgang
                .send(Ausgehend { an, frame })
                .await
                .map_err(|_| SignalingError::SendFehler)
        }
    }

    fn ressourcen_freigeben(&mut self) {
        if let Some(mut verbindung) = self.verbindung.take() {
            verbindung.close();
        }
        if let Some(strom) = self.lokaler_strom.take() {
            self.kollaborateure.media.freigeben(&strom);
        }
        if self.remote_strom.take().is_some() {
            self.kollaborateure.audio.remote_entfernen();
        }
        self.remote_gesetzt = false;
    }

    /// Fehlgeschlagener Aufbau: zurueck nach `Idle`, kein Frame gesendet
    fn zuruecksetzen(&mut self) {
        self.ressourcen_freigeben();
        self.wartend.clear();
        self.zustand = CallState::Idle;
        tracing::warn!(call_id = %self.call_id, "Anrufaufbau abgebrochen");
    }
}

impl Drop for SignalingSession {
    fn drop(&mut self) {
        self.end_call();
    }
}

impl std::fmt::Debug for SignalingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingSession")
            .field("call_id", &self.call_id)
            .field("peer_id", &self.peer_id)
            .field("zustand", &self.zustand)
            .field("wartend", &self.wartend.len())
            .finish_non_exhaustive()
    }
}
