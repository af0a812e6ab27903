//! Anruf-Registry
//!
//! Ordnet jedem Gegenueber hoechstens eine laufende Sitzung zu und verteilt
//! eingehende Frames. Fehlerhafte Frames werden geloggt und verworfen, die
//! Registry selbst laeuft weiter.
//!
//! Frames werden ohne Warten zugestellt: eine blockierte Sitzung haelt den
//! Nachrichtenkanal fuer andere Gegenueber nicht auf. Geschlossene
//! Sitzungen (auch durch Leerlauf) werden beim Anlegen neuer Sitzungen
//! entfernt.

use dashmap::DashMap;
use fluester_core::UserId;
use fluester_protocol::SignalingFrame;
use tokio::sync::mpsc;

use crate::actor::{SessionConfig, SessionHandle};
use crate::error::{SignalingError, SignalingResult};
use crate::peer::Kollaborateure;
use crate::session::{Ausgehend, CallState};

/// Ein roher eingehender Frame vom Nachrichtenkanal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eingehend {
    pub von: UserId,
    pub text: String,
}

/// Verwaltet alle Anrufe eines Endpunkts
#[derive(Debug)]
pub struct CallRegistry {
    sitzungen: DashMap<UserId, SessionHandle>,
    kollaborateure: Kollaborateure,
    config: SessionConfig,
    ausgang: mpsc::Sender<Ausgehend>,
}

impl CallRegistry {
    pub fn neu(
        kollaborateure: Kollaborateure,
        config: SessionConfig,
        ausgang: mpsc::Sender<Ausgehend>,
    ) -> Self {
        Self {
            sitzungen: DashMap::new(),
            kollaborateure,
            config,
            ausgang,
        }
    }

    /// Laufende (nicht geschlossene) Sitzung mit `peer`
    pub fn sitzung(&self, peer: &UserId) -> Option<SessionHandle> {
        self.sitzungen
            .get(peer)
            .filter(|h| h.zustand() != CallState::Closed)
            .map(|h| h.clone())
    }

    /// Ruft `peer` an
    pub async fn anrufen(&self, peer: UserId) -> SignalingResult<SessionHandle> {
        let handle = self.sitzung_holen_oder_erstellen(peer);
        handle.start_call().await?;
        Ok(handle)
    }

    /// Nimmt einen angekuendigten Anruf von `peer` an
    pub async fn annehmen(&self, peer: UserId) -> SignalingResult<SessionHandle> {
        let handle = self.sitzung_holen_oder_erstellen(peer);
        handle.accept_call().await?;
        Ok(handle)
    }

    /// Beendet den Anruf mit `peer` (idempotent)
    pub async fn auflegen(&self, peer: &UserId) {
        if let Some((_, handle)) = self.sitzungen.remove(peer) {
            handle.end_call().await;
            tracing::info!(peer = %peer, "Aufgelegt");
        }
    }

    /// Verteilt einen Frame von `von`
    ///
    /// `answer` ohne laufende Sitzung ergibt `NoActiveConnection`; alle
    /// anderen Frames legen bei Bedarf eine neue Sitzung an.
    pub async fn eingang(&self, von: UserId, frame: SignalingFrame) -> SignalingResult<()> {
        let handle = match (self.sitzung(&von), &frame) {
            (Some(handle), _) => handle,
            (None, SignalingFrame::Answer { .. }) => {
                tracing::warn!(peer = %von, "answer ohne laufenden Anruf verworfen");
                return Err(SignalingError::NoActiveConnection(format!(
                    "kein Anruf mit {von}"
                )));
            }
            (None, _) => self.sitzung_holen_oder_erstellen(von),
        };
        handle.frame_anbieten(frame).map_err(|e| {
            if let SignalingError::Ueberlastet(grund) = &e {
                tracing::warn!(peer = %von, grund = %grund, "Frame verworfen");
            }
            e
        })
    }

    /// Wie `eingang`, aber mit dem rohen JSON-Text
    pub async fn eingang_text(&self, von: UserId, text: &str) -> SignalingResult<()> {
        let frame = SignalingFrame::from_json(text).map_err(|e| {
            tracing::warn!(peer = %von, fehler = %e, "Ungueltiger Signaling-Frame verworfen");
            SignalingError::from(e)
        })?;
        self.eingang(von, frame).await
    }

    /// Bedient den Nachrichtenkanal bis er geschlossen wird
    ///
    /// Danach werden alle Anrufe beendet.
    pub async fn bedienen(&self, mut eingang: mpsc::Receiver<Eingehend>) {
        while let Some(Eingehend { von, text }) = eingang.recv().await {
            if let Err(e) = self.eingang_text(von, &text).await {
                tracing::debug!(peer = %von, fehler = %e, "Eingehender Frame nicht zugestellt");
            }
        }
        tracing::info!("Nachrichtenkanal geschlossen");
        self.alle_beenden().await;
    }

    /// Beendet alle Anrufe
    pub async fn alle_beenden(&self) {
        let peers: Vec<UserId> = self.sitzungen.iter().map(|e| *e.key()).collect();
        for peer in peers {
            self.auflegen(&peer).await;
        }
    }

    /// Entfernt geschlossene Sitzungen
    pub fn aufraeumen(&self) -> usize {
        let vorher = self.sitzungen.len();
        self.sitzungen.retain(|_, h| h.zustand() != CallState::Closed);
        vorher - self.sitzungen.len()
    }

    pub fn aktive_anrufe(&self) -> usize {
        self.sitzungen
            .iter()
            .filter(|e| e.value().zustand() != CallState::Closed)
            .count()
    }

    fn sitzung_holen_oder_erstellen(&self, peer: UserId) -> SessionHandle {
        if let Some(handle) = self.sitzung(&peer) {
            return handle;
        }
        let entfernt = self.aufraeumen();
        if entfernt > 0 {
            tracing::debug!(entfernt, "Geschlossene Sitzungen entfernt");
        }

        self.sitzungen
            .entry(peer)
            .or_insert_with(|| {
                tracing::debug!(peer = %peer, "Neue Sitzung");
                let (handle, _task) = SessionHandle::spawnen(
                    peer,
                    self.config,
                    self.kollaborateure.clone(),
                    self.ausgang.clone(),
                );
                handle
            })
            .clone()
    }
}
