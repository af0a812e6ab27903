//! Sitzungs-Task
//!
//! Jede `SignalingSession` laeuft in genau einem Tokio-Task. Befehle,
//! eingehende Frames und Peer-Ereignisse werden dort nacheinander
//! verarbeitet; von aussen spricht man nur ueber `SessionHandle`.
//!
//! Waehrend ein Schritt wartet (z.B. auf das Mikrofon), bleibt die
//! Befehls-Queue offen: `end_call` bricht den Schritt ab. Eine Sitzung,
//! die laenger als `leerlauf_timeout` im Zustand `Idle` ohne Aktivitaet
//! bleibt, schliesst sich selbst.

use std::future::Future;
use std::time::Duration;

use fluester_core::UserId;
use fluester_protocol::SignalingFrame;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{SignalingError, SignalingResult};
use crate::peer::{Kollaborateure, PeerEvent};
use crate::session::{Ausgehend, CallState, SignalingSession, STANDARD_KANDIDATEN_PUFFER};

/// Groesse der Befehls-Queue pro Sitzung
const BEFEHLS_QUEUE_GROESSE: usize = 8;

/// Standard-Leerlaufzeit einer Sitzung im Zustand `Idle`
pub const STANDARD_LEERLAUF_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameter fuer neue Sitzungs-Tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximale Anzahl gepufferter frueher ICE-Kandidaten
    pub kandidaten_puffer: usize,
    /// Groesse der Queue fuer eingehende Frames
    pub eingangs_queue: usize,
    /// Nach dieser Zeit ohne Aktivitaet schliesst sich eine `Idle`-Sitzung
    pub leerlauf_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kandidaten_puffer: STANDARD_KANDIDATEN_PUFFER,
            eingangs_queue: 64,
            leerlauf_timeout: STANDARD_LEERLAUF_TIMEOUT,
        }
    }
}

enum Befehl {
    StartCall(oneshot::Sender<SignalingResult<()>>),
    AcceptCall(oneshot::Sender<SignalingResult<()>>),
    EndCall(oneshot::Sender<()>),
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle auf einen laufenden Sitzungs-Task
///
/// Klonbar. Wenn alle Handles verworfen sind, beendet der Task den Anruf.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    call_id: Uuid,
    peer_id: UserId,
    befehle: mpsc::Sender<Befehl>,
    eingang: mpsc::Sender<SignalingFrame>,
    zustand: watch::Receiver<CallState>,
}

impl std::fmt::Debug for Befehl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StartCall(_) => "StartCall",
            Self::AcceptCall(_) => "AcceptCall",
            Self::EndCall(_) => "EndCall",
        };
        f.write_str(name)
    }
}

impl SessionHandle {
    /// Startet einen Sitzungs-Task fuer `peer_id`
    pub fn spawnen(
        peer_id: UserId,
        config: SessionConfig,
        kollaborateure: Kollaborateure,
        ausgang: mpsc::Sender<Ausgehend>,
    ) -> (Self, JoinHandle<()>) {
        let (session, events) =
            SignalingSession::neu(peer_id, kollaborateure, ausgang, config.kandidaten_puffer);
        let call_id = session.call_id();

        let (befehle_tx, befehle_rx) = mpsc::channel(BEFEHLS_QUEUE_GROESSE);
        let (eingang_tx, eingang_rx) = mpsc::channel(config.eingangs_queue.max(1));
        let (zustand_tx, zustand_rx) = watch::channel(CallState::Idle);

        let kanaele = Kanaele {
            befehle: befehle_rx,
            eingang: eingang_rx,
            events,
            zustand: zustand_tx,
        };
        let span = tracing::info_span!("anruf", call_id = %call_id, peer = %peer_id);
        let task = tokio::spawn(
            ausfuehren(session, kanaele, config.leerlauf_timeout).instrument(span),
        );

        let handle = Self {
            call_id,
            peer_id,
            befehle: befehle_tx,
            eingang: eingang_tx,
            zustand: zustand_rx,
        };
        (handle, task)
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn peer_id(&self) -> UserId {
        self.peer_id
    }

    /// Zuletzt gemeldeter Zustand
    pub fn zustand(&self) -> CallState {
        *self.zustand.borrow()
    }

    pub async fn start_call(&self) -> SignalingResult<()> {
        let (tx, rx) = oneshot::channel();
        self.befehl_senden(Befehl::StartCall(tx)).await?;
        rx.await.map_err(|_| SignalingError::Geschlossen)?
    }

    pub async fn accept_call(&self) -> SignalingResult<()> {
        let (tx, rx) = oneshot::channel();
        self.befehl_senden(Befehl::AcceptCall(tx)).await?;
        rx.await.map_err(|_| SignalingError::Geschlossen)?
    }

    /// Beendet den Anruf; ohne Wirkung wenn der Task schon beendet ist
    ///
    /// Bricht auch einen noch laufenden Aufbau ab.
    pub async fn end_call(&self) {
        let (tx, rx) = oneshot::channel();
        if self.befehl_senden(Befehl::EndCall(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Reiht einen Frame der Gegenseite ein (wartet auf Platz)
    pub async fn frame_zustellen(&self, frame: SignalingFrame) -> SignalingResult<()> {
        self.eingang
            .send(frame)
            .await
            .map_err(|_| SignalingError::Geschlossen)
    }

    /// Reiht einen Frame ein ohne zu warten
    ///
    /// Ist die Queue voll, wird der Frame mit `Ueberlastet` abgelehnt.
    pub fn frame_anbieten(&self, frame: SignalingFrame) -> SignalingResult<()> {
        self.eingang.try_send(frame).map_err(|e| match e {
            TrySendError::Full(frame) => SignalingError::Ueberlastet(format!(
                "{} verworfen, Queue fuer {} voll",
                frame.typ(),
                self.peer_id
            )),
            TrySendError::Closed(_) => SignalingError::Geschlossen,
        })
    }

    /// Wartet bis der Task `ziel` meldet
    pub async fn warten_auf(&self, ziel: CallState) -> SignalingResult<()> {
        let mut zustand = self.zustand.clone();
        zustand
            .wait_for(|z| *z == ziel)
            .await
            .map(|_| ())
            .map_err(|_| SignalingError::Geschlossen)
    }

    async fn befehl_senden(&self, befehl: Befehl) -> SignalingResult<()> {
        self.befehle
            .send(befehl)
            .await
            .map_err(|_| SignalingError::Geschlossen)
    }
}

// ---------------------------------------------------------------------------
// Task-Schleife
// ---------------------------------------------------------------------------

struct Kanaele {
    befehle: mpsc::Receiver<Befehl>,
    eingang: mpsc::Receiver<SignalingFrame>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
    zustand: watch::Sender<CallState>,
}

/// Ausgang eines abbrechbaren Schritts
enum Schritt<T> {
    Fertig(T),
    /// Abgebrochen; enthaelt die Bestaetigung des `EndCall`-Befehls
    Abgebrochen(Option<oneshot::Sender<()>>),
}

async fn ausfuehren(mut session: SignalingSession, kanaele: Kanaele, leerlauf: Duration) {
    let Kanaele {
        mut befehle,
        mut eingang,
        mut events,
        zustand: zustand_tx,
    } = kanaele;
    tracing::debug!("Sitzungs-Task gestartet");

    let mut frist = Instant::now() + leerlauf;
    loop {
        let leerlauf_aktiv = session.zustand() == CallState::Idle;

        tokio::select! {
            befehl = befehle.recv() => {
                match befehl {
                    Some(Befehl::StartCall(antwort)) => {
                        let schritt = abbrechbar(
                            session.start_call(),
                            &mut befehle,
                            CallState::LocalOffering,
                        )
                        .await;
                        match schritt {
                            Schritt::Fertig(ergebnis) => {
                                if let Err(e) = &ergebnis {
                                    tracing::warn!(fehler = %e, "Anruf konnte nicht gestartet werden");
                                }
                                let _ = antwort.send(ergebnis);
                            }
                            Schritt::Abgebrochen(bestaetigung) => {
                                let _ = antwort.send(Err(SignalingError::Geschlossen));
                                abbrechen(&mut session, bestaetigung);
                            }
                        }
                    }
                    Some(Befehl::AcceptCall(antwort)) => {
                        let schritt =
                            abbrechbar(session.accept_call(), &mut befehle, CallState::Idle).await;
                        match schritt {
                            Schritt::Fertig(ergebnis) => {
                                if let Err(e) = &ergebnis {
                                    tracing::warn!(fehler = %e, "Annahme konnte nicht gesendet werden");
                                }
                                let _ = antwort.send(ergebnis);
                            }
                            Schritt::Abgebrochen(bestaetigung) => {
                                let _ = antwort.send(Err(SignalingError::Geschlossen));
                                abbrechen(&mut session, bestaetigung);
                            }
                        }
                    }
                    Some(Befehl::EndCall(antwort)) => {
                        session.end_call();
                        let _ = antwort.send(());
                    }
                    None => {
                        tracing::debug!("Alle Handles verworfen");
                        break;
                    }
                }
            }

            frame = eingang.recv() => {
                match frame {
                    Some(frame) => {
                        let zustand = zustand_waehrend(&frame, session.zustand());
                        match abbrechbar(session.handle_frame(frame), &mut befehle, zustand).await {
                            Schritt::Fertig(Ok(())) => {}
                            Schritt::Fertig(Err(e)) => fehler_protokollieren(&e),
                            Schritt::Abgebrochen(bestaetigung) => abbrechen(&mut session, bestaetigung),
                        }
                    }
                    None => {
                        tracing::info!("Nachrichtenkanal geschlossen – Anruf wird beendet");
                        break;
                    }
                }
            }

            Some(event) = events.recv() => {
                let zustand = session.zustand();
                match abbrechbar(session.handle_peer_event(event), &mut befehle, zustand).await {
                    Schritt::Fertig(Ok(())) => {}
                    Schritt::Fertig(Err(e)) => {
                        tracing::warn!(fehler = %e, "Peer-Ereignis konnte nicht verarbeitet werden");
                    }
                    Schritt::Abgebrochen(bestaetigung) => abbrechen(&mut session, bestaetigung),
                }
            }

            _ = tokio::time::sleep_until(frist), if leerlauf_aktiv => {
                tracing::info!(
                    leerlauf_ms = leerlauf.as_millis() as u64,
                    "Sitzung ohne Aktivitaet – wird geschlossen"
                );
                session.end_call();
            }
        }

        frist = Instant::now() + leerlauf;
        zustand_tx.send_replace(session.zustand());
        if session.zustand() == CallState::Closed {
            break;
        }
    }

    session.end_call();
    zustand_tx.send_replace(CallState::Closed);
    tracing::debug!("Sitzungs-Task beendet");
}

/// Fuehrt `schritt` aus, bis er fertig ist oder `EndCall` eintrifft
///
/// Weitere `StartCall`/`AcceptCall` waehrend des Schritts werden mit
/// `UngueltigerZustand` abgelehnt.
async fn abbrechbar<F: Future>(
    schritt: F,
    befehle: &mut mpsc::Receiver<Befehl>,
    zustand: CallState,
) -> Schritt<F::Output> {
    tokio::select! {
        ergebnis = schritt => Schritt::Fertig(ergebnis),
        bestaetigung = auf_abbruch_warten(befehle, zustand) => Schritt::Abgebrochen(bestaetigung),
    }
}

async fn auf_abbruch_warten(
    befehle: &mut mpsc::Receiver<Befehl>,
    zustand: CallState,
) -> Option<oneshot::Sender<()>> {
    loop {
        match befehle.recv().await {
            Some(Befehl::EndCall(antwort)) => return Some(antwort),
            Some(Befehl::StartCall(antwort)) => {
                let _ = antwort.send(Err(SignalingError::UngueltigerZustand {
                    zustand,
                    ereignis: "startCall",
                }));
            }
            Some(Befehl::AcceptCall(antwort)) => {
                let _ = antwort.send(Err(SignalingError::UngueltigerZustand {
                    zustand,
                    ereignis: "acceptCall",
                }));
            }
            None => return None,
        }
    }
}

fn abbrechen(session: &mut SignalingSession, bestaetigung: Option<oneshot::Sender<()>>) {
    tracing::info!(zustand = ?session.zustand(), "Laufender Schritt abgebrochen");
    session.end_call();
    if let Some(bestaetigung) = bestaetigung {
        let _ = bestaetigung.send(());
    }
}

/// Zustand, den ein Frame waehrend seiner Verarbeitung herstellt
fn zustand_waehrend(frame: &SignalingFrame, aktuell: CallState) -> CallState {
    match frame {
        SignalingFrame::Offer { .. } if aktuell == CallState::Idle => CallState::RemoteOffered,
        SignalingFrame::CallAccepted { .. } if aktuell == CallState::Idle => {
            CallState::LocalOffering
        }
        _ => aktuell,
    }
}

fn fehler_protokollieren(fehler: &SignalingError) {
    if fehler.ist_verwerfbar() {
        tracing::warn!(fehler = %fehler, "Frame verworfen");
    } else {
        tracing::error!(fehler = %fehler, "Frame-Verarbeitung fehlgeschlagen");
    }
}
