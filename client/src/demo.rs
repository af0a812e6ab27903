//! Loopback-Demo zweier Endpunkte im selben Prozess
//!
//! Ein In-Memory-Nachrichtenkanal verbindet Alice und Bob. Die Demo
//! vereinbart einen Schluessel ueber den Kanal, tauscht eine verschluesselte
//! Nachricht aus und verhandelt einen Anruf bis `Connected`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fluester_core::UserId;
use fluester_signaling::loopback::Loopback;
use fluester_signaling::{CallState, Eingehend};
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::endpunkt::{Endpunkt, Kanaltext};

/// Wie lange auf den Verbindungsaufbau gewartet wird
const ANRUF_TIMEOUT: Duration = Duration::from_secs(10);
/// Wie lange auf die Schluesselvereinbarung gewartet wird
const SCHLUESSEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Ergebnis eines Demo-Laufs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoBericht {
    /// Von Bob entschluesselte Nachricht
    pub nachricht: String,
    /// Zustand des Anrufs bei Alice vor dem Auflegen
    pub anruf_zustand: CallState,
    /// Aktive Anrufe bei Alice nach dem Auflegen
    pub anrufe_danach: usize,
}

/// Fuehrt die Demo mit der gegebenen Konfiguration aus
pub async fn loopback_demo(config: &ClientConfig, text: &str) -> anyhow::Result<DemoBericht> {
    let (alice_id, bob_id) = (UserId::new(), UserId::new());
    let queue = config.signaling.ausgangs_queue.max(1);

    let (alice_aus_tx, alice_aus_rx) = mpsc::channel(queue);
    let (bob_aus_tx, bob_aus_rx) = mpsc::channel(queue);
    let (alice_ein_tx, alice_ein_rx) = mpsc::channel(queue);
    let (bob_ein_tx, bob_ein_rx) = mpsc::channel(queue);

    // Der Schluesselspeicher aus der Konfiguration gehoert Alice, Bob
    // bleibt im Speicher
    let alice = Arc::new(Endpunkt::aus_config(
        alice_id,
        config,
        Loopback::neu("alice").kollaborateure(),
        alice_aus_tx,
    )?);
    let mut bob_config = config.clone();
    bob_config.krypto.schluesselspeicher = None;
    let bob = Arc::new(Endpunkt::aus_config(
        bob_id,
        &bob_config,
        Loopback::neu("bob").kollaborateure(),
        bob_aus_tx,
    )?);

    weiterleiten(alice_id, alice_aus_rx, bob_ein_tx);
    weiterleiten(bob_id, bob_aus_rx, alice_ein_tx);
    bedienen(Arc::clone(&alice), alice_ein_rx);
    bedienen(Arc::clone(&bob), bob_ein_rx);

    // 1. Schluesselvereinbarung ueber den Kanal
    alice.vereinbarung_senden(bob_id).await?;
    tokio::time::timeout(SCHLUESSEL_TIMEOUT, async {
        loop {
            if alice.hat_schluessel(bob_id)? && bob.hat_schluessel(alice_id)? {
                return anyhow::Ok(());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("Schluesselvereinbarung nicht rechtzeitig abgeschlossen")??;

    // 2. Verschluesselte Nachricht
    let umschlag = alice.verschluesseln(bob_id, text)?;
    tracing::info!(bytes = umschlag.len(), "Umschlag gesendet");
    let nachricht = bob.entschluesseln(alice_id, &umschlag)?;

    // 3. Anruf
    let handle = alice.anrufe().anrufen(bob_id).await?;
    tokio::time::timeout(ANRUF_TIMEOUT, handle.warten_auf(CallState::Connected))
        .await
        .context("Anruf nicht rechtzeitig verbunden")??;
    let anruf_zustand = handle.zustand();
    tracing::info!(call_id = %handle.call_id(), "Anruf verbunden");

    alice.anrufe().auflegen(&bob_id).await;
    bob.anrufe().auflegen(&alice_id).await;

    Ok(DemoBericht {
        nachricht,
        anruf_zustand,
        anrufe_danach: alice.anrufe().aktive_anrufe(),
    })
}

/// Simulierter Nachrichtenkanal: Texte von `von` gehen an die Gegenseite
fn weiterleiten(
    von: UserId,
    mut ausgang: mpsc::Receiver<Kanaltext>,
    eingang: mpsc::Sender<Eingehend>,
) {
    tokio::spawn(async move {
        while let Some(Kanaltext { text, .. }) = ausgang.recv().await {
            if eingang.send(Eingehend { von, text }).await.is_err() {
                break;
            }
        }
    });
}

fn bedienen(endpunkt: Arc<Endpunkt>, eingang: mpsc::Receiver<Eingehend>) {
    tokio::spawn(async move { endpunkt.bedienen(eingang).await });
}
