//! Integration-Tests: zwei Endpunkte verhandeln einen Anruf ueber einen
//! simulierten Nachrichtenkanal (JSON-Text wie auf der Leitung)

use std::sync::Arc;
use std::time::Duration;

use fluester_core::UserId;
use fluester_protocol::{IceCandidate, SignalingFrame};
use fluester_signaling::loopback::{Loopback, LoopbackMedia};
use fluester_signaling::{Ausgehend, CallRegistry, CallState, Eingehend, SessionConfig};
use tokio::sync::mpsc;

const WARTEZEIT: Duration = Duration::from_secs(5);

fn logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fluester_signaling=debug")
        .with_test_writer()
        .try_init();
}

struct Endpunkt {
    id: UserId,
    registry: Arc<CallRegistry>,
    loopback: Loopback,
}

/// Leitet ausgehende Frames von `von` als JSON an den Eingang der Gegenseite
fn weiterleiten(
    von: UserId,
    mut ausgang: mpsc::Receiver<Ausgehend>,
    eingang: mpsc::Sender<Eingehend>,
) {
    tokio::spawn(async move {
        while let Some(ausgehend) = ausgang.recv().await {
            let text = ausgehend.frame.to_json().expect("Frame serialisieren");
            if eingang.send(Eingehend { von, text }).await.is_err() {
                break;
            }
        }
    });
}

fn verbundenes_paar(alice_lb: Loopback, bob_lb: Loopback) -> (Endpunkt, Endpunkt) {
    let (alice_id, bob_id) = (UserId::new(), UserId::new());
    let (alice_aus_tx, alice_aus_rx) = mpsc::channel(64);
    let (bob_aus_tx, bob_aus_rx) = mpsc::channel(64);
    let (alice_ein_tx, alice_ein_rx) = mpsc::channel(64);
    let (bob_ein_tx, bob_ein_rx) = mpsc::channel(64);

    let alice = Endpunkt {
        id: alice_id,
        registry: Arc::new(CallRegistry::neu(
            alice_lb.kollaborateure(),
            SessionConfig::default(),
            alice_aus_tx,
        )),
        loopback: alice_lb,
    };
    let bob = Endpunkt {
        id: bob_id,
        registry: Arc::new(CallRegistry::neu(
            bob_lb.kollaborateure(),
            SessionConfig::default(),
            bob_aus_tx,
        )),
        loopback: bob_lb,
    };

    weiterleiten(alice_id, alice_aus_rx, bob_ein_tx);
    weiterleiten(bob_id, bob_aus_rx, alice_ein_tx);

    let registry = Arc::clone(&alice.registry);
    tokio::spawn(async move { registry.bedienen(alice_ein_rx).await });
    let registry = Arc::clone(&bob.registry);
    tokio::spawn(async move { registry.bedienen(bob_ein_rx).await });

    (alice, bob)
}

async fn warten_bis(mut bedingung: impl FnMut() -> bool) {
    tokio::time::timeout(WARTEZEIT, async {
        while !bedingung() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Bedingung nicht rechtzeitig erfuellt");
}

#[tokio::test]
async fn anruf_wird_vollstaendig_verhandelt() {
    logging();
    let (alice, bob) = verbundenes_paar(Loopback::neu("alice"), Loopback::neu("bob"));

    let handle = alice.registry.anrufen(bob.id).await.expect("anrufen");
    tokio::time::timeout(WARTEZEIT, handle.warten_auf(CallState::Connected))
        .await
        .expect("Timeout")
        .expect("Alice verbunden");

    warten_bis(|| {
        bob.registry
            .sitzung(&alice.id)
            .is_some_and(|h| h.zustand() == CallState::Connected)
    })
    .await;

    // Kandidaten beider Seiten sind angekommen, Remote-Audio haengt
    warten_bis(|| {
        bob.loopback
            .peers
            .letzte()
            .is_some_and(|p| !p.kandidaten.is_empty())
            && alice
                .loopback
                .peers
                .letzte()
                .is_some_and(|p| !p.kandidaten.is_empty())
    })
    .await;
    warten_bis(|| {
        alice.loopback.audio.angehaengt().len() == 1 && bob.loopback.audio.angehaengt().len() == 1
    })
    .await;

    alice.registry.auflegen(&bob.id).await;
    assert_eq!(alice.registry.aktive_anrufe(), 0);
    assert_eq!(alice.loopback.peers.letzte().unwrap().geschlossen, 1);
    assert_eq!(alice.loopback.media.aktiv(), 0);
    assert_eq!(alice.loopback.audio.entfernt(), 1);
}

#[tokio::test]
async fn verweigertes_mikrofon_beim_angerufenen() {
    logging();
    let (alice, bob) = verbundenes_paar(
        Loopback::neu("alice"),
        Loopback::mit_media("bob", LoopbackMedia::verweigernd()),
    );

    let handle = alice.registry.anrufen(bob.id).await.expect("anrufen");

    // Bob hat eine Verbindung erstellt, sie nach der Ablehnung geschlossen
    // und ist wieder im Ruhezustand
    warten_bis(|| bob.loopback.peers.letzte().is_some_and(|p| p.geschlossen == 1)).await;
    warten_bis(|| {
        bob.registry
            .sitzung(&alice.id)
            .is_some_and(|h| h.zustand() == CallState::Idle)
    })
    .await;
    assert_eq!(bob.loopback.media.erfasst(), 0);

    // Ohne Antwort bleibt Alice im Wartezustand
    assert_eq!(handle.zustand(), CallState::AwaitingAnswer);
    alice.registry.auflegen(&bob.id).await;
    assert_eq!(alice.loopback.media.aktiv(), 0);
}

#[tokio::test]
async fn frueher_kandidat_vor_angebot() {
    logging();
    let bob_lb = Loopback::neu("bob");
    let (tx, mut ausgang) = mpsc::channel(16);
    let bob = CallRegistry::neu(bob_lb.kollaborateure(), SessionConfig::default(), tx);
    let alice_id = UserId::new();

    let kandidat = IceCandidate {
        candidate: "candidate:9 1 udp 2122260223 10.0.0.9 6000 typ host".into(),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
    };
    bob.eingang(alice_id, SignalingFrame::IceCandidate { candidate: kandidat.clone() })
        .await
        .expect("Kandidat zustellen");

    let handle = bob.sitzung(&alice_id).expect("Sitzung angelegt");
    assert_eq!(handle.zustand(), CallState::Idle);

    let angebot = "v=0\r\no=- alice 2 IN IP4 127.0.0.1\r\ns=offer\r\n";
    bob.eingang_text(
        alice_id,
        &SignalingFrame::Offer { sdp: angebot.into() }.to_json().unwrap(),
    )
    .await
    .expect("Angebot zustellen");

    tokio::time::timeout(WARTEZEIT, handle.warten_auf(CallState::Connected))
        .await
        .expect("Timeout")
        .expect("verbunden");

    let antwort = ausgang.recv().await.expect("Antwort gesendet");
    assert_eq!(antwort.an, alice_id);
    assert!(matches!(antwort.frame, SignalingFrame::Answer { .. }));
    assert_eq!(bob_lb.peers.letzte().unwrap().kandidaten, vec![kandidat]);
}

#[tokio::test]
async fn kanalende_beendet_alle_anrufe() {
    logging();
    let lb = Loopback::neu("alice");
    let (tx, _ausgang) = mpsc::channel(16);
    let registry = CallRegistry::neu(lb.kollaborateure(), SessionConfig::default(), tx);

    let (peer_a, peer_b) = (UserId::new(), UserId::new());
    registry.anrufen(peer_a).await.expect("anrufen a");
    registry.anrufen(peer_b).await.expect("anrufen b");
    assert_eq!(registry.aktive_anrufe(), 2);

    let (ein_tx, ein_rx) = mpsc::channel(1);
    drop(ein_tx);
    registry.bedienen(ein_rx).await;

    assert_eq!(registry.aktive_anrufe(), 0);
    assert_eq!(lb.media.aktiv(), 0);
    assert!(lb.peers.protokolle().iter().all(|p| p.geschlossen == 1));
}
