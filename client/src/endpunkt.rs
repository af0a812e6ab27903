//! Endpunkt – ein angemeldeter Client
//!
//! Verbindet Schluesselvereinbarung, Sitzungsschluessel-Cache und
//! Umschlag-Verschluesselung fuer Chat-Nachrichten mit der Anruf-Registry.
//! DH-Werte und Signaling-Frames laufen ueber denselben Nachrichtenkanal.
//!
//! ```text
//! vereinbarung_senden ---- Anfrage (dh-public) ----> Gegenseite
//!                    <---- Antwort (inReplyTo) -----
//! public_value_empfangen -> SharedSecret -> SessionKey -> Cache
//! verschluesseln / entschluesseln  (Schluessel aus dem Cache)
//! ```

use std::collections::HashMap;

use fluester_core::{ConversationId, FluesterError, Result, UserId};
use fluester_crypto::{
    decrypt_from_wire, derive_from_shared_secret, derive_from_tokens, encrypt_to_wire,
    generate_key_pair, parse_public_hex, DomainParameters, InMemorySecretStore,
    JsonFileSecretStore, KeyPair, SecretStore, SessionKey, SessionKeyCache,
};
use fluester_protocol::{Kanalnachricht, PublicValueMessage};
use fluester_signaling::{
    Ausgehend, CallRegistry, Eingehend, Kollaborateure, SessionConfig, SignalingError,
};
use num_bigint::BigUint;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::ClientConfig;

/// Ein ausgehender Text fuer den Nachrichtenkanal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kanaltext {
    pub an: UserId,
    pub text: String,
}

/// Zuletzt beantwortete Anfrage einer Unterhaltung
#[derive(Debug, Clone)]
struct Beantwortet {
    anfrage: String,
    antwort: Option<PublicValueMessage>,
}

/// Ein Client mit eigenen Schluesseln und Anrufen
#[derive(Debug)]
pub struct Endpunkt {
    id: UserId,
    params: DomainParameters,
    schluessel: SessionKeyCache,
    /// Schluesselpaare eigener Anfragen (einmal verwendbar)
    offen: Mutex<HashMap<ConversationId, KeyPair>>,
    beantwortet: Mutex<HashMap<ConversationId, Beantwortet>>,
    anrufe: CallRegistry,
    ausgang: mpsc::Sender<Kanaltext>,
    /// Ausgehende Frames der Anrufe, bis `bedienen` sie uebernimmt
    signaling: Mutex<Option<mpsc::Receiver<Ausgehend>>>,
}

impl Endpunkt {
    /// Erstellt einen Endpunkt gemaess Konfiguration
    pub fn aus_config(
        id: UserId,
        config: &ClientConfig,
        kollaborateure: Kollaborateure,
        ausgang: mpsc::Sender<Kanaltext>,
    ) -> anyhow::Result<Self> {
        let params = config.krypto.gruppe.parameter();
        let session = config.signaling.session_config();

        let endpunkt = match &config.krypto.schluesselspeicher {
            Some(pfad) => {
                let store = JsonFileSecretStore::oeffnen(pfad)
                    .map_err(|e| anyhow::anyhow!("Schluesselspeicher '{}': {e}", pfad.display()))?;
                Self::neu(id, params, store, session, kollaborateure, ausgang)
            }
            None => Self::neu(
                id,
                params,
                InMemorySecretStore::neu(),
                session,
                kollaborateure,
                ausgang,
            ),
        };
        Ok(endpunkt)
    }

    pub fn neu(
        id: UserId,
        params: DomainParameters,
        store: impl SecretStore + 'static,
        session: SessionConfig,
        kollaborateure: Kollaborateure,
        ausgang: mpsc::Sender<Kanaltext>,
    ) -> Self {
        let (signaling_tx, signaling_rx) = mpsc::channel(ausgang.max_capacity());
        Self {
            id,
            params,
            schluessel: SessionKeyCache::neu(store),
            offen: Mutex::new(HashMap::new()),
            beantwortet: Mutex::new(HashMap::new()),
            anrufe: CallRegistry::neu(kollaborateure, session, signaling_tx),
            ausgang,
            signaling: Mutex::new(Some(signaling_rx)),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn anrufe(&self) -> &CallRegistry {
        &self.anrufe
    }

    fn unterhaltung(&self, peer: UserId) -> ConversationId {
        ConversationId::zwischen(self.id, peer)
    }

    // -----------------------------------------------------------------------
    // Nachrichtenkanal
    // -----------------------------------------------------------------------

    /// Bedient den Nachrichtenkanal bis er geschlossen wird
    ///
    /// Leitet ausgehende Signaling-Frames auf den Kanal weiter und verteilt
    /// eingehende Texte. Danach werden alle Anrufe beendet.
    pub async fn bedienen(&self, mut eingang: mpsc::Receiver<Eingehend>) {
        let Some(signaling) = self.signaling.lock().take() else {
            tracing::warn!("Nachrichtenkanal wird bereits bedient");
            return;
        };
        let weiterleitung = tokio::spawn(frames_weiterleiten(signaling, self.ausgang.clone()));

        while let Some(Eingehend { von, text }) = eingang.recv().await {
            if let Err(e) = self.eingang(von, &text).await {
                tracing::debug!(peer = %von, fehler = %e, "Eingehende Nachricht verworfen");
            }
        }

        tracing::info!("Nachrichtenkanal geschlossen");
        self.anrufe.alle_beenden().await;
        weiterleitung.abort();
    }

    /// Verteilt einen eingehenden Text nach seinem `type`-Feld
    pub async fn eingang(&self, von: UserId, text: &str) -> Result<()> {
        let nachricht = Kanalnachricht::from_json(text).map_err(|e| {
            tracing::warn!(peer = %von, fehler = %e, "Ungueltige Nachricht verworfen");
            SignalingError::from(e)
        })?;

        match nachricht {
            Kanalnachricht::Schluessel(msg) => {
                if msg.from != von {
                    tracing::warn!(peer = %von, from = %msg.from, "Absender des DH-Werts passt nicht");
                    return Err(FluesterError::Krypto(format!(
                        "DH-Wert von {von} traegt Absender {}",
                        msg.from
                    )));
                }
                if let Some(antwort) = self.public_value_empfangen(&msg)? {
                    self.senden(von, Kanalnachricht::Schluessel(antwort)).await?;
                }
                Ok(())
            }
            Kanalnachricht::Signaling(frame) => Ok(self.anrufe.eingang(von, frame).await?),
        }
    }

    async fn senden(&self, an: UserId, nachricht: Kanalnachricht) -> Result<()> {
        let text = nachricht.to_json().map_err(SignalingError::from)?;
        self.ausgang
            .send(Kanaltext { an, text })
            .await
            .map_err(|_| FluesterError::from(SignalingError::SendFehler))
    }

    // -----------------------------------------------------------------------
    // Schluesselvereinbarung
    // -----------------------------------------------------------------------

    /// Erzeugt ein frisches Schluesselpaar fuer `peer`
    ///
    /// Die zurueckgegebene Anfrage wird ueber den Nachrichtenkanal gesendet.
    /// Eine noch offene Anfrage an `peer` wird ersetzt; Antworten darauf
    /// werden danach verworfen.
    pub fn vereinbarung_starten(&self, peer: UserId) -> Result<PublicValueMessage> {
        let paar = generate_key_pair(&self.params)?;
        let nachricht = PublicValueMessage::neu(self.id, paar.public_hex());
        self.offen.lock().insert(self.unterhaltung(peer), paar);
        tracing::debug!(peer = %peer, "Schluesselvereinbarung gestartet");
        Ok(nachricht)
    }

    /// Startet eine Vereinbarung und sendet die Anfrage an `peer`
    pub async fn vereinbarung_senden(&self, peer: UserId) -> Result<()> {
        let anfrage = self.vereinbarung_starten(peer)?;
        self.senden(peer, Kanalnachricht::Schluessel(anfrage)).await
    }

    /// Verarbeitet den oeffentlichen Wert der Gegenseite
    ///
    /// Eine Anfrage wird mit eigenem Wert beantwortet (Rueckgabe), ausser
    /// es laeuft gleichzeitig eine eigene Anfrage: dann gilt das eigene Paar
    /// und es gibt keine Antwort. Eine Antwort wird nur angenommen, wenn sie
    /// sich auf die offene eigene Anfrage bezieht; sonst wird sie verworfen
    /// und der gespeicherte Schluessel bleibt.
    pub fn public_value_empfangen(
        &self,
        nachricht: &PublicValueMessage,
    ) -> Result<Option<PublicValueMessage>> {
        let conv = self.unterhaltung(nachricht.from);
        let peer_wert = parse_public_hex(&nachricht.public_key)?;

        match &nachricht.antwort_auf {
            Some(anfrage) => {
                self.antwort_empfangen(&conv, anfrage, &peer_wert)?;
                Ok(None)
            }
            None => self.anfrage_empfangen(&conv, &nachricht.public_key, &peer_wert),
        }
    }

    fn anfrage_empfangen(
        &self,
        conv: &ConversationId,
        anfrage: &str,
        peer_wert: &BigUint,
    ) -> Result<Option<PublicValueMessage>> {
        // Doppelt zugestellte Anfrage
        if let Some(frueher) = self.beantwortet.lock().get(conv) {
            if frueher.anfrage == anfrage {
                tracing::debug!(conversation = %conv, "Anfrage bereits beantwortet");
                return Ok(frueher.antwort.clone());
            }
        }

        let eigenes = self.offen.lock().remove(conv);
        let (mut paar, antwort) = match eigenes {
            Some(paar) => {
                tracing::debug!(conversation = %conv, "Gleichzeitige Anfragen, eigenes Paar gilt");
                (paar, None)
            }
            None => {
                let paar = generate_key_pair(&self.params)?;
                let antwort = PublicValueMessage::antwort(self.id, paar.public_hex(), anfrage);
                (paar, Some(antwort))
            }
        };

        self.schluessel_ableiten(conv, &mut paar, peer_wert)?;
        self.beantwortet.lock().insert(
            conv.clone(),
            Beantwortet {
                anfrage: anfrage.to_string(),
                antwort: antwort.clone(),
            },
        );
        Ok(antwort)
    }

    fn antwort_empfangen(
        &self,
        conv: &ConversationId,
        anfrage: &str,
        peer_wert: &BigUint,
    ) -> Result<()> {
        let paar = {
            let mut offen = self.offen.lock();
            let passt = offen.get(conv).map(|paar| paar.public_hex() == anfrage);
            match passt {
                Some(true) => offen.remove(conv),
                Some(false) => {
                    tracing::warn!(conversation = %conv, "Veraltete DH-Antwort verworfen");
                    return Ok(());
                }
                None => {
                    tracing::warn!(conversation = %conv, "DH-Antwort ohne offene Anfrage verworfen");
                    return Ok(());
                }
            }
        };

        match paar {
            Some(mut paar) => self.schluessel_ableiten(conv, &mut paar, peer_wert),
            None => Ok(()),
        }
    }

    fn schluessel_ableiten(
        &self,
        conv: &ConversationId,
        paar: &mut KeyPair,
        peer_wert: &BigUint,
    ) -> Result<()> {
        let geheimnis = paar.compute_shared_secret(peer_wert, &self.params)?;
        let key = derive_from_shared_secret(&geheimnis, &self.params);
        self.schluessel.setzen(conv, &key)?;
        tracing::info!(conversation = %conv, "Sitzungsschluessel vereinbart");
        Ok(())
    }

    /// Leitet den Schluessel aus den Tokens beider Seiten ab (falls noch keiner existiert)
    pub fn schluessel_aus_tokens(
        &self,
        peer: UserId,
        eigener_token: &str,
        peer_token: &str,
    ) -> Result<()> {
        let conv = self.unterhaltung(peer);
        self.schluessel
            .schluessel_fuer(&conv, || derive_from_tokens(eigener_token, peer_token))?;
        Ok(())
    }

    pub fn hat_schluessel(&self, peer: UserId) -> Result<bool> {
        Ok(self.schluessel.gespeichert(&self.unterhaltung(peer))?.is_some())
    }

    /// Verwirft den Schluessel der Unterhaltung mit `peer`
    pub fn schluessel_vergessen(&self, peer: UserId) -> Result<bool> {
        Ok(self.schluessel.invalidieren(&self.unterhaltung(peer))?)
    }

    // -----------------------------------------------------------------------
    // Nachrichten
    // -----------------------------------------------------------------------

    /// Verschluesselt eine Chat-Nachricht an `peer` (Umschlag als JSON)
    pub fn verschluesseln(&self, peer: UserId, text: &str) -> Result<String> {
        let key = self.schluessel_holen(peer)?;
        Ok(encrypt_to_wire(text, &key)?)
    }

    /// Entschluesselt eine Nachricht von `peer`
    ///
    /// Manipulierte Umschlaege ergeben `FluesterError::Manipuliert`.
    pub fn entschluesseln(&self, peer: UserId, umschlag: &str) -> Result<String> {
        let key = self.schluessel_holen(peer)?;
        decrypt_from_wire(umschlag, &key).map_err(|e| {
            tracing::warn!(peer = %peer, fehler = %e, "Nachricht nicht entschluesselbar");
            FluesterError::from(e)
        })
    }

    fn schluessel_holen(&self, peer: UserId) -> Result<SessionKey> {
        let conv = self.unterhaltung(peer);
        self.schluessel
            .gespeichert(&conv)?
            .ok_or_else(|| FluesterError::Krypto(format!("Kein Sitzungsschluessel fuer {conv}")))
    }
}

/// Serialisiert die Frames der Anrufe auf den Nachrichtenkanal
async fn frames_weiterleiten(
    mut frames: mpsc::Receiver<Ausgehend>,
    ausgang: mpsc::Sender<Kanaltext>,
) {
    while let Some(Ausgehend { an, frame }) = frames.recv().await {
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(fehler = %e, "Frame nicht serialisierbar");
                continue;
            }
        };
        if ausgang.send(Kanaltext { an, text }).await.is_err() {
            break;
        }
    }
}
