//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use std::path::PathBuf;
use std::time::Duration;

use fluester_crypto::DhGruppe;
use fluester_observability::LoggingEinstellungen;
use fluester_signaling::SessionConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable fuer den Konfigurationspfad
pub const ENV_CONFIG: &str = "FLUESTER_CONFIG";
/// Standardpfad der Konfigurationsdatei
pub const STANDARD_PFAD: &str = "fluester.toml";

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Schluesselvereinbarung und Schluesselspeicher
    pub krypto: KryptoEinstellungen,
    /// Anruf-Signaling
    pub signaling: SignalingEinstellungen,
}

/// Krypto-Einstellungen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KryptoEinstellungen {
    /// DH-Gruppe: "modp2048" (Standard) oder "klein" (nur Tests)
    pub gruppe: DhGruppe,
    /// JSON-Datei fuer Sitzungsschluessel (leer = nur im Speicher)
    pub schluesselspeicher: Option<PathBuf>,
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Maximale Anzahl frueher ICE-Kandidaten pro Anruf
    pub kandidaten_puffer: usize,
    /// Kapazitaet der ausgehenden Frame-Queue
    pub ausgangs_queue: usize,
    /// Kapazitaet der eingehenden Frame-Queue pro Anruf
    pub eingangs_queue: usize,
    /// Leerlaufzeit in Millisekunden, nach der ein nicht begonnener Anruf verfaellt
    pub leerlauf_timeout_ms: u64,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            kandidaten_puffer: session.kandidaten_puffer,
            ausgangs_queue: 64,
            eingangs_queue: session.eingangs_queue,
            leerlauf_timeout_ms: session.leerlauf_timeout.as_millis() as u64,
        }
    }
}

impl SignalingEinstellungen {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            kandidaten_puffer: self.kandidaten_puffer,
            eingangs_queue: self.eingangs_queue,
            leerlauf_timeout: Duration::from_millis(self.leerlauf_timeout_ms),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `FLUESTER_CONFIG` oder `fluester.toml`
    pub fn pfad_aus_umgebung() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into())
    }
}
