//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (ueberschreibt die Konfigurationsdatei):
//! - `FL_LOG_LEVEL`: Filter-Direktive (z.B. `info` oder `fluester_signaling=debug`)
//! - `FL_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Anruf-Spans tragen `call_id` und `peer` als Felder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "FL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "FL_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingFehler {
    #[error("Ungueltiger Log-Filter '{0}'")]
    UngueltigerFilter(String),

    #[error("Unbekanntes Log-Format '{0}' (erlaubt: text, json)")]
    UnbekanntesFormat(String),

    #[error("Logging bereits initialisiert")]
    BereitsInitialisiert,
}

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(LoggingFehler::UnbekanntesFormat(andere.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Aufgeloeste Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingEinstellungen {
    /// Uebernimmt `FL_LOG_LEVEL` / `FL_LOG_FORMAT` falls gesetzt
    pub fn mit_umgebung(self) -> Result<Self, LoggingFehler> {
        self.ueberschreiben(
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }

    fn ueberschreiben(
        mut self,
        level: Option<String>,
        format: Option<String>,
    ) -> Result<Self, LoggingFehler> {
        if let Some(level) = level.filter(|l| !l.is_empty()) {
            self.level = level;
        }
        if let Some(format) = format.filter(|f| !f.is_empty()) {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    fn filter(&self) -> Result<EnvFilter, LoggingFehler> {
        EnvFilter::try_new(&self.level)
            .map_err(|_| LoggingFehler::UngueltigerFilter(self.level.clone()))
    }
}

/// Initialisiert das globale Logging
///
/// Darf pro Prozess nur einmal erfolgreich aufgerufen werden.
pub fn logging_initialisieren(einstellungen: &LoggingEinstellungen) -> Result<(), LoggingFehler> {
    let filter = einstellungen.filter()?;

    let ergebnis = match einstellungen.format {
        LogFormat::Json => tfmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => tfmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|_| LoggingFehler::BereitsInitialisiert)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!(
            "JSON".parse::<LogFormat>(),
            Err(LoggingFehler::UnbekanntesFormat(_))
        ));
    }

    #[test]
    fn umgebung_ueberschreibt_konfiguration() {
        let einstellungen = LoggingEinstellungen::default()
            .ueberschreiben(Some("fluester_signaling=debug".into()), Some("json".into()))
            .unwrap();
        assert_eq!(einstellungen.level, "fluester_signaling=debug");
        assert_eq!(einstellungen.format, LogFormat::Json);
    }

    #[test]
    fn leere_umgebung_behaelt_konfiguration() {
        let einstellungen = LoggingEinstellungen::default()
            .ueberschreiben(Some(String::new()), None)
            .unwrap();
        assert_eq!(einstellungen, LoggingEinstellungen::default());
    }

    #[test]
    fn ungueltiges_format_aus_umgebung() {
        let ergebnis = LoggingEinstellungen::default().ueberschreiben(None, Some("xml".into()));
        assert!(ergebnis.is_err());
    }

    #[test]
    fn ungueltiger_filter_wird_abgelehnt() {
        let einstellungen = LoggingEinstellungen {
            level: "fluester=laut".into(),
            format: LogFormat::Text,
        };
        assert!(matches!(
            logging_initialisieren(&einstellungen),
            Err(LoggingFehler::UngueltigerFilter(_))
        ));
    }

    #[test]
    fn einstellungen_aus_toml() {
        let einstellungen: LoggingEinstellungen =
            toml::from_str("level = \"warn\"\nformat = \"json\"").unwrap();
        assert_eq!(einstellungen.level, "warn");
        assert_eq!(einstellungen.format, LogFormat::Json);

        let leer: LoggingEinstellungen = toml::from_str("").unwrap();
        assert_eq!(leer, LoggingEinstellungen::default());
    }
}
