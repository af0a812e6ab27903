//! Fluester Client – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt die
//! Loopback-Demo zweier Endpunkte aus.

use anyhow::Result;
use fluester_client::{config::ClientConfig, demo};
use fluester_observability::logging_initialisieren;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = ClientConfig::pfad_aus_umgebung();

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.clone().mit_umgebung()?)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        gruppe = ?config.krypto.gruppe,
        "Fluester Client wird initialisiert"
    );

    let bericht = demo::loopback_demo(&config, "Hallo Bob, hier ist Alice").await?;
    tracing::info!(
        nachricht = %bericht.nachricht,
        zustand = ?bericht.anruf_zustand,
        "Demo abgeschlossen"
    );

    Ok(())
}
