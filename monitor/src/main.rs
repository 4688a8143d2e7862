//! TeamTalk-Monitor – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Monitor.

use anyhow::Result;
use teamtalk_client::ClientKonfig;
use teamtalk_monitor::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("TT_MONITOR_CONFIG").unwrap_or_else(|_| "monitor.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let konfig = ClientKonfig::laden(&config_pfad)?;

    teamtalk_observability::logging_initialisieren(&konfig.logging.level, &konfig.logging.format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "TeamTalk-Monitor wird initialisiert"
    );

    Monitor::neu(konfig).starten().await?;
    Ok(())
}
