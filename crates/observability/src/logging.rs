//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Konfigurationsdatei):
//! - `TT_LOG_LEVEL`: Filter-Direktive (z.B. `debug` oder
//!   `info,teamtalk_client=trace`), Standard: info
//! - `TT_LOG_FORMAT`: Format (text/json), Standard: text

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "TT_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "TT_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum LoggingFehler {
    #[error("Unbekanntes Log-Format '{0}' (erlaubt: text, json)")]
    UnbekanntesFormat(String),

    #[error("Ungueltiger Log-Filter '{0}'")]
    UngueltigerFilter(String),

    /// Es ist bereits ein globaler Subscriber gesetzt
    #[error("Logging bereits initialisiert: {0}")]
    BereitsInitialisiert(String),
}

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
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
            anderes => Err(LoggingFehler::UnbekanntesFormat(anderes.to_string())),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `level` und `format` stammen aus der Konfiguration; `TT_LOG_LEVEL` und
/// `TT_LOG_FORMAT` ueberschreiben sie.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<(), LoggingFehler> {
    let level_env = std::env::var(ENV_LOG_LEVEL).ok();
    let format_env = std::env::var(ENV_LOG_FORMAT).ok();
    let (filter, format) = aufloesen(level, format, level_env.as_deref(), format_env.as_deref())?;

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| LoggingFehler::BereitsInitialisiert(e.to_string()))
}

/// Kombiniert Konfiguration und Umgebung zu Filter und Format
fn aufloesen(
    level: &str,
    format: &str,
    level_env: Option<&str>,
    format_env: Option<&str>,
) -> Result<(EnvFilter, LogFormat), LoggingFehler> {
    let direktive = level_env.unwrap_or(level);
    // Ein einzelnes Wort ohne `=` waere fuer EnvFilter ein Target-Name
    if ist_einzelnes_wort(direktive) && !log_level_gueltig(&direktive.to_ascii_lowercase()) {
        return Err(LoggingFehler::UngueltigerFilter(direktive.to_string()));
    }
    let filter = EnvFilter::try_new(direktive)
        .map_err(|_| LoggingFehler::UngueltigerFilter(direktive.to_string()))?;
    let format = format_env.unwrap_or(format).parse()?;
    Ok((filter, format))
}

/// Validiert ob ein einfacher Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error" | "off")
}

fn ist_einzelnes_wort(direktive: &str) -> bool {
    !direktive.contains(['=', ',', '[', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_gueltige_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level}");
        }
    }

    #[test]
    fn log_level_ungueltige_werte() {
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

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
    fn konfiguration_ohne_umgebung() {
        let (filter, format) = aufloesen("debug", "json", None, None).unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn umgebung_ueberschreibt_konfiguration() {
        let (filter, format) =
            aufloesen("info", "json", Some("teamtalk_client=trace"), Some("text")).unwrap();
        assert_eq!(format, LogFormat::Text);
        assert_eq!(filter.to_string(), "teamtalk_client=trace");
    }

    #[test]
    fn ungueltiges_format_aus_umgebung() {
        assert!(matches!(
            aufloesen("info", "text", None, Some("xml")),
            Err(LoggingFehler::UnbekanntesFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn tippfehler_im_level_wird_abgelehnt() {
        assert!(matches!(
            aufloesen("verbose", "text", None, None),
            Err(LoggingFehler::UngueltigerFilter(f)) if f == "verbose"
        ));
        assert!(matches!(
            aufloesen("info", "text", Some("lautstark"), None),
            Err(LoggingFehler::UngueltigerFilter(_))
        ));
        assert!(aufloesen("off", "text", None, None).is_ok());
        assert!(aufloesen("info", "text", Some("WARN"), None).is_ok());
    }

    #[test]
    fn ungueltiger_filter() {
        assert!(matches!(
            aufloesen("teamtalk=lautstark", "text", None, None),
            Err(LoggingFehler::UngueltigerFilter(_))
        ));
    }
}
