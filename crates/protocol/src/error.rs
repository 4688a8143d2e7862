//! Fehlertypen fuer das TeamTalk-Textprotokoll

use thiserror::Error;

/// Eine einzelne Zeile konnte nicht als Nachricht gelesen werden
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtokollFehler {
    #[error("Leere Zeile")]
    LeereZeile,

    #[error("Token ohne '=': {0}")]
    FehlendesGleichheitszeichen(String),

    #[error("Nicht geschlossenes Anfuehrungszeichen")]
    OffenesAnfuehrungszeichen,

    #[error("Escape-Zeichen am Zeilenende")]
    UnvollstaendigesEscape,

    #[error("Zeile ist kein gueltiges UTF-8")]
    KeinUtf8,

    /// Ausgehende Nachricht ueberschreitet die maximale Zeilenlaenge
    #[error("Nachricht zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    ZeileZuLang { laenge: usize, maximum: usize },
}

pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
