//! Fehlertypen fuer den TeamTalk-Client

use std::time::Duration;

use teamtalk_protocol::ProtokollFehler;
use thiserror::Error;

use crate::session::SessionZustand;

/// Alle moeglichen Fehler im Client-Crate
#[derive(Debug, Error)]
pub enum ClientError {
    /// Keine Willkommensnachricht innerhalb der Frist
    #[error("Server hat innerhalb von {0:?} keine Willkommensnachricht gesendet")]
    HandshakeTimeout(Duration),

    /// Erste Zeile war nicht die erwartete Begruessung (anderes Protokoll, TeamTalk 4, ...)
    #[error("Protokoll passt nicht: erwartet '{erwartet}', erhalten '{erhalten}'")]
    ProtokollMismatch {
        erwartet: &'static str,
        erhalten: String,
    },

    /// Einzelne Zeile nicht lesbar
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(#[from] ProtokollFehler),

    /// Socket-Fehler beim Senden oder Empfangen
    #[error("Transportfehler: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Operation '{operation}' im Zustand {aktuell:?} nicht erlaubt")]
    UngueltigerZustand {
        operation: &'static str,
        aktuell: SessionZustand,
    },

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl ClientError {
    /// Transportfehler ohne zugrundeliegenden IO-Fehler
    pub fn transport(kind: std::io::ErrorKind, msg: impl Into<String>) -> Self {
        Self::Transport(std::io::Error::new(kind, msg.into()))
    }
}

/// Result-Typ fuer den TeamTalk-Client
pub type ClientResult<T> = Result<T, ClientError>;
