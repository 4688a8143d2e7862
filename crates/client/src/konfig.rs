//! Client-Konfiguration
//!
//! Wird aus einer TOML-Datei geladen. Alle Felder haben Standardwerte,
//! sodass der Client auch ohne Konfigurationsdatei lauffaehig ist.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use teamtalk_protocol::konstanten::STANDARD_TCP_PORT;
use teamtalk_protocol::wire::DEFAULT_MAX_ZEILEN_LAENGE;

use crate::error::{ClientError, ClientResult};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientKonfig {
    /// Zielserver
    pub server: ServerAdresse,
    /// Anmeldedaten fuer `login`
    pub anmeldung: LoginDaten,
    /// Timeouts und Limits der Verbindung
    pub verbindung: VerbindungsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Adresse des TeamTalk-Servers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerAdresse {
    pub host: String,
    pub tcp_port: u16,
}

impl Default for ServerAdresse {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            tcp_port: STANDARD_TCP_PORT,
        }
    }
}

impl ServerAdresse {
    /// `host:port` fuer `TcpStream::connect`
    pub fn adresse(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }
}

/// Anmeldedaten und Client-Kennung fuer die `login`-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginDaten {
    pub nickname: String,
    pub username: String,
    pub password: String,
    /// `clientname=`
    pub client_name: String,
    /// `protocol=`
    pub protocol_version: String,
    /// `version=`
    pub client_version: String,
}

impl Default for LoginDaten {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            username: String::new(),
            password: String::new(),
            client_name: "TeamTalkRsClient".into(),
            protocol_version: "5.6".into(),
            client_version: "1.0".into(),
        }
    }
}

/// Timeouts und Limits der TCP-Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// Maximale Dauer fuer den TCP-Verbindungsaufbau
    pub verbindungs_timeout_ms: u64,
    /// Maximale Wartezeit auf die Willkommensnachricht
    pub handshake_timeout_ms: u64,
    /// Lese-Timeout der Nachrichtenschleife (leer = ohne Timeout)
    pub lese_timeout_ms: Option<u64>,
    /// Maximale Zeilenlaenge in Bytes
    pub max_zeilen_laenge: usize,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            verbindungs_timeout_ms: 10_000,
            handshake_timeout_ms: 3_000,
            lese_timeout_ms: None,
            max_zeilen_laenge: DEFAULT_MAX_ZEILEN_LAENGE,
        }
    }
}

impl VerbindungsEinstellungen {
    pub fn verbindungs_timeout(&self) -> Duration {
        Duration::from_millis(self.verbindungs_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn lese_timeout(&self) -> Option<Duration> {
        self.lese_timeout_ms.map(Duration::from_millis)
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientKonfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> ClientResult<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| ClientError::Konfiguration(format!("Fehler in '{pfad}': {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(ClientError::Konfiguration(format!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    pub fn aus_toml(inhalt: &str) -> ClientResult<Self> {
        toml::from_str(inhalt).map_err(|e| ClientError::Konfiguration(e.to_string()))
    }
}
