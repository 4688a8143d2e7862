//! teamtalk-monitor – Bibliotheks-Root
//!
//! Meldet sich an einem TeamTalk-Server an und protokolliert An- und
//! Abmeldungen sowie zugestellte Textnachrichten bis Ctrl-C.

use anyhow::Result;
use teamtalk_client::{ClientKonfig, Params, Session, Value};
use teamtalk_protocol::konstanten::MessageType;

/// Haelt die Monitor-Konfiguration zusammen
pub struct Monitor {
    pub konfig: ClientKonfig,
}

impl Monitor {
    pub fn neu(konfig: ClientKonfig) -> Self {
        Self { konfig }
    }

    /// Verbindet, meldet an und laeuft bis Ctrl-C oder Verbindungsabbruch
    pub async fn starten(self) -> Result<()> {
        let anmeldung = self.konfig.anmeldung.clone();
        let mut session = Session::neu(self.konfig);

        session.connect().await?;
        if let Some(name) = session.server_param("servername") {
            tracing::info!(servername = %name, "Verbunden");
        }
        session.login(&anmeldung)?;

        session.subscribe("accepted", |s, _| {
            tracing::info!(userid = ?s.me().userid(), "Angemeldet");
        });
        session.subscribe("loggedin", |_, params| {
            let userid = params.get("userid").and_then(Value::as_int);
            tracing::info!(
                userid = ?userid,
                nickname = %text(params, "nickname"),
                "Benutzer angemeldet"
            );
        });
        session.subscribe("loggedout", |s, params| {
            // Der Cache hat den Benutzer bereits entfernt
            let userid = params.get("userid").and_then(Value::as_int);
            tracing::info!(userid = ?userid, verbleibend = s.users().len(), "Benutzer abgemeldet");
        });
        session.subscribe("messagedeliver", |s, params| {
            let absender = params
                .get("srcuserid")
                .and_then(Value::as_int)
                .and_then(|id| s.find_user(id))
                .and_then(|u| u.nickname())
                .unwrap_or("?");
            tracing::info!(
                art = nachrichten_art(params),
                absender = %absender,
                inhalt = %text(params, "content"),
                "Textnachricht"
            );
        });

        let handle = session.handle();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Monitor wird beendet"),
                Err(e) => tracing::warn!(fehler = %e, "Ctrl-C-Handler nicht verfuegbar"),
            }
            handle.disconnect();
        });

        tracing::info!("Monitor laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        session.run().await?;
        Ok(())
    }
}

/// Lesbare Bezeichnung des Nachrichtentyps von `messagedeliver`
pub fn nachrichten_art(params: &Params) -> &'static str {
    match params
        .get("type")
        .and_then(Value::as_int)
        .and_then(MessageType::aus_wert)
    {
        Some(MessageType::User) => "privat",
        Some(MessageType::Channel) => "kanal",
        Some(MessageType::Broadcast) => "broadcast",
        Some(MessageType::Custom) => "custom",
        Some(MessageType::None) | None => "unbekannt",
    }
}

fn text(params: &Params, key: &str) -> String {
    params.get(key).map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamtalk_protocol::parse;

    #[test]
    fn nachrichten_art_aus_type() {
        let art = |zeile: &str| nachrichten_art(&parse(zeile).unwrap().params);
        assert_eq!(art("messagedeliver type=1 content=hallo"), "privat");
        assert_eq!(art("messagedeliver type=2 chanid=1"), "kanal");
        assert_eq!(art("messagedeliver type=3"), "broadcast");
        assert_eq!(art("messagedeliver type=99"), "unbekannt");
        assert_eq!(art("messagedeliver"), "unbekannt");
    }

    #[test]
    fn text_fehlender_schluessel_ist_leer() {
        let params = parse(r#"loggedin nickname="Anna""#).unwrap().params;
        assert_eq!(text(&params, "nickname"), "Anna");
        assert_eq!(text(&params, "username"), "");
    }
}
