//! Keepalive – haelt eine eingeloggte Verbindung am Leben
//!
//! Sendet periodisch `ping`. Das Intervall wird in jedem Durchlauf neu aus
//! dem aktuellen `usertimeout` des Servers berechnet, da `serverupdate` den
//! Wert jederzeit aendern kann:
//!
//! | usertimeout | Intervall |
//! |---|---|
//! | < 1 s | 0,3 s |
//! | < 1,5 s | 0,5 s |
//! | sonst | 0,75 × usertimeout |
//!
//! Die Wartezeit endet sofort, wenn die Session getrennt wird.

use std::sync::Arc;
use std::time::Duration;

use teamtalk_protocol::konstanten::PING;
use teamtalk_protocol::{Params, ProtocolMessage, Value};

use crate::verbindung::{heruntergefahren, Gemeinsam};

/// Annahme falls der Server kein `usertimeout` gesendet hat
pub const STANDARD_USERTIMEOUT_SEK: f64 = 60.0;

/// Berechnet die Wartezeit bis zum naechsten `ping`
pub fn keepalive_intervall(usertimeout_sek: f64) -> Duration {
    if !usertimeout_sek.is_finite() {
        return keepalive_intervall(STANDARD_USERTIMEOUT_SEK);
    }
    if usertimeout_sek < 1.0 {
        Duration::from_millis(300)
    } else if usertimeout_sek < 1.5 {
        Duration::from_millis(500)
    } else {
        Duration::try_from_secs_f64(usertimeout_sek * 0.75).unwrap_or(Duration::MAX)
    }
}

/// Liest `usertimeout` (Sekunden) aus den Server-Parametern
pub fn usertimeout_sek(params: &Params) -> Option<f64> {
    match params.get("usertimeout")? {
        Value::Integer(n) => Some(*n as f64),
        Value::Text(t) => t.trim().parse().ok(),
        Value::List(_) => None,
    }
}

/// Keepalive-Schleife, laeuft als eigener Task von `login` bis zum Trennen
pub(crate) async fn keepalive_schleife(gemeinsam: Arc<Gemeinsam>) {
    let mut shutdown = gemeinsam.shutdown_empfaenger();
    tracing::debug!("Keepalive gestartet");

    while !gemeinsam.is_disconnecting() {
        // Kein erneuter Versuch: der Schreib-Task trennt bei Transportfehlern
        if let Err(e) = gemeinsam.senden(ProtocolMessage::neu(PING)) {
            tracing::warn!(fehler = %e, "Keepalive konnte nicht gesendet werden");
            break;
        }

        let usertimeout = usertimeout_sek(&gemeinsam.server_params());
        let intervall = keepalive_intervall(usertimeout.unwrap_or_else(|| {
            tracing::warn!(
                standard = STANDARD_USERTIMEOUT_SEK,
                "Server hat kein usertimeout gesendet"
            );
            STANDARD_USERTIMEOUT_SEK
        }));
        tracing::trace!(?intervall, "Naechster Keepalive");

        tokio::select! {
            _ = heruntergefahren(&mut shutdown) => break,
            _ = tokio::time::sleep(intervall) => {}
        }
    }

    tracing::debug!("Keepalive beendet");
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamtalk_protocol::parse;

    #[test]
    fn intervall_unter_einer_sekunde() {
        assert_eq!(keepalive_intervall(0.5), Duration::from_millis(300));
        assert_eq!(keepalive_intervall(0.0), Duration::from_millis(300));
    }

    #[test]
    fn intervall_unter_anderthalb_sekunden() {
        assert_eq!(keepalive_intervall(1.2), Duration::from_millis(500));
        assert_eq!(keepalive_intervall(1.0), Duration::from_millis(500));
    }

    #[test]
    fn intervall_drei_viertel_des_timeouts() {
        assert_eq!(keepalive_intervall(4.0), Duration::from_secs(3));
        assert_eq!(keepalive_intervall(60.0), Duration::from_secs(45));
    }

    #[test]
    fn intervall_ungueltige_werte() {
        assert_eq!(keepalive_intervall(f64::NAN), Duration::from_secs(45));
        assert_eq!(keepalive_intervall(f64::MAX), Duration::MAX);
    }

    #[test]
    fn usertimeout_aus_params() {
        assert_eq!(usertimeout_sek(&parse("teamtalk usertimeout=60").unwrap().params), Some(60.0));
        assert_eq!(usertimeout_sek(&parse(r#"x usertimeout="1.2""#).unwrap().params), Some(1.2));
        assert_eq!(usertimeout_sek(&parse("x usertimeout=[1]").unwrap().params), None);
        assert_eq!(usertimeout_sek(&Params::new()), None);
    }
}
