//! Geteilter Verbindungszustand zwischen Leseschleife, Keepalive und Schreib-Task
//!
//! ```text
//! Session (Leseschleife, Aufrufer-Task)
//!     |  FramedRead<OwnedReadHalf, ZeilenCodec>
//!     |
//!     +-- Arc<Gemeinsam> --+-- Keepalive-Task  (ping, liest usertimeout)
//!                          +-- Schreib-Task    (FramedWrite<OwnedWriteHalf>)
//!                          +-- SessionHandle   (beliebige Tasks/Threads)
//! ```
//!
//! Ausgehende Nachrichten laufen ueber eine mpsc-Queue zum Schreib-Task.
//! Das Herunterfahren wird ueber ein `watch`-Signal kooperativ an alle
//! Beteiligten verteilt.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use teamtalk_protocol::{Eingang, Params, ProtocolMessage, Value, ZeilenCodec};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::{ClientError, ClientResult};
use crate::session::SessionZustand;

pub(crate) type Leser = FramedRead<OwnedReadHalf, ZeilenCodec>;
pub(crate) type Schreiber = FramedWrite<OwnedWriteHalf, ZeilenCodec>;

// ---------------------------------------------------------------------------
// Gemeinsam
// ---------------------------------------------------------------------------

struct Ausgang {
    sender: mpsc::UnboundedSender<ProtocolMessage>,
    /// Nur fuer die Laengenpruefung vor dem Einreihen
    codec: ZeilenCodec,
}

/// Zustand den mehrere Tasks gleichzeitig lesen oder aendern
pub(crate) struct Gemeinsam {
    disconnecting: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    /// Queue zum Schreib-Task (erst nach `connect` gesetzt)
    ausgang: Mutex<Option<Ausgang>>,
    /// Wird von `serverupdate` (Leseschleife) geschrieben und vom Keepalive gelesen
    server_params: Mutex<Params>,
    zustand: Mutex<SessionZustand>,
    /// Erster Transportfehler des Schreib-Tasks
    transport_fehler: Mutex<Option<io::Error>>,
}

impl Gemeinsam {
    pub(crate) fn neu() -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            disconnecting: AtomicBool::new(false),
            shutdown_tx,
            ausgang: Mutex::new(None),
            server_params: Mutex::new(Params::new()),
            zustand: Mutex::new(SessionZustand::Idle),
            transport_fehler: Mutex::new(None),
        })
    }

    pub(crate) fn is_disconnecting(&self) -> bool {
        self.disconnecting.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_empfaenger(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub(crate) fn zustand(&self) -> SessionZustand {
        *self.zustand.lock()
    }

    pub(crate) fn zustand_setzen(&self, neu: SessionZustand) {
        let mut zustand = self.zustand.lock();
        tracing::debug!(von = ?*zustand, nach = ?neu, "Zustandswechsel");
        *zustand = neu;
    }

    /// Wechselt nur wenn der aktuelle Zustand `von` ist
    pub(crate) fn zustand_wechseln(&self, von: SessionZustand, nach: SessionZustand) -> bool {
        let mut zustand = self.zustand.lock();
        if *zustand != von {
            return false;
        }
        tracing::debug!(von = ?von, nach = ?nach, "Zustandswechsel");
        *zustand = nach;
        true
    }

    pub(crate) fn server_params(&self) -> parking_lot::MutexGuard<'_, Params> {
        self.server_params.lock()
    }

    pub(crate) fn ausgang_setzen(
        &self,
        sender: mpsc::UnboundedSender<ProtocolMessage>,
        codec: ZeilenCodec,
    ) {
        *self.ausgang.lock() = Some(Ausgang { sender, codec });
    }

    /// Reiht eine Nachricht beim Schreib-Task ein
    ///
    /// Zu lange Nachrichten werden hier mit `UngueltigeNachricht` abgelehnt
    /// und erreichen den Schreib-Task nie; die Verbindung bleibt bestehen.
    pub(crate) fn senden(&self, nachricht: ProtocolMessage) -> ClientResult<()> {
        if self.is_disconnecting() {
            return Err(ClientError::transport(
                io::ErrorKind::NotConnected,
                "Verbindung wird getrennt",
            ));
        }
        let ausgang = self.ausgang.lock();
        let Some(ausgang) = ausgang.as_ref() else {
            return Err(ClientError::transport(
                io::ErrorKind::NotConnected,
                "Nicht verbunden",
            ));
        };
        if let Err(e) = ausgang.codec.zeile_pruefen(&nachricht.build()) {
            tracing::warn!(event = %nachricht.event, fehler = %e, "Nachricht nicht gesendet");
            return Err(e.into());
        }
        ausgang.sender.send(nachricht).map_err(|_| {
            ClientError::transport(io::ErrorKind::BrokenPipe, "Schreib-Task beendet")
        })
    }

    /// Setzt `disconnecting` und weckt Leseschleife, Keepalive und Schreib-Task
    ///
    /// Ohne offene Verbindung (`Idle`, `Closed`) passiert nichts.
    pub(crate) fn herunterfahren(&self) -> bool {
        {
            let mut zustand = self.zustand.lock();
            match *zustand {
                SessionZustand::Idle | SessionZustand::Closed => return false,
                SessionZustand::Disconnecting => {}
                _ => {
                    tracing::debug!(von = ?*zustand, "Zustandswechsel nach Disconnecting");
                    *zustand = SessionZustand::Disconnecting;
                }
            }
        }
        self.disconnecting.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);
        true
    }

    pub(crate) fn transport_fehler_melden(&self, fehler: io::Error) {
        {
            let mut gespeichert = self.transport_fehler.lock();
            if gespeichert.is_none() {
                *gespeichert = Some(fehler);
            }
        }
        self.herunterfahren();
    }

    pub(crate) fn transport_fehler_nehmen(&self) -> Option<io::Error> {
        self.transport_fehler.lock().take()
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Klonbarer Zugriff auf eine laufende Session aus anderen Tasks oder Threads
///
/// Erlaubt Senden und Trennen waehrend die Leseschleife die `Session`
/// exklusiv haelt.
#[derive(Clone)]
pub struct SessionHandle {
    gemeinsam: Arc<Gemeinsam>,
}

impl SessionHandle {
    pub(crate) fn neu(gemeinsam: Arc<Gemeinsam>) -> Self {
        Self { gemeinsam }
    }

    /// Sendet eine beliebige Nachricht
    pub fn send_raw(&self, event: &str, params: Params) -> ClientResult<()> {
        self.gemeinsam.senden(ProtocolMessage {
            event: event.to_string(),
            params,
        })
    }

    /// Trennt die Verbindung; Leseschleife und Keepalive enden umgehend
    pub fn disconnect(&self) {
        if self.gemeinsam.herunterfahren() {
            tracing::info!("Verbindung wird getrennt");
        }
    }

    pub fn is_disconnecting(&self) -> bool {
        self.gemeinsam.is_disconnecting()
    }

    pub fn zustand(&self) -> SessionZustand {
        self.gemeinsam.zustand()
    }

    /// Kopie der aktuellen Server-Parameter
    pub fn server_params(&self) -> Params {
        self.gemeinsam.server_params().clone()
    }

    pub fn server_param(&self, key: &str) -> Option<Value> {
        self.gemeinsam.server_params().get(key).cloned()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("zustand", &self.gemeinsam.zustand())
            .field("disconnecting", &self.gemeinsam.is_disconnecting())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Schreib-Task
// ---------------------------------------------------------------------------

/// Schreibt Nachrichten aus der Queue bis zum Herunterfahren
///
/// Ein Schreibfehler wird als Transportfehler gemeldet und trennt die Session.
pub(crate) async fn schreib_schleife(
    mut schreiber: Schreiber,
    mut queue: mpsc::UnboundedReceiver<ProtocolMessage>,
    gemeinsam: Arc<Gemeinsam>,
) {
    let mut shutdown = gemeinsam.shutdown_empfaenger();

    loop {
        tokio::select! {
            // Bereits eingereihte Nachrichten zuerst
            biased;
            nachricht = queue.recv() => {
                let Some(nachricht) = nachricht else { break };
                tracing::trace!(event = %nachricht.event, "Sende Nachricht");
                if let Err(e) = schreiber.send(nachricht).await {
                    tracing::warn!(fehler = %e, "Senden fehlgeschlagen, Verbindung wird getrennt");
                    gemeinsam.transport_fehler_melden(e);
                    break;
                }
            }
            _ = heruntergefahren(&mut shutdown) => break,
        }
    }

    // Schreib-Haelfte schliessen
    if let Err(e) = schreiber.close().await {
        tracing::debug!(fehler = %e, "Schliessen der Schreib-Haelfte fehlgeschlagen");
    }
    tracing::debug!("Schreib-Task beendet");
}

/// Wartet auf das Shutdown-Signal
///
/// Der `watch::Ref` aus `wait_for` ist `!Send` und darf in keinem
/// `select!`-Zweig ueber ein `await` hinweg leben.
pub(crate) async fn heruntergefahren(shutdown: &mut watch::Receiver<bool>) {
    // Err nur wenn der Sender weg ist; dann ist die Session ohnehin beendet
    let _ = shutdown.wait_for(|aus| *aus).await;
}

// ---------------------------------------------------------------------------
// Lesen
// ---------------------------------------------------------------------------

/// Ergebnis eines Leseversuchs
pub(crate) enum Gelesen {
    Eingang(Eingang),
    Zeitueberschreitung,
    /// Server hat die Verbindung geschlossen
    Ende,
    Fehler(io::Error),
}

pub(crate) async fn naechste_zeile(leser: &mut Leser, timeout: Option<Duration>) -> Gelesen {
    let naechste = match timeout {
        Some(frist) => match tokio::time::timeout(frist, leser.next()).await {
            Ok(naechste) => naechste,
            Err(_) => return Gelesen::Zeitueberschreitung,
        },
        None => leser.next().await,
    };
    match naechste {
        Some(Ok(eingang)) => Gelesen::Eingang(eingang),
        Some(Err(e)) => Gelesen::Fehler(e),
        None => Gelesen::Ende,
    }
}
