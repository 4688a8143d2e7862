//! Session – eine Verbindung zu genau einem TeamTalk-Server
//!
//! ## State Machine
//! ```text
//! Idle -> Connected -> LoggingIn -> LoggedIn -> Disconnecting -> Closed
//!   ^        |             |            |
//!   |        +-------------+------------+---> Disconnecting (disconnect,
//!   |                                          Transportfehler)
//!   +-- HandshakeTimeout / ProtokollMismatch
//! ```
//!
//! ## Ablauf
//! 1. [`Session::connect`] oeffnet die TCP-Verbindung und wartet auf die
//!    Willkommensnachricht (`teamtalk ...`), deren Parameter zu den
//!    Server-Parametern werden.
//! 2. [`Session::login`] sendet die Anmeldung mit `id=1` und startet den
//!    Keepalive. Der Erfolg zeigt sich erst ueber `accepted`/`loggedin`.
//! 3. [`Session::handle_messages`] liest Zeilen, aktualisiert den Cache
//!    ueber die internen Handler und ruft danach die externen Handler auf.
//! 4. [`Session::disconnect`] (oder [`SessionHandle::disconnect`]) beendet
//!    Leseschleife, Keepalive und Schreib-Task.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use teamtalk_protocol::konstanten::{MessageType, LOGIN_ID, PONG, WILLKOMMEN_EVENT};
use teamtalk_protocol::{Eingang, Params, ProtocolMessage, Value, ZeilenCodec};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::cache::{merge, Channel, Lookup, User, ZustandsCache};
use crate::dispatcher::{EventDispatcher, HandlerId};
use crate::error::{ClientError, ClientResult};
use crate::keepalive::keepalive_schleife;
use crate::konfig::{ClientKonfig, LoginDaten};
use crate::verbindung::{
    heruntergefahren, naechste_zeile, schreib_schleife, Gelesen, Gemeinsam, Leser, SessionHandle,
};

/// Zustand der Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionZustand {
    /// Noch nicht verbunden
    Idle,
    /// Willkommensnachricht empfangen
    Connected,
    /// `login` gesendet, warte auf `accepted`
    LoggingIn,
    /// `accepted` empfangen
    LoggedIn,
    /// Trennen angefordert
    Disconnecting,
    /// Verbindung geschlossen (Session nicht wiederverwendbar)
    Closed,
}

/// Client-Session zu einem TeamTalk-Server
pub struct Session {
    konfig: ClientKonfig,
    gemeinsam: Arc<Gemeinsam>,
    cache: ZustandsCache,
    dispatcher: EventDispatcher,
    /// Korrelations-ID des laufenden `begin`/`end`-Blocks (0 = keiner)
    current_id: u64,
    /// `true` zwischen `begin id=1` und `end id=1`
    logging_in: bool,
    leser: Option<Leser>,
    keepalive: Option<JoinHandle<()>>,
}

impl Session {
    /// Erstellt eine neue, unverbundene Session
    pub fn neu(konfig: ClientKonfig) -> Self {
        Self {
            konfig,
            gemeinsam: Gemeinsam::neu(),
            cache: ZustandsCache::default(),
            dispatcher: EventDispatcher::neu(),
            current_id: 0,
            logging_in: false,
            leser: None,
            keepalive: None,
        }
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Baut die TCP-Verbindung auf und liest die Willkommensnachricht
    ///
    /// # Fehler
    /// - `HandshakeTimeout` wenn innerhalb von `handshake_timeout` keine Zeile kommt
    /// - `ProtokollMismatch` wenn die erste Zeile nicht mit `teamtalk` beginnt;
    ///   die Server-Parameter bleiben dann leer und die Session `Idle`
    /// - `Transport` bei Socket-Fehlern
    pub async fn connect(&mut self) -> ClientResult<()> {
        self.zustand_pruefen("connect", SessionZustand::Idle)?;

        let adresse = self.konfig.server.adresse();
        let einstellungen = &self.konfig.verbindung;
        tracing::info!(adresse = %adresse, "Verbinde mit TeamTalk-Server");

        let stream = tokio::time::timeout(
            einstellungen.verbindungs_timeout(),
            TcpStream::connect(&adresse),
        )
        .await
        .map_err(|_| {
            ClientError::transport(
                io::ErrorKind::TimedOut,
                format!("Verbindungsaufbau zu {adresse} dauerte zu lange"),
            )
        })??;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(fehler = %e, "TCP_NODELAY nicht gesetzt");
        }

        let codec = ZeilenCodec::with_max_laenge(einstellungen.max_zeilen_laenge);
        let (lesen, schreiben) = stream.into_split();
        let mut leser = FramedRead::new(lesen, codec.clone());

        let willkommen = willkommen_lesen(&mut leser, einstellungen.handshake_timeout()).await?;
        tracing::info!(
            adresse = %adresse,
            parameter = willkommen.len(),
            "Willkommensnachricht empfangen"
        );
        *self.gemeinsam.server_params() = willkommen;

        let (sender, queue) = mpsc::unbounded_channel();
        self.gemeinsam.ausgang_setzen(sender, codec.clone());
        tokio::spawn(schreib_schleife(
            FramedWrite::new(schreiben, codec),
            queue,
            Arc::clone(&self.gemeinsam),
        ));

        self.leser = Some(leser);
        self.gemeinsam.zustand_setzen(SessionZustand::Connected);
        Ok(())
    }

    /// Sendet die Anmeldung (Korrelations-ID 1) und startet den Keepalive
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden. Ob die
    /// Anmeldung erfolgreich war, zeigt sich ueber `accepted` bzw. `error`.
    pub fn login(&mut self, daten: &LoginDaten) -> ClientResult<()> {
        self.zustand_pruefen("login", SessionZustand::Connected)?;

        let nachricht = ProtocolMessage::neu("login")
            .mit("nickname", daten.nickname.as_str())
            .mit("username", daten.username.as_str())
            .mit("password", daten.password.as_str())
            .mit("clientname", daten.client_name.as_str())
            .mit("protocol", daten.protocol_version.as_str())
            .mit("version", daten.client_version.as_str())
            .mit("id", LOGIN_ID);
        self.gemeinsam.senden(nachricht)?;
        self.gemeinsam.zustand_setzen(SessionZustand::LoggingIn);
        tracing::info!(
            nickname = %daten.nickname,
            username = %daten.username,
            "Anmeldung gesendet"
        );

        self.keepalive = Some(tokio::spawn(keepalive_schleife(Arc::clone(&self.gemeinsam))));
        Ok(())
    }

    /// Leseschleife mit dem Lese-Timeout aus der Konfiguration und ohne Callback
    pub async fn run(&mut self) -> ClientResult<()> {
        let timeout = self.konfig.verbindung.lese_timeout();
        self.handle_messages(timeout, |_, _, _| {}).await
    }

    /// Verarbeitet eingehende Zeilen bis die Session getrennt wird
    ///
    /// `callback` wird nach den Handlern fuer jede Zeile aufgerufen. Bei
    /// nicht lesbaren Zeilen, `pong` und abgelaufenem `timeout` erhaelt er
    /// ein leeres Event und leere Parameter.
    ///
    /// Gibt `Ok(())` zurueck wenn die Session ueber `disconnect` beendet
    /// wurde, und `Transport` wenn die Verbindung abbricht. In beiden Faellen
    /// ist die Session danach `Closed`.
    pub async fn handle_messages<F>(
        &mut self,
        timeout: Option<Duration>,
        mut callback: F,
    ) -> ClientResult<()>
    where
        F: FnMut(&Session, &str, &Params),
    {
        let Some(mut leser) = self.leser.take() else {
            return Err(ClientError::UngueltigerZustand {
                operation: "handle_messages",
                aktuell: self.zustand(),
            });
        };
        let mut shutdown = self.gemeinsam.shutdown_empfaenger();
        let leer = Params::new();

        let ergebnis = loop {
            if self.gemeinsam.is_disconnecting() {
                break Ok(());
            }

            let gelesen = tokio::select! {
                _ = heruntergefahren(&mut shutdown) => break Ok(()),
                gelesen = naechste_zeile(&mut leser, timeout) => gelesen,
            };

            match gelesen {
                Gelesen::Eingang(Eingang::Nachricht(nachricht)) => {
                    self.dispatch(nachricht, &mut callback)
                }
                Gelesen::Eingang(Eingang::Pong) => {
                    tracing::trace!("{PONG} verworfen");
                    callback(&*self, "", &leer);
                }
                Gelesen::Eingang(Eingang::Ungueltig(e)) => {
                    tracing::debug!(fehler = %e, "Zeile nicht lesbar, wird uebersprungen");
                    callback(&*self, "", &leer);
                }
                Gelesen::Zeitueberschreitung => callback(&*self, "", &leer),
                Gelesen::Fehler(e) => {
                    tracing::warn!(fehler = %e, "Lesefehler, Verbindung wird getrennt");
                    break Err(ClientError::Transport(e));
                }
                Gelesen::Ende => {
                    tracing::warn!("Verbindung vom Server geschlossen");
                    break Err(ClientError::transport(
                        io::ErrorKind::UnexpectedEof,
                        "Verbindung vom Server geschlossen",
                    ));
                }
            }
        };

        drop(leser);
        self.abbauen().await;

        match (ergebnis, self.gemeinsam.transport_fehler_nehmen()) {
            (Ok(()), Some(fehler)) => Err(ClientError::Transport(fehler)),
            (ergebnis, _) => ergebnis,
        }
    }

    /// Trennt die Verbindung
    ///
    /// Setzt `disconnecting`; eine blockierte Leseschleife und die
    /// Keepalive-Wartezeit enden sofort. Laeuft keine Leseschleife, bleibt
    /// die Lese-Haelfte offen bis [`Session::schliessen`], `handle_messages`
    /// oder das Drop der Session.
    pub fn disconnect(&self) {
        self.handle().disconnect();
    }

    /// Trennt und schliesst die Verbindung ohne Leseschleife
    ///
    /// Danach ist die Session `Closed`. In `Idle` und `Closed` passiert nichts.
    pub async fn schliessen(&mut self) {
        if matches!(self.zustand(), SessionZustand::Idle | SessionZustand::Closed) {
            return;
        }
        drop(self.leser.take());
        self.abbauen().await;
    }

    /// Handle fuer andere Tasks/Threads (Senden, Trennen)
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::neu(Arc::clone(&self.gemeinsam))
    }

    // -----------------------------------------------------------------------
    // Abonnements
    // -----------------------------------------------------------------------

    /// Registriert einen Handler; er sieht den bereits aktualisierten Cache
    pub fn subscribe<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Session, &Params) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(event, handler)
    }

    pub fn unsubscribe(&mut self, event: &str, id: HandlerId) -> ClientResult<()> {
        self.dispatcher.unsubscribe(event, id)
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    pub fn send_raw(&self, event: &str, params: Params) -> ClientResult<()> {
        self.gemeinsam.senden(ProtocolMessage {
            event: event.to_string(),
            params,
        })
    }

    /// Private Textnachricht an einen Benutzer
    pub fn user_message(&self, userid: u64, inhalt: &str) -> ClientResult<()> {
        self.gemeinsam.senden(
            ProtocolMessage::neu("message")
                .mit("type", MessageType::User.wert())
                .mit("destuserid", userid)
                .mit("content", inhalt),
        )
    }

    /// Textnachricht in einen Kanal
    pub fn channel_message(&self, chanid: u64, inhalt: &str) -> ClientResult<()> {
        self.gemeinsam.senden(
            ProtocolMessage::neu("message")
                .mit("type", MessageType::Channel.wert())
                .mit("chanid", chanid)
                .mit("content", inhalt),
        )
    }

    /// Nachricht an alle Benutzer (erfordert `USERRIGHT_TEXTMESSAGE_BROADCAST`)
    pub fn broadcast_message(&self, inhalt: &str) -> ClientResult<()> {
        self.gemeinsam.senden(
            ProtocolMessage::neu("message")
                .mit("type", MessageType::Broadcast.wert())
                .mit("content", inhalt),
        )
    }

    pub fn join_channel(&self, chanid: u64, passwort: &str) -> ClientResult<()> {
        self.gemeinsam.senden(
            ProtocolMessage::neu("join")
                .mit("chanid", chanid)
                .mit("password", passwort),
        )
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn zustand(&self) -> SessionZustand {
        self.gemeinsam.zustand()
    }

    pub fn ist_eingeloggt(&self) -> bool {
        self.zustand() == SessionZustand::LoggedIn
    }

    pub fn is_disconnecting(&self) -> bool {
        self.gemeinsam.is_disconnecting()
    }

    /// `true` waehrend des Login-Bursts (zwischen `begin id=1` und `end id=1`)
    pub fn logging_in(&self) -> bool {
        self.logging_in
    }

    pub fn current_id(&self) -> u64 {
        self.current_id
    }

    pub fn konfig(&self) -> &ClientKonfig {
        &self.konfig
    }

    pub fn cache(&self) -> &ZustandsCache {
        &self.cache
    }

    pub fn channels(&self) -> &[Channel] {
        self.cache.channels()
    }

    pub fn users(&self) -> &[User] {
        self.cache.users()
    }

    pub fn me(&self) -> &User {
        self.cache.me()
    }

    pub fn find_channel<'a>(&self, key: impl Into<Lookup<'a>>) -> Option<&Channel> {
        self.cache.find_channel(key)
    }

    pub fn find_user<'a>(&self, key: impl Into<Lookup<'a>>) -> Option<&User> {
        self.cache.find_user(key)
    }

    pub fn users_in_channel(&self, chanid: Option<u64>) -> Vec<&User> {
        self.cache.users_in_channel(chanid)
    }

    /// Kopie der aktuellen Server-Parameter
    pub fn server_params(&self) -> Params {
        self.gemeinsam.server_params().clone()
    }

    pub fn server_param(&self, key: &str) -> Option<Value> {
        self.gemeinsam.server_params().get(key).cloned()
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    /// Keepalive und Schreib-Task beenden, danach `Closed`
    async fn abbauen(&mut self) {
        self.gemeinsam.herunterfahren();
        if let Some(keepalive) = self.keepalive.take() {
            if let Err(e) = keepalive.await {
                tracing::warn!(fehler = %e, "Keepalive-Task abgebrochen");
            }
        }
        self.gemeinsam.zustand_setzen(SessionZustand::Closed);
        tracing::info!("Verbindung geschlossen");
    }

    fn zustand_pruefen(
        &self,
        operation: &'static str,
        erwartet: SessionZustand,
    ) -> ClientResult<()> {
        let aktuell = self.zustand();
        if aktuell != erwartet {
            return Err(ClientError::UngueltigerZustand { operation, aktuell });
        }
        Ok(())
    }

    /// Interne Handler, dann externe Handler, dann Callback
    fn dispatch<F>(&mut self, nachricht: ProtocolMessage, callback: &mut F)
    where
        F: FnMut(&Session, &str, &Params),
    {
        let event = nachricht.event_normalisiert();
        tracing::trace!(event = %event, "Event empfangen");
        self.intern_verarbeiten(&event, &nachricht.params);

        let session: &Session = self;
        for (_, handler) in session.dispatcher.handler_fuer(&event) {
            handler(session, &nachricht.params);
        }
        callback(session, &event, &nachricht.params);
    }

    /// Zustands-Handler; laufen vor allen externen Handlern
    fn intern_verarbeiten(&mut self, event: &str, params: &Params) {
        match event {
            "error" => {
                let nummer = params.get("number").and_then(Value::as_int);
                let meldung = params.get("message").map(ToString::to_string).unwrap_or_default();
                tracing::warn!(nummer, meldung = %meldung, "Server meldet Fehler");
            }
            "begin" => {
                if let Some(id) = params.get("id").and_then(Value::as_int) {
                    self.current_id = id;
                    if id == LOGIN_ID {
                        self.logging_in = true;
                    }
                }
            }
            "end" => {
                self.current_id = 0;
                if params.get("id").and_then(Value::as_int) == Some(LOGIN_ID) {
                    self.logging_in = false;
                }
            }
            "accepted" => {
                self.cache.selbst_aktualisiert(params);
                if self
                    .gemeinsam
                    .zustand_wechseln(SessionZustand::LoggingIn, SessionZustand::LoggedIn)
                {
                    tracing::info!(userid = ?self.cache.me().userid(), "Anmeldung akzeptiert");
                }
            }
            "serverupdate" => merge(&mut self.gemeinsam.server_params(), params),
            "loggedin" => self.cache.user_eingeloggt(params),
            "loggedout" => self.cache.user_ausgeloggt(params),
            "updateuser" | "adduser" => self.cache.user_aktualisiert(params),
            "removeuser" => self.cache.user_kanal_verlassen(params),
            "addchannel" => self.cache.channel_hinzugefuegt(params),
            "updatechannel" => self.cache.channel_aktualisiert(params),
            "removechannel" => self.cache.channel_entfernt(params),
            _ => {}
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Keepalive und Schreib-Task duerfen die Session nicht ueberleben
        self.gemeinsam.herunterfahren();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.konfig.server.adresse())
            .field("zustand", &self.zustand())
            .field("current_id", &self.current_id)
            .field("logging_in", &self.logging_in)
            .field("channels", &self.cache.channels().len())
            .field("users", &self.cache.users().len())
            .finish()
    }
}

/// Liest die erste Zeile und prueft, ob sie die Willkommensnachricht ist
async fn willkommen_lesen(leser: &mut Leser, frist: Duration) -> ClientResult<Params> {
    let erste = tokio::time::timeout(frist, naechste_zeile(leser, None))
        .await
        .map_err(|_| ClientError::HandshakeTimeout(frist))?;

    let erhalten = match erste {
        Gelesen::Eingang(Eingang::Nachricht(n))
            if n.event.eq_ignore_ascii_case(WILLKOMMEN_EVENT) =>
        {
            return Ok(n.params)
        }
        Gelesen::Eingang(Eingang::Nachricht(n)) => n.event,
        Gelesen::Eingang(Eingang::Pong) => PONG.to_string(),
        Gelesen::Eingang(Eingang::Ungueltig(e)) => e.to_string(),
        Gelesen::Zeitueberschreitung => return Err(ClientError::HandshakeTimeout(frist)),
        Gelesen::Fehler(e) => return Err(ClientError::Transport(e)),
        Gelesen::Ende => {
            return Err(ClientError::transport(
                io::ErrorKind::UnexpectedEof,
                "Verbindung vor der Willkommensnachricht geschlossen",
            ))
        }
    };

    tracing::warn!(erhalten = %erhalten, "Unerwartete Begruessung, Verbindung wird verworfen");
    Err(ClientError::ProtokollMismatch {
        erwartet: WILLKOMMEN_EVENT,
        erhalten,
    })
}
