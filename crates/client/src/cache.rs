//! Zustands-Cache: Kanaele, Benutzer und eigener Benutzer
//!
//! Der Cache wird ausschliesslich von den internen Event-Handlern der
//! [`Session`](crate::Session) veraendert. Von aussen ist er nur lesbar, so
//! dass sein Inhalt immer genau der beobachteten Event-Folge entspricht.
//!
//! ## Bekannte Einschraenkungen
//! Nicknames und Kanalnamen sind auf dem Server nicht eindeutig. Eine Suche
//! per Name liefert den ersten Treffer in Einfuegereihenfolge.
//!
//! Namen aus reinen Ziffern (`channel="2024"`) kommen als `Integer` an.
//! `name()`/`nickname()` liefern dafuer `None`, die Suche per
//! [`Lookup::Name`] vergleicht aber die Textform und findet sie.

use teamtalk_protocol::konstanten::{USERTYPE_ADMIN, USERTYPE_DEFAULT};
use teamtalk_protocol::{Params, Value};

/// Suchschluessel fuer [`ZustandsCache::find_channel`] und [`ZustandsCache::find_user`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// `chanid` bzw. `userid`
    Id(u64),
    /// `channel` bzw. `nickname`
    Name(&'a str),
}

impl From<u64> for Lookup<'_> {
    fn from(id: u64) -> Self {
        Lookup::Id(id)
    }
}

impl<'a> From<&'a str> for Lookup<'a> {
    fn from(name: &'a str) -> Self {
        Lookup::Name(name)
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Ein Kanal mit allen Feldern wie vom Server gesendet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    felder: Params,
}

impl Channel {
    pub(crate) fn neu(felder: Params) -> Self {
        Self { felder }
    }

    pub fn chanid(&self) -> Option<u64> {
        self.felder.get("chanid").and_then(Value::as_int)
    }

    /// Kanalname (Feld `channel`, bei TeamTalk der volle Pfad)
    pub fn name(&self) -> Option<&str> {
        self.felder.get("channel").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.felder.get(key)
    }

    pub fn felder(&self) -> &Params {
        &self.felder
    }

    fn passt(&self, key: Lookup<'_>) -> bool {
        match key {
            Lookup::Id(id) => self.chanid() == Some(id),
            Lookup::Name(name) => name_passt(self.felder.get("channel"), name),
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Rolle eines Benutzers laut `usertype`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRolle {
    Admin,
    Standard,
    Unbekannt,
}

/// Ein angemeldeter Benutzer mit allen Feldern wie vom Server gesendet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    felder: Params,
}

impl User {
    pub(crate) fn neu(felder: Params) -> Self {
        Self { felder }
    }

    pub fn userid(&self) -> Option<u64> {
        self.felder.get("userid").and_then(Value::as_int)
    }

    pub fn nickname(&self) -> Option<&str> {
        self.felder.get("nickname").and_then(Value::as_str)
    }

    pub fn username(&self) -> Option<&str> {
        self.felder.get("username").and_then(Value::as_str)
    }

    /// Kanal in dem sich der Benutzer befindet (`None` = in keinem Kanal)
    pub fn chanid(&self) -> Option<u64> {
        self.felder
            .get("chanid")
            .and_then(Value::as_int)
            .filter(|id| *id != 0)
    }

    pub fn rolle(&self) -> UserRolle {
        match self.felder.get("usertype").and_then(Value::as_int) {
            Some(USERTYPE_ADMIN) => UserRolle::Admin,
            Some(USERTYPE_DEFAULT) => UserRolle::Standard,
            _ => UserRolle::Unbekannt,
        }
    }

    /// Prueft ein Recht aus `teamtalk_protocol::konstanten::USERRIGHT_*`
    pub fn hat_recht(&self, recht: u64) -> bool {
        self.felder
            .get("userrights")
            .and_then(Value::as_int)
            .is_some_and(|rechte| rechte & recht == recht)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.felder.get(key)
    }

    pub fn felder(&self) -> &Params {
        &self.felder
    }

    fn passt(&self, key: Lookup<'_>) -> bool {
        match key {
            Lookup::Id(id) => self.userid() == Some(id),
            Lookup::Name(name) => name_passt(self.felder.get("nickname"), name),
        }
    }

    fn zusammenfuehren(&mut self, params: &Params) {
        merge(&mut self.felder, params);
    }
}

/// Vergleicht ein Namensfeld in Textform (auch als `Integer` getypte Ziffern)
fn name_passt(feld: Option<&Value>, name: &str) -> bool {
    match feld {
        Some(Value::Text(t)) => t == name,
        Some(Value::Integer(n)) => n.to_string() == name,
        _ => false,
    }
}

/// Uebernimmt alle Felder aus `neu`, bestehende Schluessel werden ueberschrieben
pub(crate) fn merge(ziel: &mut Params, neu: &Params) {
    for (key, wert) in neu {
        ziel.insert(key.clone(), wert.clone());
    }
}

// ---------------------------------------------------------------------------
// ZustandsCache
// ---------------------------------------------------------------------------

/// In-Memory-Abbild des Serverzustands aus Sicht dieses Clients
#[derive(Debug, Default)]
pub struct ZustandsCache {
    channels: Vec<Channel>,
    users: Vec<User>,
    me: User,
}

impl Default for User {
    fn default() -> Self {
        Self::neu(Params::new())
    }
}

impl ZustandsCache {
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Der eigene, eingeloggte Benutzer (aus `accepted`)
    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn find_channel<'a>(&self, key: impl Into<Lookup<'a>>) -> Option<&Channel> {
        let key = key.into();
        self.channels.iter().find(|c| c.passt(key))
    }

    pub fn find_user<'a>(&self, key: impl Into<Lookup<'a>>) -> Option<&User> {
        let key = key.into();
        self.users.iter().find(|u| u.passt(key))
    }

    /// Benutzer in einem Kanal; `None` liefert alle Benutzer ohne Kanal
    pub fn users_in_channel(&self, chanid: Option<u64>) -> Vec<&User> {
        self.users.iter().filter(|u| u.chanid() == chanid).collect()
    }

    // -----------------------------------------------------------------------
    // Mutatoren (nur fuer die internen Handler)
    // -----------------------------------------------------------------------

    /// `loggedin`: zusammenfuehren falls `userid` bekannt, sonst anhaengen
    pub(crate) fn user_eingeloggt(&mut self, params: &Params) {
        let Some(userid) = params.get("userid").and_then(Value::as_int) else {
            tracing::warn!("loggedin ohne userid ignoriert");
            return;
        };
        match self.users.iter_mut().find(|u| u.userid() == Some(userid)) {
            Some(user) => user.zusammenfuehren(params),
            None => self.users.push(User::neu(params.clone())),
        }
    }

    pub(crate) fn user_ausgeloggt(&mut self, params: &Params) {
        if let Some(userid) = params.get("userid").and_then(Value::as_int) {
            self.users.retain(|u| u.userid() != Some(userid));
        }
    }

    /// `updateuser`, `adduser`: Felder in einen bekannten Benutzer uebernehmen
    pub(crate) fn user_aktualisiert(&mut self, params: &Params) {
        let Some(userid) = params.get("userid").and_then(Value::as_int) else {
            return;
        };
        match self.users.iter_mut().find(|u| u.userid() == Some(userid)) {
            Some(user) => user.zusammenfuehren(params),
            None => tracing::debug!(userid, "Aktualisierung fuer unbekannten Benutzer"),
        }
    }

    /// `removeuser`: Benutzer hat seinen Kanal verlassen
    pub(crate) fn user_kanal_verlassen(&mut self, params: &Params) {
        let Some(userid) = params.get("userid").and_then(Value::as_int) else {
            return;
        };
        if let Some(user) = self.users.iter_mut().find(|u| u.userid() == Some(userid)) {
            user.felder.shift_remove("chanid");
        }
    }

    /// `accepted`: immer zusammenfuehren, nie ersetzen
    pub(crate) fn selbst_aktualisiert(&mut self, params: &Params) {
        self.me.zusammenfuehren(params);
    }

    /// `addchannel`: gleiche `chanid` wird entfernt und neu angehaengt
    pub(crate) fn channel_hinzugefuegt(&mut self, params: &Params) {
        let Some(chanid) = params.get("chanid").and_then(Value::as_int) else {
            tracing::warn!("addchannel ohne chanid ignoriert");
            return;
        };
        self.channels.retain(|c| c.chanid() != Some(chanid));
        self.channels.push(Channel::neu(params.clone()));
    }

    pub(crate) fn channel_aktualisiert(&mut self, params: &Params) {
        let Some(chanid) = params.get("chanid").and_then(Value::as_int) else {
            return;
        };
        match self.channels.iter_mut().find(|c| c.chanid() == Some(chanid)) {
            Some(channel) => merge(&mut channel.felder, params),
            None => self.channels.push(Channel::neu(params.clone())),
        }
    }

    pub(crate) fn channel_entfernt(&mut self, params: &Params) {
        if let Some(chanid) = params.get("chanid").and_then(Value::as_int) {
            self.channels.retain(|c| c.chanid() != Some(chanid));
        }
    }
}
