//! Konstanten des TeamTalk-5-Protokolls
//!
//! Werte entsprechen `teamtalk/common.h` der TeamTalk-Bibliothek.

/// Erstes Event jeder Verbindung (Willkommensnachricht)
pub const WILLKOMMEN_EVENT: &str = "teamtalk";

/// Keepalive-Anfrage des Clients
pub const PING: &str = "ping";

/// Antwort des Servers auf `ping` – wird nie an Abonnenten weitergereicht
pub const PONG: &str = "pong";

/// Korrelations-ID der Login-Anfrage (Login-Burst zwischen `begin id=1` und `end id=1`)
pub const LOGIN_ID: u64 = 1;

/// Standard-TCP-Port eines TeamTalk-Servers
pub const STANDARD_TCP_PORT: u16 = 10333;

// ---------------------------------------------------------------------------
// Nachrichtentypen (`type=` in `message`/`messagedeliver`)
// ---------------------------------------------------------------------------

/// Art einer Textnachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum MessageType {
    None = 0,
    User = 1,
    Channel = 2,
    Broadcast = 3,
    Custom = 4,
}

impl MessageType {
    pub fn aus_wert(wert: u64) -> Option<Self> {
        match wert {
            0 => Some(Self::None),
            1 => Some(Self::User),
            2 => Some(Self::Channel),
            3 => Some(Self::Broadcast),
            4 => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn wert(self) -> u64 {
        self as u64
    }
}

// ---------------------------------------------------------------------------
// Benutzertypen (`usertype=`)
// ---------------------------------------------------------------------------

pub const USERTYPE_NONE: u64 = 0;
pub const USERTYPE_DEFAULT: u64 = 1;
pub const USERTYPE_ADMIN: u64 = 2;

// ---------------------------------------------------------------------------
// Benutzerrechte (`userrights=` Bitmaske)
// ---------------------------------------------------------------------------

pub const USERRIGHT_NONE: u64 = 0x0000_0000;
pub const USERRIGHT_MULTI_LOGIN: u64 = 0x0000_0001;
pub const USERRIGHT_VIEW_ALL_USERS: u64 = 0x0000_0002;
pub const USERRIGHT_CREATE_TEMPORARY_CHANNEL: u64 = 0x0000_0004;
pub const USERRIGHT_MODIFY_CHANNELS: u64 = 0x0000_0008;
pub const USERRIGHT_TEXTMESSAGE_BROADCAST: u64 = 0x0000_0010;
pub const USERRIGHT_KICK_USERS: u64 = 0x0000_0020;
pub const USERRIGHT_BAN_USERS: u64 = 0x0000_0040;
pub const USERRIGHT_MOVE_USERS: u64 = 0x0000_0080;
pub const USERRIGHT_OPERATOR_ENABLE: u64 = 0x0000_0100;
pub const USERRIGHT_UPLOAD_FILES: u64 = 0x0000_0200;
pub const USERRIGHT_DOWNLOAD_FILES: u64 = 0x0000_0400;
pub const USERRIGHT_UPDATE_SERVERPROPERTIES: u64 = 0x0000_0800;
pub const USERRIGHT_TRANSMIT_VOICE: u64 = 0x0000_1000;
pub const USERRIGHT_TRANSMIT_VIDEOCAPTURE: u64 = 0x0000_2000;
pub const USERRIGHT_TRANSMIT_DESKTOP: u64 = 0x0000_4000;
pub const USERRIGHT_TRANSMIT_DESKTOPINPUT: u64 = 0x0000_8000;
pub const USERRIGHT_TRANSMIT_MEDIAFILE_AUDIO: u64 = 0x0001_0000;
pub const USERRIGHT_TRANSMIT_MEDIAFILE_VIDEO: u64 = 0x0002_0000;
pub const USERRIGHT_TRANSMIT_MEDIAFILE: u64 =
    USERRIGHT_TRANSMIT_MEDIAFILE_AUDIO | USERRIGHT_TRANSMIT_MEDIAFILE_VIDEO;
pub const USERRIGHT_LOCKED_NICKNAME: u64 = 0x0004_0000;
pub const USERRIGHT_LOCKED_STATUS: u64 = 0x0008_0000;
pub const USERRIGHT_RECORD_VOICE: u64 = 0x0010_0000;

/// Rechte eines neu angelegten Standard-Benutzerkontos
pub const USERRIGHT_DEFAULT: u64 = USERRIGHT_MULTI_LOGIN
    | USERRIGHT_VIEW_ALL_USERS
    | USERRIGHT_CREATE_TEMPORARY_CHANNEL
    | USERRIGHT_UPLOAD_FILES
    | USERRIGHT_DOWNLOAD_FILES
    | USERRIGHT_TRANSMIT_VOICE
    | USERRIGHT_TRANSMIT_VIDEOCAPTURE
    | USERRIGHT_TRANSMIT_DESKTOP
    | USERRIGHT_TRANSMIT_DESKTOPINPUT
    | USERRIGHT_TRANSMIT_MEDIAFILE;

pub const USERRIGHT_ALL: u64 = 0x0013_FFFF;
pub const USERRIGHT_KNOWN_MASK: u64 = 0x001F_FFFF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_werte() {
        assert_eq!(MessageType::User.wert(), 1);
        assert_eq!(MessageType::aus_wert(3), Some(MessageType::Broadcast));
        assert_eq!(MessageType::aus_wert(9), None);
    }

    #[test]
    fn rechte_masken() {
        assert_eq!(USERRIGHT_TRANSMIT_MEDIAFILE, 0x0003_0000);
        assert_eq!(USERRIGHT_DEFAULT & USERRIGHT_KICK_USERS, 0);
        assert_ne!(USERRIGHT_DEFAULT & USERRIGHT_TRANSMIT_VOICE, 0);
        assert_eq!(USERRIGHT_ALL & !USERRIGHT_KNOWN_MASK, 0);
    }
}
