//! teamtalk-client – Client fuer TeamTalk-5-Server
//!
//! Verbindet sich ueber TCP mit einem TeamTalk-Server, meldet sich an,
//! haelt die Verbindung per Keepalive offen und spiegelt Server-, Kanal-
//! und Benutzerzustand in einem lokalen Cache.
//!
//! ## Architektur
//!
//! ```text
//! Session
//!     |  connect -> login -> handle_messages
//!     |
//!     +-- ZustandsCache   (Channels, Users, eigener Benutzer)
//!     +-- EventDispatcher (externe Handler pro Event)
//!     +-- Keepalive-Task  (ping im Abstand von 0,75 x usertimeout)
//!     +-- Schreib-Task    (mpsc-Queue -> TCP)
//!
//! SessionHandle – Senden und Trennen aus anderen Tasks
//! ```

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod keepalive;
pub mod konfig;
pub mod session;
mod verbindung;

// Bequeme Re-Exporte
pub use cache::{Channel, Lookup, User, UserRolle, ZustandsCache};
pub use dispatcher::{EventDispatcher, Handler, HandlerId};
pub use error::{ClientError, ClientResult};
pub use konfig::{ClientKonfig, LoginDaten};
pub use session::{Session, SessionZustand};
pub use verbindung::SessionHandle;

pub use teamtalk_protocol::{ListItem, Params, ProtocolMessage, Value};
